//! Conversation lifecycle controller
//!
//! ```text
//!   active ──pause──▶ paused ──resume──▶ active
//!   active|paused ──escalate──▶ escalated ──resume──▶ active
//!   any open state ──close──▶ closed ──reopen──▶ active
//! ```
//!
//! Message arrival never changes `current_state`. A closed conversation
//! rejects messages until it is explicitly reopened.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};
use crate::model::validate;
use crate::model::{
    new_id, Conversation, ConversationState, NewConversation, NewMessage, PauseReason,
};

pub fn start(business_id: &str, input: &NewConversation, now: DateTime<Utc>) -> Conversation {
    Conversation {
        id: new_id(),
        business_id: business_id.to_string(),
        client_id: input.client_id.clone(),
        platform_source_id: input.platform_source_id.clone(),
        current_state: ConversationState::Active,
        pause_reason: None,
        is_bot_active: true,
        requires_human: false,
        human_takeover_reason: None,
        lead_score: 0.0,
        sentiment_score: 0.0,
        message_count: 0,
        last_activity: now,
        closed_at: None,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

fn ensure_open(conversation: &Conversation) -> Result<()> {
    if conversation.is_closed() {
        return Err(CoreError::ConversationClosed(conversation.id.clone()));
    }
    Ok(())
}

fn not_allowed(conversation: &Conversation, action: &str) -> CoreError {
    CoreError::InvalidTransition(format!(
        "cannot {} conversation {} while {}",
        action, conversation.id, conversation.current_state
    ))
}

/// Count a new message against the conversation.
pub fn record_message(
    conversation: &Conversation,
    message: &NewMessage,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    ensure_open(conversation)?;
    message.validate()?;

    let mut next = conversation.clone();
    // The first message sets activity outright, even when it predates the open.
    next.last_activity = if conversation.message_count == 0 {
        message.message_timestamp
    } else {
        next.last_activity.max(message.message_timestamp)
    };
    next.message_count += 1;
    next.updated_at = now;
    Ok(next)
}

/// Hand the conversation to a human and silence the bot.
pub fn escalate(conversation: &Conversation, reason: &str, now: DateTime<Utc>) -> Result<Conversation> {
    ensure_open(conversation)?;
    validate::non_empty("reason", reason)?;
    if conversation.current_state == ConversationState::Escalated {
        return Err(not_allowed(conversation, "escalate"));
    }

    let mut next = conversation.clone();
    next.current_state = ConversationState::Escalated;
    next.pause_reason = None;
    next.requires_human = true;
    next.human_takeover_reason = Some(reason.to_string());
    next.is_bot_active = false;
    next.updated_at = now;
    Ok(next)
}

pub fn pause(
    conversation: &Conversation,
    reason: PauseReason,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    ensure_open(conversation)?;
    if conversation.current_state != ConversationState::Active {
        return Err(not_allowed(conversation, "pause"));
    }

    let mut next = conversation.clone();
    next.current_state = ConversationState::Paused;
    next.pause_reason = Some(reason);
    next.updated_at = now;
    Ok(next)
}

/// Return a paused or escalated conversation to the bot.
pub fn resume(conversation: &Conversation, now: DateTime<Utc>) -> Result<Conversation> {
    ensure_open(conversation)?;
    match conversation.current_state {
        ConversationState::Paused | ConversationState::Escalated => {}
        _ => return Err(not_allowed(conversation, "resume")),
    }

    let mut next = conversation.clone();
    next.current_state = ConversationState::Active;
    next.pause_reason = None;
    next.requires_human = false;
    next.is_bot_active = true;
    next.updated_at = now;
    Ok(next)
}

pub fn close(conversation: &Conversation, now: DateTime<Utc>) -> Result<Conversation> {
    if conversation.is_closed() {
        return Err(not_allowed(conversation, "close"));
    }

    let mut next = conversation.clone();
    next.current_state = ConversationState::Closed;
    next.pause_reason = None;
    next.is_bot_active = false;
    next.closed_at = Some(now);
    next.updated_at = now;
    Ok(next)
}

pub fn reopen(conversation: &Conversation, now: DateTime<Utc>) -> Result<Conversation> {
    if !conversation.is_closed() {
        return Err(not_allowed(conversation, "reopen"));
    }

    let mut next = conversation.clone();
    next.current_state = ConversationState::Active;
    next.is_bot_active = true;
    next.requires_human = false;
    next.human_takeover_reason = None;
    next.closed_at = None;
    next.updated_at = now;
    Ok(next)
}

pub fn set_scores(
    conversation: &Conversation,
    lead_score: Option<f64>,
    sentiment_score: Option<f64>,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    let mut next = conversation.clone();
    if let Some(score) = lead_score {
        next.lead_score = validate::in_range("lead_score", score, 0.0, 100.0)?;
    }
    if let Some(score) = sentiment_score {
        next.sentiment_score = validate::in_range("sentiment_score", score, -1.0, 1.0)?;
    }
    next.updated_at = now;
    Ok(next)
}

/// Active conversation with no activity for at least `timeout`.
pub fn is_idle(conversation: &Conversation, now: DateTime<Utc>, timeout: Duration) -> bool {
    conversation.current_state == ConversationState::Active
        && now - conversation.last_activity >= timeout
}
