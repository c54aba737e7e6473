use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;
use super::validate;
use crate::error::Result;

text_enum! {
    pub enum ConversationState => InvalidState {
        Active = "active",
        Paused = "paused",
        Closed = "closed",
        Escalated = "escalated",
    }
}

text_enum! {
    /// Why a conversation sits in `paused`.
    pub enum PauseReason => InvalidState {
        Manual = "manual",
        Inactivity = "inactivity",
    }
}

text_enum! {
    pub enum SenderType => InvalidState {
        Customer = "customer",
        Bot = "bot",
        Agent = "agent",
        System = "system",
    }
}

text_enum! {
    pub enum MessageType => InvalidState {
        Text = "text",
        Image = "image",
        Audio = "audio",
        Video = "video",
        Document = "document",
        Location = "location",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub business_id: String,
    pub client_id: String,
    pub platform_source_id: String,
    pub current_state: ConversationState,
    /// Only set while `current_state` is `paused`
    pub pause_reason: Option<PauseReason>,
    pub is_bot_active: bool,
    pub requires_human: bool,
    pub human_takeover_reason: Option<String>,
    pub lead_score: f64,
    pub sentiment_score: f64,
    pub message_count: i64,
    pub last_activity: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_closed(&self) -> bool {
        self.current_state == ConversationState::Closed
    }
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub client_id: String,
    pub platform_source_id: String,
}

/// Immutable once stored; ordered by `message_timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub business_id: String,
    pub sender_type: SenderType,
    pub content: String,
    pub message_type: MessageType,
    pub platform_message_id: Option<String>,
    pub message_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_type: SenderType,
    pub content: String,
    pub message_type: MessageType,
    pub platform_message_id: Option<String>,
    pub message_timestamp: DateTime<Utc>,
}

impl NewMessage {
    pub fn text(sender_type: SenderType, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            sender_type,
            content: content.into(),
            message_type: MessageType::Text,
            platform_message_id: None,
            message_timestamp: at,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.message_type == MessageType::Text {
            validate::non_empty("content", &self.content)?;
        }
        Ok(())
    }
}
