//! Conversation commands

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{print_json, truncate, Service};
use crate::clock::Clock;
use crate::model::{MessageType, NewConversation, NewMessage, PauseReason, SenderType};
use crate::tenant::TenantContext;

pub fn open(service: &Service, ctx: &TenantContext, client_id: String, source_id: String) -> Result<()> {
    let conversation = service.open_conversation(
        ctx,
        &NewConversation {
            client_id,
            platform_source_id: source_id,
        },
    )?;
    println!("Conversation opened with ID: {}", conversation.id);
    Ok(())
}

pub fn show(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    print_json(&service.get_conversation(ctx, conversation_id)?)
}

#[allow(clippy::too_many_arguments)]
pub fn message(
    service: &Service,
    ctx: &TenantContext,
    conversation_id: &str,
    sender: SenderType,
    content: String,
    message_type: MessageType,
    platform_message_id: Option<String>,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let input = NewMessage {
        sender_type: sender,
        content,
        message_type,
        platform_message_id,
        message_timestamp: at.unwrap_or_else(|| service.clock().now()),
    };
    let conversation = service.record_message(ctx, conversation_id, &input)?;
    println!(
        "Recorded message #{} in conversation {}",
        conversation.message_count, conversation.id
    );
    Ok(())
}

pub fn messages(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    let messages = service.conversation_messages(ctx, conversation_id)?;
    if messages.is_empty() {
        println!("No messages in this conversation.");
        return Ok(());
    }

    println!("{:<17} {:<9} {:<9} {}", "Timestamp", "Sender", "Type", "Content");
    println!("{}", "-".repeat(80));
    for m in messages {
        println!(
            "{:<17} {:<9} {:<9} {}",
            m.message_timestamp.format("%m-%d %H:%M:%S"),
            m.sender_type,
            m.message_type,
            truncate(&m.content, 45),
        );
    }
    Ok(())
}

pub fn escalate(service: &Service, ctx: &TenantContext, conversation_id: &str, reason: &str) -> Result<()> {
    print_json(&service.escalate_conversation(ctx, conversation_id, reason)?)
}

pub fn pause(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    print_json(&service.pause_conversation(ctx, conversation_id, PauseReason::Manual)?)
}

pub fn resume(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    print_json(&service.resume_conversation(ctx, conversation_id)?)
}

pub fn close(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    print_json(&service.close_conversation(ctx, conversation_id)?)
}

pub fn reopen(service: &Service, ctx: &TenantContext, conversation_id: &str) -> Result<()> {
    print_json(&service.reopen_conversation(ctx, conversation_id)?)
}

pub fn score(
    service: &Service,
    ctx: &TenantContext,
    conversation_id: &str,
    lead_score: Option<f64>,
    sentiment: Option<f64>,
) -> Result<()> {
    if lead_score.is_none() && sentiment.is_none() {
        anyhow::bail!("pass --lead and/or --sentiment");
    }
    print_json(&service.score_conversation(ctx, conversation_id, lead_score, sentiment)?)
}
