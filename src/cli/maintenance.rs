//! Counter reconciliation, idle sweep and scenario test runs

use anyhow::Result;
use chrono::Duration;

use super::{print_json, truncate, Service};
use crate::model::SenderType;
use crate::tenant::TenantContext;

pub fn reconcile(service: &Service, ctx: &TenantContext) -> Result<()> {
    let repaired = service.reconcile_client_counters(ctx)?;
    if repaired.is_empty() {
        println!("All client counters are consistent.");
        return Ok(());
    }
    for client in &repaired {
        println!(
            "Repaired client {}: {} conversations, {} leads",
            client.id, client.total_conversations, client.total_leads
        );
    }
    Ok(())
}

pub fn sweep(service: &Service, ctx: &TenantContext, timeout: Duration) -> Result<()> {
    let paused = service.pause_idle_conversations(ctx, timeout)?;
    println!(
        "Paused {} conversation(s) idle for {}+ minutes",
        paused.len(),
        timeout.num_minutes()
    );
    for c in paused {
        println!("  {} (last activity {})", c.id, c.last_activity.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

pub fn start_scenario(service: &Service, ctx: &TenantContext, name: &str, language: &str) -> Result<()> {
    let session = service.start_test_session(ctx, name, language)?;
    println!("Test session '{}' started with ID: {}", session.scenario_name, session.id);
    Ok(())
}

pub fn say(
    service: &Service,
    ctx: &TenantContext,
    session_id: &str,
    sender: SenderType,
    content: &str,
) -> Result<()> {
    let message = service.add_test_message(ctx, session_id, sender, content)?;
    println!("#{} {}: {}", message.sequence, message.sender_type, truncate(&message.content, 60));
    Ok(())
}

pub fn complete_scenario(service: &Service, ctx: &TenantContext, session_id: &str) -> Result<()> {
    print_json(&service.complete_test_session(ctx, session_id)?)
}

pub fn transcript(service: &Service, ctx: &TenantContext, session_id: &str) -> Result<()> {
    let messages = service.test_transcript(ctx, session_id)?;
    if messages.is_empty() {
        println!("No messages in this test session.");
        return Ok(());
    }
    for m in messages {
        println!("#{:<4} {:<9} {}", m.sequence, m.sender_type, m.content);
    }
    Ok(())
}
