use anyhow::Result;

use super::{print_json, Service};
use crate::model::{NewLead, StageChange};
use crate::tenant::TenantContext;

pub fn create(service: &Service, ctx: &TenantContext, input: NewLead) -> Result<()> {
    let lead = service.create_lead(ctx, &input)?;
    println!("Lead created with ID: {} (stage {})", lead.id, lead.current_stage);
    Ok(())
}

pub fn show(service: &Service, ctx: &TenantContext, lead_id: &str) -> Result<()> {
    print_json(&service.get_lead(ctx, lead_id)?)
}

pub fn advance(
    service: &Service,
    ctx: &TenantContext,
    lead_id: &str,
    to_stage: &str,
    change: StageChange,
) -> Result<()> {
    let lead = service.advance_lead_stage(ctx, lead_id, to_stage, &change)?;
    println!(
        "Lead {} moved {} -> {} (transition #{})",
        lead.id,
        lead.previous_stage.map(|s| s.as_str()).unwrap_or("-"),
        lead.current_stage,
        lead.stage_progression_count
    );
    if let Some(outcome) = lead.final_outcome {
        println!("Outcome: {}", outcome);
    }
    Ok(())
}

pub fn history(service: &Service, ctx: &TenantContext, lead_id: &str) -> Result<()> {
    let history = service.lead_history(ctx, lead_id)?;
    if history.is_empty() {
        println!("Lead has not changed stage yet.");
        return Ok(());
    }

    println!(
        "{:<17} {:<13} {:<13} {:<10} {:>10} {}",
        "When", "From", "To", "Type", "Seconds", "Trigger"
    );
    println!("{}", "-".repeat(85));
    for h in history {
        println!(
            "{:<17} {:<13} {:<13} {:<10} {:>10} {}",
            h.created_at.format("%m-%d %H:%M:%S"),
            h.from_stage.map(|s| s.as_str()).unwrap_or("-"),
            h.to_stage,
            h.progression_type,
            h.time_in_previous_stage,
            h.trigger_event.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
