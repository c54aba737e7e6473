//! Lead funnel state machine
//!
//! Stages run `new` through `closed_won`/`closed_lost`. Any non-terminal
//! stage may move to any other stage; terminal stages accept nothing.
//! Every accepted move produces exactly one history row, so
//! `stage_progression_count` always equals the number of history rows.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::model::{new_id, Lead, LeadStage, LeadStageHistory, NewLead, StageChange};

/// A lead after an accepted move, plus the audit row describing it.
/// The store must persist both or neither.
#[derive(Debug, Clone)]
pub struct Transition {
    pub lead: Lead,
    pub history: LeadStageHistory,
}

/// Build a lead at the initial stage. No history row is written for creation.
pub fn start(business_id: &str, input: &NewLead, now: DateTime<Utc>) -> Result<Lead> {
    input.validate()?;
    Ok(Lead {
        id: new_id(),
        business_id: business_id.to_string(),
        client_id: input.client_id.clone(),
        conversation_id: input.conversation_id.clone(),
        current_stage: LeadStage::New,
        previous_stage: None,
        stage_entered_at: Some(now),
        stage_progression_count: 0,
        total_funnel_time: 0,
        qualification_score: input.qualification_score,
        interest_level: input.interest_level,
        engagement_level: input.engagement_level,
        lead_source: input.lead_source.clone(),
        estimated_value: input.estimated_value,
        final_outcome: None,
        outcome_date: None,
        version: 0,
        created_at: now,
        updated_at: now,
    })
}

/// Check whether `lead` may move to `to_stage` without applying anything.
pub fn check_transition(lead: &Lead, to_stage: LeadStage) -> Result<()> {
    if lead.current_stage.is_terminal() {
        return Err(CoreError::InvalidTransition(format!(
            "lead {} is {} and cannot leave a terminal stage",
            lead.id, lead.current_stage
        )));
    }
    if lead.current_stage == to_stage {
        return Err(CoreError::InvalidTransition(format!(
            "lead {} is already {}",
            lead.id, to_stage
        )));
    }
    Ok(())
}

/// Move `lead` to `to_stage` at `now`.
pub fn advance_stage(
    lead: &Lead,
    to_stage: LeadStage,
    change: &StageChange,
    now: DateTime<Utc>,
) -> Result<Transition> {
    check_transition(lead, to_stage)?;
    change.validate()?;

    let time_in_previous_stage = lead.time_in_current_stage(now);

    let mut next = lead.clone();
    next.previous_stage = Some(lead.current_stage);
    next.current_stage = to_stage;
    next.stage_entered_at = Some(now);
    next.stage_progression_count += 1;
    next.total_funnel_time += time_in_previous_stage;
    next.updated_at = now;

    if let Some(outcome) = to_stage.outcome() {
        next.final_outcome = Some(outcome);
        next.outcome_date = Some(now);
    }

    let history = LeadStageHistory {
        id: new_id(),
        lead_id: lead.id.clone(),
        business_id: lead.business_id.clone(),
        from_stage: Some(lead.current_stage),
        to_stage,
        progression_type: change.progression_type,
        confidence_score: change.confidence_score,
        qualifying_factors: change.qualifying_factors.clone(),
        disqualifying_factors: change.disqualifying_factors.clone(),
        trigger_event: change.trigger_event.clone(),
        changed_by: change.changed_by.clone(),
        time_in_previous_stage,
        created_at: now,
    };

    Ok(Transition {
        lead: next,
        history,
    })
}

/// Sum of stage durations across a lead's history rows.
pub fn funnel_time(history: &[LeadStageHistory]) -> i64 {
    history.iter().map(|h| h.time_in_previous_stage).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeadOutcome, ProgressionType};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
    }

    fn lead() -> Lead {
        let input = NewLead {
            client_id: "client-1".to_string(),
            conversation_id: "conv-1".to_string(),
            qualification_score: 40,
            interest_level: 5,
            engagement_level: 3,
            lead_source: Some("whatsapp".to_string()),
            estimated_value: None,
        };
        start("biz-1", &input, t0()).unwrap()
    }

    #[test]
    fn test_new_to_qualified() {
        let lead = lead();
        let step = advance_stage(
            &lead,
            LeadStage::Qualified,
            &StageChange::new(ProgressionType::Manual),
            t0() + Duration::hours(2),
        )
        .unwrap();

        assert_eq!(step.lead.current_stage, LeadStage::Qualified);
        assert_eq!(step.lead.previous_stage, Some(LeadStage::New));
        assert_eq!(step.lead.stage_progression_count, 1);
        assert_eq!(step.history.from_stage, Some(LeadStage::New));
        assert_eq!(step.history.to_stage, LeadStage::Qualified);
        assert_eq!(step.history.time_in_previous_stage, 7200);
        assert_eq!(step.lead.total_funnel_time, 7200);
    }

    #[test]
    fn test_terminal_stage_rejects_every_move() {
        let lead = lead();
        let won = advance_stage(&lead, LeadStage::ClosedWon, &StageChange::default(), t0())
            .unwrap()
            .lead;
        assert_eq!(won.final_outcome, Some(LeadOutcome::Won));
        assert_eq!(won.outcome_date, Some(t0()));

        for stage in LeadStage::ALL {
            let err = advance_stage(&won, *stage, &StageChange::default(), t0()).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition(_)));
        }
    }

    #[test]
    fn test_same_stage_is_rejected() {
        let err = advance_stage(&lead(), LeadStage::New, &StageChange::default(), t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }

    #[test]
    fn test_missing_entry_time_counts_as_zero() {
        let mut lead = lead();
        lead.stage_entered_at = None;
        let step = advance_stage(
            &lead,
            LeadStage::Contacted,
            &StageChange::default(),
            t0() + Duration::days(3),
        )
        .unwrap();
        assert_eq!(step.history.time_in_previous_stage, 0);
    }

    #[test]
    fn test_clock_skew_never_yields_negative_duration() {
        let lead = lead();
        let step = advance_stage(
            &lead,
            LeadStage::Contacted,
            &StageChange::default(),
            t0() - Duration::minutes(5),
        )
        .unwrap();
        assert_eq!(step.history.time_in_previous_stage, 0);
    }

    #[test]
    fn test_total_funnel_time_matches_history_sum() {
        let mut current = lead();
        let mut history = Vec::new();
        let path = [
            (LeadStage::Contacted, 60),
            (LeadStage::Qualified, 3600),
            (LeadStage::Contacted, 30),
            (LeadStage::Proposal, 86400),
            (LeadStage::ClosedLost, 10),
        ];
        let mut now = t0();
        for (stage, wait) in path {
            now += Duration::seconds(wait);
            let step = advance_stage(&current, stage, &StageChange::default(), now).unwrap();
            history.push(step.history);
            current = step.lead;
        }

        assert_eq!(current.stage_progression_count, history.len() as i64);
        assert_eq!(current.total_funnel_time, funnel_time(&history));
        let held: Vec<_> = history.iter().map(|h| h.to_stage).collect();
        assert_eq!(held, path.iter().map(|(s, _)| *s).collect::<Vec<_>>());
    }

    #[test]
    fn test_bad_confidence_fails_validation() {
        let mut change = StageChange::new(ProgressionType::Automatic);
        change.confidence_score = Some(-0.1);
        let err = advance_stage(&lead(), LeadStage::Contacted, &change, t0()).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed(_)));
    }
}
