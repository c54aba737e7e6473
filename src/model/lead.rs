use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;
use super::validate;
use crate::error::Result;

text_enum! {
    /// Funnel position of a lead. `closed_won` and `closed_lost` are terminal.
    pub enum LeadStage => InvalidStage {
        New = "new",
        Contacted = "contacted",
        Qualified = "qualified",
        Proposal = "proposal",
        Negotiation = "negotiation",
        ClosedWon = "closed_won",
        ClosedLost = "closed_lost",
    }
}

impl LeadStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStage::ClosedWon | LeadStage::ClosedLost)
    }

    /// Outcome recorded when entering this stage, if it is terminal
    pub fn outcome(&self) -> Option<LeadOutcome> {
        match self {
            LeadStage::ClosedWon => Some(LeadOutcome::Won),
            LeadStage::ClosedLost => Some(LeadOutcome::Lost),
            _ => None,
        }
    }
}

text_enum! {
    pub enum ProgressionType => InvalidState {
        Automatic = "automatic",
        Manual = "manual",
        System = "system",
    }
}

text_enum! {
    pub enum LeadOutcome => InvalidState {
        Won = "won",
        Lost = "lost",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub business_id: String,
    pub client_id: String,
    pub conversation_id: String,
    pub current_stage: LeadStage,
    pub previous_stage: Option<LeadStage>,
    pub stage_entered_at: Option<DateTime<Utc>>,
    pub stage_progression_count: i64,
    /// Seconds, sum of every completed stage duration
    pub total_funnel_time: i64,
    pub qualification_score: i64,
    pub interest_level: i64,
    pub engagement_level: i64,
    pub lead_source: Option<String>,
    pub estimated_value: Option<f64>,
    pub final_outcome: Option<LeadOutcome>,
    pub outcome_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Seconds spent in the current stage as of `now`; 0 when the entry time is unknown.
    pub fn time_in_current_stage(&self, now: DateTime<Utc>) -> i64 {
        self.stage_entered_at
            .map(|entered| (now - entered).num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.current_stage.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct NewLead {
    pub client_id: String,
    pub conversation_id: String,
    pub qualification_score: i64,
    pub interest_level: i64,
    pub engagement_level: i64,
    pub lead_source: Option<String>,
    pub estimated_value: Option<f64>,
}

impl NewLead {
    pub fn validate(&self) -> Result<()> {
        validate::level("qualification_score", self.qualification_score, 0, 100)?;
        validate::level("interest_level", self.interest_level, 0, 10)?;
        validate::level("engagement_level", self.engagement_level, 0, 10)?;
        if let Some(value) = self.estimated_value {
            validate::non_negative("estimated_value", value)?;
        }
        Ok(())
    }
}

/// Metadata attached to a single stage transition
#[derive(Debug, Clone)]
pub struct StageChange {
    pub progression_type: ProgressionType,
    pub confidence_score: Option<f64>,
    pub qualifying_factors: Vec<String>,
    pub disqualifying_factors: Vec<String>,
    pub trigger_event: Option<String>,
    pub changed_by: Option<String>,
}

impl StageChange {
    pub fn new(progression_type: ProgressionType) -> Self {
        Self {
            progression_type,
            confidence_score: None,
            qualifying_factors: Vec::new(),
            disqualifying_factors: Vec::new(),
            trigger_event: None,
            changed_by: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(confidence) = self.confidence_score {
            validate::in_range("confidence_score", confidence, 0.0, 1.0)?;
        }
        Ok(())
    }
}

impl Default for StageChange {
    fn default() -> Self {
        Self::new(ProgressionType::Manual)
    }
}

/// One append-only audit row per stage transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadStageHistory {
    pub id: String,
    pub lead_id: String,
    pub business_id: String,
    pub from_stage: Option<LeadStage>,
    pub to_stage: LeadStage,
    pub progression_type: ProgressionType,
    pub confidence_score: Option<f64>,
    pub qualifying_factors: Vec<String>,
    pub disqualifying_factors: Vec<String>,
    pub trigger_event: Option<String>,
    pub changed_by: Option<String>,
    /// Seconds
    pub time_in_previous_stage: i64,
    pub created_at: DateTime<Utc>,
}
