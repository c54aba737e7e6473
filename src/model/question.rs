use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;

text_enum! {
    pub enum QuestionStatus => InvalidState {
        Pending = "pending",
        Resolved = "resolved",
        Ignored = "ignored",
        Duplicate = "duplicate",
        Escalated = "escalated",
    }
}

/// A customer question no content could answer, deduplicated by hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnansweredQuestion {
    pub id: String,
    pub business_id: String,
    pub question: String,
    pub question_hash: String,
    pub language_code: String,
    pub frequency: i64,
    pub status: QuestionStatus,
    pub sources_searched: Vec<String>,
    pub confidence_scores: Vec<f64>,
    pub resolved_faq_id: Option<String>,
    pub first_asked_at: DateTime<Utc>,
    pub last_asked_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub version: i64,
}
