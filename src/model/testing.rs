//! Scenario test runs an admin plays against the bot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;
use super::SenderType;

text_enum! {
    pub enum TestSessionStatus => InvalidState {
        Running = "running",
        Completed = "completed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    pub id: String,
    pub business_id: String,
    pub scenario_name: String,
    pub language_code: String,
    pub status: TestSessionStatus,
    pub message_count: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMessage {
    pub id: String,
    pub test_session_id: String,
    pub sequence: i64,
    pub sender_type: SenderType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
