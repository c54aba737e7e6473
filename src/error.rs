//! Error types shared by the state model and the store

/// Errors returned by every core operation.
///
/// All variants are recoverable by the caller; the core never retries.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid lead stage: {0}")]
    InvalidStage(String),

    #[error("Invalid value: {0}")]
    InvalidState(String),

    #[error("Tenant mismatch: {entity} belongs to another business")]
    TenantMismatch { entity: &'static str },

    #[error("Conversation {0} is closed")]
    ConversationClosed(String),

    #[error("Concurrency conflict on {entity} {id}: reload and retry")]
    ConcurrencyConflict { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Uniqueness violation: {0}")]
    UniquenessViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::ConcurrencyConflict {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
