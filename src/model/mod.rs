//! Domain records for every tenant-scoped entity
//!
//! Enum-like columns are closed enums that round-trip through SQLite as
//! their snake_case text form. Input structs (`New*`) validate at the
//! boundary before anything reaches the store.

mod business;
mod content;
mod conversation;
mod lead;
mod question;
mod testing;
pub mod validate;

/// Declares a closed enum stored as TEXT.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` (failing with the given
/// `CoreError` variant) and the rusqlite conversions.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident => $err:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::CoreError::$err(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub(crate) use text_enum;

pub use business::{
    Business, Client, NewBusiness, NewClient, NewPlatformSource, PlatformSource, PlatformType,
    RelationshipStatus, SubscriptionStatus,
};
pub use content::{
    CharBounds, CompletionStatus, ContentEntry, ContentKind, ContentUpsert, NewSectionTemplate,
    SectionTemplate, SectionTemplateTranslation,
};
pub use conversation::{
    Conversation, ConversationState, Message, MessageType, NewConversation, NewMessage,
    PauseReason, SenderType,
};
pub use lead::{
    Lead, LeadOutcome, LeadStage, LeadStageHistory, NewLead, ProgressionType, StageChange,
};
pub use question::{QuestionStatus, UnansweredQuestion};
pub use testing::{TestMessage, TestSession, TestSessionStatus};

/// Fresh identifier for a new row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
