use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;
use super::validate;
use crate::error::{CoreError, Result};

text_enum! {
    /// The three tenant+language scoped content tables.
    pub enum ContentKind => InvalidState {
        Faq = "faq",
        ContextSection = "context_section",
        TemplateResponse = "template_response",
    }
}

impl ContentKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            ContentKind::Faq => "faq_items",
            ContentKind::ContextSection => "business_context_sections",
            ContentKind::TemplateResponse => "business_template_responses",
        }
    }

    /// Column counting retrievals: `search_hits` for FAQs, `usage_count` otherwise
    pub(crate) fn access_count_column(&self) -> &'static str {
        match self {
            ContentKind::Faq => "search_hits",
            _ => "usage_count",
        }
    }

    pub(crate) fn last_access_column(&self) -> &'static str {
        match self {
            ContentKind::Faq => "last_accessed",
            _ => "last_used",
        }
    }

    pub fn entity_name(&self) -> &'static str {
        match self {
            ContentKind::Faq => "faq item",
            ContentKind::ContextSection => "context section",
            ContentKind::TemplateResponse => "template response",
        }
    }
}

text_enum! {
    pub enum CompletionStatus => InvalidState {
        NotStarted = "not_started",
        Incomplete = "incomplete",
        Complete = "complete",
        NeedsReview = "needs_review",
    }
}

/// Inclusive character-count window; a missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharBounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl CharBounds {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Result<Self> {
        if min.is_some_and(|m| m < 0) || max.is_some_and(|m| m < 0) {
            return Err(CoreError::ValidationFailed(
                "character bounds must be >= 0".to_string(),
            ));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(CoreError::ValidationFailed(format!(
                    "character_min {} exceeds character_max {}",
                    lo, hi
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Shared shape of FAQ items, context sections and template responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub kind: ContentKind,
    pub business_id: String,
    /// FAQ question, section key, or template key
    pub content_key: String,
    pub language_code: String,
    pub content: String,
    pub character_count: i64,
    pub word_count: i64,
    pub completion_status: CompletionStatus,
    pub bounds: CharBounds,
    pub access_count: i64,
    pub last_accessed: Option<DateTime<Utc>>,
    /// FAQ only: answers delivered with feedback
    pub usage_count: Option<i64>,
    /// FAQ only: percentage of helpful outcomes
    pub success_rate: Option<f64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContentUpsert {
    pub kind: ContentKind,
    pub content_key: String,
    pub language_code: String,
    pub content: String,
    /// Overrides stored or template bounds when set
    pub bounds: Option<CharBounds>,
}

impl ContentUpsert {
    pub fn validate(&self) -> Result<()> {
        validate::non_empty("content_key", &self.content_key)?;
        validate::language_code(&self.language_code)?;
        Ok(())
    }
}

/// Global onboarding template; not tenant scoped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub id: String,
    pub template_key: String,
    pub category: String,
    pub bounds: CharBounds,
    pub display_order: i64,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSectionTemplate {
    pub template_key: String,
    pub category: String,
    pub bounds: CharBounds,
    pub display_order: i64,
    pub is_required: bool,
}

impl NewSectionTemplate {
    pub fn validate(&self) -> Result<()> {
        validate::non_empty("template_key", &self.template_key)?;
        validate::non_empty("category", &self.category)?;
        CharBounds::new(self.bounds.min, self.bounds.max)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionTemplateTranslation {
    pub id: String,
    pub template_id: String,
    pub language_code: String,
    pub title: String,
    pub prompt: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_reject_inverted_window() {
        assert!(CharBounds::new(Some(50), Some(10)).is_err());
        assert!(CharBounds::new(Some(-1), None).is_err());
        assert!(CharBounds::new(Some(10), Some(10)).is_ok());
        assert!(CharBounds::default().is_unbounded());
    }

    #[test]
    fn test_kind_columns() {
        assert_eq!(ContentKind::Faq.access_count_column(), "search_hits");
        assert_eq!(ContentKind::ContextSection.last_access_column(), "last_used");
        assert_eq!(ContentKind::TemplateResponse.table(), "business_template_responses");
    }
}
