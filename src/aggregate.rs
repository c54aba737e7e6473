//! Derived counters kept consistent with their source content
//!
//! Every function here is deterministic in its inputs, so re-running a
//! recomputation over unchanged content is a no-op.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::model::{CharBounds, Client, CompletionStatus, ContentEntry, ContentKind};

/// Unicode scalar values, not bytes
pub fn character_count(content: &str) -> i64 {
    content.chars().count() as i64
}

pub fn word_count(content: &str) -> i64 {
    content.split_whitespace().count() as i64
}

pub fn completion_status(content: &str, bounds: CharBounds) -> CompletionStatus {
    if content.is_empty() {
        return CompletionStatus::Incomplete;
    }
    let count = character_count(content);
    if bounds.max.is_some_and(|max| count > max) {
        return CompletionStatus::NeedsReview;
    }
    // Completion is only judged against a full window.
    match (bounds.min, bounds.max) {
        (Some(min), Some(max)) if (min..=max).contains(&count) => CompletionStatus::Complete,
        _ => CompletionStatus::Incomplete,
    }
}

/// Replace the content of `entry` and recompute everything derived from it.
pub fn apply_content(
    entry: &ContentEntry,
    content: &str,
    bounds: CharBounds,
    now: DateTime<Utc>,
) -> ContentEntry {
    let mut next = entry.clone();
    next.content = content.to_string();
    next.bounds = bounds;
    next.character_count = character_count(content);
    next.word_count = word_count(content);
    next.completion_status = completion_status(content, bounds);
    next.updated_at = now;
    next
}

/// Empty entry as it exists before any content was written
pub fn blank_entry(
    kind: ContentKind,
    business_id: &str,
    content_key: &str,
    language_code: &str,
    now: DateTime<Utc>,
) -> ContentEntry {
    let is_faq = kind == ContentKind::Faq;
    ContentEntry {
        id: crate::model::new_id(),
        kind,
        business_id: business_id.to_string(),
        content_key: content_key.to_string(),
        language_code: language_code.to_string(),
        content: String::new(),
        character_count: 0,
        word_count: 0,
        completion_status: CompletionStatus::NotStarted,
        bounds: CharBounds::default(),
        access_count: 0,
        last_accessed: None,
        usage_count: is_faq.then_some(0),
        success_rate: is_faq.then_some(0.0),
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Content surfaced by a retrieval collaborator.
pub fn record_access(entry: &ContentEntry, now: DateTime<Utc>) -> ContentEntry {
    let mut next = entry.clone();
    next.access_count += 1;
    next.last_accessed = Some(now);
    next.updated_at = now;
    next
}

/// Fold one helpful/unhelpful outcome into an FAQ's running success rate.
pub fn record_outcome(
    entry: &ContentEntry,
    was_helpful: bool,
    now: DateTime<Utc>,
) -> Result<ContentEntry> {
    if entry.kind != ContentKind::Faq {
        return Err(CoreError::ValidationFailed(format!(
            "outcomes are only tracked for faq items, not {}",
            entry.kind.entity_name()
        )));
    }
    let usage = entry.usage_count.unwrap_or(0);
    let rate = entry.success_rate.unwrap_or(0.0);
    let sample = if was_helpful { 100.0 } else { 0.0 };

    let mut next = entry.clone();
    next.success_rate = Some((rate * usage as f64 + sample) / (usage + 1) as f64);
    next.usage_count = Some(usage + 1);
    next.updated_at = now;
    Ok(next)
}

/// Restore client counters from authoritative row counts.
///
/// Returns `None` when the stored counters already match.
pub fn reconcile_client(
    client: &Client,
    conversation_count: i64,
    lead_count: i64,
    now: DateTime<Utc>,
) -> Option<Client> {
    if client.total_conversations == conversation_count && client.total_leads == lead_count {
        return None;
    }
    let mut next = client.clone();
    next.total_conversations = conversation_count;
    next.total_leads = lead_count;
    next.updated_at = now;
    Some(next)
}

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dedup key for unanswered questions
pub fn question_hash(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_question(question).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn faq() -> ContentEntry {
        blank_entry(ContentKind::Faq, "biz-1", "Do you deliver?", "en", now())
    }

    #[test]
    fn test_counts_use_code_points() {
        assert_eq!(character_count("café"), 4);
        assert_eq!(character_count("日本語"), 3);
        assert_eq!(word_count("  open   from\t9\nto 5 "), 5);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_empty_content_is_incomplete() {
        let bounds = CharBounds::new(Some(0), Some(100)).unwrap();
        assert_eq!(completion_status("", bounds), CompletionStatus::Incomplete);
    }

    #[test]
    fn test_completion_against_bounds() {
        let bounds = CharBounds::new(Some(5), Some(10)).unwrap();
        assert_eq!(completion_status("abc", bounds), CompletionStatus::Incomplete);
        assert_eq!(completion_status("abcde", bounds), CompletionStatus::Complete);
        assert_eq!(completion_status("abcdefghij", bounds), CompletionStatus::Complete);
        assert_eq!(
            completion_status("abcdefghijk", bounds),
            CompletionStatus::NeedsReview
        );
        assert_eq!(
            completion_status("anything", CharBounds::default()),
            CompletionStatus::Incomplete
        );
    }

    #[test]
    fn test_one_sided_bounds_never_complete() {
        let min_only = CharBounds::new(Some(3), None).unwrap();
        assert_eq!(completion_status("abcdef", min_only), CompletionStatus::Incomplete);
        let max_only = CharBounds::new(None, Some(5)).unwrap();
        assert_eq!(completion_status("abc", max_only), CompletionStatus::Incomplete);
        assert_eq!(completion_status("abcdefgh", max_only), CompletionStatus::NeedsReview);
    }

    #[test]
    fn test_apply_content_is_idempotent() {
        let bounds = CharBounds::new(Some(10), Some(200)).unwrap();
        let text = "We deliver within 5 km of the shop.";
        let once = apply_content(&faq(), text, bounds, now());
        let twice = apply_content(&once, text, bounds, now());
        assert_eq!(once.character_count, twice.character_count);
        assert_eq!(once.word_count, twice.word_count);
        assert_eq!(once.completion_status, twice.completion_status);
        assert_eq!(once.completion_status, CompletionStatus::Complete);
    }

    #[test]
    fn test_success_rate_order_independent() {
        let a = record_outcome(&faq(), true, now()).unwrap();
        let a = record_outcome(&a, false, now()).unwrap();
        let b = record_outcome(&faq(), false, now()).unwrap();
        let b = record_outcome(&b, true, now()).unwrap();
        assert_eq!(a.success_rate, Some(50.0));
        assert_eq!(b.success_rate, Some(50.0));
        assert_eq!(a.usage_count, Some(2));
    }

    #[test]
    fn test_outcome_only_for_faq() {
        let section = blank_entry(ContentKind::ContextSection, "biz-1", "hours", "en", now());
        assert!(record_outcome(&section, true, now()).is_err());
    }

    #[test]
    fn test_access_bumps_counter() {
        let later = now() + chrono::Duration::minutes(7);
        let entry = record_access(&record_access(&faq(), now()), later);
        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_accessed, Some(later));
        assert_eq!(entry.updated_at, later);
    }

    #[test]
    fn test_question_hash_ignores_case_and_spacing() {
        assert_eq!(
            question_hash("Do you  open on Sundays?"),
            question_hash("  do you open on sundays?")
        );
        assert_ne!(question_hash("open sundays?"), question_hash("open mondays?"));
        assert_eq!(question_hash("x").len(), 64);
    }
}
