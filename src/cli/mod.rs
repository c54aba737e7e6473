//! Command handlers for the `bizcrm` binary
//!
//! Each handler drives one service operation and prints the result as JSON.

pub mod business;
pub mod content;
pub mod conversation;
pub mod lead;
pub mod maintenance;

use anyhow::Result;
use serde::Serialize;

use crate::clock::SystemClock;
use crate::service::CrmService;
use crate::store::CrmStore;
use crate::tenant::TenantContext;

pub type Service = CrmService<CrmStore, SystemClock>;

/// Tenant for commands that act on behalf of a business
pub fn tenant(business: Option<&str>) -> Result<TenantContext> {
    let id = business
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("this command needs --business <id>"))?;
    Ok(TenantContext::new(id))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// First line of `text`, cut to `width` characters
pub(crate) fn truncate(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > width {
        let cut: String = line.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_requires_business() {
        assert!(tenant(None).is_err());
        assert!(tenant(Some("  ")).is_err());
        assert_eq!(tenant(Some("biz-1")).unwrap().business_id(), "biz-1");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer line of text", 10), "a much ...");
        assert_eq!(truncate("first\nsecond", 20), "first");
    }
}
