//! Attribute constraints checked at the boundary

use crate::error::{CoreError, Result};

/// Reject values outside `[min, max]`, including NaN.
pub fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64> {
    if value.is_nan() || value < min || value > max {
        return Err(CoreError::ValidationFailed(format!(
            "{} must be within [{}, {}], got {}",
            field, min, max, value
        )));
    }
    Ok(value)
}

pub fn level(field: &str, value: i64, min: i64, max: i64) -> Result<i64> {
    if value < min || value > max {
        return Err(CoreError::ValidationFailed(format!(
            "{} must be within [{}, {}], got {}",
            field, min, max, value
        )));
    }
    Ok(value)
}

pub fn non_negative(field: &str, value: f64) -> Result<f64> {
    if value.is_nan() || value < 0.0 {
        return Err(CoreError::ValidationFailed(format!(
            "{} must be >= 0, got {}",
            field, value
        )));
    }
    Ok(value)
}

pub fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationFailed(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(value)
}

/// Loose shape check: one `@` with text on both sides and a dot in the domain.
pub fn email(value: &str) -> Result<&str> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(CoreError::ValidationFailed(format!(
            "invalid email address '{}'",
            value
        )));
    }
    Ok(value)
}

/// ISO 639-1 code with an optional region, e.g. `en` or `pt-BR`.
pub fn language_code(value: &str) -> Result<&str> {
    let mut parts = value.split('-');
    let lang_ok = parts
        .next()
        .map(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_lowercase()))
        .unwrap_or(false);
    let region_ok = match parts.next() {
        None => true,
        Some(r) => r.len() == 2 && r.chars().all(|c| c.is_ascii_uppercase()),
    };
    if !lang_ok || !region_ok || parts.next().is_some() {
        return Err(CoreError::ValidationFailed(format!(
            "invalid language code '{}'",
            value
        )));
    }
    Ok(value)
}
