//! Reusable field validators
//!
//! Each validator takes raw form text (already passed through the
//! [`filters`](super::filters)) and returns the typed value or a message
//! suitable for display next to the field.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"))
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]*$").expect("valid slug regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
    })
}

/// Validator: text is present and no longer than `max` characters
pub fn required_text(value: &str, label: &str, max: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    max_length(value, label, max)?;
    Ok(value.to_string())
}

/// Validator: text is at most `max` characters
pub fn max_length(value: &str, label: &str, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len > max {
        Err(format!("{} must be at most {} characters", label, max))
    } else {
        Ok(())
    }
}

/// Validator: text is at least `min` characters
pub fn min_length(value: &str, label: &str, min: usize) -> Result<(), String> {
    if value.chars().count() < min {
        Err(format!("{} must be at least {} characters", label, min))
    } else {
        Ok(())
    }
}

/// Validator: strict `YYYY-MM-DD` calendar date
pub fn date_format(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    if !date_regex().is_match(value) {
        return Err("Date must be YYYY-MM-DD".to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| "Date must be YYYY-MM-DD".to_string())
}

/// Validator: number must be strictly positive
pub fn positive(value: f64, label: &str) -> Result<f64, String> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must be greater than 0", label))
    }
}

/// Validator: text parses as a strictly positive number
pub fn positive_number(value: &str, label: &str) -> Result<f64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    let parsed = value
        .parse::<f64>()
        .map_err(|_| format!("{} must be a number", label))?;
    positive(parsed, label)
}

/// Validator: integer within an inclusive range
pub fn int_range(value: &str, label: &str, min: i32, max: i32) -> Result<i32, String> {
    let parsed = value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("{} must be a whole number", label))?;
    if parsed < min || parsed > max {
        Err(format!("{} must be between {} and {}", label, min, max))
    } else {
        Ok(parsed)
    }
}

/// Validator: share slug, letters, numbers, `_` and `-` only
pub fn slug(value: &str) -> Result<(), String> {
    max_length(value, "Share slug", 64)?;
    if slug_regex().is_match(value) {
        Ok(())
    } else {
        Err("Only letters, numbers, _ and -".to_string())
    }
}

/// Validator: plausible email address
pub fn email(value: &str) -> Result<(), String> {
    if email_regex().is_match(value.trim()) {
        Ok(())
    } else {
        Err("Invalid email".to_string())
    }
}
