//! Reusable field filters
//!
//! These filters normalize raw form values before validation

/// Filter: trimmed text, or `None` when blank
pub fn blank_to_none(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
