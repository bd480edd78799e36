//! Validation and filtering system
//!
//! Forms are validated locally before any request is sent, so an invalid
//! draft never costs a round-trip. Raw text goes through the [`filters`],
//! then the [`validators`]; failures are collected per field by
//! [`FieldErrors`] and surfaced together as a [`ValidationError`].

pub mod filters;
pub mod import;
pub mod validators;

use crate::core::error::{FieldValidationError, ValidationError};

pub use import::parse_bulk_import;

/// Collects field errors across a whole form
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one validator, keeping the value on success
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.push(FieldValidationError::new(field, message));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when every check passed
    pub fn finish(self) -> Result<(), ValidationError> {
        ValidationError::from_fields(self.errors)
    }
}

/// Turns raw form input into a request body
pub trait Validate {
    type Output;

    fn validate(&self) -> Result<Self::Output, ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collects_all_failures() {
        let mut errors = FieldErrors::new();
        let amount = errors.check("amount", validators::positive_number("0", "Amount"));
        let date = errors.check("date", validators::date_format("yesterday"));
        let category = errors.check("category", validators::required_text("Food", "Category", 100));

        assert!(amount.is_none());
        assert!(date.is_none());
        assert_eq!(category.as_deref(), Some("Food"));

        let err = errors.finish().unwrap_err();
        let fields: Vec<String> = err.fields().into_iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["amount", "date"]);
    }

    #[test]
    fn test_field_errors_empty_is_ok() {
        let errors = FieldErrors::new();
        assert!(errors.is_empty());
        assert!(errors.finish().is_ok());
    }
}
