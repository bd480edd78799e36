//! Bulk import of pasted expense rows
//!
//! One expense per line: `date, amount, category[, description]`. Lines
//! containing a tab are split on tabs (spreadsheet paste), others on commas.

use crate::core::entity::ExpenseDraft;
use crate::core::error::ValidationError;
use crate::core::validation::validators;

/// Maximum number of expenses accepted by one bulk create request
pub const MAX_BULK_CREATE: usize = 100;

const SHOWN_ROW_ERRORS: usize = 5;

/// Parse pasted text into drafts ready for a bulk create
///
/// Every row is checked; the error message lists the first few failing rows.
pub fn parse_bulk_import(text: &str, max_batch: usize) -> Result<Vec<ExpenseDraft>, ValidationError> {
    let lines: Vec<&str> = text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(ValidationError::EmptyBatch {
            message: "Paste at least one line (date, amount, category, description).".to_string(),
        });
    }

    let mut drafts = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        match parse_row(line) {
            Ok(draft) => drafts.push(draft),
            Err(message) => errors.push(format!("Row {}: {}", index + 1, message)),
        }
    }

    if drafts.len() > max_batch {
        return Err(ValidationError::BatchTooLarge {
            size: drafts.len(),
            max: max_batch,
        });
    }

    if !errors.is_empty() {
        let mut message = errors
            .iter()
            .take(SHOWN_ROW_ERRORS)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        if errors.len() > SHOWN_ROW_ERRORS {
            message.push_str(&format!(" (+{} more)", errors.len() - SHOWN_ROW_ERRORS));
        }
        return Err(ValidationError::Import { message });
    }

    Ok(drafts)
}

fn parse_row(line: &str) -> Result<ExpenseDraft, String> {
    let parts: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split(',').map(str::trim).collect()
    };

    if parts.len() < 3 {
        return Err("need date, amount, category (and optional description).".to_string());
    }

    let date = validators::date_format(parts[0])
        .map_err(|_| "date must be YYYY-MM-DD.".to_string())?;
    let amount = parts[1]
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
        .ok_or_else(|| "amount must be a positive number.".to_string())?;
    let category = parts[2].trim();
    if category.is_empty() {
        return Err("category is required.".to_string());
    }
    let description = parts[3..].join(" ").trim().to_string();

    Ok(ExpenseDraft {
        date,
        amount,
        category: category.to_string(),
        description: if description.is_empty() {
            None
        } else {
            Some(description)
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_and_tab_rows() {
        let text = "2026-01-05, 12.50, Food, Lunch with team\n\n2026-01-06\t40\tTransport\tTaxi\tairport";
        let drafts = parse_bulk_import(text, MAX_BULK_CREATE).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].amount, 12.5);
        assert_eq!(drafts[0].description.as_deref(), Some("Lunch with team"));
        assert_eq!(drafts[1].category, "Transport");
        assert_eq!(drafts[1].description.as_deref(), Some("Taxi airport"));
    }

    #[test]
    fn test_description_is_optional() {
        let drafts = parse_bulk_import("2026-01-05,12,Food", MAX_BULK_CREATE).unwrap();
        assert_eq!(drafts[0].description, None);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = parse_bulk_import("   \n  ", MAX_BULK_CREATE).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyBatch { .. }));
    }

    #[test]
    fn test_row_errors_are_reported_by_row() {
        let text = "2026-01-05,12,Food\n05/01/2026,12,Food\n2026-01-05,-4,Food\n2026-01-05,4";
        let err = parse_bulk_import(text, MAX_BULK_CREATE).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Row 2: date must be YYYY-MM-DD."));
        assert!(message.contains("Row 3: amount must be a positive number."));
        assert!(message.contains("Row 4: need date, amount, category"));
    }

    #[test]
    fn test_row_errors_are_truncated() {
        let text = (0..8).map(|_| "bad").collect::<Vec<_>>().join("\n");
        let err = parse_bulk_import(&text, MAX_BULK_CREATE).unwrap_err();
        assert!(err.to_string().ends_with("(+3 more)"));
    }

    #[test]
    fn test_batch_over_cap_is_rejected_locally() {
        let text = (0..101)
            .map(|i| format!("2026-01-05,{},Food", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let err = parse_bulk_import(&text, MAX_BULK_CREATE).unwrap_err();
        assert_eq!(err, ValidationError::BatchTooLarge { size: 101, max: 100 });
        assert_eq!(err.to_string(), "Maximum 100 expenses per import.");
    }
}
