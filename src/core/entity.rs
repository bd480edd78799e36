//! Resources exchanged with the Tracex API
//!
//! Response models mirror the wire format (camelCase JSON). Request bodies
//! come in two flavours: drafts (complete, validated create bodies) and
//! patches (only the fields that changed; unset fields are not serialized so
//! they never overwrite existing values).

use crate::core::error::ValidationError;
use crate::core::validation::{FieldErrors, Validate, filters, validators};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Expenses
// =============================================================================

/// An expense as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated body for `POST /expenses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub date: NaiveDate,
    pub amount: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Raw expense form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseForm {
    pub date: String,
    pub amount: String,
    pub category: String,
    pub description: String,
}

impl Validate for ExpenseForm {
    type Output = ExpenseDraft;

    fn validate(&self) -> Result<ExpenseDraft, ValidationError> {
        let mut errors = FieldErrors::new();
        let date = errors.check("date", validators::date_format(&self.date));
        let amount = errors.check("amount", validators::positive_number(&self.amount, "Amount"));
        let category = errors.check(
            "category",
            validators::required_text(&self.category, "Category", 100),
        );
        errors.check(
            "description",
            validators::max_length(self.description.trim(), "Description", 5000),
        );

        match (date, amount, category) {
            (Some(date), Some(amount), Some(category)) if errors.is_empty() => Ok(ExpenseDraft {
                date,
                amount,
                category,
                description: filters::blank_to_none(&self.description),
            }),
            _ => Err(errors
                .finish()
                .err()
                .unwrap_or_else(|| ValidationError::field("expense", "invalid input"))),
        }
    }
}

/// Body for `PATCH /expenses/{id}` and `PATCH /expenses/bulk`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
    }

    /// Every field of `draft`, for when the stored expense is not at hand
    pub fn full(draft: &ExpenseDraft) -> Self {
        Self {
            date: Some(draft.date),
            amount: Some(draft.amount),
            category: Some(draft.category.clone()),
            description: draft.description.clone(),
        }
    }

    /// Only the fields of `form` that differ from `current`
    pub fn diff(current: &Expense, draft: &ExpenseDraft) -> Self {
        let date = draft.date.format("%Y-%m-%d").to_string();
        Self {
            date: (date != current.date).then_some(draft.date),
            amount: (draft.amount != current.amount).then_some(draft.amount),
            category: (draft.category != current.category).then(|| draft.category.clone()),
            description: (draft.description != current.description)
                .then(|| draft.description.clone().unwrap_or_default()),
        }
    }

    /// Apply onto a stored expense
    pub fn apply(&self, expense: &mut Expense) {
        if let Some(date) = self.date {
            expense.date = date.format("%Y-%m-%d").to_string();
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = &self.category {
            expense.category = category.clone();
        }
        if let Some(description) = &self.description {
            expense.description = filters::blank_to_none(description);
        }
    }
}

/// Raw bulk-edit form input; blank fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkEditForm {
    pub date: String,
    pub amount: String,
    pub category: String,
    pub description: String,
}

impl Validate for BulkEditForm {
    type Output = ExpensePatch;

    fn validate(&self) -> Result<ExpensePatch, ValidationError> {
        let mut errors = FieldErrors::new();
        let date = filters::blank_to_none(&self.date)
            .and_then(|date| errors.check("date", validators::date_format(&date)));
        let amount = filters::blank_to_none(&self.amount)
            .and_then(|amount| errors.check("amount", validators::positive_number(&amount, "Amount")));
        let category = filters::blank_to_none(&self.category).and_then(|category| {
            errors.check("category", validators::required_text(&category, "Category", 100))
        });
        let description = filters::blank_to_none(&self.description);
        if let Some(description) = &description {
            errors.check(
                "description",
                validators::max_length(description, "Description", 5000),
            );
        }
        errors.finish()?;

        let patch = ExpensePatch {
            date,
            amount,
            category,
            description,
        };
        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate);
        }
        Ok(patch)
    }
}

/// Body for `POST /expenses/bulk`
#[derive(Debug, Clone, Serialize)]
pub struct BulkCreateRequest<'a> {
    pub expenses: &'a [ExpenseDraft],
}

/// Body for `DELETE /expenses/bulk`
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteRequest<'a> {
    pub ids: &'a [String],
}

/// Body for `PATCH /expenses/bulk`
#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateRequest<'a> {
    pub ids: &'a [String],
    #[serde(flatten)]
    pub fields: &'a ExpensePatch,
}

// =============================================================================
// Summaries
// =============================================================================

/// Grouping for the summary endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

impl GroupBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupBy::Day => "day",
            GroupBy::Week => "week",
            GroupBy::Month => "month",
        }
    }
}

/// Date range (and optional grouping) for summaries and exports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub group_by: Option<GroupBy>,
}

impl SummaryQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = self.from {
            pairs.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(group_by) = self.group_by {
            pairs.push(("groupBy", group_by.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub period: String,
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub total: f64,
    pub count: u64,
    #[serde(default)]
    pub by_period: Option<Vec<PeriodTotal>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummaryByCategory {
    pub total: f64,
    pub count: u64,
    pub by_category: Vec<CategoryTotal>,
}

// =============================================================================
// Categories
// =============================================================================

/// Fields shared by both category variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// A category is either shipped with the service or owned by the user
///
/// Predefined categories can be recoloured but not renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CategoryRecord", into = "CategoryRecord")]
pub enum Category {
    Predefined(CategoryInfo),
    Custom {
        info: CategoryInfo,
        user_id: String,
    },
}

/// Wire shape of a category (`userId: null` marks a predefined one)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryRecord {
    id: String,
    name: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        let info = CategoryInfo {
            id: record.id,
            name: record.name,
            color: record.color,
            icon: record.icon,
        };
        match record.user_id {
            None => Category::Predefined(info),
            Some(user_id) => Category::Custom { info, user_id },
        }
    }
}

impl From<Category> for CategoryRecord {
    fn from(category: Category) -> Self {
        let (info, user_id) = match category {
            Category::Predefined(info) => (info, None),
            Category::Custom { info, user_id } => (info, Some(user_id)),
        };
        CategoryRecord {
            id: info.id,
            name: info.name,
            user_id,
            color: info.color,
            icon: info.icon,
        }
    }
}

impl Category {
    pub fn info(&self) -> &CategoryInfo {
        match self {
            Category::Predefined(info) | Category::Custom { info, .. } => info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn is_predefined(&self) -> bool {
        matches!(self, Category::Predefined(_))
    }

    /// Whether the variant allows renaming
    pub fn can_rename(&self) -> bool {
        !self.is_predefined()
    }

    /// Build the patch for an edit, enforcing what the variant allows
    ///
    /// Blank color/icon input clears the value. Renaming a predefined
    /// category is rejected; resubmitting its current name is not a rename.
    pub fn edit(&self, form: &CategoryForm) -> Result<CategoryPatch, ValidationError> {
        let mut errors = FieldErrors::new();
        let name = errors.check("name", validators::required_text(&form.name, "Name", 100));
        errors.check("color", validators::max_length(form.color.trim(), "Color", 20));
        errors.check("icon", validators::max_length(form.icon.trim(), "Icon", 50));
        errors.finish()?;

        let name = name.filter(|name| name != self.name());
        if name.is_some() && !self.can_rename() {
            return Err(ValidationError::field(
                "name",
                "Predefined categories cannot be renamed",
            ));
        }

        let info = self.info();
        let color = filters::blank_to_none(&form.color);
        let icon = filters::blank_to_none(&form.icon);
        Ok(CategoryPatch {
            name,
            color: (color != info.color).then_some(color),
            icon: (icon != info.icon).then_some(icon),
        })
    }
}

/// Raw category form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryForm {
    pub name: String,
    pub color: String,
    pub icon: String,
}

impl Validate for CategoryForm {
    type Output = CategoryDraft;

    fn validate(&self) -> Result<CategoryDraft, ValidationError> {
        let mut errors = FieldErrors::new();
        let name = errors.check("name", validators::required_text(&self.name, "Name", 100));
        errors.check("color", validators::max_length(self.color.trim(), "Color", 20));
        errors.check("icon", validators::max_length(self.icon.trim(), "Icon", 50));
        errors.finish()?;
        Ok(CategoryDraft {
            name: name.unwrap_or_default(),
            color: filters::blank_to_none(&self.color),
            icon: filters::blank_to_none(&self.icon),
        })
    }
}

/// Body for `POST /categories`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Body for `PATCH /categories/{id}`
///
/// `Some(None)` on color/icon is sent as `null` and clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.icon.is_none()
    }
}

// =============================================================================
// Budgets
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub year: i32,
    /// `None` or `0` covers the whole year
    #[serde(default)]
    pub month: Option<u32>,
    pub limit: f64,
    #[serde(default)]
    pub share_slug: Option<String>,
}

/// Budget list entry when requested with `includeSpending=true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWithSpending {
    #[serde(flatten)]
    pub budget: Budget,
    #[serde(default)]
    pub spending: Option<f64>,
    #[serde(default)]
    pub remaining: Option<f64>,
    #[serde(default)]
    pub percent_used: Option<f64>,
    #[serde(default)]
    pub expense_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCompare {
    pub budget: Budget,
    pub spending: f64,
    pub limit: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub expense_count: u64,
}

/// Raw budget form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetForm {
    pub category: String,
    pub year: String,
    pub month: String,
    pub limit: String,
    pub share_slug: String,
}

/// Body for `POST /budgets` and `PATCH /budgets/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub limit: f64,
    #[serde(default)]
    pub share_slug: Option<String>,
}

impl Validate for BudgetForm {
    type Output = BudgetDraft;

    fn validate(&self) -> Result<BudgetDraft, ValidationError> {
        let mut errors = FieldErrors::new();
        errors.check("category", validators::max_length(self.category.trim(), "Category", 100));
        let year = errors.check("year", validators::int_range(&self.year, "Year", 2000, 2100));
        let month = match filters::blank_to_none(&self.month) {
            None => Some(0),
            Some(month) => errors.check("month", validators::int_range(&month, "Month", 0, 12)),
        };
        let limit = errors.check("limit", validators::positive_number(&self.limit, "Limit"));
        let share_slug = filters::blank_to_none(&self.share_slug);
        if let Some(slug) = &share_slug {
            errors.check("shareSlug", validators::slug(slug));
        }
        errors.finish()?;

        Ok(BudgetDraft {
            category: filters::blank_to_none(&self.category),
            year: year.unwrap_or_default(),
            month: month.and_then(|m| u32::try_from(m).ok()).filter(|m| *m > 0),
            limit: limit.unwrap_or_default(),
            share_slug,
        })
    }
}

// =============================================================================
// Recurring entries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Day,
    Week,
    Month,
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(Frequency::Day),
            "week" => Ok(Frequency::Week),
            "month" => Ok(Frequency::Month),
            other => Err(format!("Frequency must be day, week or month (got '{}')", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurring {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: String,
    pub next_run_at: String,
    #[serde(default)]
    pub last_run_at: Option<String>,
}

/// Raw recurring-entry form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringForm {
    pub category: String,
    pub amount: String,
    pub description: String,
    pub frequency: String,
    pub start_date: String,
}

/// Body for `POST /recurring` and `PATCH /recurring/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDraft {
    pub category: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

impl Validate for RecurringForm {
    type Output = RecurringDraft;

    fn validate(&self) -> Result<RecurringDraft, ValidationError> {
        let mut errors = FieldErrors::new();
        let category = errors.check(
            "category",
            validators::required_text(&self.category, "Category", 100),
        );
        let amount = errors.check("amount", validators::positive_number(&self.amount, "Amount"));
        errors.check(
            "description",
            validators::max_length(self.description.trim(), "Description", 5000),
        );
        let frequency = errors.check("frequency", self.frequency.parse::<Frequency>());
        let start_date = errors.check("startDate", validators::date_format(&self.start_date));

        match (category, amount, frequency, start_date) {
            (Some(category), Some(amount), Some(frequency), Some(start_date))
                if errors.is_empty() =>
            {
                Ok(RecurringDraft {
                    category,
                    amount,
                    description: filters::blank_to_none(&self.description),
                    frequency,
                    start_date,
                })
            }
            _ => Err(errors
                .finish()
                .err()
                .unwrap_or_else(|| ValidationError::field("recurring", "invalid input"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedExpense {
    pub id: String,
    pub date: String,
    pub amount: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRunResult {
    pub processed: u64,
    pub created: Vec<CreatedExpense>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Sign-in / sign-up body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate_sign_in(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::new();
        errors.check("email", validators::email(&self.email));
        if self.password.is_empty() {
            errors.check::<()>("password", Err("Password is required".to_string()));
        }
        errors.finish()
    }

    pub fn validate_sign_up(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::new();
        errors.check("email", validators::email(&self.email));
        errors.check("password", validators::min_length(&self.password, "Password", 6));
        errors.finish()
    }
}

/// `{ user, token }` returned by sign-in and sign-up
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthGrant {
    pub user: User,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expense() -> Expense {
        serde_json::from_value(json!({
            "id": "e1",
            "date": "2026-01-05",
            "amount": 12.5,
            "category": "Food",
            "description": "Lunch",
            "userId": "u1",
            "createdAt": "2026-01-05T12:00:00Z",
            "updatedAt": "2026-01-05T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_expense_form_validates_all_fields() {
        let form = ExpenseForm {
            date: "2026-01-05".to_string(),
            amount: "12.5".to_string(),
            category: " Food ".to_string(),
            description: "".to_string(),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.category, "Food");
        assert_eq!(draft.description, None);

        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body, json!({"date": "2026-01-05", "amount": 12.5, "category": "Food"}));
    }

    #[test]
    fn test_expense_form_reports_field_errors() {
        let form = ExpenseForm {
            date: "05/01/2026".to_string(),
            amount: "0".to_string(),
            category: "".to_string(),
            description: "".to_string(),
        };
        let err = form.validate().unwrap_err();
        let fields: Vec<String> = err.fields().into_iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["date", "amount", "category"]);
    }

    #[test]
    fn test_patch_diff_only_changed_fields() {
        let current = expense();
        let draft = ExpenseDraft {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            amount: 20.0,
            category: "Food".to_string(),
            description: Some("Lunch".to_string()),
        };
        let patch = ExpensePatch::diff(&current, &draft);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"amount": 20.0}));
    }

    #[test]
    fn test_bulk_edit_excludes_blank_fields() {
        let form = BulkEditForm {
            category: "Travel".to_string(),
            ..Default::default()
        };
        let patch = form.validate().unwrap();
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"category": "Travel"}));

        let body = BulkUpdateRequest {
            ids: &["a".to_string(), "b".to_string()],
            fields: &patch,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"ids": ["a", "b"], "category": "Travel"})
        );
    }

    #[test]
    fn test_bulk_edit_all_blank_is_nothing_to_update() {
        let form = BulkEditForm {
            date: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::NothingToUpdate);
    }

    #[test]
    fn test_category_variant_from_wire() {
        let predefined: Category =
            serde_json::from_value(json!({"id": "c1", "name": "Food", "userId": null})).unwrap();
        assert!(predefined.is_predefined());

        let custom: Category = serde_json::from_value(
            json!({"id": "c2", "name": "Pets", "userId": "u1", "color": "#ff0000"}),
        )
        .unwrap();
        assert!(custom.can_rename());
        assert_eq!(custom.info().color.as_deref(), Some("#ff0000"));

        let back = serde_json::to_value(&custom).unwrap();
        assert_eq!(back["userId"], "u1");
    }

    #[test]
    fn test_predefined_category_cannot_be_renamed() {
        let category = Category::Predefined(CategoryInfo {
            id: "c1".to_string(),
            name: "Food".to_string(),
            color: None,
            icon: None,
        });
        let rename = CategoryForm {
            name: "Groceries".to_string(),
            ..Default::default()
        };
        assert!(category.edit(&rename).is_err());

        let recolor = CategoryForm {
            name: "Food".to_string(),
            color: "#00ff00".to_string(),
            icon: String::new(),
        };
        let patch = category.edit(&recolor).unwrap();
        assert_eq!(patch.name, None);
        assert_eq!(patch.color, Some(Some("#00ff00".to_string())));
        assert_eq!(patch.icon, None);
    }

    #[test]
    fn test_custom_category_rename_and_clear_color() {
        let category = Category::Custom {
            info: CategoryInfo {
                id: "c2".to_string(),
                name: "Pets".to_string(),
                color: Some("#ff0000".to_string()),
                icon: None,
            },
            user_id: "u1".to_string(),
        };
        let form = CategoryForm {
            name: "Pet care".to_string(),
            color: "".to_string(),
            icon: "".to_string(),
        };
        let patch = category.edit(&form).unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"name": "Pet care", "color": null})
        );
    }

    #[test]
    fn test_budget_form() {
        let form = BudgetForm {
            category: "".to_string(),
            year: "2026".to_string(),
            month: "0".to_string(),
            limit: "500".to_string(),
            share_slug: "family".to_string(),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.month, None);
        assert_eq!(draft.category, None);
        assert_eq!(draft.share_slug.as_deref(), Some("family"));

        let bad = BudgetForm {
            year: "1999".to_string(),
            month: "13".to_string(),
            limit: "0".to_string(),
            share_slug: "no spaces".to_string(),
            ..Default::default()
        };
        assert_eq!(bad.validate().unwrap_err().fields().len(), 4);
    }

    #[test]
    fn test_recurring_form() {
        let form = RecurringForm {
            category: "Rent".to_string(),
            amount: "900".to_string(),
            description: String::new(),
            frequency: "month".to_string(),
            start_date: "2026-02-01".to_string(),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.frequency, Frequency::Month);
        assert_eq!(
            serde_json::to_value(&draft).unwrap()["startDate"],
            json!("2026-02-01")
        );

        let bad = RecurringForm {
            frequency: "yearly".to_string(),
            ..form
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_credentials() {
        assert!(Credentials::new("ana@example.com", "x").validate_sign_in().is_ok());
        assert!(Credentials::new("ana@example.com", "").validate_sign_in().is_err());
        assert!(Credentials::new("ana@example.com", "12345").validate_sign_up().is_err());
        assert!(Credentials::new("ana@example.com", "123456").validate_sign_up().is_ok());
    }
}
