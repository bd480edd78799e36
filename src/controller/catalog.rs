//! Mutations for categories, budgets and recurring entries
//!
//! Same contract as the expense dispatcher: validate locally, send, then on
//! success invalidate the affected query keys and publish a notice. Failures
//! become notices too and are returned to the caller.

use crate::core::cache::{QueryCache, QueryKey};
use crate::core::entity::{
    Budget, BudgetForm, Category, CategoryForm, Recurring, RecurringForm, RecurringRunResult,
};
use crate::core::error::{ErrorKind, Notice, TracexError, TracexResult, ValidationError};
use crate::core::service::{BudgetService, CategoryService, RecurringService};
use crate::core::validation::Validate;
use std::sync::Arc;

/// Notices to use instead of the server message for some failures
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    not_found: Option<&'static str>,
    forbidden: Option<&'static str>,
}

impl Overrides {
    const NONE: Overrides = Overrides {
        not_found: None,
        forbidden: None,
    };

    fn notice(&self, error: &TracexError) -> Notice {
        let replacement = match error.kind() {
            ErrorKind::NotFound => self.not_found,
            ErrorKind::Forbidden => self.forbidden,
            _ => None,
        };
        replacement.map_or_else(|| error.notice(), Notice::error)
    }
}

const RECURRING_RUN: [QueryKey; 3] = [
    QueryKey::Recurring,
    QueryKey::Expenses,
    QueryKey::ExpenseSummary,
];

/// Issues category, budget and recurring mutations
#[derive(Clone)]
pub struct CatalogDispatcher {
    categories: Arc<dyn CategoryService>,
    budgets: Arc<dyn BudgetService>,
    recurring: Arc<dyn RecurringService>,
    cache: QueryCache,
}

impl std::fmt::Debug for CatalogDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogDispatcher").finish_non_exhaustive()
    }
}

impl CatalogDispatcher {
    pub fn new(
        categories: Arc<dyn CategoryService>,
        budgets: Arc<dyn BudgetService>,
        recurring: Arc<dyn RecurringService>,
        cache: QueryCache,
    ) -> Self {
        Self {
            categories,
            budgets,
            recurring,
            cache,
        }
    }

    fn settle<T>(
        &self,
        action: &'static str,
        keys: &[QueryKey],
        result: TracexResult<T>,
        success: impl FnOnce(&T) -> String,
        overrides: Overrides,
    ) -> TracexResult<T> {
        match result {
            Ok(value) => {
                tracing::info!(action, "catalog mutation succeeded");
                self.cache.invalidate(keys);
                self.cache.events().notify(Notice::success(success(&value)));
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(action, code = e.error_code(), error = %e, "catalog mutation failed");
                self.cache.events().notify(overrides.notice(&e));
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    pub async fn create_category(&self, form: &CategoryForm) -> TracexResult<Category> {
        let draft = form.validate()?;
        let result = self.categories.create(&draft).await;
        self.settle(
            "create_category",
            &[QueryKey::Categories],
            result,
            |_| "Category created".to_string(),
            Overrides::NONE,
        )
    }

    /// Edit within what the variant allows
    ///
    /// Only changed fields are sent; a form identical to `category` fails
    /// locally with "nothing to update".
    pub async fn edit_category(
        &self,
        category: &Category,
        form: &CategoryForm,
    ) -> TracexResult<Category> {
        let patch = category.edit(form)?;
        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate.into());
        }
        let result = self.categories.update(category.id(), &patch).await;
        self.settle(
            "edit_category",
            &[QueryKey::Categories],
            result,
            |_| "Category updated".to_string(),
            Overrides {
                not_found: Some("Category not found"),
                forbidden: Some("You cannot edit this category"),
            },
        )
    }

    pub async fn delete_category(&self, id: &str) -> TracexResult<()> {
        let result = self.categories.delete(id).await;
        self.settle(
            "delete_category",
            &[QueryKey::Categories],
            result,
            |_| "Category deleted".to_string(),
            Overrides {
                not_found: Some("Category not found"),
                forbidden: Some("Cannot delete default category"),
            },
        )
    }

    pub async fn restore_category(&self, id: &str) -> TracexResult<Category> {
        let result = self.categories.restore(id).await;
        self.settle(
            "restore_category",
            &[QueryKey::Categories],
            result,
            |_| "Category restored".to_string(),
            Overrides::NONE,
        )
    }

    // -------------------------------------------------------------------------
    // Budgets
    // -------------------------------------------------------------------------

    pub async fn create_budget(&self, form: &BudgetForm) -> TracexResult<Budget> {
        let draft = form.validate()?;
        let result = self.budgets.create(&draft).await;
        self.settle(
            "create_budget",
            &[QueryKey::Budgets],
            result,
            |_| "Budget created".to_string(),
            Overrides::NONE,
        )
    }

    pub async fn update_budget(&self, id: &str, form: &BudgetForm) -> TracexResult<Budget> {
        let draft = form.validate()?;
        let result = self.budgets.update(id, &draft).await;
        self.settle(
            "update_budget",
            &[QueryKey::Budgets],
            result,
            |_| "Budget updated".to_string(),
            Overrides {
                not_found: Some("Budget not found"),
                forbidden: None,
            },
        )
    }

    pub async fn delete_budget(&self, id: &str) -> TracexResult<()> {
        let result = self.budgets.delete(id).await;
        self.settle(
            "delete_budget",
            &[QueryKey::Budgets],
            result,
            |_| "Budget deleted".to_string(),
            Overrides::NONE,
        )
    }

    // -------------------------------------------------------------------------
    // Recurring entries
    // -------------------------------------------------------------------------

    pub async fn create_recurring(&self, form: &RecurringForm) -> TracexResult<Recurring> {
        let draft = form.validate()?;
        let result = self.recurring.create(&draft).await;
        self.settle(
            "create_recurring",
            &[QueryKey::Recurring],
            result,
            |_| "Recurring expense created".to_string(),
            Overrides::NONE,
        )
    }

    pub async fn update_recurring(&self, id: &str, form: &RecurringForm) -> TracexResult<Recurring> {
        let draft = form.validate()?;
        let result = self.recurring.update(id, &draft).await;
        self.settle(
            "update_recurring",
            &[QueryKey::Recurring],
            result,
            |_| "Recurring expense updated".to_string(),
            Overrides {
                not_found: Some("Not found"),
                forbidden: None,
            },
        )
    }

    pub async fn delete_recurring(&self, id: &str) -> TracexResult<()> {
        let result = self.recurring.delete(id).await;
        self.settle(
            "delete_recurring",
            &[QueryKey::Recurring],
            result,
            |_| "Recurring expense deleted".to_string(),
            Overrides::NONE,
        )
    }

    /// Materialize due recurring entries into expenses
    pub async fn run_recurring(&self) -> TracexResult<RecurringRunResult> {
        let result = self.recurring.run().await;
        self.settle(
            "run_recurring",
            &RECURRING_RUN,
            result,
            |run| {
                format!(
                    "Run complete: {} processed, {} expense(s) created.",
                    run.processed,
                    run.created.len()
                )
            },
            Overrides::NONE,
        )
    }
}
