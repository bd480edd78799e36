//! Expense mutations
//!
//! Every mutation goes through [`MutationDispatcher`]. On success it
//! invalidates the expense list and summary caches, strictly after the
//! response arrived, and publishes a success notice. On failure it publishes
//! the error as a notice and hands the typed error back so the caller can
//! decide what to keep open.

use crate::config::{BulkDeleteStrategy, ClientConfig};
use crate::core::cache::{QueryCache, QueryKey};
use crate::core::entity::{BulkEditForm, Expense, ExpenseDraft, ExpenseForm, ExpensePatch};
use crate::core::error::{
    BatchError, BatchFailure, ErrorKind, Notice, TracexError, TracexResult, ValidationError,
};
use crate::core::service::{BulkUpdated, ExpenseService};
use crate::core::validation::{Validate, parse_bulk_import};
use std::sync::Arc;

/// Issues expense mutations and reconciles the caches afterwards
#[derive(Clone)]
pub struct MutationDispatcher {
    expenses: Arc<dyn ExpenseService>,
    cache: QueryCache,
    strategy: BulkDeleteStrategy,
    max_bulk_batch: usize,
}

impl std::fmt::Debug for MutationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationDispatcher")
            .field("strategy", &self.strategy)
            .field("max_bulk_batch", &self.max_bulk_batch)
            .finish_non_exhaustive()
    }
}

impl MutationDispatcher {
    pub fn new(expenses: Arc<dyn ExpenseService>, cache: QueryCache, config: &ClientConfig) -> Self {
        Self {
            expenses,
            cache,
            strategy: config.bulk_delete,
            max_bulk_batch: config.max_bulk_batch,
        }
    }

    pub fn with_strategy(mut self, strategy: BulkDeleteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> BulkDeleteStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn succeeded(&self, notice: Notice) {
        self.cache.invalidate(&QueryKey::EXPENSE_MUTATION);
        self.cache.events().notify(notice);
    }

    fn failed(&self, action: &str, error: TracexError) -> TracexError {
        self.report(action, &error, error.notice());
        error
    }

    fn report(&self, action: &str, error: &TracexError, notice: Notice) {
        tracing::warn!(action, code = error.error_code(), error = %error, "mutation failed");
        self.cache.events().notify(notice);
    }

    /// Create an expense from raw form input
    ///
    /// Invalid input fails locally; a 400 from the server comes back as an
    /// [`ApiError::Validation`](crate::core::error::ApiError::Validation)
    /// with its field details.
    pub async fn create(&self, form: &ExpenseForm) -> TracexResult<Expense> {
        let draft = form.validate()?;
        self.create_draft(&draft).await
    }

    pub async fn create_draft(&self, draft: &ExpenseDraft) -> TracexResult<Expense> {
        match self.expenses.create(draft).await {
            Ok(expense) => {
                tracing::info!(id = %expense.id, amount = expense.amount, "expense created");
                self.succeeded(Notice::success("Expense added"));
                Ok(expense)
            }
            Err(e) => Err(self.failed("create", e)),
        }
    }

    /// Send only the fields set in `patch`
    pub async fn update(&self, id: &str, patch: &ExpensePatch) -> TracexResult<Expense> {
        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate.into());
        }
        match self.expenses.update(id, patch).await {
            Ok(expense) => {
                tracing::info!(id, "expense updated");
                self.succeeded(Notice::success("Expense updated"));
                Ok(expense)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.report("update", &e, Notice::error("Expense not found"));
                Err(e)
            }
            Err(e) => Err(self.failed("update", e)),
        }
    }

    pub async fn delete(&self, id: &str) -> TracexResult<()> {
        match self.expenses.delete(id).await {
            Ok(()) => {
                tracing::info!(id, "expense deleted");
                self.succeeded(Notice::success("Expense deleted"));
                Ok(())
            }
            Err(e) => Err(self.failed("delete", e)),
        }
    }

    pub async fn restore(&self, id: &str) -> TracexResult<Expense> {
        match self.expenses.restore(id).await {
            Ok(expense) => {
                tracing::info!(id, "expense restored");
                self.succeeded(Notice::success("Expense restored"));
                Ok(expense)
            }
            Err(e) => Err(self.failed("restore", e)),
        }
    }

    /// Delete every id, returning how many were deleted
    ///
    /// With the sequential strategy ids are deleted one by one in the given
    /// order. Failures do not stop the loop and successes are never rolled
    /// back; any failure yields [`BatchError::Partial`].
    pub async fn bulk_delete(&self, ids: &[String]) -> TracexResult<u64> {
        if ids.is_empty() {
            return Err(self.failed("bulk_delete", nothing_selected()));
        }

        let deleted = match self.strategy {
            BulkDeleteStrategy::Batch => match self.expenses.bulk_delete(ids).await {
                Ok(deleted) => deleted,
                Err(e) => return Err(self.failed("bulk_delete", e)),
            },
            BulkDeleteStrategy::Sequential => {
                let mut succeeded = 0usize;
                let mut failures = Vec::new();
                for id in ids {
                    match self.expenses.delete(id).await {
                        Ok(()) => succeeded += 1,
                        Err(e) => {
                            tracing::debug!(id = %id, error = %e, "delete failed within batch");
                            failures.push(BatchFailure {
                                id: id.clone(),
                                kind: e.kind(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
                if !failures.is_empty() {
                    if succeeded > 0 {
                        self.cache.invalidate(&QueryKey::EXPENSE_MUTATION);
                    }
                    let error = BatchError::Partial {
                        succeeded,
                        failures,
                    };
                    return Err(self.failed("bulk_delete", error.into()));
                }
                succeeded as u64
            }
        };

        tracing::info!(deleted, requested = ids.len(), "expenses deleted in bulk");
        self.succeeded(Notice::success(format!("Deleted {} expense(s).", deleted)));
        Ok(deleted)
    }

    /// Apply the non-blank fields of `form` to every id
    ///
    /// An all-blank form fails with "nothing to update" before any request.
    pub async fn bulk_update(&self, ids: &[String], form: &BulkEditForm) -> TracexResult<BulkUpdated> {
        let patch = form
            .validate()
            .map_err(|e| self.failed("bulk_update", e.into()))?;
        self.bulk_update_patch(ids, &patch).await
    }

    pub async fn bulk_update_patch(
        &self,
        ids: &[String],
        patch: &ExpensePatch,
    ) -> TracexResult<BulkUpdated> {
        if patch.is_empty() {
            return Err(self.failed("bulk_update", ValidationError::NothingToUpdate.into()));
        }
        if ids.is_empty() {
            return Err(self.failed("bulk_update", nothing_selected()));
        }
        match self.expenses.bulk_update(ids, patch).await {
            Ok(updated) => {
                tracing::info!(count = updated.count, "expenses updated in bulk");
                self.succeeded(Notice::success(format!(
                    "Updated {} expense(s).",
                    updated.count
                )));
                Ok(updated)
            }
            Err(e) => Err(self.failed("bulk_update", e)),
        }
    }

    /// Create a batch; oversized or empty batches are rejected locally
    pub async fn bulk_create(&self, drafts: &[ExpenseDraft]) -> TracexResult<Vec<Expense>> {
        if drafts.is_empty() {
            let error = ValidationError::EmptyBatch {
                message: "Nothing to import.".to_string(),
            };
            return Err(self.failed("bulk_create", error.into()));
        }
        if drafts.len() > self.max_bulk_batch {
            let error = ValidationError::BatchTooLarge {
                size: drafts.len(),
                max: self.max_bulk_batch,
            };
            return Err(self.failed("bulk_create", error.into()));
        }
        match self.expenses.bulk_create(drafts).await {
            Ok(created) => {
                tracing::info!(count = created.len(), "expenses imported");
                self.succeeded(Notice::success(format!(
                    "Imported {} expense(s).",
                    created.len()
                )));
                Ok(created)
            }
            Err(e) => Err(self.failed("bulk_create", e)),
        }
    }

    /// Parse pasted rows and create them in one batch
    pub async fn import(&self, text: &str) -> TracexResult<Vec<Expense>> {
        let drafts = parse_bulk_import(text, self.max_bulk_batch)
            .map_err(|e| self.failed("import", e.into()))?;
        self.bulk_create(&drafts).await
    }
}

fn nothing_selected() -> TracexError {
    ValidationError::EmptyBatch {
        message: "Select at least one expense.".to_string(),
    }
    .into()
}
