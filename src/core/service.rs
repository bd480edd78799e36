//! Service traits for the Tracex resources
//!
//! Controllers and dispatchers only talk to these traits, so the same code
//! runs against [`ApiClient`](crate::client::ApiClient) or the in-memory
//! backend used in tests.

use crate::core::entity::{
    AuthGrant, BudgetCompare, BudgetDraft, BudgetWithSpending, Budget, Category, CategoryDraft,
    CategoryPatch, Credentials, Expense, ExpenseDraft, ExpensePatch, ExpenseSummary,
    ExpenseSummaryByCategory, Recurring, RecurringDraft, RecurringRunResult, SummaryQuery, User,
};
use crate::core::error::TracexResult;
use crate::core::query::{FilterQuery, Page};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of `PATCH /expenses/bulk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdated {
    pub data: Vec<Expense>,
    pub count: u64,
}

/// Expense CRUD, bulk operations and aggregates
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// One page of expenses matching `query`
    async fn list(&self, query: &FilterQuery) -> TracexResult<Page<Expense>>;

    async fn get(&self, id: &str) -> TracexResult<Expense>;

    async fn create(&self, draft: &ExpenseDraft) -> TracexResult<Expense>;

    /// Apply only the fields set in `patch`
    async fn update(&self, id: &str, patch: &ExpensePatch) -> TracexResult<Expense>;

    /// Soft delete
    async fn delete(&self, id: &str) -> TracexResult<()>;

    /// Undo a soft delete
    async fn restore(&self, id: &str) -> TracexResult<Expense>;

    async fn bulk_create(&self, drafts: &[ExpenseDraft]) -> TracexResult<Vec<Expense>>;

    /// Single batch request; returns how many were deleted
    async fn bulk_delete(&self, ids: &[String]) -> TracexResult<u64>;

    async fn bulk_update(&self, ids: &[String], patch: &ExpensePatch) -> TracexResult<BulkUpdated>;

    async fn summary(&self, query: &SummaryQuery) -> TracexResult<ExpenseSummary>;

    async fn summary_by_category(
        &self,
        query: &SummaryQuery,
    ) -> TracexResult<ExpenseSummaryByCategory>;
}

/// Predefined and custom categories
#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn list(&self) -> TracexResult<Vec<Category>>;

    async fn get(&self, id: &str) -> TracexResult<Category>;

    async fn create(&self, draft: &CategoryDraft) -> TracexResult<Category>;

    async fn update(&self, id: &str, patch: &CategoryPatch) -> TracexResult<Category>;

    async fn delete(&self, id: &str) -> TracexResult<()>;

    async fn restore(&self, id: &str) -> TracexResult<Category>;
}

#[async_trait]
pub trait BudgetService: Send + Sync {
    async fn list(&self, include_spending: bool) -> TracexResult<Vec<BudgetWithSpending>>;

    async fn get(&self, id: &str) -> TracexResult<Budget>;

    async fn create(&self, draft: &BudgetDraft) -> TracexResult<Budget>;

    async fn update(&self, id: &str, draft: &BudgetDraft) -> TracexResult<Budget>;

    async fn delete(&self, id: &str) -> TracexResult<()>;

    /// Spending against the budget limit
    async fn compare(&self, id: &str) -> TracexResult<BudgetCompare>;

    /// Shared budget, fetched without credentials
    async fn public_by_slug(&self, slug: &str) -> TracexResult<BudgetCompare>;
}

#[async_trait]
pub trait RecurringService: Send + Sync {
    async fn list(&self) -> TracexResult<Vec<Recurring>>;

    async fn get(&self, id: &str) -> TracexResult<Recurring>;

    async fn create(&self, draft: &RecurringDraft) -> TracexResult<Recurring>;

    async fn update(&self, id: &str, draft: &RecurringDraft) -> TracexResult<Recurring>;

    async fn delete(&self, id: &str) -> TracexResult<()>;

    /// Materialize every entry that is due
    async fn run(&self) -> TracexResult<RecurringRunResult>;
}

/// Authentication endpoints (tokens are issued by the server)
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> TracexResult<AuthGrant>;

    async fn sign_up(&self, credentials: &Credentials) -> TracexResult<AuthGrant>;

    /// The user owning the current token
    async fn me(&self) -> TracexResult<User>;

    async fn change_password(&self, current: &str, new: &str) -> TracexResult<()>;
}
