//! Service trait implementations over HTTP

use super::{ApiClient, Endpoint, Envelope};
use crate::core::entity::{
    AuthGrant, Budget, BudgetCompare, BudgetDraft, BudgetWithSpending, BulkCreateRequest,
    BulkDeleteRequest, BulkUpdateRequest, Category, CategoryDraft, CategoryPatch, Credentials,
    Expense, ExpenseDraft, ExpensePatch, ExpenseSummary, ExpenseSummaryByCategory, Recurring,
    RecurringDraft, RecurringRunResult, SummaryQuery, User,
};
use crate::core::error::{TracexError, TracexResult};
use crate::core::query::{FilterQuery, Page};
use crate::core::service::{
    AuthService, BudgetService, BulkUpdated, CategoryService, ExpenseService, RecurringService,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Some routes answer with the envelope, some with the bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeEnveloped<T> {
    Wrapped(Envelope<T>),
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    fn into_inner(self) -> TracexResult<T> {
        match self {
            MaybeEnveloped::Wrapped(envelope) if !envelope.success => {
                Err(TracexError::InvalidResponse {
                    message: "response is not marked successful".to_string(),
                })
            }
            MaybeEnveloped::Wrapped(envelope) => Ok(envelope.data),
            MaybeEnveloped::Bare(data) => Ok(data),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkDeleted {
    deleted: u64,
}

#[derive(Debug, Deserialize)]
struct MeBody {
    user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

// =============================================================================
// Expenses
// =============================================================================

#[async_trait]
impl ExpenseService for ApiClient {
    async fn list(&self, query: &FilterQuery) -> TracexResult<Page<Expense>> {
        let builder = self
            .request(Method::GET, Endpoint::Expenses, true)?
            .query(&query.to_query_pairs());
        let page = Self::read_page(self.execute(builder).await?).await?;
        tracing::debug!(
            page = page.pagination.page,
            total = page.pagination.total,
            items = page.len(),
            "expense page fetched"
        );
        Ok(page)
    }

    async fn get(&self, id: &str) -> TracexResult<Expense> {
        self.get_data(Endpoint::Expense(id), &[]).await
    }

    async fn create(&self, draft: &ExpenseDraft) -> TracexResult<Expense> {
        self.send_data(Method::POST, Endpoint::Expenses, Some(draft))
            .await
    }

    async fn update(&self, id: &str, patch: &ExpensePatch) -> TracexResult<Expense> {
        self.send_data(Method::PATCH, Endpoint::Expense(id), Some(patch))
            .await
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.send_empty(Method::DELETE, Endpoint::Expense(id)).await
    }

    async fn restore(&self, id: &str) -> TracexResult<Expense> {
        self.send_data(Method::POST, Endpoint::ExpenseRestore(id), None::<&()>)
            .await
    }

    async fn bulk_create(&self, drafts: &[ExpenseDraft]) -> TracexResult<Vec<Expense>> {
        let body = BulkCreateRequest { expenses: drafts };
        self.send_data(Method::POST, Endpoint::ExpenseBulk, Some(&body))
            .await
    }

    async fn bulk_delete(&self, ids: &[String]) -> TracexResult<u64> {
        let builder = self
            .request(Method::DELETE, Endpoint::ExpenseBulk, true)?
            .json(&BulkDeleteRequest { ids });
        let body: BulkDeleted = Self::read_json(self.execute(builder).await?).await?;
        Ok(body.deleted)
    }

    async fn bulk_update(&self, ids: &[String], patch: &ExpensePatch) -> TracexResult<BulkUpdated> {
        let builder = self
            .request(Method::PATCH, Endpoint::ExpenseBulk, true)?
            .json(&BulkUpdateRequest { ids, fields: patch });
        Self::read_json(self.execute(builder).await?).await
    }

    async fn summary(&self, query: &SummaryQuery) -> TracexResult<ExpenseSummary> {
        self.get_data(Endpoint::ExpenseSummary, &query.to_query_pairs())
            .await
    }

    async fn summary_by_category(
        &self,
        query: &SummaryQuery,
    ) -> TracexResult<ExpenseSummaryByCategory> {
        self.get_data(Endpoint::ExpenseSummaryByCategory, &query.to_query_pairs())
            .await
    }
}

// =============================================================================
// Categories
// =============================================================================

#[async_trait]
impl CategoryService for ApiClient {
    async fn list(&self) -> TracexResult<Vec<Category>> {
        self.get_data(Endpoint::Categories, &[]).await
    }

    async fn get(&self, id: &str) -> TracexResult<Category> {
        self.get_data(Endpoint::Category(id), &[]).await
    }

    async fn create(&self, draft: &CategoryDraft) -> TracexResult<Category> {
        self.send_data(Method::POST, Endpoint::Categories, Some(draft))
            .await
    }

    async fn update(&self, id: &str, patch: &CategoryPatch) -> TracexResult<Category> {
        self.send_data(Method::PATCH, Endpoint::Category(id), Some(patch))
            .await
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.send_empty(Method::DELETE, Endpoint::Category(id)).await
    }

    async fn restore(&self, id: &str) -> TracexResult<Category> {
        self.send_data(Method::POST, Endpoint::CategoryRestore(id), None::<&()>)
            .await
    }
}

// =============================================================================
// Budgets
// =============================================================================

#[async_trait]
impl BudgetService for ApiClient {
    async fn list(&self, include_spending: bool) -> TracexResult<Vec<BudgetWithSpending>> {
        let query: Vec<(&str, String)> = if include_spending {
            vec![("includeSpending", "true".to_string())]
        } else {
            Vec::new()
        };
        self.get_data(Endpoint::Budgets, &query).await
    }

    async fn get(&self, id: &str) -> TracexResult<Budget> {
        self.get_data(Endpoint::Budget(id), &[]).await
    }

    async fn create(&self, draft: &BudgetDraft) -> TracexResult<Budget> {
        self.send_data(Method::POST, Endpoint::Budgets, Some(draft))
            .await
    }

    async fn update(&self, id: &str, draft: &BudgetDraft) -> TracexResult<Budget> {
        self.send_data(Method::PATCH, Endpoint::Budget(id), Some(draft))
            .await
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.send_empty(Method::DELETE, Endpoint::Budget(id)).await
    }

    async fn compare(&self, id: &str) -> TracexResult<BudgetCompare> {
        self.get_data(Endpoint::BudgetCompare(id), &[]).await
    }

    async fn public_by_slug(&self, slug: &str) -> TracexResult<BudgetCompare> {
        let builder = self.request(Method::GET, Endpoint::PublicBudget(slug.trim()), false)?;
        let body: MaybeEnveloped<BudgetCompare> =
            Self::read_json(self.execute(builder).await?).await?;
        body.into_inner()
    }
}

// =============================================================================
// Recurring
// =============================================================================

#[async_trait]
impl RecurringService for ApiClient {
    async fn list(&self) -> TracexResult<Vec<Recurring>> {
        self.get_data(Endpoint::Recurring, &[]).await
    }

    async fn get(&self, id: &str) -> TracexResult<Recurring> {
        self.get_data(Endpoint::RecurringOne(id), &[]).await
    }

    async fn create(&self, draft: &RecurringDraft) -> TracexResult<Recurring> {
        self.send_data(Method::POST, Endpoint::Recurring, Some(draft))
            .await
    }

    async fn update(&self, id: &str, draft: &RecurringDraft) -> TracexResult<Recurring> {
        self.send_data(Method::PATCH, Endpoint::RecurringOne(id), Some(draft))
            .await
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.send_empty(Method::DELETE, Endpoint::RecurringOne(id))
            .await
    }

    async fn run(&self) -> TracexResult<RecurringRunResult> {
        self.send_data(Method::POST, Endpoint::RecurringRun, None::<&()>)
            .await
    }
}

// =============================================================================
// Auth
// =============================================================================

#[async_trait]
impl AuthService for ApiClient {
    async fn sign_in(&self, credentials: &Credentials) -> TracexResult<AuthGrant> {
        let builder = self
            .request(Method::POST, Endpoint::SignIn, false)?
            .json(credentials);
        let body: MaybeEnveloped<AuthGrant> = Self::read_json(self.execute(builder).await?).await?;
        body.into_inner()
    }

    async fn sign_up(&self, credentials: &Credentials) -> TracexResult<AuthGrant> {
        let builder = self
            .request(Method::POST, Endpoint::SignUp, false)?
            .json(credentials);
        let body: MaybeEnveloped<AuthGrant> = Self::read_json(self.execute(builder).await?).await?;
        body.into_inner()
    }

    async fn me(&self) -> TracexResult<User> {
        let builder = self.request(Method::GET, Endpoint::Me, true)?;
        let body: MaybeEnveloped<MeBody> = Self::read_json(self.execute(builder).await?).await?;
        Ok(body.into_inner()?.user)
    }

    async fn change_password(&self, current: &str, new: &str) -> TracexResult<()> {
        let builder = self
            .request(Method::POST, Endpoint::ChangePassword, true)?
            .json(&ChangePasswordRequest {
                current_password: current,
                new_password: new,
            });
        self.execute(builder).await?;
        Ok(())
    }
}
