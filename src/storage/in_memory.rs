//! In-memory implementations of the expense and category services
//!
//! They behave like the API as far as the controllers can observe:
//! filtering, sorting and pagination follow the server's rules, deletes are
//! soft, and missing or already-deleted ids answer with a 404. Latency and
//! an offline mode can be injected to exercise loading and network-failure
//! paths. Every call is recorded so tests can assert on the request log.

use crate::core::entity::{
    Category, CategoryDraft, CategoryInfo, CategoryPatch, CategoryTotal, Expense, ExpenseDraft,
    ExpensePatch, ExpenseSummary, ExpenseSummaryByCategory, GroupBy, PeriodTotal, SummaryQuery,
};
use crate::core::error::{ApiError, TracexError, TracexResult};
use crate::core::query::{FilterQuery, Page, PaginationMeta, SortField, SortOrder};
use crate::core::service::{BulkUpdated, CategoryService, ExpenseService};
use crate::core::validation::import::MAX_BULK_CREATE;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

/// Build a stored expense dated `date` (`YYYY-MM-DD`)
pub fn expense(id: impl Into<String>, date: &str, amount: f64, category: &str) -> Expense {
    let now = Utc::now();
    Expense {
        id: id.into(),
        date: date.to_string(),
        amount,
        category: category.to_string(),
        category_id: None,
        description: None,
        receipt_url: None,
        currency: None,
        user_id: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn expense_not_found() -> TracexError {
    ApiError::NotFound {
        message: "Expense not found".to_string(),
    }
    .into()
}

fn read_lock<T>(lock: &RwLock<T>) -> TracexResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| TracexError::Internal(format!("Failed to acquire read lock: {}", e)))
}

fn write_lock<T>(lock: &RwLock<T>) -> TracexResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| TracexError::Internal(format!("Failed to acquire write lock: {}", e)))
}

/// Injected latency and connectivity plus the request log
#[derive(Debug, Default)]
struct Behavior {
    latency: Duration,
    offline: bool,
    calls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Harness {
    behavior: Arc<Mutex<Behavior>>,
}

impl Harness {
    fn behavior(&self) -> std::sync::MutexGuard<'_, Behavior> {
        self.behavior
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log the call, wait out the latency and fail when offline
    async fn enter(&self, call: String) -> TracexResult<()> {
        let (latency, offline) = {
            let mut behavior = self.behavior();
            behavior.calls.push(call);
            (behavior.latency, behavior.offline)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if offline {
            return Err(TracexError::Network {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Expenses
// =============================================================================

/// In-memory expense service
///
/// Clones share the same data. Items keep insertion order, which breaks
/// ties when sorting.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExpenseService {
    expenses: Arc<RwLock<Vec<Expense>>>,
    harness: Harness,
}

impl InMemoryExpenseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `expenses` already stored
    pub fn with_expenses<I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = Expense>,
    {
        let service = Self::new();
        service.seed(expenses);
        service
    }

    pub fn seed<I>(&self, expenses: I)
    where
        I: IntoIterator<Item = Expense>,
    {
        let mut stored = self
            .expenses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stored.extend(expenses);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.harness.behavior().latency = latency;
    }

    /// Fail every call with a network error while `offline`
    pub fn set_offline(&self, offline: bool) {
        self.harness.behavior().offline = offline;
    }

    /// Calls received so far, e.g. `"list"` or `"delete:a"`
    pub fn calls(&self) -> Vec<String> {
        self.harness.behavior().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.harness.behavior().calls.clear();
    }

    /// Stored expense by id, including soft-deleted ones
    pub fn stored(&self, id: &str) -> Option<Expense> {
        let expenses = self
            .expenses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        expenses.iter().find(|e| e.id == id).cloned()
    }

    /// Number of expenses that are not deleted
    pub fn live_count(&self) -> usize {
        let expenses = self
            .expenses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        expenses.iter().filter(|e| e.deleted_at.is_none()).count()
    }

    fn materialize(draft: &ExpenseDraft) -> Expense {
        let mut stored = expense(
            Uuid::new_v4().to_string(),
            &draft.date.format("%Y-%m-%d").to_string(),
            draft.amount,
            &draft.category,
        );
        stored.description = draft.description.clone();
        stored
    }
}

fn matches_filters(expense: &Expense, query: &FilterQuery) -> bool {
    let date = NaiveDate::parse_from_str(&expense.date, "%Y-%m-%d").ok();
    let in_range = match date {
        Some(date) => {
            query.from.is_none_or(|from| date >= from) && query.to.is_none_or(|to| date <= to)
        }
        None => query.from.is_none() && query.to.is_none(),
    };
    let search = query.search.as_deref().map(str::to_lowercase);

    in_range
        && query
            .category
            .as_deref()
            .is_none_or(|category| expense.category == category)
        && query.min_amount.is_none_or(|min| expense.amount >= min)
        && query.max_amount.is_none_or(|max| expense.amount <= max)
        && search.is_none_or(|needle| {
            expense.category.to_lowercase().contains(&needle)
                || expense
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
}

fn compare(a: &Expense, b: &Expense, sort: SortField) -> Ordering {
    match sort {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
        SortField::Category => a.category.cmp(&b.category),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

fn in_summary_range(expense: &Expense, query: &SummaryQuery) -> bool {
    match NaiveDate::parse_from_str(&expense.date, "%Y-%m-%d") {
        Ok(date) => {
            query.from.is_none_or(|from| date >= from) && query.to.is_none_or(|to| date <= to)
        }
        Err(_) => query.from.is_none() && query.to.is_none(),
    }
}

fn period_of(date: &str, group_by: GroupBy) -> String {
    let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
        return date.to_string();
    };
    match group_by {
        GroupBy::Day => parsed.format("%Y-%m-%d").to_string(),
        GroupBy::Week => {
            let week = parsed.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        GroupBy::Month => parsed.format("%Y-%m").to_string(),
    }
}

#[async_trait]
impl ExpenseService for InMemoryExpenseService {
    async fn list(&self, query: &FilterQuery) -> TracexResult<Page<Expense>> {
        self.harness.enter("list".to_string()).await?;
        let expenses = read_lock(&self.expenses)?;

        let mut matching: Vec<&Expense> = expenses
            .iter()
            .filter(|e| e.deleted_at.is_none() && matches_filters(e, query))
            .collect();
        matching.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let limit = query.limit.get();
        let pagination = PaginationMeta::new(query.page(), limit, matching.len() as u64);
        let offset = (pagination.page as usize - 1) * limit as usize;
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(Page { items, pagination })
    }

    async fn get(&self, id: &str) -> TracexResult<Expense> {
        self.harness.enter(format!("get:{}", id)).await?;
        let expenses = read_lock(&self.expenses)?;
        expenses
            .iter()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .cloned()
            .ok_or_else(expense_not_found)
    }

    async fn create(&self, draft: &ExpenseDraft) -> TracexResult<Expense> {
        self.harness.enter("create".to_string()).await?;
        let created = Self::materialize(draft);
        write_lock(&self.expenses)?.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &ExpensePatch) -> TracexResult<Expense> {
        self.harness.enter(format!("update:{}", id)).await?;
        let mut expenses = write_lock(&self.expenses)?;
        let stored = expenses
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .ok_or_else(expense_not_found)?;
        patch.apply(stored);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.harness.enter(format!("delete:{}", id)).await?;
        let mut expenses = write_lock(&self.expenses)?;
        let stored = expenses
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .ok_or_else(expense_not_found)?;
        stored.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn restore(&self, id: &str) -> TracexResult<Expense> {
        self.harness.enter(format!("restore:{}", id)).await?;
        let mut expenses = write_lock(&self.expenses)?;
        let stored = expenses
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_some())
            .ok_or_else(expense_not_found)?;
        stored.deleted_at = None;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn bulk_create(&self, drafts: &[ExpenseDraft]) -> TracexResult<Vec<Expense>> {
        self.harness.enter("bulk_create".to_string()).await?;
        if drafts.len() > MAX_BULK_CREATE {
            return Err(ApiError::Validation {
                message: format!("Maximum {} expenses per import.", MAX_BULK_CREATE),
                fields: Vec::new(),
            }
            .into());
        }
        let created: Vec<Expense> = drafts.iter().map(Self::materialize).collect();
        write_lock(&self.expenses)?.extend(created.iter().cloned());
        Ok(created)
    }

    async fn bulk_delete(&self, ids: &[String]) -> TracexResult<u64> {
        self.harness.enter("bulk_delete".to_string()).await?;
        let mut expenses = write_lock(&self.expenses)?;
        let now = Utc::now();
        let mut deleted = 0;
        for stored in expenses
            .iter_mut()
            .filter(|e| e.deleted_at.is_none() && ids.contains(&e.id))
        {
            stored.deleted_at = Some(now);
            deleted += 1;
        }
        Ok(deleted)
    }

    async fn bulk_update(&self, ids: &[String], patch: &ExpensePatch) -> TracexResult<BulkUpdated> {
        self.harness.enter("bulk_update".to_string()).await?;
        let mut expenses = write_lock(&self.expenses)?;
        let now = Utc::now();
        let mut data = Vec::new();
        for stored in expenses
            .iter_mut()
            .filter(|e| e.deleted_at.is_none() && ids.contains(&e.id))
        {
            patch.apply(stored);
            stored.updated_at = now;
            data.push(stored.clone());
        }
        Ok(BulkUpdated {
            count: data.len() as u64,
            data,
        })
    }

    async fn summary(&self, query: &SummaryQuery) -> TracexResult<ExpenseSummary> {
        self.harness.enter("summary".to_string()).await?;
        let expenses = read_lock(&self.expenses)?;
        let live: Vec<&Expense> = expenses
            .iter()
            .filter(|e| e.deleted_at.is_none() && in_summary_range(e, query))
            .collect();

        let by_period = query.group_by.map(|group_by| {
            let mut periods: BTreeMap<String, (f64, u64)> = BTreeMap::new();
            for e in &live {
                let entry = periods.entry(period_of(&e.date, group_by)).or_default();
                entry.0 += e.amount;
                entry.1 += 1;
            }
            periods
                .into_iter()
                .map(|(period, (total, count))| PeriodTotal {
                    period,
                    total,
                    count,
                })
                .collect()
        });

        Ok(ExpenseSummary {
            total: live.iter().map(|e| e.amount).sum(),
            count: live.len() as u64,
            by_period,
        })
    }

    async fn summary_by_category(
        &self,
        query: &SummaryQuery,
    ) -> TracexResult<ExpenseSummaryByCategory> {
        self.harness.enter("summary_by_category".to_string()).await?;
        let expenses = read_lock(&self.expenses)?;
        let mut categories: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
        let mut total = 0.0;
        let mut count = 0;
        for e in expenses
            .iter()
            .filter(|e| e.deleted_at.is_none() && in_summary_range(e, query))
        {
            let entry = categories.entry(e.category.as_str()).or_default();
            entry.0 += e.amount;
            entry.1 += 1;
            total += e.amount;
            count += 1;
        }

        let mut by_category: Vec<CategoryTotal> = categories
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category: category.to_string(),
                total,
                count,
            })
            .collect();
        by_category.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));

        Ok(ExpenseSummaryByCategory {
            total,
            count,
            by_category,
        })
    }
}

// =============================================================================
// Categories
// =============================================================================

const PREDEFINED_CATEGORIES: [(&str, &str, &str); 6] = [
    ("food", "Food", "#f97316"),
    ("transport", "Transport", "#3b82f6"),
    ("shopping", "Shopping", "#ec4899"),
    ("bills", "Bills", "#eab308"),
    ("entertainment", "Entertainment", "#8b5cf6"),
    ("other", "Other", "#6b7280"),
];

/// Owner recorded on categories created through this service
pub const LOCAL_USER_ID: &str = "local-user";

#[derive(Debug, Clone)]
struct StoredCategory {
    category: Category,
    deleted: bool,
}

/// In-memory category service seeded with the predefined categories
#[derive(Debug, Clone)]
pub struct InMemoryCategoryService {
    categories: Arc<RwLock<Vec<StoredCategory>>>,
    harness: Harness,
}

impl InMemoryCategoryService {
    pub fn new() -> Self {
        let predefined = PREDEFINED_CATEGORIES
            .iter()
            .map(|(id, name, color)| StoredCategory {
                category: Category::Predefined(CategoryInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                    color: Some(color.to_string()),
                    icon: None,
                }),
                deleted: false,
            })
            .collect();
        Self {
            categories: Arc::new(RwLock::new(predefined)),
            harness: Harness::default(),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.harness.behavior().offline = offline;
    }

    pub fn calls(&self) -> Vec<String> {
        self.harness.behavior().calls.clone()
    }
}

impl Default for InMemoryCategoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn category_not_found() -> TracexError {
    ApiError::NotFound {
        message: "Category not found".to_string(),
    }
    .into()
}

fn forbidden(message: &str) -> TracexError {
    ApiError::Forbidden {
        message: message.to_string(),
    }
    .into()
}

#[async_trait]
impl CategoryService for InMemoryCategoryService {
    async fn list(&self) -> TracexResult<Vec<Category>> {
        self.harness.enter("list".to_string()).await?;
        let categories = read_lock(&self.categories)?;
        Ok(categories
            .iter()
            .filter(|c| !c.deleted)
            .map(|c| c.category.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> TracexResult<Category> {
        self.harness.enter(format!("get:{}", id)).await?;
        let categories = read_lock(&self.categories)?;
        categories
            .iter()
            .find(|c| !c.deleted && c.category.id() == id)
            .map(|c| c.category.clone())
            .ok_or_else(category_not_found)
    }

    async fn create(&self, draft: &CategoryDraft) -> TracexResult<Category> {
        self.harness.enter("create".to_string()).await?;
        let mut categories = write_lock(&self.categories)?;
        if categories
            .iter()
            .any(|c| !c.deleted && c.category.name().eq_ignore_ascii_case(&draft.name))
        {
            return Err(ApiError::Status {
                status: 409,
                code: Some("CONFLICT".to_string()),
                message: "Category already exists".to_string(),
            }
            .into());
        }
        let category = Category::Custom {
            info: CategoryInfo {
                id: Uuid::new_v4().to_string(),
                name: draft.name.clone(),
                color: draft.color.clone(),
                icon: draft.icon.clone(),
            },
            user_id: LOCAL_USER_ID.to_string(),
        };
        categories.push(StoredCategory {
            category: category.clone(),
            deleted: false,
        });
        Ok(category)
    }

    async fn update(&self, id: &str, patch: &CategoryPatch) -> TracexResult<Category> {
        self.harness.enter(format!("update:{}", id)).await?;
        let mut categories = write_lock(&self.categories)?;
        let stored = categories
            .iter_mut()
            .find(|c| !c.deleted && c.category.id() == id)
            .ok_or_else(category_not_found)?;
        if patch.name.is_some() && stored.category.is_predefined() {
            return Err(forbidden("Predefined categories cannot be renamed"));
        }

        let info = match &mut stored.category {
            Category::Predefined(info) | Category::Custom { info, .. } => info,
        };
        if let Some(name) = &patch.name {
            info.name = name.clone();
        }
        if let Some(color) = &patch.color {
            info.color = color.clone();
        }
        if let Some(icon) = &patch.icon {
            info.icon = icon.clone();
        }
        Ok(stored.category.clone())
    }

    async fn delete(&self, id: &str) -> TracexResult<()> {
        self.harness.enter(format!("delete:{}", id)).await?;
        let mut categories = write_lock(&self.categories)?;
        let stored = categories
            .iter_mut()
            .find(|c| !c.deleted && c.category.id() == id)
            .ok_or_else(category_not_found)?;
        if stored.category.is_predefined() {
            return Err(forbidden("Predefined categories cannot be deleted"));
        }
        stored.deleted = true;
        Ok(())
    }

    async fn restore(&self, id: &str) -> TracexResult<Category> {
        self.harness.enter(format!("restore:{}", id)).await?;
        let mut categories = write_lock(&self.categories)?;
        let stored = categories
            .iter_mut()
            .find(|c| c.deleted && c.category.id() == id)
            .ok_or_else(category_not_found)?;
        stored.deleted = false;
        Ok(stored.category.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::query::{FilterChange, PageSize};

    fn service() -> InMemoryExpenseService {
        let mut lunch = expense("a", "2024-03-01", 12.5, "Food");
        lunch.description = Some("Lunch with team".to_string());
        InMemoryExpenseService::with_expenses([
            lunch,
            expense("b", "2024-03-05", 40.0, "Transport"),
            expense("c", "2024-02-20", 8.0, "Food"),
        ])
    }

    #[tokio::test]
    async fn test_list_sorts_by_date_desc_by_default() {
        let page = service().list(&FilterQuery::default()).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_searches() {
        let service = service();
        let mut query = FilterQuery::default();
        FilterChange::search_input("lunch").apply_to(&mut query);
        let page = service.list(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.items[0].id, "a");

        let mut query = FilterQuery::default();
        FilterChange::category_input("Food").apply_to(&mut query);
        FilterChange::min_amount_input("10").unwrap().apply_to(&mut query);
        let page = service.list(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.items[0].id, "a");
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let service = InMemoryExpenseService::with_expenses(
            (1..=25).map(|n| expense(format!("e{}", n), "2024-01-01", n as f64, "Food")),
        );
        let mut query = FilterQuery::with_limit(PageSize::Ten);
        query.page = 3;
        let page = service.list(&query).await.unwrap();
        assert_eq!(page.len(), 5);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_second_delete_is_not_found() {
        let service = service();
        service.delete("a").await.unwrap();
        assert!(service.stored("a").unwrap().deleted_at.is_some());
        assert_eq!(service.live_count(), 2);

        let err = service.delete("a").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Expense not found");

        service.restore("a").await.unwrap();
        assert_eq!(service.live_count(), 3);
    }

    #[tokio::test]
    async fn test_offline_fails_with_network_error() {
        let service = service();
        service.set_offline(true);
        let err = service.list(&FilterQuery::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(service.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_summary_groups_by_month() {
        let summary = service()
            .summary(&SummaryQuery {
                group_by: Some(GroupBy::Month),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total, 60.5);
        let periods: Vec<&str> = summary
            .by_period
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.period.as_str())
            .collect();
        assert_eq!(periods, vec!["2024-02", "2024-03"]);
    }

    #[tokio::test]
    async fn test_summary_by_category_orders_by_total() {
        let summary = service()
            .summary_by_category(&SummaryQuery::default())
            .await
            .unwrap();
        assert_eq!(summary.by_category[0].category, "Transport");
        assert_eq!(summary.by_category[1].category, "Food");
        assert_eq!(summary.by_category[1].count, 2);
    }

    #[tokio::test]
    async fn test_predefined_categories_are_protected() {
        let service = InMemoryCategoryService::new();
        let patch = CategoryPatch {
            name: Some("Groceries".to_string()),
            ..Default::default()
        };
        let err = service.update("food", &patch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service.delete("food").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let recolor = CategoryPatch {
            color: Some(Some("#000000".to_string())),
            ..Default::default()
        };
        let updated = service.update("food", &recolor).await.unwrap();
        assert_eq!(updated.info().color.as_deref(), Some("#000000"));
    }

    #[tokio::test]
    async fn test_custom_category_lifecycle() {
        let service = InMemoryCategoryService::new();
        let created = service
            .create(&CategoryDraft {
                name: "Pets".to_string(),
                color: None,
                icon: None,
            })
            .await
            .unwrap();
        assert!(!created.is_predefined());

        service.delete(created.id()).await.unwrap();
        assert!(service.get(created.id()).await.is_err());
        service.restore(created.id()).await.unwrap();
        assert_eq!(service.get(created.id()).await.unwrap().name(), "Pets");
    }
}
