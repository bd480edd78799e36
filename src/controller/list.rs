//! The expense list controller
//!
//! [`ListController`] owns the filter query, the search buffer, the
//! selection and the last fetched page of one list view. Presenters read a
//! [`ListView`] snapshot and call methods for every navigation and mutation.
//!
//! State lives behind a `Mutex` that is never held across an `.await`:
//! fetches copy the query out, release the lock, and on completion apply the
//! result only if the query is still the one they were issued for and no
//! later fetch has been applied in the meantime.

use crate::config::ClientConfig;
use crate::controller::debounce::{PendingSearch, SearchBinding};
use crate::controller::dispatcher::MutationDispatcher;
use crate::controller::filter::FilterState;
use crate::controller::pagination::PageCursor;
use crate::controller::selection::{SelectionSet, SelectionState};
use crate::core::cache::{QueryCache, QueryKey};
use crate::core::entity::{BulkEditForm, Expense, ExpenseForm, ExpensePatch};
use crate::core::error::{TracexError, TracexResult};
use crate::core::events::EventBus;
use crate::core::query::{FilterChange, FilterQuery, Page, PageSize};
use crate::core::service::{BulkUpdated, ExpenseService};
use crate::core::validation::Validate;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Which modal the list currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    Closed,
    Create,
    Edit(String),
    ConfirmDelete(String),
    ConfirmBulkDelete,
    BulkEdit,
    Import,
}

/// What happened to a fetch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// The query changed while the request was in flight
    Discarded,
}

/// Read-only snapshot for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub query: FilterQuery,
    pub page: Option<Page<Expense>>,
    /// Selected ids in selection order
    pub selected: Vec<String>,
    pub selection_state: SelectionState,
    pub search_buffer: String,
    pub dialog: Dialog,
    pub loading: bool,
    pub error: Option<String>,
}

impl ListView {
    pub fn items(&self) -> &[Expense] {
        self.page.as_ref().map(|p| p.items.as_slice()).unwrap_or_default()
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.page
            .as_ref()
            .map(|p| PageCursor::new(self.query.page, p.pagination.total_pages))
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|selected| selected == id)
    }
}

#[derive(Debug)]
struct ListState {
    filters: FilterState,
    search: SearchBinding,
    selection: SelectionSet,
    page: Option<Page<Expense>>,
    dialog: Dialog,
    error: Option<String>,
    /// Sequence number of the most recently started fetch
    fetch_seq: u64,
    /// Sequence number of the fetch whose page is shown
    applied_seq: u64,
    loading: bool,
}

struct ListInner {
    expenses: Arc<dyn ExpenseService>,
    dispatcher: MutationDispatcher,
    events: EventBus,
    state: Mutex<ListState>,
    query_tx: watch::Sender<FilterQuery>,
}

impl ListInner {
    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Announce the current query to watchers if it changed
    fn publish_query(&self, filters: &FilterState) {
        let query = filters.query();
        self.query_tx.send_if_modified(|current| {
            if current == query {
                return false;
            }
            *current = query.clone();
            true
        });
    }

    fn apply_changes(&self, state: &mut ListState, changes: Vec<FilterChange>) {
        let search_before = state.filters.committed_search().map(str::to_string);
        state.filters.apply_filters(changes);
        state.selection.clear();
        if state.filters.committed_search() != search_before.as_deref() {
            state.search.sync(state.filters.committed_search());
        }
        self.publish_query(&state.filters);
    }

    fn commit_search(&self, pending: PendingSearch) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.search.accept(&pending) {
            tracing::trace!("superseded search commit dropped");
            return;
        }
        if state.filters.committed_search() == pending.value.as_deref() {
            return;
        }
        tracing::debug!(search = ?pending.value, "search committed");
        state.filters.apply_filters([FilterChange::Search(pending.value)]);
        state.selection.clear();
        self.publish_query(&state.filters);
    }

    async fn refresh(&self) -> TracexResult<RefreshOutcome> {
        let mut clamped = false;
        loop {
            let (query, seq) = {
                let mut state = self.lock();
                state.fetch_seq += 1;
                state.loading = true;
                (state.filters.query().clone(), state.fetch_seq)
            };
            tracing::debug!(page = query.page, limit = query.limit.get(), "fetching expenses");
            let result = self.expenses.list(&query).await;

            let mut guard = self.lock();
            let state = &mut *guard;
            if state.fetch_seq == seq {
                state.loading = false;
            }
            if state.filters.query() != &query {
                tracing::warn!(page = query.page, "stale expense page discarded");
                return Ok(RefreshOutcome::Discarded);
            }
            if seq < state.applied_seq {
                tracing::warn!(seq, applied = state.applied_seq, "superseded expense page discarded");
                return Ok(RefreshOutcome::Discarded);
            }

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to fetch expenses");
                    state.error = Some(e.to_string());
                    self.events.notify(e.notice());
                    return Err(e);
                }
            };

            if !clamped && page.is_empty() {
                if let Some(last) = PageCursor::from_meta(&page.pagination).clamp_target() {
                    tracing::debug!(from = query.page, to = last, "page past the end, clamping");
                    state.filters.set_page(last);
                    self.publish_query(&state.filters);
                    clamped = true;
                    continue;
                }
            }

            state
                .selection
                .replace_page(page.items.iter().map(|e| e.id.clone()));
            state.page = Some(page);
            state.applied_seq = seq;
            state.error = None;
            return Ok(RefreshOutcome::Applied);
        }
    }

    fn close_dialog_if(&self, dialog: &Dialog) {
        let mut state = self.lock();
        if &state.dialog == dialog {
            state.dialog = Dialog::Closed;
        }
    }
}

/// Controller for one expense list view
///
/// ```rust,ignore
/// let controller = ListController::new(expenses, cache, &config);
/// controller.spawn_refresh_loop();
/// controller.search_input("Lunch");
/// let view = controller.view();
/// ```
pub struct ListController {
    inner: Arc<ListInner>,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListController")
            .field("state", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl ListController {
    pub fn new(expenses: Arc<dyn ExpenseService>, cache: QueryCache, config: &ClientConfig) -> Self {
        let dispatcher = MutationDispatcher::new(expenses.clone(), cache, config);
        Self::with_dispatcher(expenses, dispatcher, config)
    }

    /// Use a preconfigured dispatcher (e.g. another bulk delete strategy)
    pub fn with_dispatcher(
        expenses: Arc<dyn ExpenseService>,
        dispatcher: MutationDispatcher,
        config: &ClientConfig,
    ) -> Self {
        let filters = FilterState::new(config.default_page_size);
        let (query_tx, _) = watch::channel(filters.query().clone());
        let events = dispatcher.cache().events().clone();
        let state = ListState {
            filters,
            search: SearchBinding::new(config.search_debounce()),
            selection: SelectionSet::new(),
            page: None,
            dialog: Dialog::Closed,
            error: None,
            fetch_seq: 0,
            applied_seq: 0,
            loading: false,
        };
        Self {
            inner: Arc::new(ListInner {
                expenses,
                dispatcher,
                events,
                state: Mutex::new(state),
                query_tx,
            }),
            refresher: Mutex::new(None),
        }
    }

    pub fn dispatcher(&self) -> &MutationDispatcher {
        &self.inner.dispatcher
    }

    pub fn view(&self) -> ListView {
        let state = self.inner.lock();
        ListView {
            query: state.filters.query().clone(),
            page: state.page.clone(),
            selected: state.selection.ids(),
            selection_state: state.selection.state(),
            search_buffer: state.search.buffer().to_string(),
            dialog: state.dialog.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn query(&self) -> FilterQuery {
        self.inner.lock().filters.query().clone()
    }

    /// Watch the committed query; every change warrants a fetch
    pub fn subscribe_query(&self) -> watch::Receiver<FilterQuery> {
        self.inner.query_tx.subscribe()
    }

    // -------------------------------------------------------------------------
    // Filters and navigation
    // -------------------------------------------------------------------------

    /// Merge `changes`, return to page 1 and clear the selection
    pub fn apply_filters(&self, changes: Vec<FilterChange>) {
        let mut guard = self.inner.lock();
        self.inner.apply_changes(&mut guard, changes);
    }

    pub fn apply_filter(&self, change: FilterChange) {
        self.apply_filters(vec![change]);
    }

    /// Jump to `page`; the selection is replaced once the page arrives
    pub fn set_page(&self, page: u32) {
        let mut state = self.inner.lock();
        state.filters.set_page(page);
        self.inner.publish_query(&state.filters);
    }

    pub fn set_limit(&self, limit: PageSize) {
        let mut state = self.inner.lock();
        state.filters.set_limit(limit);
        state.selection.clear();
        self.inner.publish_query(&state.filters);
    }

    /// Restore default filters and empty the search box
    pub fn clear_filters(&self) {
        let mut state = self.inner.lock();
        state.filters.clear();
        state.selection.clear();
        state.search.sync(None);
        self.inner.publish_query(&state.filters);
    }

    /// Advance one page; no-op without a loaded page or on the last one
    pub fn next_page(&self) -> bool {
        self.step(PageCursor::next)
    }

    /// Go back one page; no-op on the first page
    pub fn prev_page(&self) -> bool {
        self.step(PageCursor::prev)
    }

    fn step(&self, mv: fn(&mut PageCursor) -> bool) -> bool {
        let mut state = self.inner.lock();
        let Some(total_pages) = state.page.as_ref().map(|p| p.pagination.total_pages) else {
            return false;
        };
        let mut cursor = PageCursor::new(state.filters.query().page, total_pages);
        if !mv(&mut cursor) {
            return false;
        }
        state.filters.set_page(cursor.page());
        self.inner.publish_query(&state.filters);
        true
    }

    /// Record a keystroke in the search box
    ///
    /// The trimmed text is committed as the `search` filter once the
    /// debounce delay passes without another keystroke.
    pub fn search_input(&self, text: &str) {
        let weak: Weak<ListInner> = Arc::downgrade(&self.inner);
        let mut state = self.inner.lock();
        state.search.input(text, move |pending| {
            if let Some(inner) = weak.upgrade() {
                inner.commit_search(pending);
            }
        });
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn toggle(&self, id: &str) -> bool {
        self.inner.lock().selection.toggle(id)
    }

    pub fn toggle_all(&self) {
        self.inner.lock().selection.toggle_all();
    }

    pub fn clear_selection(&self) {
        self.inner.lock().selection.clear();
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Fetch the page for the current query
    ///
    /// Failures leave the previous page in place, set `error` and publish a
    /// notice. A result for a query that has since changed, or one that
    /// resolves after a later fetch was applied, is discarded.
    pub async fn refresh(&self) -> TracexResult<RefreshOutcome> {
        self.inner.refresh().await
    }

    /// Re-fetch on every query change and on every expense invalidation
    ///
    /// Starts with a fetch. Replaces a previously spawned loop; the loop
    /// stops when the controller is dropped.
    pub fn spawn_refresh_loop(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut queries = self.inner.query_tx.subscribe();
        let mut events = self.inner.events.subscribe();

        let task = tokio::spawn(async move {
            let mut last_applied: Option<FilterQuery> = None;
            let mut wake = true;
            loop {
                if !wake {
                    tokio::select! {
                        changed = queries.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let query = queries.borrow_and_update().clone();
                            if last_applied.as_ref() == Some(&query) {
                                continue;
                            }
                        }
                        received = events.recv() => match received {
                            Ok(envelope) => {
                                if envelope.event.invalidated_key() != Some(QueryKey::Expenses) {
                                    continue;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::debug!(skipped, "event receiver lagged, refreshing");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
                wake = false;

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Ok(RefreshOutcome::Applied) = inner.refresh().await {
                    last_applied = Some(inner.lock().filters.query().clone());
                }
            }
            tracing::debug!("refresh loop stopped");
        });

        let mut refresher = self
            .refresher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = refresher.replace(task) {
            previous.abort();
        }
    }

    // -------------------------------------------------------------------------
    // Dialogs
    // -------------------------------------------------------------------------

    pub fn open_dialog(&self, dialog: Dialog) {
        self.inner.lock().dialog = dialog;
    }

    pub fn close_dialog(&self) {
        self.inner.lock().dialog = Dialog::Closed;
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Create an expense; the create dialog closes on success only
    pub async fn create(&self, form: &ExpenseForm) -> TracexResult<Expense> {
        let created = self.inner.dispatcher.create(form).await?;
        self.inner.close_dialog_if(&Dialog::Create);
        Ok(created)
    }

    /// Save an edit, sending only the fields that changed
    ///
    /// A 404 closes the editor; validation failures keep it open.
    pub async fn update(&self, id: &str, form: &ExpenseForm) -> TracexResult<Expense> {
        let draft = form.validate()?;
        let patch = {
            let state = self.inner.lock();
            state
                .page
                .as_ref()
                .and_then(|page| page.items.iter().find(|e| e.id == id))
                .map(|current| ExpensePatch::diff(current, &draft))
                .unwrap_or_else(|| ExpensePatch::full(&draft))
        };

        let editor = Dialog::Edit(id.to_string());
        match self.inner.dispatcher.update(id, &patch).await {
            Ok(updated) => {
                self.inner.close_dialog_if(&editor);
                Ok(updated)
            }
            Err(e) => {
                if e.closes_editor() {
                    self.inner.close_dialog_if(&editor);
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> TracexResult<()> {
        self.inner.dispatcher.delete(id).await?;
        let mut state = self.inner.lock();
        if state.selection.contains(id) {
            state.selection.toggle(id);
        }
        if state.dialog == Dialog::ConfirmDelete(id.to_string()) {
            state.dialog = Dialog::Closed;
        }
        Ok(())
    }

    pub async fn restore(&self, id: &str) -> TracexResult<Expense> {
        self.inner.dispatcher.restore(id).await
    }

    /// Delete the selected expenses
    ///
    /// On success the selection is cleared and the confirmation closes. On
    /// partial failure only the ids that failed stay selected and the
    /// confirmation stays open; the next page keeps those still listed.
    pub async fn bulk_delete(&self) -> TracexResult<u64> {
        let ids = self.inner.lock().selection.ids();
        match self.inner.dispatcher.bulk_delete(&ids).await {
            Ok(deleted) => {
                let mut state = self.inner.lock();
                state.selection.clear();
                if state.dialog == Dialog::ConfirmBulkDelete {
                    state.dialog = Dialog::Closed;
                }
                Ok(deleted)
            }
            Err(TracexError::Batch(batch)) => {
                let failed: Vec<String> = batch.failures().iter().map(|f| f.id.clone()).collect();
                self.inner.lock().selection.retain(&failed);
                Err(TracexError::Batch(batch))
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the non-blank fields of `form` to the selection
    pub async fn bulk_update(&self, form: &BulkEditForm) -> TracexResult<BulkUpdated> {
        let ids = self.inner.lock().selection.ids();
        let updated = self.inner.dispatcher.bulk_update(&ids, form).await?;
        let mut state = self.inner.lock();
        state.selection.clear();
        if state.dialog == Dialog::BulkEdit {
            state.dialog = Dialog::Closed;
        }
        Ok(updated)
    }

    /// Import pasted rows
    pub async fn import(&self, text: &str) -> TracexResult<Vec<Expense>> {
        let created = self.inner.dispatcher.import(text).await?;
        self.inner.close_dialog_if(&Dialog::Import);
        Ok(created)
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        self.inner.lock().search.cancel();
        let refresher = self
            .refresher
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = refresher.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::{InMemoryExpenseService, expense};

    fn controller(service: &InMemoryExpenseService) -> ListController {
        ListController::new(
            Arc::new(service.clone()),
            QueryCache::default(),
            &ClientConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_refresh_applies_page_and_ids() {
        let service = InMemoryExpenseService::with_expenses([
            expense("a", "2024-01-02", 5.0, "Food"),
            expense("b", "2024-01-01", 7.0, "Food"),
        ]);
        let list = controller(&service);

        assert_eq!(list.refresh().await.unwrap(), RefreshOutcome::Applied);
        let view = list.view();
        assert_eq!(view.items().len(), 2);
        assert!(!view.loading);
        assert_eq!(view.cursor().map(|c| c.total_pages()), Some(1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_page() {
        let service = InMemoryExpenseService::with_expenses([expense("a", "2024-01-02", 5.0, "Food")]);
        let list = controller(&service);
        list.refresh().await.unwrap();

        service.set_offline(true);
        assert!(list.refresh().await.is_err());
        let view = list.view();
        assert_eq!(view.items().len(), 1);
        assert!(view.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_filter_change_clears_selection_and_resets_page() {
        let service = InMemoryExpenseService::with_expenses(
            (0..30).map(|n| expense(format!("e{}", n), "2024-01-01", 1.0, "Food")),
        );
        let list = controller(&service);
        list.set_page(2);
        list.refresh().await.unwrap();
        list.toggle("e25");
        assert_eq!(list.view().selected.len(), 1);

        list.apply_filter(FilterChange::category_input("Food"));
        let view = list.view();
        assert_eq!(view.query.page, 1);
        assert!(view.selected.is_empty());
    }

    #[tokio::test]
    async fn test_set_page_keeps_selection_until_page_arrives() {
        let service = InMemoryExpenseService::with_expenses(
            (0..30).map(|n| expense(format!("e{}", n), "2024-01-01", 1.0, "Food")),
        );
        let list = controller(&service);
        list.refresh().await.unwrap();
        let first = list.view().items()[0].id.clone();
        list.toggle(&first);

        list.set_page(2);
        assert!(list.view().is_selected(&first));
        list.refresh().await.unwrap();
        assert!(list.view().selected.is_empty());
    }

    #[tokio::test]
    async fn test_dialog_closes_only_on_success() {
        let service = InMemoryExpenseService::new();
        let list = controller(&service);
        list.open_dialog(Dialog::Create);

        let invalid = ExpenseForm {
            date: "2024-01-01".to_string(),
            amount: "-3".to_string(),
            category: "Food".to_string(),
            description: String::new(),
        };
        assert!(list.create(&invalid).await.is_err());
        assert_eq!(list.view().dialog, Dialog::Create);

        let valid = ExpenseForm {
            amount: "3".to_string(),
            ..invalid
        };
        list.create(&valid).await.unwrap();
        assert_eq!(list.view().dialog, Dialog::Closed);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let service = InMemoryExpenseService::with_expenses([expense("a", "2024-01-02", 5.0, "Food")]);
        let list = controller(&service);
        list.refresh().await.unwrap();
        list.open_dialog(Dialog::Edit("a".to_string()));

        let form = ExpenseForm {
            date: "2024-01-02".to_string(),
            amount: "9".to_string(),
            category: "Food".to_string(),
            description: String::new(),
        };
        let updated = list.update("a", &form).await.unwrap();
        assert_eq!(updated.amount, 9.0);
        assert_eq!(list.view().dialog, Dialog::Closed);
    }

    #[tokio::test]
    async fn test_update_of_missing_expense_closes_editor() {
        let service = InMemoryExpenseService::new();
        let list = controller(&service);
        list.open_dialog(Dialog::Edit("gone".to_string()));

        let form = ExpenseForm {
            date: "2024-01-02".to_string(),
            amount: "9".to_string(),
            category: "Food".to_string(),
            description: String::new(),
        };
        let err = list.update("gone", &form).await.unwrap_err();
        assert!(err.closes_editor());
        assert_eq!(list.view().dialog, Dialog::Closed);
    }
}
