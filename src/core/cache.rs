//! Query cache invalidation
//!
//! The client never patches fetched data in place. A mutation bumps the
//! generation of every affected [`QueryKey`] and announces it on the
//! [`EventBus`]; readers holding data from an older generation re-fetch.

use crate::core::events::{ClientEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cached query families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKey {
    /// Paginated expense lists (every filter combination)
    Expenses,
    /// Totals and per-category aggregates
    ExpenseSummary,
    Categories,
    Budgets,
    Recurring,
}

impl QueryKey {
    /// Keys touched by any expense mutation
    pub const EXPENSE_MUTATION: [QueryKey; 2] = [QueryKey::Expenses, QueryKey::ExpenseSummary];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKey::Expenses => "expenses",
            QueryKey::ExpenseSummary => "expense_summary",
            QueryKey::Categories => "categories",
            QueryKey::Budgets => "budgets",
            QueryKey::Recurring => "recurring",
        }
    }
}

/// Generation counters per query key, shared across clones
#[derive(Debug, Clone)]
pub struct QueryCache {
    generations: Arc<Mutex<HashMap<QueryKey, u64>>>,
    events: EventBus,
}

impl QueryCache {
    pub fn new(events: EventBus) -> Self {
        Self {
            generations: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current generation of `key` (0 until first invalidated)
    pub fn generation(&self, key: QueryKey) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generations.get(&key).copied().unwrap_or(0)
    }

    /// Mark every key as stale and notify subscribers
    pub fn invalidate(&self, keys: &[QueryKey]) {
        {
            let mut generations = self
                .generations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for key in keys {
                *generations.entry(*key).or_insert(0) += 1;
            }
        }
        for key in keys {
            tracing::debug!(key = key.as_str(), "query invalidated");
            self.events.publish(ClientEvent::Invalidated { key: *key });
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_bumps_generation_and_publishes() {
        let cache = QueryCache::default();
        let mut rx = cache.events().subscribe();

        assert_eq!(cache.generation(QueryKey::Expenses), 0);
        cache.invalidate(&QueryKey::EXPENSE_MUTATION);
        assert_eq!(cache.generation(QueryKey::Expenses), 1);
        assert_eq!(cache.generation(QueryKey::ExpenseSummary), 1);
        assert_eq!(cache.generation(QueryKey::Budgets), 0);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event.invalidated_key(), Some(QueryKey::Expenses));
        assert_eq!(second.event.invalidated_key(), Some(QueryKey::ExpenseSummary));
    }

    #[test]
    fn test_clones_share_generations() {
        let cache = QueryCache::default();
        let clone = cache.clone();
        clone.invalidate(&[QueryKey::Categories]);
        assert_eq!(cache.generation(QueryKey::Categories), 1);
    }
}
