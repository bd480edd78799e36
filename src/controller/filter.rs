//! Filter state for the expense list

use crate::core::query::{FilterChange, FilterQuery, PageSize};

/// Current query parameters of one list
///
/// Any change other than page or limit sends the list back to page 1.
/// Clearing the selection is left to the owner, which also owns the
/// selection set.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    query: FilterQuery,
    default_limit: PageSize,
}

impl FilterState {
    pub fn new(default_limit: PageSize) -> Self {
        Self {
            query: FilterQuery::with_limit(default_limit),
            default_limit,
        }
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    /// Merge `changes` and return to page 1
    pub fn apply_filters<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = FilterChange>,
    {
        for change in changes {
            change.apply_to(&mut self.query);
        }
        self.query.page = 1;
    }

    /// Move to `page` keeping every other field
    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.max(1);
    }

    pub fn set_limit(&mut self, limit: PageSize) {
        self.query.limit = limit;
        self.query.page = 1;
    }

    /// Back to the defaults this state was created with
    pub fn clear(&mut self) {
        self.query = FilterQuery::with_limit(self.default_limit);
    }

    pub fn committed_search(&self) -> Option<&str> {
        self.query.search.as_deref()
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{SortField, SortOrder};

    #[test]
    fn test_apply_filters_resets_page() {
        let mut filters = FilterState::default();
        filters.set_page(4);
        filters.apply_filters([
            FilterChange::Sort(SortField::Amount),
            FilterChange::Order(SortOrder::Asc),
        ]);
        assert_eq!(filters.query().page, 1);
        assert_eq!(filters.query().sort, SortField::Amount);
        assert_eq!(filters.query().order, SortOrder::Asc);
    }

    #[test]
    fn test_set_page_keeps_filters() {
        let mut filters = FilterState::default();
        filters.apply_filters([FilterChange::category_input("Food")]);
        filters.set_page(3);
        assert_eq!(filters.query().page, 3);
        assert_eq!(filters.query().category.as_deref(), Some("Food"));

        filters.set_page(0);
        assert_eq!(filters.query().page, 1);
    }

    #[test]
    fn test_set_limit_returns_to_first_page() {
        let mut filters = FilterState::default();
        filters.set_page(5);
        filters.set_limit(PageSize::Fifty);
        assert_eq!(filters.query().page, 1);
        assert_eq!(filters.query().limit, PageSize::Fifty);
    }

    #[test]
    fn test_clear_restores_defaults() {
        let mut filters = FilterState::new(PageSize::Ten);
        filters.apply_filters([
            FilterChange::search_input("Lunch"),
            FilterChange::min_amount_input("5").unwrap(),
        ]);
        filters.set_limit(PageSize::Fifty);
        filters.clear();
        assert_eq!(filters.query(), &FilterQuery::with_limit(PageSize::Ten));
        assert_eq!(filters.committed_search(), None);
    }

    #[test]
    fn test_empty_inputs_unset_fields() {
        let mut filters = FilterState::default();
        filters.apply_filters([
            FilterChange::category_input("Food"),
            FilterChange::max_amount_input("30").unwrap(),
        ]);
        filters.apply_filters([
            FilterChange::category_input(""),
            FilterChange::max_amount_input("").unwrap(),
        ]);
        assert!(!filters.query().has_filters());
    }
}
