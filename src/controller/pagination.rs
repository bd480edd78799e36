//! Page navigation state machine

use crate::core::query::PaginationMeta;

/// Position within a paginated list
///
/// `next` and `prev` are no-ops at the ends. Pages are 1-based; an empty
/// list has no pages and therefore no neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    total_pages: u32,
}

impl PageCursor {
    pub fn new(page: u32, total_pages: u32) -> Self {
        Self {
            page: page.max(1),
            total_pages,
        }
    }

    pub fn from_meta(meta: &PaginationMeta) -> Self {
        Self::new(meta.page, meta.total_pages)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1 && self.total_pages > 0
    }

    /// Advance one page; returns whether the page changed
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Go back one page; returns whether the page changed
    pub fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Back to the first page (page size changed)
    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Last valid page when the cursor points past the end of a non-empty list
    pub fn clamp_target(&self) -> Option<u32> {
        (self.total_pages > 0 && self.page > self.total_pages).then_some(self.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_until_last_page() {
        let mut cursor = PageCursor::from_meta(&PaginationMeta::new(2, 20, 55));
        assert!(cursor.has_prev());
        assert!(cursor.has_next());

        assert!(cursor.next());
        assert_eq!(cursor.page(), 3);
        assert!(!cursor.has_next());

        assert!(!cursor.next());
        assert_eq!(cursor.page(), 3);
    }

    #[test]
    fn test_prev_stops_at_first_page() {
        let mut cursor = PageCursor::new(2, 3);
        assert!(cursor.prev());
        assert_eq!(cursor.page(), 1);
        assert!(!cursor.prev());
        assert_eq!(cursor.page(), 1);
    }

    #[test]
    fn test_empty_list_has_no_neighbours() {
        let mut cursor = PageCursor::from_meta(&PaginationMeta::new(1, 20, 0));
        assert!(!cursor.has_next());
        assert!(!cursor.has_prev());
        assert!(!cursor.next());
        assert!(!cursor.prev());
        assert_eq!(cursor.clamp_target(), None);
    }

    #[test]
    fn test_reset_and_clamp() {
        let mut cursor = PageCursor::new(5, 3);
        assert_eq!(cursor.clamp_target(), Some(3));
        cursor.reset();
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.clamp_target(), None);
    }
}
