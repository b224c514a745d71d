//! Paginated result envelopes.

use serde::Serialize;

/// Length-aware page: carries the total row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<M> {
    pub items: Vec<M>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
}

impl<M> Page<M> {
    /// Wraps an unpaginated result as one page holding every item.
    pub(crate) fn single(items: Vec<M>) -> Self {
        let len = items.len();
        Self {
            per_page: u32::try_from(len.max(1)).unwrap_or(u32::MAX),
            total: len as u64,
            current_page: 1,
            items,
        }
    }

    /// Last page number; `1` for an empty result.
    pub fn last_page(&self) -> u32 {
        if self.total == 0 || self.per_page == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Page without a total count; only knows whether another page follows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplePage<M> {
    pub items: Vec<M>,
    pub per_page: u32,
    pub current_page: u32,
    pub has_more: bool,
}

impl<M> SimplePage<M> {
    pub(crate) fn single(items: Vec<M>) -> Self {
        Self {
            per_page: u32::try_from(items.len().max(1)).unwrap_or(u32::MAX),
            current_page: 1,
            has_more: false,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    fn page(total: u64, per_page: u32, current_page: u32) -> Page<()> {
        Page {
            items: Vec::new(),
            total,
            per_page,
            current_page,
        }
    }

    #[test]
    fn last_page_rounds_up() {
        assert_eq!(page(0, 10, 1).last_page(), 1);
        assert_eq!(page(10, 10, 1).last_page(), 1);
        assert_eq!(page(11, 10, 1).last_page(), 2);
    }

    #[test]
    fn has_more_pages_compares_against_last_page() {
        assert!(page(11, 10, 1).has_more_pages());
        assert!(!page(11, 10, 2).has_more_pages());
    }

    #[test]
    fn single_page_holds_everything() {
        let single = Page::single(vec![1, 2, 3]);
        assert_eq!(single.total, 3);
        assert_eq!(single.per_page, 3);
        assert_eq!(single.last_page(), 1);

        let empty: Page<i32> = Page::single(Vec::new());
        assert_eq!(empty.per_page, 1);
    }
}
