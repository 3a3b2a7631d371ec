//! Page-number pagination for post listings.
//!
//! DESIGN
//! ======
//! Listings count their rows first, resolve the requested `?page=` against
//! that count, then fetch one `LIMIT/OFFSET` window. Resolution never fails:
//! garbage means the first page and anything out of range means the last
//! page, so a stale link still lands somewhere useful.

use serde::Serialize;

/// Splits `count` rows into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: i64,
}

impl Paginator {
    #[must_use]
    pub fn new(per_page: i64) -> Self {
        Self { per_page: per_page.max(1) }
    }

    #[must_use]
    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Number of pages for `count` rows. An empty listing still has one page.
    #[must_use]
    pub fn num_pages(&self, count: i64) -> i64 {
        if count <= 0 {
            return 1;
        }
        (count + self.per_page - 1) / self.per_page
    }

    /// Resolve a raw `page` query value into a fetch window.
    #[must_use]
    pub fn window(&self, raw_page: Option<&str>, count: i64) -> PageWindow {
        let count = count.max(0);
        let num_pages = self.num_pages(count);
        let number = match raw_page.and_then(parse_page_number) {
            None => 1,
            Some(n) if n < 1 || n > num_pages => num_pages,
            Some(n) => n,
        };

        PageWindow { number, num_pages, count, offset: (number - 1) * self.per_page, limit: self.per_page }
    }
}

/// The slice of rows a page covers, before the rows are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    #[must_use]
    pub fn into_page<T>(self, object_list: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
            object_list,
        }
    }
}

/// One page of results as sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    /// Total rows across all pages.
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub object_list: Vec<T>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

/// Only whole integers count; `"2.0"` and `"2.5"` are garbage like `"abc"`.
fn parse_page_number(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod tests;
