//! Page-number pagination for feeds.
//!
//! Out-of-range requests never fail: an unparsable page parameter selects the
//! first page, and a number outside `1..=num_pages` selects the last page.

use std::num::NonZeroU32;

use serde::Serialize;

pub const DEFAULT_PER_PAGE: u32 = 10;
/// Upper bound on page size; repositories never return more rows than this.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            per_page: NonZeroU32::new(DEFAULT_PER_PAGE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// The slice of rows a repository should return for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub num_pages: u32,
    pub offset: u64,
    pub limit: u32,
}

impl Paginator {
    /// Sizes above [`MAX_PER_PAGE`] are lowered so offsets match the rows served.
    pub fn new(per_page: NonZeroU32) -> Self {
        let per_page =
            NonZeroU32::new(per_page.get().min(MAX_PER_PAGE)).unwrap_or(NonZeroU32::MIN);
        Self { per_page }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    pub fn num_pages(&self, total: u64) -> u32 {
        let per_page = u64::from(self.per_page.get());
        let pages = total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve the raw `page` query value against `total` rows.
    pub fn resolve(&self, raw: Option<&str>, total: u64) -> PageRequest {
        let num_pages = self.num_pages(total);
        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(value)) if value >= 1 && value <= i64::from(num_pages) => value as u32,
            Some(Ok(_)) => num_pages,
        };
        PageRequest {
            number,
            num_pages,
            offset: u64::from(number - 1) * u64::from(self.per_page.get()),
            limit: self.per_page.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            number: request.number,
            num_pages: request.num_pages,
            total,
        }
    }

    pub fn previous_number(&self) -> Option<u32> {
        (self.number > 1).then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u32> {
        (self.number < self.num_pages).then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(per_page: u32) -> Paginator {
        Paginator::new(NonZeroU32::new(per_page).expect("non-zero"))
    }

    #[test]
    fn empty_result_has_one_page() {
        let p = paginator(10);
        assert_eq!(p.num_pages(0), 1);
        let request = p.resolve(None, 0);
        assert_eq!(request.number, 1);
        assert_eq!(request.offset, 0);
    }

    #[test]
    fn pages_round_up() {
        let p = paginator(10);
        assert_eq!(p.num_pages(10), 1);
        assert_eq!(p.num_pages(11), 2);
        assert_eq!(p.num_pages(25), 3);
    }

    #[test]
    fn garbage_selects_first_page() {
        let p = paginator(10);
        assert_eq!(p.resolve(Some("abc"), 35).number, 1);
        assert_eq!(p.resolve(Some(""), 35).number, 1);
    }

    #[test]
    fn out_of_range_selects_last_page() {
        let p = paginator(10);
        let request = p.resolve(Some("99"), 35);
        assert_eq!(request.number, 4);
        assert_eq!(request.offset, 30);
        assert_eq!(p.resolve(Some("0"), 35).number, 4);
        assert_eq!(p.resolve(Some("-3"), 35).number, 4);
    }

    #[test]
    fn oversized_pages_are_capped() {
        let p = paginator(150);
        assert_eq!(p.per_page(), MAX_PER_PAGE);
        let request = p.resolve(Some("2"), 250);
        assert_eq!(request.offset, u64::from(MAX_PER_PAGE));
        assert_eq!(request.limit, MAX_PER_PAGE);
        assert_eq!(request.num_pages, 3);
    }

    #[test]
    fn neighbours() {
        let p = paginator(10);
        let page: Page<u8> = Page::new(Vec::new(), p.resolve(Some("2"), 35), 35);
        assert_eq!(page.previous_number(), Some(1));
        assert_eq!(page.next_number(), Some(3));

        let first: Page<u8> = Page::new(Vec::new(), p.resolve(None, 5), 5);
        assert_eq!(first.previous_number(), None);
        assert_eq!(first.next_number(), None);
    }
}
