//! Page-number pagination for article listings.
//!
//! Requests for a page that is not a number are answered with the first page;
//! requests for a page outside the valid range are answered with the last one.

/// Splits a list of items into numbered pages.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: usize,
}

impl Paginator {
    /// Returns a new [`Paginator`] with the given page size (at least one item).
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Returns the number of pages needed for `count` items. An empty list still
    /// has one (empty) page.
    pub fn num_pages(&self, count: usize) -> usize {
        count.div_ceil(self.per_page).max(1)
    }

    /// Returns the page requested by the raw `page` query parameter.
    pub fn page<T>(&self, items: Vec<T>, page_param: Option<&str>) -> Page<T> {
        let count = items.len();
        let num_pages = self.num_pages(count);

        let number = match page_param.map(PageNumber::parse) {
            Some(PageNumber::Valid(number)) if (1..=num_pages).contains(&number) => number,
            Some(PageNumber::Valid(_) | PageNumber::OutOfRange) => num_pages,
            Some(PageNumber::Invalid) | None => 1,
        };

        let start = (number - 1) * self.per_page;
        let end = (start + self.per_page).min(count);

        let items = items
            .into_iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();

        Page {
            items,
            number,
            num_pages,
            count,
            per_page: self.per_page,
        }
    }
}

enum PageNumber {
    Valid(usize),
    /// An integer that does not fit a page number, e.g. a negative one or one
    /// too large to represent.
    OutOfRange,
    Invalid,
}

impl PageNumber {
    fn parse(param: &str) -> Self {
        let param = param.trim();
        let digits = param.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(param);
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Self::Invalid;
        }

        match param.parse::<usize>() {
            Ok(number) => Self::Valid(number),
            Err(_) => Self::OutOfRange,
        }
    }
}

/// A single page of items.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The 1-based number of this page.
    pub number: usize,
    pub num_pages: usize,
    /// The number of items across all pages.
    pub count: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then_some(self.number - 1)
    }

    /// Returns the 1-based index of the first item on this page, or 0 when the
    /// page is empty.
    pub fn start_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    /// Returns the 1-based index of the last item on this page, or 0 when the
    /// page is empty.
    pub fn end_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.start_index() + self.items.len() - 1
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn items(count: usize) -> Vec<usize> {
        (1..=count).collect()
    }

    #[test]
    fn test_num_pages() {
        let paginator = Paginator::new(10);

        assert_eq!(paginator.num_pages(0), 1);
        assert_eq!(paginator.num_pages(10), 1);
        assert_eq!(paginator.num_pages(11), 2);
        assert_eq!(paginator.num_pages(30), 3);
    }

    #[test]
    fn test_requested_page() {
        let page = Paginator::new(10).page(items(25), Some("2"));

        assert_eq!(page.number, 2);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.start_index(), 11);
        assert_eq!(page.end_index(), 20);
        assert_eq!(page.previous_page_number(), Some(1));
        assert_eq!(page.next_page_number(), Some(3));
    }

    #[test]
    fn test_missing_page_is_first_page() {
        let page = Paginator::new(10).page(items(25), None);

        assert_eq!(page.number, 1);
        assert_eq!(page.has_previous(), false);
    }

    #[test]
    fn test_non_numeric_page_is_first_page() {
        let page = Paginator::new(10).page(items(25), Some("abc"));

        assert_eq!(page.number, 1);
        assert_eq!(page.items, items(10));
    }

    #[test]
    fn test_out_of_range_page_is_last_page() {
        let page = Paginator::new(10).page(items(25), Some("999"));

        assert_eq!(page.number, 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.has_next(), false);
    }

    #[test]
    fn test_page_below_one_is_last_page() {
        assert_eq!(Paginator::new(10).page(items(25), Some("0")).number, 3);
        assert_eq!(Paginator::new(10).page(items(25), Some("-4")).number, 3);
    }

    #[test]
    fn test_overflowing_page_is_last_page() {
        let paginator = Paginator::new(10);

        assert_eq!(
            paginator.page(items(25), Some("99999999999999999999")).number,
            3
        );
        assert_eq!(
            paginator.page(items(25), Some("-99999999999999999999")).number,
            3
        );
        assert_eq!(paginator.page(items(25), Some("+2")).number, 2);
        assert_eq!(paginator.page(items(25), Some("2.5")).number, 1);
        assert_eq!(paginator.page(items(25), Some("-")).number, 1);
    }

    #[test]
    fn test_empty_listing_has_one_empty_page() {
        let page = Paginator::new(10).page(Vec::<usize>::new(), Some("5"));

        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.start_index(), 0);
        assert_eq!(page.end_index(), 0);
    }

    #[test]
    fn test_zero_page_size_is_raised_to_one() {
        assert_eq!(Paginator::new(0).per_page(), 1);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Paginator::new(2).page(items(5), Some("2")).map(|item| item * 10);

        assert_eq!(page.items, vec![30, 40]);
        assert_eq!(page.number, 2);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.count, 5);
    }
}
