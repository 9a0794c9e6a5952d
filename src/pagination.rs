use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// Страница результатов. `next`/`previous` это номера страниц.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(params: &PageParams, count: i64, results: Vec<T>) -> Self {
        let page = params.page();
        let shown = i64::from(page) * params.limit();
        Self {
            count,
            next: (shown < count).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<u32>, page_size: Option<u32>) -> PageParams {
        PageParams { page, page_size }
    }

    #[test]
    fn defaults_to_first_page_of_five() {
        let p = params(None, None);
        assert_eq!((p.page(), p.page_size(), p.offset()), (1, 5, 0));
    }

    #[test]
    fn page_size_is_capped() {
        assert_eq!(params(None, Some(100)).page_size(), MAX_PAGE_SIZE);
        assert_eq!(params(None, Some(0)).page_size(), 1);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(params(Some(3), Some(10)).offset(), 20);
        assert_eq!(params(Some(0), None).offset(), 0);
    }

    #[test]
    fn links_point_to_neighbour_pages() {
        let p = params(Some(2), Some(5));
        let page = Page::new(&p, 12, vec![(); 5]);
        assert_eq!(page.previous, Some(1));
        assert_eq!(page.next, Some(3));

        let last = Page::new(&params(Some(3), Some(5)), 12, vec![(); 2]);
        assert_eq!(last.next, None);
    }
}
