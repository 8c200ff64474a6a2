//! Page-based pagination.

use serde::{Deserialize, Serialize};

/// `?page=` query parameter; pages start at 1.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    /// Requested page, clamped to at least 1.
    #[must_use]
    pub fn number(self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Row offset for a page of `per_page` items.
    #[must_use]
    pub fn offset(self, per_page: u32) -> i64 {
        i64::from(self.number() - 1) * i64::from(per_page)
    }
}

/// One page of a collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, query: PageQuery, per_page: u32, total: i64) -> Self {
        Self {
            items,
            page: query.number(),
            per_page,
            total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_to_first() {
        let query = PageQuery::default();
        assert_eq!(query.number(), 1);
        assert_eq!(query.offset(10), 0);
    }

    #[test]
    fn test_page_zero_is_first() {
        let query = PageQuery { page: Some(0) };
        assert_eq!(query.number(), 1);
        assert_eq!(Page::<u8>::new(vec![], query, 10, 0).page, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageQuery { page: Some(3) }.offset(10), 20);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = Page::new(vec![1, 2], PageQuery { page: Some(2) }, 2, 5);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["perPage"], 2);
        assert_eq!(json["page"], 2);
        assert_eq!(json["total"], 5);
    }
}
