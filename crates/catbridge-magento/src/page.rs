//! Page body shapes.
//!
//! Search endpoints wrap results as `{ "items": [...], "total_count": N }`;
//! some endpoints and most exported files are a bare JSON array. Both are
//! accepted everywhere a page is read.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageBody<T> {
    Search {
        #[serde(default = "Vec::new")]
        items: Vec<T>,
        #[serde(default)]
        total_count: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> PageBody<T> {
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        match self {
            PageBody::Search { total_count, .. } => *total_count,
            PageBody::Bare(_) => None,
        }
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            PageBody::Search { items, .. } | PageBody::Bare(items) => items,
        }
    }
}

/// Whether `page` (1-based) starts past the end of a result set of
/// `total_count` rows. Magento answers such pages with the last page again
/// instead of an empty one.
#[must_use]
pub fn page_is_past_end(page: u32, page_size: u32, total_count: u64) -> bool {
    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    offset >= total_count
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i64,
    }

    #[test]
    fn accepts_bare_array() {
        let body: PageBody<Row> =
            serde_json::from_value(json!([{ "id": 1 }, { "id": 2 }])).expect("bare array");
        assert!(body.total_count().is_none());
        assert_eq!(body.into_items(), vec![Row { id: 1 }, Row { id: 2 }]);
    }

    #[test]
    fn accepts_items_object() {
        let body: PageBody<Row> = serde_json::from_value(json!({
            "items": [{ "id": 3 }],
            "search_criteria": {},
            "total_count": 41
        }))
        .expect("items object");
        assert_eq!(body.total_count(), Some(41));
        assert_eq!(body.into_items(), vec![Row { id: 3 }]);
    }

    #[test]
    fn missing_items_is_an_empty_page() {
        let body: PageBody<Row> =
            serde_json::from_value(json!({ "total_count": 0 })).expect("empty object");
        assert!(body.into_items().is_empty());
    }

    #[test]
    fn past_end_detection() {
        assert!(!page_is_past_end(1, 50, 1));
        assert!(!page_is_past_end(2, 50, 51));
        assert!(page_is_past_end(2, 50, 50));
        assert!(page_is_past_end(1, 50, 0));
    }
}
