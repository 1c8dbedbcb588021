use serde::Deserialize;

/// The backend's list envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Some list endpoints skip pagination and answer with a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paged(page) => page,
            Listing::Bare(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    /// Exact-match filters such as `course=3` or `result__class_instance=7`.
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Blank search strings are dropped rather than sent as `search=`.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((key.into(), value.to_string()));
        self
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 3);
        if let Some(page) = self.page {
            pairs.push(("page".into(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size".into(), size.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search".into(), search.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_arrays_become_a_single_page() {
        let listing: Listing<u32> = serde_json::from_str("[1, 2, 3]").unwrap();
        let page: Page<u32> = listing.into();
        assert_eq!(page.count, 3);
        assert!(!page.has_next());

        let listing: Listing<u32> =
            serde_json::from_str(r#"{"count": 9, "next": "http://x/?page=2", "previous": null, "results": [1]}"#)
                .unwrap();
        let page: Page<u32> = listing.into();
        assert_eq!(page.count, 9);
        assert!(page.has_next());
    }

    #[test]
    fn query_pairs_skip_unset_values() {
        let query = ListQuery::new()
            .page(2)
            .search("  ")
            .filter("result__class_instance", 7);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("result__class_instance".to_string(), "7".to_string()),
            ]
        );
    }
}
