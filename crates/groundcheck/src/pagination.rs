//! Offset pagination shared by record listings and the leaderboard.

use serde::{Deserialize, Deserializer, Serialize};

/// Every list endpoint returns pages of this size.
pub const PAGE_SIZE: usize = 10;

/// Query parameters accepted by list endpoints (`?page=2&search=warung`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    /// Unparsable values (`?page=`, `?page=abc`) fall back to the first page.
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, search: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            search: Some(search.into()),
        }
    }

    /// 1-indexed page number; zero and absent both mean the first page.
    pub fn page(&self) -> u32 {
        self.page.filter(|page| *page > 0).unwrap_or(1)
    }

    pub fn search(&self) -> &str {
        self.search.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn offset(&self) -> usize {
        (self.page() as usize - 1).saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> usize {
        PAGE_SIZE
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage {
    Number(u64),
    Text(String),
}

fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawPage>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawPage::Number(page)) => u32::try_from(page).ok(),
        Some(RawPage::Text(text)) => parse_page(&text),
        None => None,
    })
}

/// Leading digits of `raw`, so `2abc` reads as page 2.
fn parse_page(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits_end].parse().ok()
}

/// One page of results plus the page count of the whole matching set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    pub total_pages: u64,
    pub current_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_matching: u64, request: &PageRequest) -> Self {
        Self {
            items,
            total_pages: total_pages(total_matching),
            current_page: request.page(),
        }
    }

    /// Slice an already ordered result set.
    pub fn from_ordered(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.limit())
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            current_page: self.current_page,
        }
    }
}

pub fn total_pages(total_matching: u64) -> u64 {
    total_matching.div_ceil(PAGE_SIZE as u64)
}

/// Case-insensitive substring match; an empty needle matches everything.
pub(crate) fn matches_search(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_and_missing_pages_default_to_first() {
        assert_eq!(PageRequest::default().page(), 1);
        assert_eq!(PageRequest::new(0, "").page(), 1);
        assert_eq!(PageRequest::new(3, "").offset(), 20);
    }

    fn query(uri: &str) -> PageRequest {
        let uri: axum::http::Uri = uri.parse().expect("valid uri");
        axum::extract::Query::<PageRequest>::try_from_uri(&uri)
            .expect("query parses")
            .0
    }

    #[test]
    fn malformed_page_parameters_fall_back_to_first_page() {
        assert_eq!(query("/r?page=").page(), 1);
        assert_eq!(query("/r?page=abc").page(), 1);
        assert_eq!(query("/r?page=-3").page(), 1);
        assert_eq!(query("/r").page(), 1);
        assert_eq!(query("/r?page=2abc").page(), 2);
        assert_eq!(query("/r?page=3&search=%20kopi").page(), 3);
        assert_eq!(query("/r?page=3&search=%20kopi").search(), "kopi");
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let request = PageRequest::new(1, "  WarUng ");
        assert_eq!(request.search(), "WarUng");
        assert!(matches_search("Warung Makan Bu Sri", request.search()));
        assert!(matches_search("anything", ""));
        assert!(!matches_search("Toko Besi", "warung"));
    }

    proptest! {
        #[test]
        fn pages_cover_every_item_exactly_once(n in 0usize..95) {
            let items: Vec<usize> = (0..n).collect();
            let pages = total_pages(n as u64);
            let mut seen = Vec::new();
            for page in 1..=pages as u32 {
                let slice = Page::from_ordered(items.clone(), &PageRequest::new(page, ""));
                prop_assert_eq!(slice.total_pages, pages);
                seen.extend(slice.items);
            }
            prop_assert_eq!(seen, items.clone());

            let beyond = Page::from_ordered(items, &PageRequest::new(pages as u32 + 1, ""));
            prop_assert!(beyond.items.is_empty());
            prop_assert_eq!(beyond.total_pages, pages);
        }
    }
}
