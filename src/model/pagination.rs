//! Infinite-query page cache
//!
//! Pages are fetched on demand, keyed by a composite [`QueryKey`], and held in
//! fetch order. A next page exists only while the last page came back full.

use std::collections::{HashMap, VecDeque};

use anyhow::Result;
use async_trait::async_trait;

use super::item::Item;
use super::types::{ItemSortBy, SortOrder};

/// Source of pages for one query
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum QueryKind {
    #[default]
    AllTracks,
    Albums,
    Artists,
    Genres,
    FrequentlyPlayed,
}

/// Composite cache key: everything that changes what the server returns
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub library_id: String,
    pub favorites: bool,
    pub unplayed: bool,
    /// Number of downloaded tracks when listing downloads only
    pub downloaded: Option<usize>,
    pub sort_by: ItemSortBy,
    pub sort_order: SortOrder,
    pub artist_id: Option<String>,
    /// Kept sorted so equal filter sets hash equally
    pub genre_ids: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl QueryKey {
    pub fn new(kind: QueryKind, library_id: impl Into<String>) -> Self {
        Self {
            kind,
            library_id: library_id.into(),
            ..Default::default()
        }
    }

    pub fn with_genres(mut self, mut genre_ids: Vec<String>) -> Self {
        genre_ids.sort();
        genre_ids.dedup();
        self.genre_ids = genre_ids;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Page {
    pub param: usize,
    pub items: Vec<Item>,
}

/// Fetched pages for a single [`QueryKey`]
#[derive(Clone, Debug)]
pub struct InfiniteQuery {
    pages: VecDeque<Page>,
    page_size: usize,
    max_pages: Option<usize>,
    single_page: bool,
    stale: bool,
}

impl InfiniteQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: VecDeque::new(),
            page_size: page_size.max(1),
            max_pages: None,
            single_page: false,
            stale: false,
        }
    }

    /// Keep at most `max_pages` pages, dropping from the far end
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages.max(1));
        self
    }

    /// Queries served from local data in one go never have a next page
    pub fn single_page(mut self) -> Self {
        self.single_page = true;
        self
    }

    pub fn is_fetched(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn has_next_page(&self) -> bool {
        match self.pages.back() {
            None => true,
            Some(_) if self.single_page => false,
            Some(last) => last.items.len() == self.page_size,
        }
    }

    pub fn has_previous_page(&self) -> bool {
        self.pages.front().is_some_and(|first| first.param > 0)
    }

    /// Fetch the page after the last one held. Returns false when there is none.
    pub async fn fetch_next(&mut self, fetcher: &dyn PageFetcher) -> Result<bool> {
        if !self.has_next_page() {
            return Ok(false);
        }
        let param = self.pages.back().map_or(0, |last| last.param + 1);
        let items = fetcher.fetch_page(param).await?;
        tracing::trace!(param, count = items.len(), "Fetched next page");
        self.pages.push_back(Page { param, items });

        if let Some(max) = self.max_pages {
            while self.pages.len() > max {
                self.pages.pop_front();
            }
        }
        Ok(true)
    }

    /// Fetch the page before the first one held (only after pages were dropped).
    pub async fn fetch_previous(&mut self, fetcher: &dyn PageFetcher) -> Result<bool> {
        let Some(param) = self.pages.front().and_then(|first| first.param.checked_sub(1)) else {
            return Ok(false);
        };
        let items = fetcher.fetch_page(param).await?;
        tracing::trace!(param, count = items.len(), "Fetched previous page");
        self.pages.push_front(Page { param, items });

        if let Some(max) = self.max_pages {
            while self.pages.len() > max {
                self.pages.pop_back();
            }
        }
        Ok(true)
    }

    /// Drop everything and fetch the first page again
    pub async fn refetch(&mut self, fetcher: &dyn PageFetcher) -> Result<()> {
        self.pages.clear();
        self.stale = false;
        self.fetch_next(fetcher).await?;
        Ok(())
    }

    pub fn pages(&self) -> Vec<Vec<Item>> {
        self.pages.iter().map(|page| page.items.clone()).collect()
    }

    #[cfg(test)]
    pub fn page_params(&self) -> Vec<usize> {
        self.pages.iter().map(|page| page.param).collect()
    }

    /// All held items, pages concatenated in order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }
}

/// All live infinite queries
#[derive(Default)]
pub struct QueryCache {
    queries: HashMap<QueryKey, InfiniteQuery>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&InfiniteQuery> {
        self.queries.get(key)
    }

    pub fn insert(&mut self, key: QueryKey, query: InfiniteQuery) {
        self.queries.insert(key, query);
    }

    /// Mark every query matching `predicate` stale. Returns how many matched.
    pub fn invalidate(&mut self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let mut count = 0;
        for (key, query) in self.queries.iter_mut() {
            if predicate(key) {
                query.mark_stale();
                count += 1;
            }
        }
        tracing::debug!(count, "Invalidated queries");
        count
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
