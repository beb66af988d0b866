//! Library tab loading, favorites, search and lyrics

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::formatting::aggregate_frequent_artists;
use crate::model::item::NameIdPair;
use crate::model::jellyfin_client::{AlbumQuery, ArtistQuery, TrackQuery, current_year};
use crate::model::lyrics::LyricLine;
use crate::model::sections::{flatten_for_sort, flatten_plain, jump_to_letter};
use crate::model::{
    InfiniteQuery, Item, ItemKind, ItemSortBy, LibraryApi, LibraryTab, ListEntry, NoticeLevel,
    PageFetcher, QueryKey, QueryKind, QueueRef, QueueTrack, QueuingType, SearchResults,
};

use super::AppController;

/// A flattened library list ready to render
#[derive(Clone, Debug, Default)]
pub struct LibraryView {
    pub entries: Vec<ListEntry>,
    /// Letters that have a section header, for the jump-to-letter control
    pub letters: BTreeSet<char>,
    pub has_next_page: bool,
    /// Earlier pages were dropped from the window and can be fetched back
    pub has_previous_page: bool,
}

/// Which page a load should bring in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PageRequest {
    /// What is cached, fetching the first page only when nothing is
    #[default]
    Current,
    Next,
    Previous,
}

impl LibraryView {
    fn from_query(query: &InfiniteQuery, sort_by: Option<ItemSortBy>) -> Self {
        let pages = query.pages();
        let mut letters = BTreeSet::new();
        let entries = match sort_by {
            Some(sort_by) => flatten_for_sort(&pages, sort_by, &mut letters),
            None => flatten_plain(&pages),
        };
        Self {
            entries,
            letters,
            has_next_page: query.has_next_page(),
            has_previous_page: query.has_previous_page(),
        }
    }

    /// Entry index of the section to scroll to for `letter`
    pub fn jump_to(&self, letter: char) -> Option<usize> {
        jump_to_letter(&self.entries, letter)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().filter_map(ListEntry::as_item)
    }
}

struct TracksFetcher {
    api: Arc<dyn LibraryApi>,
    query: TrackQuery,
}

#[async_trait]
impl PageFetcher for TracksFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        self.api.fetch_tracks(page, &self.query).await
    }
}

struct AlbumsFetcher {
    api: Arc<dyn LibraryApi>,
    query: AlbumQuery,
}

#[async_trait]
impl PageFetcher for AlbumsFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        self.api.fetch_albums(page, &self.query).await
    }
}

struct ArtistsFetcher {
    api: Arc<dyn LibraryApi>,
    query: ArtistQuery,
}

#[async_trait]
impl PageFetcher for ArtistsFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        self.api.fetch_artists(page, &self.query).await
    }
}

struct GenresFetcher(Arc<dyn LibraryApi>);

#[async_trait]
impl PageFetcher for GenresFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        self.0.fetch_genres(page).await
    }
}

struct FrequentlyPlayedFetcher(Arc<dyn LibraryApi>);

#[async_trait]
impl PageFetcher for FrequentlyPlayedFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        self.0.fetch_frequently_played(page).await
    }
}

/// Already-filtered downloaded tracks, served as one page
struct DownloadsFetcher(Vec<Item>);

#[async_trait]
impl PageFetcher for DownloadsFetcher {
    async fn fetch_page(&self, page: usize) -> Result<Vec<Item>> {
        Ok(if page == 0 { self.0.clone() } else { Vec::new() })
    }
}

fn favorites_kind(kind: ItemKind) -> Option<QueryKind> {
    match kind {
        ItemKind::Audio => Some(QueryKind::AllTracks),
        ItemKind::MusicAlbum => Some(QueryKind::Albums),
        ItemKind::MusicArtist => Some(QueryKind::Artists),
        _ => None,
    }
}

impl AppController {
    async fn library_id(&self) -> Result<String> {
        Ok(self.model.require_api().await?.library_id().to_string())
    }

    /// Fetch the requested page of the query for `key` and store it back.
    /// Unfetched or stale queries start over from the first page.
    async fn run_query(
        &self,
        key: QueryKey,
        create: impl FnOnce() -> InfiniteQuery,
        fetcher: &dyn PageFetcher,
        request: PageRequest,
    ) -> Result<InfiniteQuery> {
        let cached = self.model.queries.lock().await.get(&key).cloned();
        let mut query = cached.unwrap_or_else(create);

        if !query.is_fetched() || query.is_stale() {
            query.refetch(fetcher).await?;
        } else {
            match request {
                PageRequest::Current => {}
                PageRequest::Next => {
                    query.fetch_next(fetcher).await?;
                }
                PageRequest::Previous => {
                    query.fetch_previous(fetcher).await?;
                }
            }
        }

        self.model.queries.lock().await.insert(key, query.clone());
        Ok(query)
    }

    async fn notify_on_error<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.model
                .set_notice(NoticeLevel::Error, Self::format_error(e))
                .await;
        }
        result
    }

    /// Tracks tab. Downloaded-only listings are built from the local index.
    pub async fn load_tracks(&self, request: PageRequest) -> Result<LibraryView> {
        let result = self.load_tracks_inner(request).await;
        self.notify_on_error(result).await
    }

    async fn load_tracks_inner(&self, request: PageRequest) -> Result<LibraryView> {
        let (sort_by, sort_order, filters) = {
            let prefs = self.model.preferences.read().await;
            (
                prefs.sort_by(LibraryTab::Tracks),
                prefs.sort_order(LibraryTab::Tracks),
                prefs.filters(LibraryTab::Tracks),
            )
        };
        let limits = self.limits;

        if filters.is_downloaded {
            let sort_for_compare = match sort_by {
                ItemSortBy::SortName => ItemSortBy::Name,
                other => other,
            };
            let (min, max) = (filters.year_min.unwrap_or(0), filters.year_max.unwrap_or(current_year()));
            let favorites = self.model.favorites.snapshot().await;
            let items: Vec<Item> = self
                .model
                .downloads
                .sorted_items(sort_for_compare, sort_order)
                .await
                .into_iter()
                .filter(|item| {
                    !filters.has_year_range()
                        || item.production_year.is_some_and(|year| year >= min && year <= max)
                })
                .filter(|item| !filters.favorites_only() || favorites.contains(&item.id))
                .collect();

            let key = QueryKey {
                favorites: filters.favorites_only(),
                downloaded: Some(self.model.downloads.len().await),
                sort_by,
                sort_order,
                year_min: filters.year_min,
                year_max: filters.year_max,
                ..QueryKey::new(QueryKind::AllTracks, "downloads")
            };
            // local data: always rebuild
            self.model.queries.lock().await.invalidate(|k| k == &key);
            let fetcher = DownloadsFetcher(items);
            let query = self
                .run_query(key, || InfiniteQuery::new(limits.library).single_page(), &fetcher, request)
                .await?;
            return Ok(LibraryView::from_query(&query, Some(sort_by)));
        }

        let api = self.model.require_api().await?;
        let key = QueryKey {
            favorites: filters.favorites_only(),
            unplayed: filters.is_unplayed,
            sort_by,
            sort_order,
            year_min: filters.year_min,
            year_max: filters.year_max,
            ..QueryKey::new(QueryKind::AllTracks, self.library_id().await?)
        }
        .with_genres(filters.genre_ids.clone());

        let fetcher = TracksFetcher {
            api,
            query: TrackQuery {
                favorites: filters.favorites_only(),
                unplayed: filters.is_unplayed,
                sort_by,
                sort_order,
                artist_id: None,
                genre_ids: filters.genre_ids.clone(),
                year_min: filters.year_min,
                year_max: filters.year_max,
            },
        };
        let query = self
            .run_query(
                key,
                || InfiniteQuery::new(limits.library).with_max_pages(limits.library_max_pages),
                &fetcher,
                request,
            )
            .await?;
        Ok(LibraryView::from_query(&query, Some(sort_by)))
    }

    /// Albums tab
    pub async fn load_albums(&self, request: PageRequest) -> Result<LibraryView> {
        let result = self.load_albums_inner(request).await;
        self.notify_on_error(result).await
    }

    async fn load_albums_inner(&self, request: PageRequest) -> Result<LibraryView> {
        let api = self.model.require_api().await?;
        let (sort_by, sort_order, filters) = {
            let prefs = self.model.preferences.read().await;
            (
                prefs.sort_by(LibraryTab::Albums),
                prefs.sort_order(LibraryTab::Albums),
                prefs.filters(LibraryTab::Albums),
            )
        };
        let key = QueryKey {
            favorites: filters.favorites_only(),
            sort_by,
            sort_order,
            year_min: filters.year_min,
            year_max: filters.year_max,
            ..QueryKey::new(QueryKind::Albums, self.library_id().await?)
        };
        let fetcher = AlbumsFetcher {
            api,
            query: AlbumQuery {
                favorites: filters.favorites_only(),
                sort_by,
                sort_order,
                year_min: filters.year_min,
                year_max: filters.year_max,
            },
        };
        let limits = self.limits;
        let query = self
            .run_query(
                key,
                || InfiniteQuery::new(limits.library).with_max_pages(limits.library_max_pages),
                &fetcher,
                request,
            )
            .await?;
        Ok(LibraryView::from_query(&query, Some(sort_by)))
    }

    /// Artists tab; only name sorts are offered by the server
    pub async fn load_artists(&self, request: PageRequest) -> Result<LibraryView> {
        let result = self.load_artists_inner(request).await;
        self.notify_on_error(result).await
    }

    async fn load_artists_inner(&self, request: PageRequest) -> Result<LibraryView> {
        let api = self.model.require_api().await?;
        let (sort_by, sort_order, filters) = {
            let prefs = self.model.preferences.read().await;
            (
                prefs.sort_by(LibraryTab::Artists),
                prefs.sort_order(LibraryTab::Artists),
                prefs.filters(LibraryTab::Artists),
            )
        };
        let sort_by = match sort_by {
            ItemSortBy::Name | ItemSortBy::SortName => sort_by,
            _ => ItemSortBy::SortName,
        };
        let key = QueryKey {
            favorites: filters.favorites_only(),
            sort_by,
            sort_order,
            ..QueryKey::new(QueryKind::Artists, self.library_id().await?)
        };
        let fetcher = ArtistsFetcher {
            api,
            query: ArtistQuery {
                favorites: filters.favorites_only(),
                sort_by,
                sort_order,
            },
        };
        let limits = self.limits;
        let query = self
            .run_query(
                key,
                || InfiniteQuery::new(limits.library).with_max_pages(limits.library_max_pages),
                &fetcher,
                request,
            )
            .await?;
        Ok(LibraryView::from_query(&query, Some(sort_by)))
    }

    /// Genres, unsectioned
    pub async fn load_genres(&self, request: PageRequest) -> Result<LibraryView> {
        let result = async {
            let api = self.model.require_api().await?;
            let key = QueryKey::new(QueryKind::Genres, self.library_id().await?);
            let limits = self.limits;
            let query = self
                .run_query(
                    key,
                    || InfiniteQuery::new(limits.library).with_max_pages(limits.library_max_pages),
                    &GenresFetcher(api),
                    request,
                )
                .await?;
            Ok::<_, anyhow::Error>(LibraryView::from_query(&query, None))
        }
        .await;
        self.notify_on_error(result).await
    }

    /// Most played tracks, unsectioned
    pub async fn load_frequently_played(&self, request: PageRequest) -> Result<LibraryView> {
        let result = async {
            let api = self.model.require_api().await?;
            let key = QueryKey {
                sort_by: ItemSortBy::PlayCount,
                ..QueryKey::new(QueryKind::FrequentlyPlayed, self.library_id().await?)
            };
            let limits = self.limits;
            let query = self
                .run_query(
                    key,
                    || InfiniteQuery::new(limits.home).with_max_pages(limits.home_max_pages),
                    &FrequentlyPlayedFetcher(api),
                    request,
                )
                .await?;
            Ok::<_, anyhow::Error>(LibraryView::from_query(&query, None))
        }
        .await;
        self.notify_on_error(result).await
    }

    /// Artists of the most played tracks, by total play count
    pub async fn frequent_artists(&self) -> Result<Vec<NameIdPair>> {
        let view = self.load_frequently_played(PageRequest::Current).await?;
        let tracks: Vec<Item> = view.items().cloned().collect();
        Ok(aggregate_frequent_artists(&tracks))
    }

    pub async fn library_years(&self) -> Result<Vec<i32>> {
        let result = async { self.model.require_api().await?.fetch_library_years().await }.await;
        self.notify_on_error(result).await
    }

    pub async fn search(&self, term: &str) -> Result<SearchResults> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchResults::default());
        }
        let result = async { self.model.require_api().await?.search(term).await }.await;
        self.notify_on_error(result).await
    }

    pub async fn lyrics(&self, item_id: &str) -> Result<Vec<LyricLine>> {
        let result = async { self.model.require_api().await?.fetch_lyrics(item_id).await }.await;
        self.notify_on_error(result).await
    }

    /// Save the sort for a library tab. Cached queries stay valid since the
    /// sort is part of their key.
    pub async fn set_sort(&self, tab: LibraryTab, sort_by: ItemSortBy, descending: bool) -> Result<()> {
        {
            let mut prefs = self.model.preferences.write().await;
            let Some(slot) = prefs.sort_by.get_mut(tab) else {
                anyhow::bail!("{tab:?} have no saved sort");
            };
            *slot = Some(sort_by);
            if let Some(slot) = prefs.sort_descending.get_mut(tab) {
                *slot = descending;
            }
        }
        tracing::info!(?tab, %sort_by, descending, "Sort changed");
        self.model.save_preferences().await
    }

    /// Flip an item's favorite state on the server, then update the local
    /// cache and mark favorites-filtered lists of that kind stale.
    /// Returns the new state.
    pub async fn toggle_favorite(&self, item: &Item) -> Result<bool> {
        let currently = self
            .model
            .favorites
            .state(&item.id)
            .await
            .unwrap_or_else(|| item.is_favorite());
        let result = async {
            let api = self.model.require_api().await?;
            if currently {
                api.remove_favorite(&item.id).await
            } else {
                api.add_favorite(&item.id).await
            }
        }
        .await;

        let user_data = match result {
            Ok(user_data) => user_data,
            Err(e) => {
                tracing::error!(item_id = %item.id, error = %e, "Unable to toggle favorite");
                let text = if currently {
                    "Failed to remove favorite"
                } else {
                    "Failed to add favorite"
                };
                self.model.set_notice(NoticeLevel::Error, text).await;
                return Err(e);
            }
        };

        if user_data.is_favorite {
            self.model.favorites.add(item.id.clone()).await;
        } else {
            self.model.favorites.remove(&item.id).await;
        }
        if let Err(e) = self.model.favorites.save_to_store().await {
            tracing::warn!(error = %e, "Failed to persist favorites");
        }

        if let Some(kind) = favorites_kind(item.kind) {
            let library_id = self.library_id().await?;
            self.model.queries.lock().await.invalidate(|key| {
                key.kind == kind && key.favorites && key.library_id == library_id
            });
        }
        Ok(user_data.is_favorite)
    }

    /// Start playing `items` from `start` as a new queue
    pub async fn play_items(&self, queue_ref: QueueRef, items: Vec<Item>, start: usize) -> Result<()> {
        let tracks: Vec<QueueTrack> = match self.model.api().await {
            Some(api) => items
                .into_iter()
                .map(|item| {
                    let url = api.stream_url(&item.id);
                    QueueTrack::new(item, url, QueuingType::FromSelection)
                })
                .collect(),
            None => {
                let downloads = self.model.downloads.queue_tracks().await;
                items
                    .into_iter()
                    .filter_map(|item| downloads.iter().find(|track| track.id() == item.id).cloned())
                    .collect()
            }
        };
        if tracks.is_empty() {
            anyhow::bail!("Nothing to play");
        }
        let start = start.min(tracks.len() - 1);

        self.player.set_queue(tracks.clone()).await?;
        if start > 0 {
            self.player.skip(start).await?;
        }
        self.player.play().await?;

        {
            let mut state = self.model.queue.lock().await;
            state.set_queue_ref(queue_ref);
            state.set_queue(tracks, Some(start));
            state.clear_shuffle();
        }
        self.model.save_queue().await;
        Ok(())
    }

    /// Jump to `index` in the saved queue
    pub async fn skip_to(&self, index: usize) -> Result<()> {
        {
            let mut state = self.model.queue.lock().await;
            if index >= state.queue().len() {
                anyhow::bail!("No track at position {index}");
            }
            self.player.skip(index).await?;
            state.set_current_index(Some(index));
        }
        self.model.save_queue().await;
        Ok(())
    }
}
