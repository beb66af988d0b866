//! Shared builders and a scripted server for unit tests

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::model::content::SearchResults;
use crate::model::jellyfin_client::{AlbumQuery, ArtistQuery, RandomQuery, TrackQuery};
use crate::model::lyrics::LyricLine;
use crate::model::{Item, ItemKind, LibraryApi, QueueTrack, QueuingType, UserData};

pub fn item_named(name: &str) -> Item {
    Item {
        id: name.to_string(),
        name: Some(name.to_string()),
        sort_name: Some(name.to_string()),
        kind: ItemKind::Audio,
        ..Default::default()
    }
}

pub fn items_named(names: &[&str]) -> Vec<Item> {
    names.iter().map(|name| item_named(name)).collect()
}

pub fn track(id: &str) -> QueueTrack {
    QueueTrack::new(item_named(id), format!("http://test/{id}"), QueuingType::FromSelection)
}

pub fn tracks(ids: &[&str]) -> Vec<QueueTrack> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn ids(tracks: &[QueueTrack]) -> Vec<String> {
    tracks.iter().map(|track| track.id().to_string()).collect()
}

/// In-memory server. Lists are served in pages of `page_size` (everything on
/// the first page when zero) and filters are ignored.
#[derive(Default)]
pub struct ScriptedApi {
    pub tracks: Vec<Item>,
    pub albums: Vec<Item>,
    pub artists: Vec<Item>,
    pub genres: Vec<Item>,
    pub frequently_played: Vec<Item>,
    pub years: Vec<i32>,
    pub random: Vec<Item>,
    pub fail_random: bool,
    pub page_size: usize,
    pub recorded_random: Mutex<Vec<RandomQuery>>,
    pub favorites: Mutex<HashSet<String>>,
}

impl ScriptedApi {
    pub fn with_random(names: &[&str]) -> Self {
        Self {
            random: items_named(names),
            ..Default::default()
        }
    }

    pub fn failing_random() -> Self {
        Self {
            fail_random: true,
            ..Default::default()
        }
    }

    pub fn random_queries(&self) -> Vec<RandomQuery> {
        self.recorded_random.lock().unwrap().clone()
    }

    fn page_of(&self, items: &[Item], page: usize) -> Vec<Item> {
        if self.page_size == 0 {
            return if page == 0 { items.to_vec() } else { Vec::new() };
        }
        items
            .iter()
            .skip(page * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect()
    }

    fn set_favorite(&self, item_id: &str, favorite: bool) -> UserData {
        let mut favorites = self.favorites.lock().unwrap();
        if favorite {
            favorites.insert(item_id.to_string());
        } else {
            favorites.remove(item_id);
        }
        UserData {
            is_favorite: favorite,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LibraryApi for ScriptedApi {
    fn library_id(&self) -> &str {
        "lib"
    }

    fn stream_url(&self, item_id: &str) -> String {
        format!("http://test/{item_id}")
    }

    async fn fetch_tracks(&self, page: usize, _query: &TrackQuery) -> Result<Vec<Item>> {
        Ok(self.page_of(&self.tracks, page))
    }

    async fn fetch_albums(&self, page: usize, _query: &AlbumQuery) -> Result<Vec<Item>> {
        Ok(self.page_of(&self.albums, page))
    }

    async fn fetch_artists(&self, page: usize, _query: &ArtistQuery) -> Result<Vec<Item>> {
        Ok(self.page_of(&self.artists, page))
    }

    async fn fetch_genres(&self, page: usize) -> Result<Vec<Item>> {
        Ok(self.page_of(&self.genres, page))
    }

    async fn fetch_frequently_played(&self, page: usize) -> Result<Vec<Item>> {
        Ok(self.page_of(&self.frequently_played, page))
    }

    async fn fetch_library_years(&self) -> Result<Vec<i32>> {
        Ok(self.years.clone())
    }

    async fn fetch_random_tracks(&self, query: &RandomQuery) -> Result<Vec<Item>> {
        self.recorded_random.lock().unwrap().push(query.clone());
        if self.fail_random {
            bail!("connection refused");
        }
        Ok(self.random.iter().take(query.limit).cloned().collect())
    }

    async fn search(&self, term: &str) -> Result<SearchResults> {
        let term = term.to_lowercase();
        let matching = |items: &[Item]| -> Vec<Item> {
            items
                .iter()
                .filter(|item| item.display_name().to_lowercase().contains(&term))
                .cloned()
                .collect()
        };
        let mut results = SearchResults {
            tracks: matching(&self.tracks),
            albums: matching(&self.albums),
            artists: matching(&self.artists),
            ..Default::default()
        };
        results.determine_best_match(&term);
        Ok(results)
    }

    async fn add_favorite(&self, item_id: &str) -> Result<UserData> {
        Ok(self.set_favorite(item_id, true))
    }

    async fn remove_favorite(&self, item_id: &str) -> Result<UserData> {
        Ok(self.set_favorite(item_id, false))
    }

    async fn fetch_lyrics(&self, _item_id: &str) -> Result<Vec<LyricLine>> {
        Ok(Vec::new())
    }
}
