//! Local caches: favorite ids and the downloaded-track index

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::item::{Item, QueueTrack};
use super::types::{ItemSortBy, QueuingType, SortOrder};
use crate::storage::{DOWNLOADS_STORE_KEY, FAVORITES_STORE_KEY, KeyValueStore, KeyValueStoreExt};

/// Favorite item ids, so favorite state is known without asking the server
#[derive(Clone)]
pub struct FavoritesCache {
    favorite_ids: Arc<RwLock<HashSet<String>>>,
    /// Ids seen unfavorited this session
    cleared_ids: Arc<RwLock<HashSet<String>>>,
    store: Arc<dyn KeyValueStore>,
}

impl FavoritesCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            favorite_ids: Arc::new(RwLock::new(HashSet::new())),
            cleared_ids: Arc::new(RwLock::new(HashSet::new())),
            store,
        }
    }

    pub async fn load_from_store(&self) -> Result<()> {
        if let Some(ids) = self.store.get_json::<Vec<String>>(FAVORITES_STORE_KEY)? {
            *self.favorite_ids.write().await = ids.into_iter().collect();
        }
        Ok(())
    }

    pub async fn save_to_store(&self) -> Result<()> {
        let favorite_ids = self.favorite_ids.read().await;
        let mut ids: Vec<&String> = favorite_ids.iter().collect();
        ids.sort();
        self.store.set_json(FAVORITES_STORE_KEY, &ids)
    }

    pub async fn is_favorite(&self, item_id: &str) -> bool {
        self.favorite_ids.read().await.contains(item_id)
    }

    /// Known favorite state: `None` when this cache has no answer for the id
    pub async fn state(&self, item_id: &str) -> Option<bool> {
        if self.favorite_ids.read().await.contains(item_id) {
            Some(true)
        } else if self.cleared_ids.read().await.contains(item_id) {
            Some(false)
        } else {
            None
        }
    }

    pub async fn add(&self, item_id: String) {
        self.cleared_ids.write().await.remove(&item_id);
        self.favorite_ids.write().await.insert(item_id);
    }

    pub async fn remove(&self, item_id: &str) {
        self.favorite_ids.write().await.remove(item_id);
        self.cleared_ids.write().await.insert(item_id.to_string());
    }

    pub async fn snapshot(&self) -> HashSet<String> {
        self.favorite_ids.read().await.clone()
    }
}

/// A track stored on this device
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedTrack {
    pub item: Item,
    pub path: String,
}

impl DownloadedTrack {
    pub fn to_queue_track(&self) -> QueueTrack {
        QueueTrack::new(self.item.clone(), self.path.clone(), QueuingType::FromSelection)
    }
}

#[derive(Clone)]
pub struct DownloadIndex {
    tracks: Arc<RwLock<Vec<DownloadedTrack>>>,
    store: Arc<dyn KeyValueStore>,
}

impl DownloadIndex {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            tracks: Arc::new(RwLock::new(Vec::new())),
            store,
        }
    }

    pub async fn load_from_store(&self) -> Result<()> {
        if let Some(tracks) = self.store.get_json::<Vec<DownloadedTrack>>(DOWNLOADS_STORE_KEY)? {
            tracing::debug!(count = tracks.len(), "Loaded download index");
            *self.tracks.write().await = tracks;
        }
        Ok(())
    }

    pub async fn save_to_store(&self) -> Result<()> {
        let tracks = self.tracks.read().await;
        self.store.set_json(DOWNLOADS_STORE_KEY, &*tracks)
    }

    /// Insert or replace by item id
    pub async fn add(&self, track: DownloadedTrack) {
        let mut tracks = self.tracks.write().await;
        match tracks.iter_mut().find(|existing| existing.item.id == track.item.id) {
            Some(existing) => *existing = track,
            None => tracks.push(track),
        }
    }

    pub async fn remove(&self, item_id: &str) {
        self.tracks.write().await.retain(|track| track.item.id != item_id);
    }

    pub async fn len(&self) -> usize {
        self.tracks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tracks.read().await.is_empty()
    }

    pub async fn queue_tracks(&self) -> Vec<QueueTrack> {
        self.tracks
            .read()
            .await
            .iter()
            .map(DownloadedTrack::to_queue_track)
            .collect()
    }

    /// Downloaded items sorted locally the way the server would sort them
    pub async fn sorted_items(&self, sort_by: ItemSortBy, order: SortOrder) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .tracks
            .read()
            .await
            .iter()
            .map(|track| track.item.clone())
            .collect();
        items.sort_by(|a, b| compare_downloaded(a, b, sort_by, order));
        items
    }
}

enum SortValue<'a> {
    Text(&'a str),
    Number(i64),
}

fn timestamp(date: Option<&str>) -> i64 {
    date.and_then(|date| DateTime::parse_from_rfc3339(date).ok())
        .map_or(0, |date| date.timestamp_millis())
}

fn sort_value(item: &Item, sort_by: ItemSortBy) -> SortValue<'_> {
    match sort_by {
        ItemSortBy::Album => SortValue::Text(item.album.as_deref().unwrap_or("")),
        ItemSortBy::Artist => SortValue::Text(
            item.album_artist
                .as_deref()
                .or(item.artists.first().map(String::as_str))
                .unwrap_or(""),
        ),
        ItemSortBy::DateCreated => SortValue::Number(timestamp(item.date_created.as_deref())),
        ItemSortBy::PremiereDate => SortValue::Number(timestamp(item.premiere_date.as_deref())),
        ItemSortBy::PlayCount => SortValue::Number(i64::try_from(item.play_count()).unwrap_or(i64::MAX)),
        ItemSortBy::Runtime => SortValue::Number(item.run_time_ticks.unwrap_or(0)),
        _ => SortValue::Text(
            item.name
                .as_deref()
                .or(item.sort_name.as_deref())
                .unwrap_or(""),
        ),
    }
}

/// Ordering for downloaded tracks: text compares case-insensitively, dates
/// and counts numerically
pub fn compare_downloaded(a: &Item, b: &Item, sort_by: ItemSortBy, order: SortOrder) -> Ordering {
    let ordering = match (sort_value(a, sort_by), sort_value(b, sort_by)) {
        (SortValue::Number(a), SortValue::Number(b)) => a.cmp(&b),
        (SortValue::Text(a), SortValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        _ => Ordering::Equal,
    };
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::item_named;

    #[tokio::test]
    async fn state_is_unknown_until_seen() {
        let cache = FavoritesCache::new(Arc::new(MemoryStore::new()));
        assert_eq!(cache.state("x").await, None);
        cache.add("x".into()).await;
        assert_eq!(cache.state("x").await, Some(true));
        cache.remove("x").await;
        assert_eq!(cache.state("x").await, Some(false));
        assert!(!cache.is_favorite("x").await);
    }

    #[tokio::test]
    async fn favorites_persist_through_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = FavoritesCache::new(store.clone());
        cache.add("b".into()).await;
        cache.add("a".into()).await;
        cache.remove("b").await;
        cache.save_to_store().await.unwrap();

        let reloaded = FavoritesCache::new(store);
        reloaded.load_from_store().await.unwrap();
        assert!(reloaded.is_favorite("a").await);
        assert!(!reloaded.is_favorite("b").await);
    }

    #[tokio::test]
    async fn downloads_replace_by_id_and_sort_locally() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let index = DownloadIndex::new(store);
        for name in ["beta", "Alpha", "gamma"] {
            index
                .add(DownloadedTrack { item: item_named(name), path: format!("/music/{name}") })
                .await;
        }
        index
            .add(DownloadedTrack { item: item_named("beta"), path: "/music/beta-v2".into() })
            .await;
        assert_eq!(index.len().await, 3);

        let names: Vec<String> = index
            .sorted_items(ItemSortBy::SortName, SortOrder::Ascending)
            .await
            .into_iter()
            .map(|item| item.display_name().to_string())
            .collect();
        assert_eq!(names, ["Alpha", "beta", "gamma"]);

        let queue = index.queue_tracks().await;
        assert!(queue.iter().any(|track| track.url == "/music/beta-v2"));
    }

    #[test]
    fn compares_dates_and_counts_numerically() {
        let mut older = item_named("b");
        older.date_created = Some("2020-01-01T00:00:00.0000000Z".into());
        let mut newer = item_named("a");
        newer.date_created = Some("2023-06-01T12:00:00Z".into());

        assert_eq!(
            compare_downloaded(&older, &newer, ItemSortBy::DateCreated, SortOrder::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_downloaded(&older, &newer, ItemSortBy::DateCreated, SortOrder::Descending),
            Ordering::Greater
        );
        assert_eq!(
            compare_downloaded(&older, &newer, ItemSortBy::PlayCount, SortOrder::Ascending),
            Ordering::Equal
        );
    }
}
