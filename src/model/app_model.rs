//! Application context holding every piece of shared client state

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tokio::sync::{Mutex, RwLock};

use super::cache::{DownloadIndex, FavoritesCache};
use super::jellyfin_client::LibraryApi;
use super::pagination::QueryCache;
use super::queue::QueueState;
use super::settings::{AppSettings, LibraryPreferences};
use super::types::NoticeLevel;
use crate::storage::KeyValueStore;

/// How long a notice stays up before it is cleared automatically
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// A dismissable message for the user
#[derive(Clone, Debug)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub created: Instant,
}

/// Explicit context passed to everything that needs session, queue, or
/// preference state. Nothing here is process-global.
pub struct AppModel {
    api: RwLock<Option<Arc<dyn LibraryApi>>>,
    store: Arc<dyn KeyValueStore>,
    pub queue: Arc<Mutex<QueueState>>,
    pub preferences: Arc<RwLock<LibraryPreferences>>,
    pub settings: Arc<RwLock<AppSettings>>,
    pub favorites: FavoritesCache,
    pub downloads: DownloadIndex,
    pub queries: Arc<Mutex<QueryCache>>,
    notice: Arc<Mutex<Option<Notice>>>,
}

impl AppModel {
    /// Fresh context with defaults, not touching the store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api: RwLock::new(None),
            queue: Arc::new(Mutex::new(QueueState::default())),
            preferences: Arc::new(RwLock::new(LibraryPreferences::default())),
            settings: Arc::new(RwLock::new(AppSettings::default())),
            favorites: FavoritesCache::new(store.clone()),
            downloads: DownloadIndex::new(store.clone()),
            queries: Arc::new(Mutex::new(QueryCache::new())),
            notice: Arc::new(Mutex::new(None)),
            store,
        }
    }

    /// Context restored from the store. Preference migration happens here,
    /// once; unreadable caches are logged and start empty.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let model = Self::new(store.clone());
        *model.queue.lock().await = QueueState::load(store.as_ref());
        *model.preferences.write().await = LibraryPreferences::load(store.as_ref());
        *model.settings.write().await = AppSettings::load(store.as_ref());

        if let Err(e) = model.favorites.load_from_store().await {
            tracing::warn!(error = %e, "Failed to load favorites cache");
        }
        if let Err(e) = model.downloads.load_from_store().await {
            tracing::warn!(error = %e, "Failed to load download index");
        }
        model
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn set_api(&self, api: Arc<dyn LibraryApi>) {
        *self.api.write().await = Some(api);
    }

    pub async fn api(&self) -> Option<Arc<dyn LibraryApi>> {
        self.api.read().await.clone()
    }

    pub async fn require_api(&self) -> Result<Arc<dyn LibraryApi>> {
        self.api().await.ok_or_else(|| anyhow!("Client instance not set"))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub async fn save_queue(&self) {
        let queue = self.queue.lock().await;
        if let Err(e) = queue.save(self.store()) {
            tracing::warn!(error = %e, "Failed to persist queue");
        }
    }

    pub async fn save_preferences(&self) -> Result<()> {
        self.preferences.read().await.save(self.store())
    }

    pub async fn save_settings(&self) -> Result<()> {
        self.settings.read().await.save(self.store())
    }

    // ========================================================================
    // Notices
    // ========================================================================

    pub async fn set_notice(&self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Info => tracing::info!(notice = %text, "Notice"),
            NoticeLevel::Error => tracing::warn!(notice = %text, "Error notice"),
        }
        *self.notice.lock().await = Some(Notice {
            level,
            text,
            created: Instant::now(),
        });
    }

    /// The pending notice, dropped once it is older than the display TTL
    pub async fn notice(&self) -> Option<Notice> {
        let mut notice = self.notice.lock().await;
        if notice
            .as_ref()
            .is_some_and(|notice| notice.created.elapsed() > NOTICE_TTL)
        {
            *notice = None;
        }
        notice.clone()
    }
}
