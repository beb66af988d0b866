//! Model module - client state and data types
//!
//! Organized into submodules by responsibility:
//!
//! - `types`: Core enums (sort keys, filters, queue references)
//! - `item`: Server items and queue entries
//! - `jellyfin_client`: Jellyfin API client and the `LibraryApi` seam
//! - `pagination`: Infinite-query page cache
//! - `sections`: Alphabetical list flattening and jump-to-letter
//! - `queue`: Persisted play-queue state
//! - `shuffle`: Shuffle and deshuffle plans
//! - `settings`: Versioned library preferences and app settings
//! - `cache`: Favorites and downloaded tracks
//! - `lyrics`, `formatting`, `content`: Display helpers and search results
//! - `app_model`: The application context tying it all together

pub mod types;
pub mod item;
pub mod jellyfin_client;
pub mod pagination;
pub mod sections;
pub mod queue;
pub mod shuffle;
pub mod settings;
pub mod cache;
pub mod lyrics;
pub mod formatting;
pub mod content;
mod app_model;

pub use types::{
    ItemFilter, ItemSortBy, LibraryTab, NoticeLevel, QueueRef, QueuingType, SortOrder,
};

pub use item::{Item, ItemKind, ItemsPage, QueueTrack, UserData};

pub use jellyfin_client::{JellyfinClient, LibraryApi};

pub use pagination::{InfiniteQuery, PageFetcher, QueryCache, QueryKey, QueryKind};

pub use sections::{ListEntry, SectionMode};

pub use queue::QueueState;

pub use settings::{AppSettings, LibraryPreferences, TabFilters};

pub use cache::{DownloadIndex, DownloadedTrack, FavoritesCache};

pub use content::{SearchResults, SearchSection};

pub use app_model::{AppModel, Notice, NOTICE_TTL};
