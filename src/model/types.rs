//! Core type definitions shared across the client

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-side sort keys understood by `/Items`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemSortBy {
    #[default]
    SortName,
    Name,
    Album,
    Artist,
    DateCreated,
    PlayCount,
    PremiereDate,
    Runtime,
    Random,
}

impl ItemSortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SortName => "SortName",
            Self::Name => "Name",
            Self::Album => "Album",
            Self::Artist => "Artist",
            Self::DateCreated => "DateCreated",
            Self::PlayCount => "PlayCount",
            Self::PremiereDate => "PremiereDate",
            Self::Runtime => "Runtime",
            Self::Random => "Random",
        }
    }
}

impl FromStr for ItemSortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::SortName,
            Self::Name,
            Self::Album,
            Self::Artist,
            Self::DateCreated,
            Self::PlayCount,
            Self::PremiereDate,
            Self::Runtime,
            Self::Random,
        ]
        .into_iter()
        .find(|sort_by| sort_by.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown sort key: {s}"))
    }
}

impl fmt::Display for ItemSortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_descending(descending: bool) -> Self {
        if descending { Self::Descending } else { Self::Ascending }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }
}

/// Server-side item filters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemFilter {
    IsFavorite,
    IsUnplayed,
}

impl ItemFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsFavorite => "IsFavorite",
            Self::IsUnplayed => "IsUnplayed",
        }
    }
}

/// Library tabs that carry their own sort and filter preferences
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryTab {
    Tracks,
    Albums,
    Artists,
    Playlists,
}

impl FromStr for LibraryTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tracks" => Ok(Self::Tracks),
            "albums" => Ok(Self::Albums),
            "artists" => Ok(Self::Artists),
            "playlists" => Ok(Self::Playlists),
            _ => Err(format!("unknown library tab: {s}")),
        }
    }
}

/// Semantic source of the current play queue
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum QueueRef {
    /// Everything in the library matching the current track filters
    Library,
    Favorites,
    Playlist(String),
    Album(String),
    Artist(String),
    Search,
    #[default]
    Unknown,
}

impl QueueRef {
    pub fn is_library(&self) -> bool {
        matches!(self, Self::Library)
    }
}

/// How a track ended up in the queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueuingType {
    DirectlyQueued,
    PlayingNext,
    #[default]
    FromSelection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}
