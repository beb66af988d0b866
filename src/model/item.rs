//! Server item records and queue entries

use serde::{Deserialize, Deserializer, Serialize};

use super::types::QueuingType;

/// Ticks per second in Jellyfin's 100ns time unit
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Kind of media entity an [`Item`] describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemKind {
    Audio,
    MusicAlbum,
    MusicArtist,
    MusicGenre,
    Genre,
    Playlist,
    #[default]
    #[serde(other)]
    Other,
}

/// Id + name reference embedded in items (album artists, genres)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NameIdPair {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Per-user state attached to an item
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserData {
    pub is_favorite: bool,
    pub play_count: u64,
    pub played: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaSource {
    pub id: Option<String>,
    pub container: Option<String>,
    pub bitrate: Option<u32>,
}

/// A read-only copy of a server-side media entity.
///
/// Only the fields this client reads are modelled; anything else in the
/// payload is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Item {
    pub id: String,
    pub name: Option<String>,
    pub sort_name: Option<String>,
    #[serde(rename = "Type")]
    pub kind: ItemKind,
    pub album: Option<String>,
    pub album_id: Option<String>,
    pub album_artist: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub artists: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub album_artists: Vec<NameIdPair>,
    pub production_year: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub date_created: Option<String>,
    pub premiere_date: Option<String>,
    pub official_rating: Option<String>,
    pub custom_rating: Option<String>,
    pub user_data: Option<UserData>,
    #[serde(deserialize_with = "null_as_default")]
    pub media_sources: Vec<MediaSource>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Item {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled")
    }

    /// Album artist if set, otherwise the first track artist
    pub fn primary_artist(&self) -> Option<&str> {
        self.album_artist
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.artists
                    .first()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
            })
    }

    pub fn is_favorite(&self) -> bool {
        self.user_data.as_ref().is_some_and(|data| data.is_favorite)
    }

    pub fn play_count(&self) -> u64 {
        self.user_data.as_ref().map_or(0, |data| data.play_count)
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.run_time_ticks
            .map(|ticks| ticks as f64 / TICKS_PER_SECOND as f64)
    }
}

/// `/Items`-style response envelope
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsPage {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
    pub total_record_count: Option<u64>,
    pub start_index: Option<u64>,
}

/// An entry in the play queue: an item plus what the player needs to stream it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueTrack {
    pub item: Item,
    /// Stream URL, or a local file path for downloaded tracks
    pub url: String,
    pub container: Option<String>,
    pub bitrate: Option<u32>,
    pub queuing_type: QueuingType,
}

impl QueueTrack {
    pub fn new(item: Item, url: String, queuing_type: QueuingType) -> Self {
        let source = item.media_sources.first();
        let container = source.and_then(|s| s.container.clone());
        let bitrate = source.and_then(|s| s.bitrate);
        Self {
            item,
            url,
            container,
            bitrate,
            queuing_type,
        }
    }

    /// Queue identity is the wrapped item's id
    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn title(&self) -> &str {
        self.item.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_server_payload_with_nulls_and_unknown_fields() {
        let json = r#"{
            "Id": "t1",
            "Name": "Song",
            "Type": "Audio",
            "Artists": null,
            "AlbumArtists": [{"Id": "a1", "Name": "Band"}],
            "UserData": {"IsFavorite": true, "PlayCount": 3, "Played": true, "Key": "x"},
            "MediaSources": [{"Id": "m", "Container": "flac", "Bitrate": 900000}],
            "ServerId": "ignored"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();

        assert_eq!(item.kind, ItemKind::Audio);
        assert!(item.artists.is_empty());
        assert!(item.is_favorite());
        assert_eq!(item.play_count(), 3);
        assert_eq!(item.album_artists[0].name.as_deref(), Some("Band"));

        let track = QueueTrack::new(item, "http://x".into(), QueuingType::FromSelection);
        assert_eq!(track.container.as_deref(), Some("flac"));
        assert_eq!(track.id(), "t1");
    }

    #[test]
    fn unknown_item_type_maps_to_other() {
        let item: Item = serde_json::from_str(r#"{"Id": "x", "Type": "Book"}"#).unwrap();
        assert_eq!(item.kind, ItemKind::Other);
    }

    #[test]
    fn primary_artist_skips_blank_album_artist() {
        let item = Item {
            album_artist: Some("  ".into()),
            artists: vec![" Solo ".into()],
            ..Default::default()
        };
        assert_eq!(item.primary_artist(), Some("Solo"));
        assert_eq!(Item::default().primary_artist(), None);
    }
}
