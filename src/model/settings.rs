//! Library preferences and app settings, with one-shot schema migration
//!
//! Library preferences are versioned. Older blobs (a single flat
//! `sortDescending` flag and two filter toggles per tab) are upgraded once,
//! when loaded, and the upgraded blob is written straight back.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ItemSortBy, LibraryTab, SortOrder};
use crate::storage::{KeyValueStore, KeyValueStoreExt, LIBRARY_STORE_KEY, SETTINGS_STORE_KEY};

pub const PREFERENCES_VERSION: u32 = 2;

/// One value per sortable library tab
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerTab<T> {
    pub tracks: T,
    pub albums: T,
    pub artists: T,
}

impl<T> PerTab<T> {
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            tracks: value.clone(),
            albums: value.clone(),
            artists: value,
        }
    }

    /// Playlists carry no preferences
    pub fn get(&self, tab: LibraryTab) -> Option<&T> {
        match tab {
            LibraryTab::Tracks => Some(&self.tracks),
            LibraryTab::Albums => Some(&self.albums),
            LibraryTab::Artists => Some(&self.artists),
            LibraryTab::Playlists => None,
        }
    }

    pub fn get_mut(&mut self, tab: LibraryTab) -> Option<&mut T> {
        match tab {
            LibraryTab::Tracks => Some(&mut self.tracks),
            LibraryTab::Albums => Some(&mut self.albums),
            LibraryTab::Artists => Some(&mut self.artists),
            LibraryTab::Playlists => None,
        }
    }
}

/// Filters applied to a library tab
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabFilters {
    pub is_favorites: Option<bool>,
    /// Tracks tab only
    pub is_downloaded: bool,
    pub is_unplayed: bool,
    pub genre_ids: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl TabFilters {
    pub fn favorites_only(&self) -> bool {
        self.is_favorites == Some(true)
    }

    pub fn has_year_range(&self) -> bool {
        self.year_min.is_some() || self.year_max.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryPreferences {
    pub version: u32,
    pub sort_by: PerTab<Option<ItemSortBy>>,
    pub sort_descending: PerTab<bool>,
    pub filters: PerTab<TabFilters>,
}

impl Default for LibraryPreferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            sort_by: PerTab::default(),
            sort_descending: PerTab::default(),
            filters: PerTab::default(),
        }
    }
}

/// Pre-versioning layout
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPreferences {
    sort_descending: bool,
    #[serde(default)]
    sort_by: Option<ItemSortBy>,
    #[serde(default)]
    filters: PerTab<TabFilters>,
}

impl From<LegacyPreferences> for LibraryPreferences {
    fn from(legacy: LegacyPreferences) -> Self {
        Self {
            version: PREFERENCES_VERSION,
            sort_by: PerTab::uniform(legacy.sort_by),
            sort_descending: PerTab::uniform(legacy.sort_descending),
            filters: legacy.filters,
        }
    }
}

/// Persisted stores may be wrapped as `{"state": {...}, "version": n}`
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("state").is_some_and(Value::is_object) => {
            map.remove("state").unwrap_or(Value::Null)
        }
        other => other,
    }
}

impl LibraryPreferences {
    pub fn sort_by(&self, tab: LibraryTab) -> ItemSortBy {
        self.sort_by.get(tab).copied().flatten().unwrap_or_default()
    }

    pub fn sort_order(&self, tab: LibraryTab) -> SortOrder {
        SortOrder::from_descending(self.sort_descending.get(tab).copied().unwrap_or(false))
    }

    pub fn filters(&self, tab: LibraryTab) -> TabFilters {
        self.filters.get(tab).cloned().unwrap_or_default()
    }

    /// Parse a stored blob of any known version. The flag is true when the
    /// blob was in an older layout and has been upgraded.
    pub fn parse(raw: &str) -> Result<(Self, bool)> {
        let value: Value = serde_json::from_str(raw).context("Library preferences are not JSON")?;
        let value = unwrap_envelope(value);

        let version = value.get("version").and_then(Value::as_u64);
        if version == Some(u64::from(PREFERENCES_VERSION)) {
            let prefs = serde_json::from_value(value).context("Malformed library preferences")?;
            return Ok((prefs, false));
        }

        if value.get("sortDescending").is_some_and(Value::is_boolean) {
            let legacy: LegacyPreferences =
                serde_json::from_value(value).context("Malformed legacy library preferences")?;
            return Ok((legacy.into(), true));
        }

        anyhow::bail!("Unrecognized library preferences layout (version {version:?})")
    }

    /// Load from the store, migrating and writing back older layouts
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get_raw(LIBRARY_STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read library preferences");
                return Self::default();
            }
        };

        match Self::parse(&raw) {
            Ok((prefs, migrated)) => {
                if migrated {
                    tracing::info!(version = PREFERENCES_VERSION, "Migrated library preferences");
                    if let Err(e) = prefs.save(store) {
                        tracing::warn!(error = %e, "Failed to write migrated library preferences");
                    }
                }
                prefs
            }
            Err(e) => {
                tracing::warn!(error = %e, "Resetting library preferences to defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set_json(LIBRARY_STORE_KEY, self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
    Oled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    #[default]
    Purple,
    Ocean,
    Forest,
    Sunset,
    Peanut,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub send_metrics: bool,
    pub hide_run_times: bool,
    pub reduced_haptics: bool,
    pub theme: Theme,
    pub color_preset: ColorPreset,
}

impl AppSettings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let parsed = store.get_json::<Value>(SETTINGS_STORE_KEY).and_then(|value| {
            value
                .map(|value| serde_json::from_value::<AppSettings>(unwrap_envelope(value)))
                .transpose()
                .context("Malformed app settings")
        });
        match parsed {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Resetting app settings to defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set_json(SETTINGS_STORE_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const LEGACY_BLOB: &str = r#"{
        "state": {
            "sortDescending": true,
            "filters": {
                "tracks": {"isFavorites": true, "isDownloaded": true},
                "albums": {"isFavorites": null},
                "artists": {}
            }
        },
        "version": 0
    }"#;

    #[test]
    fn migrates_legacy_blob_once_and_writes_it_back() {
        let store = MemoryStore::new();
        store.set_raw(LIBRARY_STORE_KEY, LEGACY_BLOB).unwrap();

        let prefs = LibraryPreferences::load(&store);
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.sort_order(LibraryTab::Albums), SortOrder::Descending);
        assert_eq!(prefs.sort_by(LibraryTab::Tracks), ItemSortBy::SortName);
        assert!(prefs.filters(LibraryTab::Tracks).favorites_only());
        assert!(prefs.filters(LibraryTab::Tracks).is_downloaded);
        assert!(!prefs.filters(LibraryTab::Albums).is_unplayed);

        let (reparsed, migrated) =
            LibraryPreferences::parse(&store.get_raw(LIBRARY_STORE_KEY).unwrap().unwrap()).unwrap();
        assert!(!migrated);
        assert_eq!(reparsed, prefs);
    }

    #[test]
    fn legacy_flat_sort_by_applies_to_every_tab() {
        let (prefs, migrated) =
            LibraryPreferences::parse(r#"{"sortDescending": false, "sortBy": "DateCreated"}"#).unwrap();
        assert!(migrated);
        assert_eq!(prefs.sort_by(LibraryTab::Artists), ItemSortBy::DateCreated);
        assert_eq!(prefs.sort_by(LibraryTab::Playlists), ItemSortBy::SortName);
    }

    #[test]
    fn malformed_or_unknown_blobs_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set_raw(LIBRARY_STORE_KEY, r#"{"version": 9}"#).unwrap();
        assert_eq!(LibraryPreferences::load(&store), LibraryPreferences::default());

        store.set_raw(LIBRARY_STORE_KEY, "nope").unwrap();
        assert_eq!(LibraryPreferences::load(&store), LibraryPreferences::default());
    }

    #[test]
    fn app_settings_accept_wrapped_blob() {
        let store = MemoryStore::new();
        store
            .set_raw(
                SETTINGS_STORE_KEY,
                r#"{"state": {"theme": "oled", "colorPreset": "peanut", "hideRunTimes": true}, "version": 0}"#,
            )
            .unwrap();
        let settings = AppSettings::load(&store);
        assert_eq!(settings.theme, Theme::Oled);
        assert_eq!(settings.color_preset, ColorPreset::Peanut);
        assert!(settings.hide_run_times);
        assert!(!settings.send_metrics);
    }
}
