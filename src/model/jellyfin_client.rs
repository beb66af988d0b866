//! Jellyfin HTTP client with the item-fetch calls the library views need

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Datelike;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::content::SearchResults;
use super::formatting::build_years_param;
use super::item::{Item, ItemKind, ItemsPage, UserData};
use super::lyrics::{LyricLine, parse_lyrics};
use super::types::{ItemFilter, ItemSortBy, SortOrder};
use crate::config::{Config, Limits};
use crate::{log_server_call, log_server_outcome};

const SEARCH_LIMIT: usize = 25;

const TRACK_FIELDS: &str = "SortName";
const RANDOM_TRACK_FIELDS: &str = "MediaSources,ParentId,Path,SortName,Chapters";

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackQuery {
    pub favorites: bool,
    pub unplayed: bool,
    pub sort_by: ItemSortBy,
    pub sort_order: SortOrder,
    pub artist_id: Option<String>,
    pub genre_ids: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlbumQuery {
    pub favorites: bool,
    pub sort_by: ItemSortBy,
    pub sort_order: SortOrder,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArtistQuery {
    pub favorites: bool,
    pub sort_by: ItemSortBy,
    pub sort_order: SortOrder,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RandomQuery {
    pub favorites: bool,
    pub unplayed: bool,
    pub genre_ids: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub limit: usize,
}

/// Everything the client needs from the server
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// Music library (collection folder) this session browses
    fn library_id(&self) -> &str;

    /// Streaming URL for an audio item
    fn stream_url(&self, item_id: &str) -> String;

    async fn fetch_tracks(&self, page: usize, query: &TrackQuery) -> Result<Vec<Item>>;
    async fn fetch_albums(&self, page: usize, query: &AlbumQuery) -> Result<Vec<Item>>;
    async fn fetch_artists(&self, page: usize, query: &ArtistQuery) -> Result<Vec<Item>>;
    async fn fetch_genres(&self, page: usize) -> Result<Vec<Item>>;
    async fn fetch_frequently_played(&self, page: usize) -> Result<Vec<Item>>;
    /// Production years present in the library, ascending
    async fn fetch_library_years(&self) -> Result<Vec<i32>>;
    /// One random batch, not paginated
    async fn fetch_random_tracks(&self, query: &RandomQuery) -> Result<Vec<Item>>;
    async fn search(&self, term: &str) -> Result<SearchResults>;
    async fn add_favorite(&self, item_id: &str) -> Result<UserData>;
    async fn remove_favorite(&self, item_id: &str) -> Result<UserData>;
    async fn fetch_lyrics(&self, item_id: &str) -> Result<Vec<LyricLine>>;
}

type Params = Vec<(&'static str, String)>;

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn filters_param(favorites: bool, unplayed: bool) -> Option<String> {
    let filters: Vec<&str> = [
        favorites.then_some(ItemFilter::IsFavorite),
        unplayed.then_some(ItemFilter::IsUnplayed),
    ]
    .into_iter()
    .flatten()
    .map(ItemFilter::as_str)
    .collect();
    (!filters.is_empty()).then(|| filters.join(","))
}

/// Track sort names carry disc and track numbers, so sort tracks by name
fn track_sort(sort_by: ItemSortBy) -> ItemSortBy {
    match sort_by {
        ItemSortBy::SortName => ItemSortBy::Name,
        other => other,
    }
}

/// Album artists can only be listed by name
fn artist_sort(sort_by: ItemSortBy) -> ItemSortBy {
    match sort_by {
        ItemSortBy::Name | ItemSortBy::SortName => sort_by,
        _ => ItemSortBy::SortName,
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct LibraryFilters {
    years: Option<Vec<i32>>,
}

/// Jellyfin server session
#[derive(Clone)]
pub struct JellyfinClient {
    http: reqwest::Client,
    server_url: String,
    access_token: String,
    user_id: String,
    library_id: String,
    device_id: String,
    auth_header: String,
    limits: Limits,
}

impl JellyfinClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let device_id = config.device_id();
        let auth_header = format!(
            r#"MediaBrowser Client="{}", Device="{}", DeviceId="{}", Version="{}", Token="{}""#,
            config.client_name(),
            config.device_name(),
            device_id,
            env!("CARGO_PKG_VERSION"),
            config.access_token,
        );
        let http = reqwest::Client::builder()
            .user_agent(concat!("jellify-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            server_url: config.server_url().to_string(),
            access_token: config.access_token.clone(),
            user_id: config.user_id.clone(),
            library_id: config.library_id.clone(),
            device_id,
            auth_header,
            limits: config.limits,
        })
    }

    pub fn into_shared(self) -> Arc<dyn LibraryApi> {
        Arc::new(self)
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<T> {
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .query(params)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?
            .error_for_status()?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Unexpected response body from {path}"))
    }

    async fn send_user_data(&self, method: reqwest::Method, path: &str) -> Result<UserData> {
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?
            .error_for_status()?;
        Ok(response.json::<UserData>().await?)
    }

    fn paged(&self, page: usize, page_size: usize) -> Params {
        vec![
            ("UserId", self.user_id.clone()),
            ("ParentId", self.library_id.clone()),
            ("StartIndex", (page * page_size).to_string()),
            ("Limit", page_size.to_string()),
        ]
    }

    fn push_years(params: &mut Params, min: Option<i32>, max: Option<i32>) {
        if let Some(years) = build_years_param(min, max, current_year()) {
            params.push(("Years", join(&years)));
        }
    }

    async fn search_kind(&self, term: &str, kind: ItemKind) -> Result<Vec<Item>> {
        let kind = match kind {
            ItemKind::Audio => "Audio",
            ItemKind::MusicAlbum => "MusicAlbum",
            ItemKind::Playlist => "Playlist",
            _ => "MusicArtist",
        };
        let params: Params = vec![
            ("UserId", self.user_id.clone()),
            ("SearchTerm", term.to_string()),
            ("IncludeItemTypes", kind.to_string()),
            ("Recursive", "true".to_string()),
            ("Limit", SEARCH_LIMIT.to_string()),
        ];
        let page: ItemsPage = self.get_json("/Items", &params).await?;
        Ok(page.items)
    }
}

#[async_trait]
impl LibraryApi for JellyfinClient {
    fn library_id(&self) -> &str {
        &self.library_id
    }

    fn stream_url(&self, item_id: &str) -> String {
        format!(
            "{}/Audio/{}/universal?UserId={}&DeviceId={}&api_key={}",
            self.server_url, item_id, self.user_id, self.device_id, self.access_token
        )
    }

    async fn fetch_tracks(&self, page: usize, query: &TrackQuery) -> Result<Vec<Item>> {
        log_server_call!("fetch_tracks", page, sort_by = %query.sort_by);
        let mut params = self.paged(page, self.limits.library);
        params.extend([
            ("IncludeItemTypes", "Audio".to_string()),
            ("Recursive", "true".to_string()),
            ("SortBy", track_sort(query.sort_by).as_str().to_string()),
            ("SortOrder", query.sort_order.as_str().to_string()),
            ("Fields", TRACK_FIELDS.to_string()),
        ]);
        if let Some(filters) = filters_param(query.favorites, query.unplayed) {
            params.push(("Filters", filters));
        }
        if let Some(artist_id) = &query.artist_id {
            params.push(("ArtistIds", artist_id.clone()));
        }
        if !query.genre_ids.is_empty() {
            params.push(("GenreIds", join(&query.genre_ids)));
        }
        Self::push_years(&mut params, query.year_min, query.year_max);

        let result = self.get_json::<ItemsPage>("/Items", &params).await;
        log_server_outcome!("fetch_tracks", result);
        Ok(result?.items)
    }

    async fn fetch_albums(&self, page: usize, query: &AlbumQuery) -> Result<Vec<Item>> {
        log_server_call!("fetch_albums", page, sort_by = %query.sort_by);
        let mut params = self.paged(page, self.limits.library);
        params.extend([
            ("IncludeItemTypes", "MusicAlbum".to_string()),
            ("Recursive", "true".to_string()),
            ("SortBy", query.sort_by.as_str().to_string()),
            ("SortOrder", query.sort_order.as_str().to_string()),
            ("Fields", "SortName".to_string()),
        ]);
        if query.favorites {
            params.push(("IsFavorite", "true".to_string()));
        }
        Self::push_years(&mut params, query.year_min, query.year_max);

        let result = self.get_json::<ItemsPage>("/Items", &params).await;
        log_server_outcome!("fetch_albums", result);
        Ok(result?.items)
    }

    async fn fetch_artists(&self, page: usize, query: &ArtistQuery) -> Result<Vec<Item>> {
        log_server_call!("fetch_artists", page);
        let mut params = self.paged(page, self.limits.library);
        params.extend([
            ("SortBy", artist_sort(query.sort_by).as_str().to_string()),
            ("SortOrder", query.sort_order.as_str().to_string()),
            ("Fields", "SortName".to_string()),
        ]);
        if query.favorites {
            params.push(("IsFavorite", "true".to_string()));
        }

        let result = self.get_json::<ItemsPage>("/Artists/AlbumArtists", &params).await;
        log_server_outcome!("fetch_artists", result);
        Ok(result?.items)
    }

    async fn fetch_genres(&self, page: usize) -> Result<Vec<Item>> {
        log_server_call!("fetch_genres", page);
        let mut params = self.paged(page, self.limits.library);
        params.extend([
            ("SortBy", ItemSortBy::SortName.as_str().to_string()),
            ("SortOrder", SortOrder::Ascending.as_str().to_string()),
        ]);

        let result = self.get_json::<ItemsPage>("/Genres", &params).await;
        log_server_outcome!("fetch_genres", result);
        Ok(result?.items)
    }

    async fn fetch_frequently_played(&self, page: usize) -> Result<Vec<Item>> {
        log_server_call!("fetch_frequently_played", page);
        let mut params = self.paged(page, self.limits.home);
        params.extend([
            ("IncludeItemTypes", "Audio".to_string()),
            ("Recursive", "true".to_string()),
            ("SortBy", ItemSortBy::PlayCount.as_str().to_string()),
            ("SortOrder", SortOrder::Descending.as_str().to_string()),
        ]);

        let result = self.get_json::<ItemsPage>("/Items", &params).await;
        log_server_outcome!("fetch_frequently_played", result);
        Ok(result?.items)
    }

    async fn fetch_library_years(&self) -> Result<Vec<i32>> {
        let params: Params = vec![
            ("UserId", self.user_id.clone()),
            ("ParentId", self.library_id.clone()),
            ("IncludeItemTypes", "MusicAlbum".to_string()),
        ];
        let result = self.get_json::<LibraryFilters>("/Items/Filters", &params).await;
        log_server_outcome!("fetch_library_years", result);

        let mut years = result?.years.unwrap_or_default();
        years.retain(|year| *year > 0);
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    async fn fetch_random_tracks(&self, query: &RandomQuery) -> Result<Vec<Item>> {
        log_server_call!("fetch_random_tracks", limit = query.limit);
        let mut params: Params = vec![
            ("UserId", self.user_id.clone()),
            ("ParentId", self.library_id.clone()),
            ("IncludeItemTypes", "Audio".to_string()),
            ("Recursive", "true".to_string()),
            ("SortBy", ItemSortBy::Random.as_str().to_string()),
            ("Limit", query.limit.to_string()),
            ("Fields", RANDOM_TRACK_FIELDS.to_string()),
        ];
        if let Some(filters) = filters_param(query.favorites, query.unplayed) {
            params.push(("Filters", filters));
        }
        if !query.genre_ids.is_empty() {
            params.push(("GenreIds", join(&query.genre_ids)));
        }
        Self::push_years(&mut params, query.year_min, query.year_max);

        let result = self.get_json::<ItemsPage>("/Items", &params).await;
        log_server_outcome!("fetch_random_tracks", result);
        Ok(result?.items)
    }

    async fn search(&self, term: &str) -> Result<SearchResults> {
        log_server_call!("search", term);

        let (tracks, albums, artists, playlists) = futures::join!(
            self.search_kind(term, ItemKind::Audio),
            self.search_kind(term, ItemKind::MusicAlbum),
            self.search_kind(term, ItemKind::MusicArtist),
            self.search_kind(term, ItemKind::Playlist),
        );

        // A failed category leaves that category empty; only total failure is an error
        let mut first_error = None;
        let mut take = |result: Result<Vec<Item>>| match result {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Search category failed");
                first_error.get_or_insert(e);
                Vec::new()
            }
        };
        let mut results = SearchResults {
            tracks: take(tracks),
            albums: take(albums),
            artists: take(artists),
            playlists: take(playlists),
            ..Default::default()
        };

        if results.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        results.determine_best_match(term);
        Ok(results)
    }

    async fn add_favorite(&self, item_id: &str) -> Result<UserData> {
        log_server_call!("add_favorite", item_id);
        let path = format!("/Users/{}/FavoriteItems/{}", self.user_id, item_id);
        let result = self.send_user_data(reqwest::Method::POST, &path).await;
        log_server_outcome!("add_favorite", result);
        result
    }

    async fn remove_favorite(&self, item_id: &str) -> Result<UserData> {
        log_server_call!("remove_favorite", item_id);
        let path = format!("/Users/{}/FavoriteItems/{}", self.user_id, item_id);
        let result = self.send_user_data(reqwest::Method::DELETE, &path).await;
        log_server_outcome!("remove_favorite", result);
        result
    }

    async fn fetch_lyrics(&self, item_id: &str) -> Result<Vec<LyricLine>> {
        let path = format!("/Audio/{item_id}/Lyrics");
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(item_id, "No lyrics for item");
            return Ok(Vec::new());
        }
        let raw = response.error_for_status()?.text().await?;
        Ok(parse_lyrics(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_comma_joined() {
        assert_eq!(filters_param(false, false), None);
        assert_eq!(filters_param(true, false).as_deref(), Some("IsFavorite"));
        assert_eq!(filters_param(true, true).as_deref(), Some("IsFavorite,IsUnplayed"));
    }

    #[test]
    fn sort_rewrites() {
        assert_eq!(track_sort(ItemSortBy::SortName), ItemSortBy::Name);
        assert_eq!(track_sort(ItemSortBy::Album), ItemSortBy::Album);
        assert_eq!(artist_sort(ItemSortBy::DateCreated), ItemSortBy::SortName);
        assert_eq!(artist_sort(ItemSortBy::Name), ItemSortBy::Name);
    }

    #[test]
    fn stream_url_and_auth_header_carry_session() {
        let config = Config::parse(
            r#"
            server_url = "http://host:8096/"
            access_token = "tok"
            user_id = "u1"
            library_id = "lib"
            device_id = "dev"
            "#,
        )
        .unwrap();
        let client = JellyfinClient::from_config(&config).unwrap();

        assert_eq!(
            client.stream_url("abc"),
            "http://host:8096/Audio/abc/universal?UserId=u1&DeviceId=dev&api_key=tok"
        );
        assert!(client.auth_header.starts_with("MediaBrowser Client=\"jellify-rs\""));
        assert!(client.auth_header.contains("Token=\"tok\""));
    }

    #[test]
    fn paging_uses_offset_and_limit() {
        let config = Config::parse(
            "server_url = \"http://h\"\naccess_token = \"t\"\nuser_id = \"u\"\nlibrary_id = \"l\"",
        )
        .unwrap();
        let client = JellyfinClient::from_config(&config).unwrap();
        let params = client.paged(3, 100);
        assert!(params.contains(&("StartIndex", "300".to_string())));
        assert!(params.contains(&("Limit", "100".to_string())));
    }
}
