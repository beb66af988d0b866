//! Search results

use super::item::Item;

/// Result category shown first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchSection {
    #[default]
    Tracks,
    Artists,
    Albums,
    Playlists,
}

#[derive(Clone, Debug, Default)]
pub struct SearchResults {
    pub tracks: Vec<Item>,
    pub albums: Vec<Item>,
    pub artists: Vec<Item>,
    pub playlists: Vec<Item>,
    pub best_match: SearchSection,
}

/// Exact, prefix, and substring match weights for one category
struct Weights {
    exact: u32,
    prefix: u32,
    contains: u32,
}

impl Weights {
    fn score(&self, candidate: &str, query: &str) -> u32 {
        let candidate = candidate.to_lowercase();
        if candidate == query {
            self.exact
        } else if candidate.starts_with(query) {
            self.prefix
        } else if candidate.contains(query) {
            self.contains
        } else {
            0
        }
    }
}

const ARTIST_WEIGHTS: Weights = Weights { exact: 100, prefix: 80, contains: 60 };
const TRACK_WEIGHTS: Weights = Weights { exact: 95, prefix: 75, contains: 55 };
const ALBUM_WEIGHTS: Weights = Weights { exact: 85, prefix: 65, contains: 45 };
const PLAYLIST_WEIGHTS: Weights = Weights { exact: 80, prefix: 60, contains: 40 };

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
            && self.albums.is_empty()
            && self.artists.is_empty()
            && self.playlists.is_empty()
    }

    /// Pick the category whose top hit best matches `query`
    pub fn determine_best_match(&mut self, query: &str) {
        let query = query.to_lowercase();
        let top_name = |items: &[Item]| items.first().map(|item| item.display_name().to_string());

        let artist_score = top_name(&self.artists).map_or(0, |name| ARTIST_WEIGHTS.score(&name, &query));
        let album_score = top_name(&self.albums).map_or(0, |name| ALBUM_WEIGHTS.score(&name, &query));
        let playlist_score =
            top_name(&self.playlists).map_or(0, |name| PLAYLIST_WEIGHTS.score(&name, &query));
        // a track also matches on its artist
        let track_score = self.tracks.first().map_or(0, |track| {
            let by_name = TRACK_WEIGHTS.score(track.display_name(), &query);
            let by_artist = track
                .primary_artist()
                .map_or(0, |artist| TRACK_WEIGHTS.score(artist, &query));
            by_name.max(by_artist)
        });

        let best = artist_score.max(album_score).max(playlist_score).max(track_score);

        self.best_match = if best == 0 {
            if !self.tracks.is_empty() {
                SearchSection::Tracks
            } else if !self.artists.is_empty() {
                SearchSection::Artists
            } else if !self.albums.is_empty() {
                SearchSection::Albums
            } else {
                SearchSection::Playlists
            }
        } else if artist_score == best {
            SearchSection::Artists
        } else if album_score == best {
            SearchSection::Albums
        } else if playlist_score == best {
            SearchSection::Playlists
        } else {
            SearchSection::Tracks
        };
    }
}
