//! Display helpers and small aggregations over items

use super::item::{Item, NameIdPair};

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const SEPARATOR: &str = " • ";

const ADULT_RATINGS: &[&str] = &[
    "R", "NC-17", "TV-MA", "TV-X", "TV-AO", "21", "XXX", "BANNED", "X", "AO",
];

/// Artist caption, optionally prefixed with a release year or date
pub fn format_artist_name(name: Option<&str>, release: Option<&str>) -> String {
    let name = name.filter(|name| !name.is_empty()).unwrap_or(UNKNOWN_ARTIST);
    match release.filter(|release| !release.is_empty()) {
        Some(release) => format!("{release}{SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

pub fn format_artist_names(names: &[String]) -> String {
    if names.is_empty() {
        return UNKNOWN_ARTIST.to_string();
    }
    names
        .iter()
        .map(|name| format_artist_name(Some(name.as_str()), None))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn normalize_rating(rating: &str) -> String {
    rating
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether an item's rating marks it as adult content.
/// The official rating wins over the custom one when both are present.
pub fn is_explicit(item: &Item) -> bool {
    let rating = item
        .official_rating
        .as_deref()
        .filter(|rating| !rating.is_empty())
        .or(item.custom_rating.as_deref());
    let Some(rating) = rating.map(normalize_rating) else {
        return false;
    };
    !rating.is_empty() && (ADULT_RATINGS.contains(&rating.as_str()) || rating.starts_with("TV-MA"))
}

/// Every year from `min` (default 0) to `max` (default `current_year`),
/// or None when neither bound is set or the range is empty.
pub fn build_years_param(min: Option<i32>, max: Option<i32>, current_year: i32) -> Option<Vec<i32>> {
    if min.is_none() && max.is_none() {
        return None;
    }
    let min = min.unwrap_or(0);
    let max = max.unwrap_or(current_year);
    if min > max {
        return None;
    }
    Some((min..=max).collect())
}

/// Album artists of `tracks` ranked by summed play count, highest first.
/// Tracks whose first album artist has no id are ignored.
pub fn aggregate_frequent_artists(tracks: &[Item]) -> Vec<NameIdPair> {
    let mut ranked: Vec<(NameIdPair, u64)> = Vec::new();
    for track in tracks {
        let Some(artist) = track.album_artists.first().filter(|artist| artist.id.is_some()) else {
            continue;
        };
        match ranked.iter_mut().find(|(existing, _)| existing.id == artist.id) {
            Some((_, count)) => *count += track.play_count(),
            None => ranked.push((artist.clone(), track.play_count())),
        }
    }
    // stable: ties keep first-seen order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().map(|(artist, _)| artist).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::UserData;

    #[test]
    fn artist_captions() {
        assert_eq!(format_artist_name(None, None), "Unknown Artist");
        assert_eq!(format_artist_name(Some("Björk"), Some("1997")), "1997 • Björk");
        assert_eq!(format_artist_names(&[]), "Unknown Artist");
        assert_eq!(format_artist_names(&["A".into(), "B".into()]), "A • B");
    }

    #[test]
    fn explicit_ratings() {
        let rated = |official: Option<&str>, custom: Option<&str>| Item {
            official_rating: official.map(String::from),
            custom_rating: custom.map(String::from),
            ..Default::default()
        };
        assert!(is_explicit(&rated(Some("tv-ma l"), None)));
        assert!(is_explicit(&rated(Some("TV-MA-D"), None)));
        assert!(is_explicit(&rated(None, Some("XXX"))));
        assert!(is_explicit(&rated(Some(""), Some("R"))));
        assert!(!is_explicit(&rated(Some("PG-13"), Some("R"))));
        assert!(!is_explicit(&Item::default()));
    }

    #[test]
    fn years_param() {
        assert_eq!(build_years_param(None, None, 2026), None);
        assert_eq!(build_years_param(Some(2024), None, 2026), Some(vec![2024, 2025, 2026]));
        assert_eq!(build_years_param(Some(5), Some(3), 2026), None);
        assert_eq!(build_years_param(None, Some(1), 2026).map(|y| y.len()), Some(2));
    }

    #[test]
    fn frequent_artists_sum_play_counts() {
        let play = |artist: &str, count: u64| Item {
            album_artists: vec![NameIdPair { id: Some(artist.into()), name: Some(artist.into()) }],
            user_data: Some(UserData { play_count: count, ..Default::default() }),
            ..Default::default()
        };
        let tracks = vec![play("a", 3), play("b", 5), play("a", 4), Item::default()];
        let ranked: Vec<_> = aggregate_frequent_artists(&tracks)
            .into_iter()
            .filter_map(|artist| artist.id)
            .collect();
        assert_eq!(ranked, ["a", "b"]);
    }
}
