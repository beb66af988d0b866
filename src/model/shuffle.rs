//! Queue reordering plans for shuffle and deshuffle
//!
//! Everything here is pure: a plan says what the queue should look like and
//! where the current track ends up. Driving the player is the controller's job.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use super::item::QueueTrack;
use super::settings::TabFilters;

/// Target queue order and the index the current track should occupy in it
#[derive(Clone, Debug, PartialEq)]
pub struct ShufflePlan {
    pub queue: Vec<QueueTrack>,
    pub current_index: usize,
}

impl ShufflePlan {
    pub fn current(&self) -> Option<&QueueTrack> {
        self.queue.get(self.current_index)
    }
}

/// Shuffle everything but the current track.
///
/// With tracks after the current one, the current track moves to the front
/// and the rest follow in random order. When the current track is last it
/// keeps its index and only the tracks before it are shuffled.
pub fn shuffle_upcoming<R: Rng + ?Sized>(
    queue: &[QueueTrack],
    current_index: usize,
    rng: &mut R,
) -> ShufflePlan {
    let Some(current) = queue.get(current_index) else {
        let mut shuffled = queue.to_vec();
        shuffled.shuffle(rng);
        return ShufflePlan { queue: shuffled, current_index: 0 };
    };

    let mut others: Vec<QueueTrack> = queue
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != current_index)
        .map(|(_, track)| track.clone())
        .collect();
    others.shuffle(rng);

    if current_index + 1 < queue.len() {
        let mut shuffled = Vec::with_capacity(queue.len());
        shuffled.push(current.clone());
        shuffled.extend(others);
        ShufflePlan { queue: shuffled, current_index: 0 }
    } else {
        others.insert(current_index, current.clone());
        ShufflePlan { queue: others, current_index }
    }
}

/// Put the current track into a freshly fetched batch.
///
/// If the batch already holds it, the batch is used as-is and playback stays
/// on that entry; otherwise it is prepended.
pub fn splice_current(batch: Vec<QueueTrack>, current: Option<&QueueTrack>) -> ShufflePlan {
    let Some(current) = current else {
        return ShufflePlan { queue: batch, current_index: 0 };
    };

    match batch.iter().position(|track| track.id() == current.id()) {
        Some(index) => ShufflePlan { queue: batch, current_index: index },
        None => {
            let mut queue = Vec::with_capacity(batch.len() + 1);
            queue.push(current.clone());
            queue.extend(batch);
            ShufflePlan { queue, current_index: 0 }
        }
    }
}

/// Pre-shuffle order with the index of the current track in it
pub fn restore_order(backup: &[QueueTrack], current: Option<&QueueTrack>) -> ShufflePlan {
    let found = current.and_then(|current| backup.iter().position(|track| track.id() == current.id()));
    match (found, current) {
        (Some(index), _) => ShufflePlan { queue: backup.to_vec(), current_index: index },
        (None, Some(current)) => {
            tracing::debug!(track = current.id(), "Current track missing from backup, prepending");
            let mut queue = Vec::with_capacity(backup.len() + 1);
            queue.push(current.clone());
            queue.extend_from_slice(backup);
            ShufflePlan { queue, current_index: 0 }
        }
        (None, None) => ShufflePlan { queue: backup.to_vec(), current_index: 0 },
    }
}

/// Random selection of downloaded tracks honoring the tracks-tab filters.
///
/// Year bounds default to 0 and `current_year`; tracks without a year are
/// dropped when any bound is set. Favorites are judged by `favorites`.
pub fn filter_downloads<R: Rng + ?Sized>(
    downloads: &[QueueTrack],
    filters: &TabFilters,
    favorites: &HashSet<String>,
    current_year: i32,
    cap: usize,
    rng: &mut R,
) -> Vec<QueueTrack> {
    let min = filters.year_min.unwrap_or(0);
    let max = filters.year_max.unwrap_or(current_year);

    let mut selected: Vec<QueueTrack> = downloads
        .iter()
        .filter(|track| {
            !filters.has_year_range()
                || track
                    .item
                    .production_year
                    .is_some_and(|year| year >= min && year <= max)
        })
        .filter(|track| !filters.favorites_only() || favorites.contains(track.id()))
        .cloned()
        .collect();

    selected.shuffle(rng);
    selected.truncate(cap);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ids, track, tracks};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn current_moves_to_front_and_rest_is_a_permutation() {
        let queue = tracks(&["A", "B", "C", "D"]);
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..100 {
            let plan = shuffle_upcoming(&queue, 1, &mut rng);
            assert_eq!(plan.current_index, 0);
            assert_eq!(plan.current().map(QueueTrack::id), Some("B"));

            let mut rest = ids(&plan.queue[1..]);
            seen.insert(rest.clone());
            rest.sort();
            assert_eq!(rest, ["A", "C", "D"]);
        }
        assert!(seen.len() > 1, "100 shuffles produced a single order");
    }

    #[test]
    fn last_track_keeps_its_index() {
        let queue = tracks(&["A", "B", "C"]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let plan = shuffle_upcoming(&queue, 2, &mut rng);
            assert_eq!(plan.current_index, 2);
            assert_eq!(plan.queue[2].id(), "C");
            let mut before = ids(&plan.queue[..2]);
            before.sort();
            assert_eq!(before, ["A", "B"]);
        }
    }

    #[test]
    fn splice_keeps_batch_when_current_is_in_it() {
        let batch = tracks(&["X", "C", "Y"]);
        let plan = splice_current(batch.clone(), Some(&track("C")));
        assert_eq!(plan.queue, batch);
        assert_eq!(plan.current_index, 1);
    }

    #[test]
    fn splice_prepends_missing_current() {
        let plan = splice_current(tracks(&["X", "Y"]), Some(&track("C")));
        assert_eq!(ids(&plan.queue), ["C", "X", "Y"]);
        assert_eq!(plan.current_index, 0);

        let plan = splice_current(tracks(&["X"]), None);
        assert_eq!(ids(&plan.queue), ["X"]);
    }

    #[test]
    fn restore_finds_current_in_backup() {
        let backup = tracks(&["A", "B", "C", "D"]);
        let plan = restore_order(&backup, Some(&track("C")));
        assert_eq!(plan.queue, backup);
        assert_eq!(plan.current_index, 2);

        let plan = restore_order(&backup, Some(&track("Z")));
        assert_eq!(ids(&plan.queue), ["Z", "A", "B", "C", "D"]);
        assert_eq!(plan.current_index, 0);
    }

    #[test]
    fn downloads_filtered_by_year_and_favorites_then_capped() {
        let mut downloads = tracks(&["old", "new", "undated", "fav"]);
        downloads[0].item.production_year = Some(1970);
        downloads[1].item.production_year = Some(2020);
        downloads[3].item.production_year = Some(2021);

        let filters = TabFilters { year_min: Some(2000), ..Default::default() };
        let favorites = HashSet::from(["fav".to_string()]);
        let mut rng = StdRng::seed_from_u64(3);

        let mut picked = ids(&filter_downloads(&downloads, &filters, &favorites, 2026, 10, &mut rng));
        picked.sort();
        assert_eq!(picked, ["fav", "new"]);

        let favorites_only = TabFilters { is_favorites: Some(true), ..Default::default() };
        let picked = filter_downloads(&downloads, &favorites_only, &favorites, 2026, 10, &mut rng);
        assert_eq!(ids(&picked), ["fav"]);

        let capped = filter_downloads(&downloads, &TabFilters::default(), &favorites, 2026, 2, &mut rng);
        assert_eq!(capped.len(), 2);
    }
}
