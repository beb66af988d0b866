//! Persisted play-queue state

use serde::{Deserialize, Serialize};

use super::item::QueueTrack;
use super::types::QueueRef;
use crate::storage::{KeyValueStore, KeyValueStoreExt, QUEUE_STORE_KEY};

/// The queue as this client last arranged it.
///
/// `current_index`, when set, always points into `queue`. `unshuffled` holds
/// the pre-shuffle order and is only non-empty while `shuffled` is true.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueState {
    queue_ref: QueueRef,
    queue: Vec<QueueTrack>,
    current_index: Option<usize>,
    shuffled: bool,
    unshuffled: Vec<QueueTrack>,
}

impl QueueState {
    pub fn new(queue_ref: QueueRef, queue: Vec<QueueTrack>, current_index: Option<usize>) -> Self {
        let mut state = Self {
            queue_ref,
            ..Default::default()
        };
        state.set_queue(queue, current_index);
        state
    }

    pub fn queue_ref(&self) -> &QueueRef {
        &self.queue_ref
    }

    pub fn set_queue_ref(&mut self, queue_ref: QueueRef) {
        self.queue_ref = queue_ref;
    }

    pub fn queue(&self) -> &[QueueTrack] {
        &self.queue
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&QueueTrack> {
        self.current_index.and_then(|index| self.queue.get(index))
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn unshuffled(&self) -> &[QueueTrack] {
        &self.unshuffled
    }

    /// Replace the queue. An out-of-range index is dropped.
    pub fn set_queue(&mut self, queue: Vec<QueueTrack>, current_index: Option<usize>) {
        self.queue = queue;
        self.current_index = current_index.filter(|index| *index < self.queue.len());
    }

    /// Returns false (and leaves the index alone) when out of range
    pub fn set_current_index(&mut self, index: Option<usize>) -> bool {
        match index {
            Some(index) if index >= self.queue.len() => false,
            _ => {
                self.current_index = index;
                true
            }
        }
    }

    /// Enter the shuffled state, keeping `backup` for a later deshuffle
    pub fn mark_shuffled(&mut self, backup: Vec<QueueTrack>) {
        self.shuffled = true;
        self.unshuffled = backup;
    }

    pub fn clear_shuffle(&mut self) {
        self.shuffled = false;
        self.unshuffled.clear();
    }

    /// Load the persisted queue; anything unreadable yields an empty queue
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get_json::<QueueState>(QUEUE_STORE_KEY) {
            Ok(Some(mut state)) => {
                if state.current_index.is_some_and(|index| index >= state.queue.len()) {
                    tracing::warn!(
                        index = ?state.current_index,
                        len = state.queue.len(),
                        "Stored queue index out of range, clearing it"
                    );
                    state.current_index = None;
                }
                if !state.shuffled {
                    state.unshuffled.clear();
                }
                state
            }
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding stored queue");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> anyhow::Result<()> {
        store.set_json(QUEUE_STORE_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::tracks;

    #[test]
    fn index_is_kept_in_bounds() {
        let mut state = QueueState::new(QueueRef::Favorites, tracks(&["A", "B"]), Some(5));
        assert_eq!(state.current_index(), None);

        assert!(state.set_current_index(Some(1)));
        assert_eq!(state.current_track().map(QueueTrack::id), Some("B"));
        assert!(!state.set_current_index(Some(2)));
        assert_eq!(state.current_index(), Some(1));

        state.set_queue(tracks(&["C"]), Some(1));
        assert_eq!(state.current_index(), None);
    }

    #[test]
    fn persists_through_store() {
        let store = MemoryStore::new();
        let mut state = QueueState::new(QueueRef::Album("al".into()), tracks(&["A", "B", "C"]), Some(2));
        state.mark_shuffled(tracks(&["C", "B", "A"]));
        state.save(&store).unwrap();

        assert_eq!(QueueState::load(&store), state);
    }

    #[test]
    fn load_clamps_bad_index_and_survives_garbage() {
        let store = MemoryStore::new();
        store
            .set_raw(QUEUE_STORE_KEY, r#"{"queue": [], "currentIndex": 3, "shuffled": false}"#)
            .unwrap();
        let state = QueueState::load(&store);
        assert_eq!(state.current_index(), None);

        store.set_raw(QUEUE_STORE_KEY, "[[[").unwrap();
        assert_eq!(QueueState::load(&store), QueueState::default());
    }
}
