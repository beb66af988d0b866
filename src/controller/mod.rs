//! Controller module - orchestration over the model and the player
//!
//! It is organized into submodules by responsibility:
//!
//! - `library`: Library tab loading, favorites, search and lyrics
//! - `shuffle`: Shuffle and deshuffle of the play queue

mod library;
mod shuffle;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Limits;
use crate::model::{AppModel, QueueRef};
use crate::player::MediaPlayer;

pub use library::{LibraryView, PageRequest};

/// Queue references with a shuffle or deshuffle currently running
#[derive(Clone, Default)]
struct InFlight {
    refs: Arc<Mutex<HashSet<QueueRef>>>,
}

/// Held while an operation on a queue reference runs; releases it on drop
struct InFlightGuard {
    refs: Arc<Mutex<HashSet<QueueRef>>>,
    queue_ref: QueueRef,
}

impl InFlight {
    fn try_acquire(&self, queue_ref: &QueueRef) -> Option<InFlightGuard> {
        let mut refs = self.refs.lock().unwrap_or_else(PoisonError::into_inner);
        refs.insert(queue_ref.clone()).then(|| InFlightGuard {
            refs: self.refs.clone(),
            queue_ref: queue_ref.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut refs = self.refs.lock().unwrap_or_else(PoisonError::into_inner);
        refs.remove(&self.queue_ref);
    }
}

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) player: Arc<dyn MediaPlayer>,
    limits: Limits,
    in_flight: InFlight,
}

impl AppController {
    pub fn new(model: Arc<AppModel>, player: Arc<dyn MediaPlayer>, limits: Limits) -> Self {
        Self {
            model,
            player,
            limits,
            in_flight: InFlight::default(),
        }
    }

    pub fn model(&self) -> &Arc<AppModel> {
        &self.model
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// User-facing text for a failed server call
    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        let status = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<reqwest::Error>())
            .and_then(reqwest::Error::status)
            .map(|status| status.as_u16());

        match status {
            Some(401) => "Session expired. Please sign in again.".to_string(),
            Some(403) => "You don't have access to this item.".to_string(),
            Some(404) => "Item not found on the server.".to_string(),
            Some(429) => "Rate limited. Please wait a moment.".to_string(),
            Some(code) if code >= 500 => format!("Server error ({code}). Try again later."),
            _ => format!("Error: {error:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_per_queue_ref_and_released_on_drop() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_acquire(&QueueRef::Library);
        assert!(guard.is_some());
        assert!(in_flight.try_acquire(&QueueRef::Library).is_none());
        assert!(in_flight.try_acquire(&QueueRef::Favorites).is_some());

        drop(guard);
        assert!(in_flight.try_acquire(&QueueRef::Library).is_some());
    }

    #[test]
    fn non_http_errors_keep_their_message() {
        let error = anyhow::anyhow!("Client instance not set");
        assert_eq!(AppController::format_error(&error), "Error: Client instance not set");
    }
}
