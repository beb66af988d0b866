//! Shuffle and deshuffle of the play queue
//!
//! A queue moves between two states. Shuffling saves the order it replaces
//! and deshuffling puts that order back around whatever is playing. Library
//! queues have no meaningful order, so for them both operations fetch a new
//! random batch instead.
//!
//! Shuffling an already shuffled queue saves the shuffled order as the
//! backup, so a later deshuffle returns to the previous shuffle rather than
//! the original order.

use crate::error::ShuffleError;
use crate::model::jellyfin_client::{RandomQuery, current_year};
use crate::model::shuffle::{ShufflePlan, filter_downloads, restore_order, shuffle_upcoming, splice_current};
use crate::model::{LibraryTab, QueueRef, QueueTrack, QueuingType};

use super::AppController;

/// What the player looked like when the operation started
struct PlayerSnapshot {
    queue: Vec<QueueTrack>,
    index: Option<usize>,
    track: Option<QueueTrack>,
    position: f64,
}

impl AppController {
    /// Shuffle the current queue.
    ///
    /// With `keep_current`, the playing track keeps playing from the same
    /// position. Failures are also shown as a notice.
    pub async fn shuffle(&self, keep_current: bool) -> Result<(), ShuffleError> {
        let queue_ref = self.model.queue.lock().await.queue_ref().clone();
        tracing::info!(?queue_ref, keep_current, "Shuffle requested");

        let result = match self.in_flight.try_acquire(&queue_ref) {
            Some(_guard) => self.shuffle_unguarded(&queue_ref, keep_current).await,
            None => Err(ShuffleError::Busy),
        };
        self.finish(result).await
    }

    /// Restore the order the queue had before it was shuffled
    pub async fn deshuffle(&self) -> Result<(), ShuffleError> {
        let queue_ref = self.model.queue.lock().await.queue_ref().clone();
        tracing::info!(?queue_ref, "Deshuffle requested");

        let result = match self.in_flight.try_acquire(&queue_ref) {
            Some(_guard) if queue_ref.is_library() => self.shuffle_unguarded(&queue_ref, true).await,
            Some(_guard) => self.deshuffle_unguarded().await,
            None => Err(ShuffleError::Busy),
        };
        self.finish(result).await
    }

    async fn finish(&self, result: Result<(), ShuffleError>) -> Result<(), ShuffleError> {
        match &result {
            Ok(()) => self.model.save_queue().await,
            Err(e) => self.report(e).await,
        }
        result
    }

    async fn report(&self, error: &ShuffleError) {
        if error.is_precondition() {
            tracing::debug!(error = %error, "Shuffle precondition not met");
        } else {
            tracing::warn!(error = %error, "Shuffle did not complete");
        }
        self.model.set_notice(error.level(), error.to_string()).await;
    }

    async fn snapshot(&self, keep_current: bool) -> PlayerSnapshot {
        let queue = self.player.queue().await;
        let index = self.player.active_index().await;
        let track = if keep_current {
            self.player.active_track().await
        } else {
            None
        };
        let position = if track.is_some() {
            self.player.progress().await
        } else {
            0.0
        };
        PlayerSnapshot { queue, index, track, position }
    }

    async fn shuffle_unguarded(&self, queue_ref: &QueueRef, keep_current: bool) -> Result<(), ShuffleError> {
        let snapshot = self.snapshot(keep_current).await;

        if queue_ref.is_library() {
            match self.library_shuffle(&snapshot).await {
                Ok(true) => return Ok(()),
                Ok(false) => tracing::debug!("Random batch was empty, shuffling the current queue"),
                Err(e @ ShuffleError::NoDownloadedTracks) => return Err(e),
                // the player may already be half rebuilt, so the snapshot is stale
                Err(e @ ShuffleError::Player(_)) => return Err(e),
                Err(e) if snapshot.queue.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Library shuffle failed, shuffling the current queue");
                    self.report(&e).await;
                }
            }
        }

        self.regular_shuffle(snapshot).await
    }

    /// Replace the queue with a random batch from the library. Returns false
    /// when the batch came back empty.
    async fn library_shuffle(&self, snapshot: &PlayerSnapshot) -> Result<bool, ShuffleError> {
        let filters = self.model.preferences.read().await.filters(LibraryTab::Tracks);
        let cap = self.limits.library_shuffle;

        let batch: Vec<QueueTrack> = if filters.is_downloaded {
            let downloads = self.model.downloads.queue_tracks().await;
            if downloads.is_empty() {
                return Err(ShuffleError::NoDownloadedTracks);
            }
            let favorites = self.model.favorites.snapshot().await;
            let mut rng = rand::rng();
            filter_downloads(&downloads, &filters, &favorites, current_year(), cap, &mut rng)
        } else {
            let api = self.model.api().await.ok_or(ShuffleError::NotConnected)?;
            let query = RandomQuery {
                favorites: filters.favorites_only(),
                unplayed: filters.is_unplayed,
                genre_ids: filters.genre_ids.clone(),
                year_min: filters.year_min,
                year_max: filters.year_max,
                limit: cap,
            };
            let items = api
                .fetch_random_tracks(&query)
                .await
                .map_err(ShuffleError::Remote)?;
            items
                .into_iter()
                .map(|item| {
                    let url = api.stream_url(&item.id);
                    QueueTrack::new(item, url, QueuingType::FromSelection)
                })
                .collect()
        };

        if batch.is_empty() {
            return Ok(false);
        }
        tracing::debug!(count = batch.len(), "Fetched random batch");

        let plan = splice_current(batch, snapshot.track.as_ref());
        self.replace_queue(&plan).await.map_err(ShuffleError::Player)?;
        self.restore_position(snapshot.position).await;

        let mut state = self.model.queue.lock().await;
        state.set_queue(plan.queue.clone(), Some(plan.current_index));
        state.mark_shuffled(plan.queue);
        Ok(true)
    }

    async fn regular_shuffle(&self, snapshot: PlayerSnapshot) -> Result<(), ShuffleError> {
        if snapshot.queue.len() <= 1 {
            return Err(ShuffleError::NothingToShuffle);
        }
        let (Some(index), Some(_)) = (snapshot.index, snapshot.track.as_ref()) else {
            return Err(ShuffleError::NoTrackPlaying);
        };

        let plan = {
            let mut rng = rand::rng();
            shuffle_upcoming(&snapshot.queue, index, &mut rng)
        };
        self.rebuild_around_current(index, &plan)
            .await
            .map_err(ShuffleError::Player)?;
        self.restore_position(snapshot.position).await;

        let mut state = self.model.queue.lock().await;
        state.set_queue(plan.queue, Some(plan.current_index));
        state.mark_shuffled(snapshot.queue);
        tracing::info!(index = state.current_index(), "Queue shuffled");
        Ok(())
    }

    async fn deshuffle_unguarded(&self) -> Result<(), ShuffleError> {
        let backup = {
            let state = self.model.queue.lock().await;
            if !state.is_shuffled() || state.unshuffled().is_empty() {
                return Err(ShuffleError::NothingToDeshuffle);
            }
            state.unshuffled().to_vec()
        };
        let Some(index) = self.player.active_index().await else {
            return Err(ShuffleError::NoTrackPlaying);
        };
        let current = self.player.active_track().await;

        let plan = restore_order(&backup, current.as_ref());
        self.rebuild_around_current(index, &plan)
            .await
            .map_err(ShuffleError::Player)?;

        let mut state = self.model.queue.lock().await;
        state.set_queue(plan.queue, Some(plan.current_index));
        state.clear_shuffle();
        tracing::info!(index = state.current_index(), "Queue deshuffled");
        Ok(())
    }

    /// Rearrange the player queue into `plan` without interrupting the
    /// active track at `active_index`.
    async fn rebuild_around_current(&self, active_index: usize, plan: &ShufflePlan) -> anyhow::Result<()> {
        let rest = without_index(&plan.queue, plan.current_index);

        self.player.move_track(active_index, 0).await?;
        self.player.remove_upcoming().await?;
        self.player.add(rest).await?;
        if plan.current_index > 0 {
            self.player.move_track(0, plan.current_index).await?;
        }
        Ok(())
    }

    /// Replace the player queue with `plan`, starting at its current entry
    async fn replace_queue(&self, plan: &ShufflePlan) -> anyhow::Result<()> {
        let start = plan.queue[plan.current_index].clone();
        let rest = without_index(&plan.queue, plan.current_index);

        self.player.remove_upcoming().await?;
        self.player.set_queue(vec![start]).await?;
        self.player.add(rest).await?;
        if plan.current_index > 0 {
            self.player.move_track(0, plan.current_index).await?;
            self.player.skip(plan.current_index).await?;
        }
        Ok(())
    }

    async fn restore_position(&self, position: f64) {
        if position > 0.0 {
            if let Err(e) = self.player.seek_to(position).await {
                tracing::warn!(error = %e, position, "Failed to restore playback position");
            }
        }
    }
}

fn without_index(queue: &[QueueTrack], index: usize) -> Vec<QueueTrack> {
    queue
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, track)| track.clone())
        .collect()
}
