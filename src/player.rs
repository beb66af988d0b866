//! Media player seam
//!
//! The queue controller never plays audio itself; it drives whatever
//! implements [`MediaPlayer`]. [`MemoryPlayer`] keeps the queue in memory and
//! is what the CLI and the tests use.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::QueueTrack;

#[async_trait]
pub trait MediaPlayer: Send + Sync {
    async fn queue(&self) -> Vec<QueueTrack>;
    async fn active_index(&self) -> Option<usize>;
    async fn active_track(&self) -> Option<QueueTrack>;
    /// Playback position of the active track, in seconds
    async fn progress(&self) -> f64;

    /// Replace the queue and make its first track active
    async fn set_queue(&self, tracks: Vec<QueueTrack>) -> Result<()>;
    /// Append to the end of the queue
    async fn add(&self, tracks: Vec<QueueTrack>) -> Result<()>;
    /// Drop everything after the active track
    async fn remove_upcoming(&self) -> Result<()>;
    /// Move one entry. The active index follows the active track.
    async fn move_track(&self, from: usize, to: usize) -> Result<()>;
    /// Make `index` the active track, from its start
    async fn skip(&self, index: usize) -> Result<()>;
    async fn seek_to(&self, position: f64) -> Result<()>;
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
}

/// A player call, as recorded by [`MemoryPlayer`]
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCall {
    SetQueue(Vec<String>),
    Add(Vec<String>),
    RemoveUpcoming,
    Move(usize, usize),
    Skip(usize),
    SeekTo(f64),
    Play,
    Pause,
}

#[derive(Default)]
struct PlayerState {
    queue: Vec<QueueTrack>,
    active: Option<usize>,
    position: f64,
    playing: bool,
    calls: Vec<PlayerCall>,
    /// Mutations still allowed before every call fails; unlimited when None
    allowed_mutations: Option<usize>,
}

impl PlayerState {
    fn record(&mut self, call: PlayerCall) -> Result<()> {
        match self.allowed_mutations {
            Some(0) => bail!("player rejected {call:?}"),
            Some(n) => self.allowed_mutations = Some(n - 1),
            None => {}
        }
        tracing::trace!(?call, "Player call");
        self.calls.push(call);
        Ok(())
    }
}

fn ids(tracks: &[QueueTrack]) -> Vec<String> {
    tracks.iter().map(|track| track.id().to_string()).collect()
}

/// In-memory player
#[derive(Clone, Default)]
pub struct MemoryPlayer {
    state: Arc<Mutex<PlayerState>>,
}

impl MemoryPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded queue with `active` playing at `position`
    pub async fn load(&self, queue: Vec<QueueTrack>, active: Option<usize>, position: f64) {
        let mut state = self.state.lock().await;
        state.active = active.filter(|index| *index < queue.len());
        state.queue = queue;
        state.position = position;
        state.playing = state.active.is_some();
    }

    pub async fn calls(&self) -> Vec<PlayerCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.playing
    }

    /// Make every mutating call fail from now on
    pub async fn fail_mutations(&self, fail: bool) {
        self.state.lock().await.allowed_mutations = fail.then_some(0);
    }

    /// Let `count` more mutating calls through, then fail the rest
    pub async fn fail_after(&self, count: usize) {
        self.state.lock().await.allowed_mutations = Some(count);
    }
}

#[async_trait]
impl MediaPlayer for MemoryPlayer {
    async fn queue(&self) -> Vec<QueueTrack> {
        self.state.lock().await.queue.clone()
    }

    async fn active_index(&self) -> Option<usize> {
        self.state.lock().await.active
    }

    async fn active_track(&self) -> Option<QueueTrack> {
        let state = self.state.lock().await;
        state.active.and_then(|index| state.queue.get(index).cloned())
    }

    async fn progress(&self) -> f64 {
        self.state.lock().await.position
    }

    async fn set_queue(&self, tracks: Vec<QueueTrack>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::SetQueue(ids(&tracks)))?;
        state.active = (!tracks.is_empty()).then_some(0);
        state.queue = tracks;
        state.position = 0.0;
        Ok(())
    }

    async fn add(&self, tracks: Vec<QueueTrack>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::Add(ids(&tracks)))?;
        state.queue.extend(tracks);
        Ok(())
    }

    async fn remove_upcoming(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::RemoveUpcoming)?;
        let keep = state.active.map_or(0, |index| index + 1);
        state.queue.truncate(keep);
        Ok(())
    }

    async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        let len = state.queue.len();
        if from >= len || to >= len {
            bail!("move {from} -> {to} out of range for queue of {len}");
        }
        state.record(PlayerCall::Move(from, to))?;

        let track = state.queue.remove(from);
        state.queue.insert(to, track);
        state.active = state.active.map(|active| {
            if active == from {
                to
            } else if from < active && active <= to {
                active - 1
            } else if to <= active && active < from {
                active + 1
            } else {
                active
            }
        });
        Ok(())
    }

    async fn skip(&self, index: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        if index >= state.queue.len() {
            bail!("skip to {index} out of range for queue of {}", state.queue.len());
        }
        state.record(PlayerCall::Skip(index))?;
        state.active = Some(index);
        state.position = 0.0;
        Ok(())
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::SeekTo(position))?;
        state.position = position;
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::Play)?;
        state.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(PlayerCall::Pause)?;
        state.playing = false;
        Ok(())
    }
}
