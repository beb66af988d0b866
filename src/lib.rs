//! Client-side core for browsing and playing a Jellyfin music library.
//!
//! - `model`: items, queue state, pagination, list sectioning, shuffle algorithms, settings
//! - `controller`: orchestration of library loading, favorites and shuffle/deshuffle
//! - `player`: the media-player seam playback is delegated to
//! - `storage`: JSON key-value persistence
//! - `config` / `logging`: ambient setup used by the `jellify` binary

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod model;
pub mod player;
pub mod storage;

#[cfg(test)]
mod test_fixtures;

pub use config::{Config, Limits};
pub use controller::AppController;
pub use error::ShuffleError;
pub use model::AppModel;
pub use player::{MediaPlayer, MemoryPlayer};
