//! Error types for queue operations.

use crate::model::NoticeLevel;

/// Why a shuffle or deshuffle request did not change the queue.
///
/// Every variant is non-fatal; the controller turns it into a dismissable notice.
#[derive(Debug, thiserror::Error)]
pub enum ShuffleError {
    #[error("Nothing to shuffle")]
    NothingToShuffle,

    #[error("No track currently playing")]
    NoTrackPlaying,

    #[error("No downloaded tracks available")]
    NoDownloadedTracks,

    #[error("Queue is not shuffled")]
    NothingToDeshuffle,

    #[error("Unable to fetch random tracks")]
    NotConnected,

    #[error("A shuffle is already in progress")]
    Busy,

    #[error("Failed to fetch random tracks: {0:#}")]
    Remote(anyhow::Error),

    #[error("Media player call failed: {0:#}")]
    Player(anyhow::Error),
}

impl ShuffleError {
    /// Severity used when the error is surfaced as a notice.
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::NotConnected | Self::Remote(_) | Self::Player(_) => NoticeLevel::Error,
            _ => NoticeLevel::Info,
        }
    }

    /// Precondition failures leave state untouched by construction.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NothingToShuffle
                | Self::NoTrackPlaying
                | Self::NoDownloadedTracks
                | Self::NothingToDeshuffle
        )
    }
}
