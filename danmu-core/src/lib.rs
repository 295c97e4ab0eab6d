//! DanMu Core Library
//!
//! This library provides the core data structures for DanMu overlays: timed
//! comment events and the time-sorted sequences the scheduler plays back.

pub mod event;
pub mod sequence;
pub mod style;

pub use event::{Category, CommentEvent, LaneGroup};
pub use sequence::CommentSequence;
pub use style::{Color, DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE};

/// Result type for danmu-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmu-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid start time {value} for comment {index}")]
    InvalidStartTime { index: usize, value: f64 },

    #[error("Invalid duration {value} for comment {index}")]
    InvalidDuration { index: usize, value: f64 },
}
