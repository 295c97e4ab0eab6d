//! DanMu Scheduler Library
//!
//! This library plays back a [`danmu_core::CommentSequence`] on top of a
//! display: it keeps the playback clock, sheds comments under load, assigns
//! each admitted comment a lane and manages the pooled renderer handles for
//! its lifetime. Rendering itself goes through the [`render`] capability
//! traits.

pub mod admission;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod headless;
pub mod lanes;
pub mod pool;
pub mod render;
pub mod time;

pub use admission::AdmissionController;
pub use clock::PlaybackClock;
pub use config::{LaneLayout, PlaybackSettings, SchedulerConfig, ScreenGeometry};
pub use dispatcher::{
    ActiveComment, CommentDispatcher, CommentState, DispatchStats, ResourceUsage, TickReport,
};
pub use headless::HeadlessRenderer;
pub use lanes::LaneAllocator;
pub use pool::{Pool, ResourcePool};
pub use render::{Animator, Completion, CommentId, Flight, Point, TextExtent, TextMeasurer, TextStyle};
pub use time::{ManualTime, MonotonicTime, TimeSource};

/// Result type for danmu-scheduler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmu-scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("DanMu core error: {0}")]
    Core(#[from] danmu_core::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
