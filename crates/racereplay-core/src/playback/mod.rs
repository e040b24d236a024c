//! Playback
//!
//! Drives the replay: a timer advances the playback position while
//! playing, seeks jump around the timeline, and every position change is
//! resolved to telemetry and pushed to subscribers as [`PlaybackEvent`]s.

mod scheduler;

pub use scheduler::PlaybackScheduler;

use serde::Serialize;

use crate::telemetry::{TelemetryDisplay, TelemetryRecord};
use crate::timestamp::Timestamp;

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
}

/// Snapshot of the scheduler's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub current_position: usize,
    pub is_playing: bool,
    pub current_lap: Option<u32>,
}

/// Result of resolving one position change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFrame {
    pub position: usize,
    /// Timeline timestamp the position stands for
    pub timestamp: Timestamp,
    /// Matched sample, `None` when no data is available
    pub record: Option<TelemetryRecord>,
    /// Values to show, with dropouts filled from earlier samples
    pub display: TelemetryDisplay,
}

/// Notification sent to playback subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEvent {
    StatusChanged(PlaybackStatus),
    /// Emitted synchronously when the position moves
    PositionChanged(PlaybackState),
    /// Emitted once the latest position has been resolved
    Frame(ResolvedFrame),
}
