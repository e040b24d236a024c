//! # RaceReplay Core Library
//!
//! Chunked telemetry streaming and playback for race replays.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A timeline index of lightweight `{timestamp, lap}` descriptors per car
//! - Chunked loading of full telemetry with an in-session cache and prefetch
//! - Nearest-sample matching between timeline and telemetry timestamps
//! - A timer-driven playback scheduler with seeking and stale-result suppression
//!
//! ## Example
//!
//! ```rust,ignore
//! use racereplay_core::prelude::*;
//!
//! let mut viewer = ReplayViewer::connect(ReplayConfig::default())?;
//! let session = viewer.select_car("R1", "GR86-002-2").await?;
//!
//! let mut events = session.scheduler().subscribe();
//! session.scheduler().play();
//! while let Some(event) = events.recv().await {
//!     if let PlaybackEvent::Frame(frame) = event {
//!         println!("{} {:?}", frame.timestamp, frame.display.speed);
//!     }
//! }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod api;
pub mod chunk;
pub mod config;
pub mod error;
pub mod laps;
pub mod playback;
pub mod resolver;
pub mod session;
pub mod telemetry;
pub mod timeline;
pub mod timestamp;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{HttpSource, StaticSource, TelemetrySource};
    pub use crate::chunk::{ChunkKey, ChunkLoader};
    pub use crate::config::{ChunkSizing, ReplayConfig};
    pub use crate::error::ReplayError;
    pub use crate::laps::LapTable;
    pub use crate::playback::{PlaybackEvent, PlaybackScheduler, PlaybackState, PlaybackStatus};
    pub use crate::resolver::PositionResolver;
    pub use crate::session::{ReplaySession, ReplayViewer};
    pub use crate::telemetry::{TelemetryDisplay, TelemetryRecord};
    pub use crate::timeline::{TimelineEntry, TimelineIndex};
    pub use crate::timestamp::Timestamp;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
