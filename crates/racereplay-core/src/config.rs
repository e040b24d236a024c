//! Replay configuration
//!
//! Every field has a default, so a config file only needs to list the
//! values it overrides:
//!
//! ```json
//! { "api": { "base_url": "http://race-box:8001" }, "preload_ahead": 3 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
use crate::error::ReplayError;

/// Points per chunk when the sampling interval can't be determined
pub const FALLBACK_CHUNK_POINTS: usize = 600;

/// Default wall-clock span of a chunk in seconds
pub const DEFAULT_CHUNK_SECONDS: f64 = 60.0;

/// Connection settings for the telemetry API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("RaceReplay/{}", crate::VERSION),
        }
    }
}

/// How many timeline points make up one chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChunkSizing {
    /// A fixed number of timeline points
    Fixed { points: usize },
    /// Enough points to cover this many seconds at the timeline's sampling rate
    Duration { seconds: f64 },
}

impl Default for ChunkSizing {
    fn default() -> Self {
        ChunkSizing::Duration {
            seconds: DEFAULT_CHUNK_SECONDS,
        }
    }
}

impl ChunkSizing {
    /// Resolve to a point count, given the timeline's mean sample interval
    pub fn points(&self, sample_interval: Option<Duration>) -> usize {
        match *self {
            ChunkSizing::Fixed { points } => points.max(1),
            ChunkSizing::Duration { seconds } => match sample_interval {
                Some(interval) if !interval.is_zero() => {
                    let points = (seconds / interval.as_secs_f64()).ceil();
                    if points.is_nan() {
                        FALLBACK_CHUNK_POINTS
                    } else {
                        // Float casts saturate: an endless span is one chunk
                        (points as usize).max(1)
                    }
                }
                _ => FALLBACK_CHUNK_POINTS,
            },
        }
    }
}

/// Configuration of a replay session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub api: ApiConfig,
    /// Chunk sizing policy
    pub chunking: ChunkSizing,
    /// Number of chunks to prefetch after the current one
    pub preload_ahead: usize,
    /// Largest timestamp gap accepted when no sample matches exactly
    pub match_tolerance_ms: u64,
    /// Playback timer period
    pub tick_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            chunking: ChunkSizing::default(),
            preload_ahead: 2,
            match_tolerance_ms: 1000,
            tick_interval_ms: 100,
        }
    }
}

impl ReplayConfig {
    /// Parse a JSON config, filling in defaults
    pub fn from_json_str(json: &str) -> Result<Self, ReplayError> {
        let config: ReplayConfig =
            serde_json::from_str(json).map_err(|e| ReplayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Reject settings the scheduler or loader can't work with
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.tick_interval_ms == 0 {
            return Err(ReplayError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        match self.chunking {
            ChunkSizing::Fixed { points: 0 } => Err(ReplayError::Config(
                "chunking.points must be greater than zero".to_string(),
            )),
            ChunkSizing::Duration { seconds } if seconds.is_nan() || seconds <= 0.0 => Err(
                ReplayError::Config("chunking.seconds must be positive".to_string()),
            ),
            _ => Ok(()),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn match_tolerance(&self) -> Duration {
        Duration::from_millis(self.match_tolerance_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ReplayConfig::from_json_str(
            r#"{ "api": { "base_url": "http://race-box:8001" }, "preload_ahead": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://race-box:8001");
        assert_eq!(config.api.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.preload_ahead, 3);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.chunking, ChunkSizing::default());
    }

    #[test]
    fn fixed_chunking_from_json() {
        let config =
            ReplayConfig::from_json_str(r#"{ "chunking": { "mode": "fixed", "points": 250 } }"#)
                .unwrap();
        assert_eq!(config.chunking, ChunkSizing::Fixed { points: 250 });
    }

    #[test]
    fn rejects_unusable_values() {
        assert!(ReplayConfig::from_json_str(r#"{ "tick_interval_ms": 0 }"#).is_err());
        assert!(
            ReplayConfig::from_json_str(r#"{ "chunking": { "mode": "fixed", "points": 0 } }"#)
                .is_err()
        );
        assert!(ReplayConfig::from_json_str(
            r#"{ "chunking": { "mode": "duration", "seconds": -5.0 } }"#
        )
        .is_err());
    }

    #[test]
    fn duration_chunking_follows_sample_rate() {
        let sizing = ChunkSizing::Duration { seconds: 60.0 };
        assert_eq!(sizing.points(Some(Duration::from_millis(100))), 600);
        assert_eq!(sizing.points(Some(Duration::from_millis(40))), 1500);
        assert_eq!(sizing.points(None), FALLBACK_CHUNK_POINTS);
        assert_eq!(sizing.points(Some(Duration::ZERO)), FALLBACK_CHUNK_POINTS);
        assert_eq!(ChunkSizing::Fixed { points: 0 }.points(None), 1);
    }

    #[test]
    fn enormous_chunk_duration_saturates() {
        let interval = Some(Duration::from_millis(1));
        let huge = ChunkSizing::Duration { seconds: f64::MAX };
        assert_eq!(huge.points(interval), usize::MAX);
        let tiny = ChunkSizing::Duration { seconds: 1e-9 };
        assert_eq!(tiny.points(interval), 1);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "match_tolerance_ms": 250 }}"#).unwrap();
        let config = ReplayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.match_tolerance(), Duration::from_millis(250));
    }
}
