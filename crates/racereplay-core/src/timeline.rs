//! Timeline Index
//!
//! The ordered list of lightweight `{timestamp, lap}` descriptors for one
//! car. An index into this list is a playback position; every other
//! component speaks in positions and only looks up timestamps through here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::types::TimelineResponse;
use crate::api::{FetchError, TelemetrySource};
use crate::error::ReplayError;
use crate::timestamp::Timestamp;

/// One playback position on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: Timestamp,
    #[serde(default = "first_lap")]
    pub lap: u32,
}

fn first_lap() -> u32 {
    1
}

impl TimelineEntry {
    pub fn new(timestamp: Timestamp, lap: u32) -> Self {
        Self { timestamp, lap }
    }
}

/// Ordered timeline of a car's race
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineIndex {
    entries: Vec<TimelineEntry>,
    /// Duration reported by the API, if any
    reported_duration: Option<Duration>,
}

impl TimelineIndex {
    /// Build an index from entries, sorting them by timestamp if needed
    pub fn new(mut entries: Vec<TimelineEntry>) -> Self {
        if !entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            tracing::warn!("timeline entries out of order, sorting {}", entries.len());
            entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        Self {
            entries,
            reported_duration: None,
        }
    }

    /// Create an index with no playable positions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetch the timeline of a car
    ///
    /// A car the backend has no data for yields an empty index rather than
    /// an error; callers treat that as "no playback possible".
    pub async fn load(
        source: &dyn TelemetrySource,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<Self, FetchError> {
        let response = match source.timeline(race_id, vehicle_id).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::info!("no timeline for {race_id}/{vehicle_id}: {e}");
                return Ok(Self::empty());
            }
            Err(e) => return Err(e),
        };

        let index = Self::from_response(response);
        tracing::debug!(
            "loaded timeline for {race_id}/{vehicle_id}: {} points",
            index.len()
        );
        Ok(index)
    }

    /// Build an index from a timeline response
    ///
    /// A reported duration that isn't a representable span is ignored.
    pub fn from_response(response: TimelineResponse) -> Self {
        if let Some(total) = response.total_points {
            if total != response.timeline.len() {
                tracing::debug!(
                    "timeline reports {} points but carries {}",
                    total,
                    response.timeline.len()
                );
            }
        }

        let mut index = Self::new(response.timeline);
        index.reported_duration = response
            .duration_seconds
            .and_then(|s| Duration::try_from_secs_f64(s).ok());
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Entry at a playback position
    pub fn get(&self, position: usize) -> Option<&TimelineEntry> {
        self.entries.get(position)
    }

    /// Entry at a playback position, or an out-of-range error
    pub fn entry(&self, position: usize) -> Result<&TimelineEntry, ReplayError> {
        self.entries.get(position).ok_or(ReplayError::OutOfRange {
            position,
            len: self.entries.len(),
        })
    }

    /// Index of the final entry
    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    /// Clamp a position into `[0, N-1]`
    pub fn clamp(&self, position: usize) -> Option<usize> {
        self.last_index().map(|last| position.min(last))
    }

    /// First position belonging to a lap
    pub fn first_position_of_lap(&self, lap: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.lap == lap)
    }

    /// Position whose timestamp is closest to `target`
    ///
    /// Linear scan; ties go to the earlier position.
    pub fn closest_position(&self, target_millis: i64) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            let diff = entry.timestamp.millis().abs_diff(target_millis);
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((i, diff));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Distinct lap numbers in order of appearance
    pub fn laps(&self) -> Vec<u32> {
        let mut laps: Vec<u32> = Vec::new();
        for entry in &self.entries {
            if !laps.contains(&entry.lap) {
                laps.push(entry.lap);
            }
        }
        laps
    }

    /// Total race duration
    ///
    /// Prefers the duration reported by the API and falls back to the span
    /// between the first and last entries.
    pub fn duration(&self) -> Option<Duration> {
        if self.reported_duration.is_some() {
            return self.reported_duration;
        }
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some(first.timestamp.distance(&last.timestamp))
    }

    /// Mean time between consecutive timeline points
    pub fn sample_interval(&self) -> Option<Duration> {
        if self.entries.len() < 2 {
            return None;
        }
        let duration = self.duration()?;
        Some(duration / (self.entries.len() - 1) as u32)
    }

    /// Time elapsed since the first entry at a position
    pub fn elapsed(&self, position: usize) -> Option<Duration> {
        let first = self.entries.first()?;
        let entry = self.entries.get(position)?;
        Some(first.timestamp.distance(&entry.timestamp))
    }
}
