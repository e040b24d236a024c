//! Position Resolver
//!
//! Turns a playback position into the telemetry sample to display. The
//! timeline and the telemetry chunks may be sampled independently, so an
//! exact timestamp match is tried first and the nearest sample within a
//! small tolerance second.

use std::sync::Arc;
use std::time::Duration;

use crate::chunk::ChunkLoader;
use crate::telemetry::TelemetryRecord;
use crate::timeline::TimelineIndex;
use crate::timestamp::Timestamp;

/// Resolves playback positions to telemetry records
#[derive(Clone)]
pub struct PositionResolver {
    timeline: Arc<TimelineIndex>,
    loader: ChunkLoader,
    tolerance: Duration,
}

impl PositionResolver {
    pub fn new(loader: ChunkLoader, tolerance: Duration) -> Self {
        Self {
            timeline: loader.timeline().clone(),
            loader,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn loader(&self) -> &ChunkLoader {
        &self.loader
    }

    /// Telemetry record for a playback position
    ///
    /// `None` means no data is available for that position: it is out of
    /// range, its chunk could not be loaded, or no sample lies within the
    /// tolerance.
    pub async fn resolve(&self, position: usize) -> Option<TelemetryRecord> {
        let target = self.timeline.get(position)?.timestamp.clone();
        let chunk = self.loader.ensure_loaded(position).await?;

        let found = match_record(&chunk, &target, self.tolerance);
        if found.is_none() {
            tracing::debug!(
                "no sample within {:?} of {} (position {position}, {} records in chunk)",
                self.tolerance,
                target,
                chunk.len()
            );
        }
        found.cloned()
    }
}

/// Find the record matching `target` exactly, else the closest one within
/// `tolerance` (inclusive). Ties go to the earlier record.
pub fn match_record<'a>(
    records: &'a [TelemetryRecord],
    target: &Timestamp,
    tolerance: Duration,
) -> Option<&'a TelemetryRecord> {
    if let Some(exact) = records.iter().find(|r| r.timestamp == *target) {
        return Some(exact);
    }

    let mut best: Option<(&TelemetryRecord, Duration)> = None;
    for record in records {
        let distance = record.timestamp.distance(target);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((record, distance));
        }
    }

    best.filter(|(_, distance)| *distance <= tolerance)
        .map(|(record, _)| record)
}
