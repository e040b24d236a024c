#![allow(dead_code)]

use async_trait::async_trait;
use racereplay_core::api::types::{ChunkResponse, LapsResponse, TimelineResponse};
use racereplay_core::api::{CarSummary, FetchError, RaceSummary, StaticSource, TelemetrySource};
use racereplay_core::telemetry::TelemetryRecord;
use racereplay_core::timestamp::Timestamp;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// `count` samples `interval_ms` apart, a new lap every `per_lap` samples
pub fn race_records(count: usize, interval_ms: i64, per_lap: usize) -> Vec<TelemetryRecord> {
    (0..count)
        .map(|i| {
            let lap = 1 + (i / per_lap) as u32;
            TelemetryRecord::new(Timestamp::from_millis(i as i64 * interval_ms), lap)
                .with_position(33.53 + i as f64 * 1e-5, -86.62)
                .with_speed(100.0 + i as f64)
        })
        .collect()
}

/// Wraps a [`StaticSource`] with per-chunk latency and failures
pub struct ScriptedSource {
    inner: StaticSource,
    /// Chunk start (ms) -> latency
    chunk_delays: Mutex<HashMap<i64, Duration>>,
    /// Chunk starts (ms) that fail
    failing_chunks: Mutex<HashSet<i64>>,
    timeline_error: Mutex<Option<FetchError>>,
    chunk_calls: Mutex<Vec<(i64, i64)>>,
}

impl ScriptedSource {
    pub fn new(inner: StaticSource) -> Self {
        Self {
            inner,
            chunk_delays: Mutex::new(HashMap::new()),
            failing_chunks: Mutex::new(HashSet::new()),
            timeline_error: Mutex::new(None),
            chunk_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delay_chunk(&self, start_ms: i64, delay: Duration) {
        self.chunk_delays.lock().unwrap().insert(start_ms, delay);
    }

    pub fn fail_chunk(&self, start_ms: i64) {
        self.failing_chunks.lock().unwrap().insert(start_ms);
    }

    pub fn fail_timeline(&self, error: FetchError) {
        *self.timeline_error.lock().unwrap() = Some(error);
    }

    /// `(start_ms, end_ms)` of every chunk request, in order
    pub fn chunk_calls(&self) -> Vec<(i64, i64)> {
        self.chunk_calls.lock().unwrap().clone()
    }

    pub fn calls_starting_at(&self, start_ms: i64) -> usize {
        self.chunk_calls()
            .iter()
            .filter(|(start, _)| *start == start_ms)
            .count()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn races(&self) -> Result<Vec<RaceSummary>, FetchError> {
        self.inner.races().await
    }

    async fn cars(&self, race_id: &str) -> Result<Vec<CarSummary>, FetchError> {
        self.inner.cars(race_id).await
    }

    async fn timeline(
        &self,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<TimelineResponse, FetchError> {
        if let Some(err) = self.timeline_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.inner.timeline(race_id, vehicle_id).await
    }

    async fn chunk(
        &self,
        race_id: &str,
        vehicle_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<ChunkResponse, FetchError> {
        self.chunk_calls
            .lock()
            .unwrap()
            .push((start.millis(), end.millis()));

        let delay = self.chunk_delays.lock().unwrap().get(&start.millis()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_chunks.lock().unwrap().contains(&start.millis()) {
            return Err(FetchError::Status {
                status: 500,
                url: format!("/api/telemetry/{race_id}/{vehicle_id}/chunk"),
            });
        }
        self.inner.chunk(race_id, vehicle_id, start, end).await
    }

    async fn laps(&self, race_id: &str, vehicle_id: &str) -> Result<LapsResponse, FetchError> {
        self.inner.laps(race_id, vehicle_id).await
    }
}
