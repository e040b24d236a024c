//! In-memory telemetry source
//!
//! Serves the same contract as the HTTP API from data held in memory.
//! Used for offline replays of previously exported sessions and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::source::TelemetrySource;
use super::types::{CarSummary, ChunkResponse, LapsResponse, RaceSummary, TimelineResponse};
use super::FetchError;
use crate::telemetry::TelemetryRecord;
use crate::timeline::TimelineEntry;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Default)]
struct CarData {
    summary: Option<CarSummary>,
    timeline: Vec<TimelineEntry>,
    records: Vec<TelemetryRecord>,
    laps: Option<LapsResponse>,
}

/// Telemetry source backed by vectors in memory
#[derive(Debug, Default)]
pub struct StaticSource {
    races: Vec<RaceSummary>,
    cars: HashMap<(String, String), CarData>,
    timeline_requests: AtomicUsize,
    chunk_requests: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a car with full telemetry
    ///
    /// The timeline is derived from the records (one entry per record).
    pub fn with_car(
        mut self,
        race_id: &str,
        vehicle_id: &str,
        mut records: Vec<TelemetryRecord>,
    ) -> Self {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let timeline = records
            .iter()
            .map(|r| TimelineEntry::new(r.timestamp.clone(), r.lap.unwrap_or(1)))
            .collect();
        self.insert_car(race_id, vehicle_id, timeline, records);
        self
    }

    /// Register a car whose timeline is sampled independently of its records
    pub fn with_car_timeline(
        mut self,
        race_id: &str,
        vehicle_id: &str,
        timeline: Vec<TimelineEntry>,
        mut records: Vec<TelemetryRecord>,
    ) -> Self {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.insert_car(race_id, vehicle_id, timeline, records);
        self
    }

    /// Attach lap timing to a registered car
    pub fn with_laps(mut self, race_id: &str, vehicle_id: &str, laps: LapsResponse) -> Self {
        self.cars
            .entry((race_id.to_string(), vehicle_id.to_string()))
            .or_default()
            .laps = Some(laps);
        self
    }

    fn insert_car(
        &mut self,
        race_id: &str,
        vehicle_id: &str,
        timeline: Vec<TimelineEntry>,
        records: Vec<TelemetryRecord>,
    ) {
        if !self.races.iter().any(|r| r.id == race_id) {
            self.races.push(RaceSummary {
                id: race_id.to_string(),
                name: None,
                track: None,
            });
        }
        let car = self
            .cars
            .entry((race_id.to_string(), vehicle_id.to_string()))
            .or_default();
        car.summary = Some(CarSummary {
            id: vehicle_id.to_string(),
            display_name: vehicle_id.to_string(),
            number: None,
        });
        car.timeline = timeline;
        car.records = records;
    }

    /// Number of timeline requests served
    pub fn timeline_requests(&self) -> usize {
        self.timeline_requests.load(Ordering::SeqCst)
    }

    /// Number of chunk requests served
    pub fn chunk_requests(&self) -> usize {
        self.chunk_requests.load(Ordering::SeqCst)
    }

    fn car(&self, race_id: &str, vehicle_id: &str) -> Result<&CarData, FetchError> {
        self.cars
            .get(&(race_id.to_string(), vehicle_id.to_string()))
            .ok_or_else(|| FetchError::NotFound(format!("{race_id}/{vehicle_id}")))
    }
}

#[async_trait]
impl TelemetrySource for StaticSource {
    async fn races(&self) -> Result<Vec<RaceSummary>, FetchError> {
        Ok(self.races.clone())
    }

    async fn cars(&self, race_id: &str) -> Result<Vec<CarSummary>, FetchError> {
        let mut cars: Vec<CarSummary> = self
            .cars
            .iter()
            .filter(|((race, _), _)| race == race_id)
            .filter_map(|(_, car)| car.summary.clone())
            .collect();
        cars.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cars)
    }

    async fn timeline(
        &self,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<TimelineResponse, FetchError> {
        self.timeline_requests.fetch_add(1, Ordering::SeqCst);
        let car = self.car(race_id, vehicle_id)?;
        let duration_seconds = match (car.timeline.first(), car.timeline.last()) {
            (Some(first), Some(last)) => {
                Some(first.timestamp.millis_until(&last.timestamp) as f64 / 1000.0)
            }
            _ => None,
        };
        Ok(TimelineResponse {
            timeline: car.timeline.clone(),
            total_points: Some(car.timeline.len()),
            duration_seconds,
        })
    }

    async fn chunk(
        &self,
        race_id: &str,
        vehicle_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<ChunkResponse, FetchError> {
        self.chunk_requests.fetch_add(1, Ordering::SeqCst);
        let car = self.car(race_id, vehicle_id)?;
        let data: Vec<TelemetryRecord> = car
            .records
            .iter()
            .filter(|r| r.timestamp >= *start && r.timestamp <= *end)
            .cloned()
            .collect();
        Ok(ChunkResponse {
            total_points: Some(data.len()),
            data,
        })
    }

    async fn laps(&self, race_id: &str, vehicle_id: &str) -> Result<LapsResponse, FetchError> {
        self.car(race_id, vehicle_id)?
            .laps
            .clone()
            .ok_or_else(|| FetchError::NotFound(format!("laps for {race_id}/{vehicle_id}")))
    }
}
