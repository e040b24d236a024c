//! Response bodies of the telemetry API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::telemetry::TelemetryRecord;
use crate::timeline::TimelineEntry;

/// A race available for replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
}

/// A car that took part in a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSummary {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub number: Option<String>,
}

/// `GET /api/races`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RacesResponse {
    #[serde(default)]
    pub races: Vec<RaceSummary>,
}

/// `GET /api/races/{race}/cars`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarsResponse {
    #[serde(default)]
    pub cars: Vec<CarSummary>,
}

/// `GET /api/telemetry/{race}/{vehicle}/timeline`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub total_points: Option<usize>,
    /// Reported race duration; the backend sends NaN (null) for empty data
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// `GET /api/telemetry/{race}/{vehicle}/chunk`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkResponse {
    #[serde(default)]
    pub data: Vec<TelemetryRecord>,
    #[serde(default)]
    pub total_points: Option<usize>,
}

/// Timing of a single lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapTiming {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub lap_time: Option<String>,
    #[serde(default)]
    pub lap_time_ms: Option<f64>,
}

/// `GET /api/laps/{race}/{vehicle}`
///
/// Lap numbers arrive as JSON object keys (`"1"`, `"2"`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LapsResponse {
    #[serde(default)]
    pub laps: BTreeMap<String, LapTiming>,
    #[serde(default)]
    pub best_lap: Option<u32>,
    #[serde(default)]
    pub best_lap_time: Option<String>,
    #[serde(default)]
    pub best_lap_time_ms: Option<f64>,
    #[serde(default)]
    pub total_laps: Option<u32>,
}
