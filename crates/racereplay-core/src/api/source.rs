use async_trait::async_trait;

use super::types::{CarSummary, ChunkResponse, LapsResponse, RaceSummary, TimelineResponse};
use super::FetchError;
use crate::timestamp::Timestamp;

/// Abstraction over where replay data comes from (live API or in-memory)
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// List the races available for replay
    async fn races(&self) -> Result<Vec<RaceSummary>, FetchError>;

    /// List the cars of a race
    async fn cars(&self, race_id: &str) -> Result<Vec<CarSummary>, FetchError>;

    /// Fetch the lightweight timeline of a car
    async fn timeline(&self, race_id: &str, vehicle_id: &str)
        -> Result<TimelineResponse, FetchError>;

    /// Fetch full telemetry between two timeline timestamps (both inclusive)
    async fn chunk(
        &self,
        race_id: &str,
        vehicle_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<ChunkResponse, FetchError>;

    /// Fetch lap timing for a car
    async fn laps(&self, race_id: &str, vehicle_id: &str) -> Result<LapsResponse, FetchError>;
}
