//! Telemetry API over HTTP
//!
//! ## Usage
//!
//! ```ignore
//! let source = HttpSource::new(&ApiConfig::default())?;
//! for race in source.races().await? {
//!     println!("{}: {:?}", race.id, race.track);
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::source::TelemetrySource;
use super::types::{
    CarSummary, CarsResponse, ChunkResponse, LapsResponse, RaceSummary, RacesResponse,
    TimelineResponse,
};
use super::FetchError;
use crate::config::ApiConfig;
use crate::timestamp::Timestamp;

/// Client for the replay REST API
#[derive(Debug, Clone)]
pub struct HttpSource {
    /// HTTP client for API requests
    client: reqwest::Client,
    /// Base URL without trailing slash, e.g. `http://localhost:8001`
    base_url: String,
}

impl HttpSource {
    /// Create a new client from API settings
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(HttpSource {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(format!("{url}: {e}")))
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn races(&self) -> Result<Vec<RaceSummary>, FetchError> {
        let resp: RacesResponse = self.get_json("/api/races", &[]).await?;
        Ok(resp.races)
    }

    async fn cars(&self, race_id: &str) -> Result<Vec<CarSummary>, FetchError> {
        let path = format!("/api/races/{race_id}/cars");
        let resp: CarsResponse = self.get_json(&path, &[]).await?;
        Ok(resp.cars)
    }

    async fn timeline(
        &self,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<TimelineResponse, FetchError> {
        let path = format!("/api/telemetry/{race_id}/{vehicle_id}/timeline");
        self.get_json(&path, &[]).await
    }

    async fn chunk(
        &self,
        race_id: &str,
        vehicle_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<ChunkResponse, FetchError> {
        let path = format!("/api/telemetry/{race_id}/{vehicle_id}/chunk");
        // reqwest percent-encodes the `+` of UTC offsets
        self.get_json(
            &path,
            &[("start_time", start.as_str()), ("end_time", end.as_str())],
        )
        .await
    }

    async fn laps(&self, race_id: &str, vehicle_id: &str) -> Result<LapsResponse, FetchError> {
        let path = format!("/api/laps/{race_id}/{vehicle_id}");
        self.get_json(&path, &[]).await
    }
}
