//! Lap timing
//!
//! Lap splits and the official best lap of a car, as served by the laps
//! endpoint.

use std::collections::BTreeMap;

use crate::api::types::{LapTiming, LapsResponse};
use crate::api::{FetchError, TelemetrySource};

/// Lap timing of one car, keyed by lap number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapTable {
    laps: BTreeMap<u32, LapTiming>,
    best_lap: Option<u32>,
    best_lap_time: Option<String>,
    best_lap_time_ms: Option<f64>,
    total_laps: Option<u32>,
}

impl LapTable {
    /// Fetch the lap table of a car
    pub async fn load(
        source: &dyn TelemetrySource,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<Self, FetchError> {
        let response = source.laps(race_id, vehicle_id).await?;
        Ok(Self::from_response(response))
    }

    /// Build from an API response, skipping keys that aren't lap numbers
    pub fn from_response(response: LapsResponse) -> Self {
        let mut laps = BTreeMap::new();
        for (key, timing) in response.laps {
            match key.trim().parse::<u32>() {
                Ok(lap) => {
                    laps.insert(lap, timing);
                }
                Err(_) => tracing::debug!("ignoring lap entry with key '{key}'"),
            }
        }

        Self {
            laps,
            best_lap: response.best_lap,
            best_lap_time: response.best_lap_time,
            best_lap_time_ms: response.best_lap_time_ms,
            total_laps: response.total_laps,
        }
    }

    pub fn lap(&self, lap: u32) -> Option<&LapTiming> {
        self.laps.get(&lap)
    }

    /// All laps in order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &LapTiming)> {
        self.laps.iter().map(|(lap, timing)| (*lap, timing))
    }

    /// Number of laps, preferring the official count
    pub fn lap_count(&self) -> usize {
        self.total_laps
            .map(|n| n as usize)
            .unwrap_or(self.laps.len())
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty() && self.best_lap.is_none()
    }

    /// Best lap number with its formatted time and milliseconds
    pub fn best(&self) -> Option<(u32, Option<&str>, Option<f64>)> {
        self.best_lap
            .map(|lap| (lap, self.best_lap_time.as_deref(), self.best_lap_time_ms))
    }

    pub fn is_best(&self, lap: u32) -> bool {
        self.best_lap == Some(lap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response() -> LapsResponse {
        serde_json::from_str(
            r#"{
                "laps": {
                    "2": {"lap_time": "1:40.500", "lap_time_ms": 100500},
                    "1": {"lap_time": "1:39.123", "lap_time_ms": 99123},
                    "warmup": {"lap_time": null}
                },
                "best_lap": 1,
                "best_lap_time": "1:39.123",
                "best_lap_time_ms": 99123
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn laps_are_ordered_numerically() {
        let table = LapTable::from_response(response());
        let laps: Vec<u32> = table.iter().map(|(lap, _)| lap).collect();
        assert_eq!(laps, vec![1, 2]);
        assert_eq!(table.lap_count(), 2);
        assert_eq!(table.lap(2).unwrap().lap_time_ms, Some(100500.0));
    }

    #[test]
    fn best_lap_is_reported() {
        let table = LapTable::from_response(response());
        assert_eq!(table.best(), Some((1, Some("1:39.123"), Some(99123.0))));
        assert!(table.is_best(1));
        assert!(!table.is_best(2));
    }

    #[test]
    fn official_total_wins() {
        let mut resp = response();
        resp.total_laps = Some(27);
        assert_eq!(LapTable::from_response(resp).lap_count(), 27);
        assert!(LapTable::default().is_empty());
    }
}
