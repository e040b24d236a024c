//! Telemetry records and the fallback display model
//!
//! Sensor dropout is routine in the recorded data: any physical channel may
//! be null for a given sample. [`TelemetryDisplay`] smooths this over by
//! holding on to the last known good value of every channel.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// A single full telemetry sample for one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub lap: Option<u32>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub gear: Option<f64>,
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub brake_rear: Option<f64>,
    #[serde(default)]
    pub brake_front: Option<f64>,
    #[serde(default)]
    pub engine_rpm: Option<f64>,
    #[serde(default)]
    pub steering_angle: Option<f64>,
    #[serde(default)]
    pub g_force_x: Option<f64>,
    #[serde(default)]
    pub g_force_y: Option<f64>,
    #[serde(default)]
    pub lap_distance: Option<f64>,
}

impl TelemetryRecord {
    /// Create a record with only a timestamp and lap set
    pub fn new(timestamp: Timestamp, lap: u32) -> Self {
        Self {
            timestamp,
            lap: Some(lap),
            latitude: None,
            longitude: None,
            speed: None,
            gear: None,
            throttle: None,
            brake_rear: None,
            brake_front: None,
            engine_rpm: None,
            steering_angle: None,
            g_force_x: None,
            g_force_y: None,
            lap_distance: None,
        }
    }

    /// Set the GPS position
    pub fn with_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Set the vehicle speed
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// GPS position, when both coordinates are present
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Telemetry values as shown to the user
///
/// Every field holds the most recent non-null value seen since the
/// session started, so a sample with dropouts doesn't blank the display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryDisplay {
    pub timestamp: Option<Timestamp>,
    pub lap: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub gear: Option<f64>,
    pub throttle: Option<f64>,
    pub brake_rear: Option<f64>,
    pub brake_front: Option<f64>,
    pub engine_rpm: Option<f64>,
    pub steering_angle: Option<f64>,
    pub g_force_x: Option<f64>,
    pub g_force_y: Option<f64>,
    pub lap_distance: Option<f64>,
}

fn keep(slot: &mut Option<f64>, value: Option<f64>) {
    if value.is_some() {
        *slot = value;
    }
}

impl TelemetryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a resolved record into the display
    ///
    /// Null channels keep their previous value.
    pub fn apply(&mut self, record: &TelemetryRecord) {
        self.timestamp = Some(record.timestamp.clone());
        if record.lap.is_some() {
            self.lap = record.lap;
        }
        keep(&mut self.latitude, record.latitude);
        keep(&mut self.longitude, record.longitude);
        keep(&mut self.speed, record.speed);
        keep(&mut self.gear, record.gear);
        keep(&mut self.throttle, record.throttle);
        keep(&mut self.brake_rear, record.brake_rear);
        keep(&mut self.brake_front, record.brake_front);
        keep(&mut self.engine_rpm, record.engine_rpm);
        keep(&mut self.steering_angle, record.steering_angle);
        keep(&mut self.g_force_x, record.g_force_x);
        keep(&mut self.g_force_y, record.g_force_y);
        keep(&mut self.lap_distance, record.lap_distance);
    }

    /// Whether any value has been received yet
    pub fn has_data(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Forget every value
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
