//! Telemetry API access
//!
//! The replay core only talks to its data through [`TelemetrySource`].
//! [`HttpSource`] speaks the REST API of the replay backend, while
//! [`StaticSource`] serves the same contract from memory.

mod error;
mod http;
mod memory;
mod source;
pub mod types;

pub use error::FetchError;
pub use http::HttpSource;
pub use memory::StaticSource;
pub use source::TelemetrySource;
pub use types::{CarSummary, LapTiming, RaceSummary};

/// Default address of the replay backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
