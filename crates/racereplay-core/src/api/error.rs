//! Fetch errors

use thiserror::Error;

/// Errors that can occur while talking to the telemetry API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("No data for {0}")]
    NotFound(String),
}

impl FetchError {
    /// Whether the server reported that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_) | FetchError::Status { status: 404, .. }
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
