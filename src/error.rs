//! Error handling for the discovery engine and PTZ client
//!
//! Discovery favors graceful degradation: only bad caller arguments, a core
//! socket that cannot be created, or a network that cannot be resolved stop a
//! run. Everything else is logged and the next phase is attempted.

use std::time::Duration;
use thiserror::Error;

/// Main error type for discovery and PTZ operations
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    #[error("No usable IPv4 network found on this host")]
    NoNetwork,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("SOAP request failed with status {status}: {fault}")]
    SoapFault { status: u16, fault: String },
}

/// Result type alias for discovery operations
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

impl From<toml::de::Error> for DiscoveryError {
    fn from(e: toml::de::Error) -> Self {
        DiscoveryError::ConfigError(e.to_string())
    }
}

/// Linear backoff used between bind attempts, capped at two seconds
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let delay = base.saturating_mul(attempt.max(1));
    std::cmp::min(delay, Duration::from_secs(2))
}
