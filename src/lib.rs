//! onvif-scout - ONVIF camera discovery and PTZ control
//!
//! Finds ONVIF devices on a local IPv4 network with a port sweep, WS-Discovery
//! probes and an HTTP fallback, then drives their PTZ service over SOAP.

pub mod config;
pub mod discovery;
pub mod error;
pub mod network;
pub mod output;
pub mod ptz;
pub mod scanner;

// Re-export commonly used types
pub use config::DiscoveryConfig;
pub use discovery::{DeviceRecord, DiscoveryReport, DiscoveryService};
pub use error::{DiscoveryError, DiscoveryResult};
pub use network::NetworkRange;
pub use ptz::{Credentials, PtzClient};
