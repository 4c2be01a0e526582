//! Configuration module for the discovery engine

use crate::error::{DiscoveryError, DiscoveryResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// WS-Discovery UDP port
pub const WS_DISCOVERY_PORT: u16 = 3702;

/// Paths tried, in order, by the HTTP fallback
pub const DEFAULT_HTTP_PATHS: [&str; 5] = [
    "/onvif/device_service",
    "/onvif/services",
    "/onvif/device",
    "/onvif/Device",
    "/device_service",
];

/// Main configuration structure for discovery runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Network to search: "auto", a.b.c.d/nn or a.b.c.d/m.m.m.m
    pub network: String,

    /// Capacity of the device registry
    pub max_devices: usize,

    /// Stop the port scan after this many responsive hosts
    pub max_candidates: usize,

    /// How many local prefixes to consider when auto-detecting
    pub max_interfaces: usize,

    /// TCP ports probed by the range scanner, in order
    pub scan_ports: Vec<u16>,

    /// Connect timeout per host and port in milliseconds
    pub connect_timeout: u64,

    /// UDP ports a unicast probe is sent to for every candidate
    pub probe_ports: Vec<u16>,

    /// Preferred local port for the response collector
    pub listen_port: u16,

    /// Ports tried when the preferred port stays busy
    pub alternate_ports: Vec<u16>,

    /// Bind attempts on the preferred port
    pub bind_retries: u32,

    /// Base backoff between bind attempts in milliseconds
    pub bind_backoff: u64,

    /// Wait cycles of the standard collection
    pub collect_attempts: u32,

    /// Timeout of one standard wait cycle in milliseconds
    pub collect_timeout: u64,

    /// Wait cycles of the follow-up collection when nothing answered
    pub retry_attempts: u32,

    /// Timeout of one follow-up wait cycle in milliseconds
    pub retry_timeout: u64,

    /// Port used by the HTTP fallback
    pub http_port: u16,

    /// Per-request timeout of the HTTP fallback in milliseconds
    pub http_timeout: u64,

    /// Paths tried by the HTTP fallback, in order
    pub http_paths: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            network: "auto".to_string(),
            max_devices: 100,
            max_candidates: 256,
            max_interfaces: 10,
            scan_ports: vec![WS_DISCOVERY_PORT, 80],
            connect_timeout: 200,
            probe_ports: vec![WS_DISCOVERY_PORT, 80],
            listen_port: WS_DISCOVERY_PORT,
            alternate_ports: vec![3703, 3704, 3705],
            bind_retries: 5,
            bind_backoff: 100,
            collect_attempts: 5,
            collect_timeout: 10_000,
            retry_attempts: 2,
            retry_timeout: 3_000,
            http_port: 80,
            http_timeout: 2_000,
            http_paths: DEFAULT_HTTP_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a configuration targeting a specific network
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Default::default()
        }
    }

    /// Set the number and length of the standard wait cycles
    pub fn with_collection(mut self, attempts: u32, timeout_ms: u64) -> Self {
        self.collect_attempts = attempts;
        self.collect_timeout = timeout_ms;
        self
    }

    /// Set the number and length of the follow-up wait cycles
    pub fn with_retry(mut self, attempts: u32, timeout_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_timeout = timeout_ms;
        self
    }

    /// Set the TCP ports the range scanner probes
    pub fn with_scan_ports(mut self, ports: Vec<u16>) -> Self {
        self.scan_ports = ports;
        self
    }

    /// Set the collector's preferred local port
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the port used by the HTTP fallback
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Set the registry capacity
    pub fn with_max_devices(mut self, max: usize) -> Self {
        self.max_devices = max;
        self
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub fn collect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.collect_timeout)
    }

    pub fn retry_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.retry_timeout)
    }

    pub fn http_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.http_timeout)
    }

    pub fn bind_backoff_duration(&self) -> Duration {
        Duration::from_millis(self.bind_backoff)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            DiscoveryError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: DiscoveryConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from ~/.onvif-scout.toml, falling back to defaults
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".onvif-scout.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> DiscoveryResult<()> {
        if self.max_devices == 0 {
            return Err(DiscoveryError::ConfigError(
                "max_devices must be greater than 0".to_string(),
            ));
        }

        if self.scan_ports.is_empty() {
            return Err(DiscoveryError::ConfigError(
                "at least one scan port is required".to_string(),
            ));
        }

        if self.collect_attempts == 0 {
            return Err(DiscoveryError::ConfigError(
                "collect_attempts must be greater than 0".to_string(),
            ));
        }

        if self.http_paths.iter().any(|p| !p.starts_with('/')) {
            return Err(DiscoveryError::ConfigError(
                "HTTP fallback paths must start with '/'".to_string(),
            ));
        }

        Ok(())
    }
}
