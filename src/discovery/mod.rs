//! ONVIF device discovery
//!
//! A run resolves the target network, sweeps it for hosts with the
//! WS-Discovery or HTTP port open, and then walks an ordered chain of
//! strategies (unicast probe, broadcast/multicast probe, HTTP fallback) until
//! one of them turns up devices. The result replaces the service's registry.

pub mod collector;
pub mod engine;
pub mod methods;
pub mod parser;
pub mod probe;
pub mod registry;

use crate::config::DiscoveryConfig;
use crate::network::NetworkRange;
use chrono::{DateTime, Utc};
use collector::ResponseCollector;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

pub use engine::{DiscoveryReport, DiscoveryService};
pub use methods::{BroadcastProbe, HttpFallback, StrategyKind, UnicastProbe};
pub use registry::DeviceRegistry;

/// Model label when the device did not say what it is
pub const UNKNOWN_MODEL: &str = "unknown";

/// Model label for devices found by the HTTP fallback
pub const HTTP_MODEL: &str = "unknown via HTTP";

/// A discovered device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Host taken from the advertised service URL, not the reply's source address
    pub ip_address: String,
    pub device_service: String,
    /// Same value as `device_service`
    pub endpoint: String,
    pub model: String,
    pub discovery_time: DateTime<Utc>,
    pub online: bool,
}

impl DeviceRecord {
    pub fn new(ip_address: &str, service_url: &str, model: &str) -> Self {
        Self {
            ip_address: ip_address.to_string(),
            device_service: service_url.to_string(),
            endpoint: service_url.to_string(),
            model: model.to_string(),
            discovery_time: Utc::now(),
            online: true,
        }
    }
}

/// Wait budget for one collection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectPlan {
    pub attempts: u32,
    pub timeout: Duration,
}

/// Per-run state shared by the strategies
pub struct DiscoveryContext {
    pub config: DiscoveryConfig,
    pub network: NetworkRange,
    pub candidates: Vec<Ipv4Addr>,
    pub capacity: usize,
    pub standard: CollectPlan,
    pub retry: CollectPlan,
    collector: Option<ResponseCollector>,
    collector_failed: bool,
}

impl DiscoveryContext {
    pub fn new(
        config: DiscoveryConfig,
        network: NetworkRange,
        candidates: Vec<Ipv4Addr>,
        capacity: usize,
    ) -> Self {
        let standard = CollectPlan {
            attempts: config.collect_attempts,
            timeout: config.collect_timeout_duration(),
        };
        let retry = CollectPlan {
            attempts: config.retry_attempts,
            timeout: config.retry_timeout_duration(),
        };

        Self {
            config,
            network,
            candidates,
            capacity,
            standard,
            retry,
            collector: None,
            collector_failed: false,
        }
    }

    pub fn with_standard_plan(mut self, plan: CollectPlan) -> Self {
        self.standard = plan;
        self
    }

    /// The run's collector, bound on first use. A bind failure is remembered
    /// so later strategies do not retry it.
    pub async fn collector(&mut self) -> Option<&ResponseCollector> {
        if self.collector.is_none() && !self.collector_failed {
            match ResponseCollector::bind(&self.config).await {
                Ok(collector) => self.collector = Some(collector),
                Err(e) => {
                    log::error!("UDP discovery unavailable: {}", e);
                    self.collector_failed = true;
                }
            }
        }
        self.collector.as_ref()
    }
}

/// One link in the fallback chain
#[async_trait::async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Devices found, or `None` when the strategy does not apply or found nothing
    async fn try_discover(&self, ctx: &mut DiscoveryContext) -> Option<Vec<DeviceRecord>>;
    fn name(&self) -> &str;
}
