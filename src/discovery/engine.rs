//! Discovery orchestrator

use super::methods::StrategyKind;
use super::registry::DeviceRegistry;
use super::{CollectPlan, DeviceRecord, DiscoveryContext, DiscoveryStrategy};
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::network::NetworkRange;
use crate::scanner::RangeScanner;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Summary of one discovery run
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub network: String,
    pub candidates: usize,
    /// Strategy that produced the devices, if any did
    pub strategy: Option<String>,
    pub devices: Vec<DeviceRecord>,
    pub elapsed: Duration,
}

/// Application-scoped discovery service owning the device registry
pub struct DiscoveryService {
    config: DiscoveryConfig,
    registry: DeviceRegistry,
    strategies: Vec<StrategyKind>,
}

impl DiscoveryService {
    pub fn new(config: DiscoveryConfig) -> Self {
        let strategies = StrategyKind::default_chain(&config);
        Self {
            registry: DeviceRegistry::new(config.max_devices),
            config,
            strategies,
        }
    }

    /// Replace the strategy chain
    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Discover devices on `network` ("auto", empty, or CIDR-like) and
    /// publish them to the registry. Zero devices is not an error.
    pub async fn discover_onvif_devices(
        &self,
        network: &str,
        capacity: usize,
    ) -> DiscoveryResult<Vec<DeviceRecord>> {
        let report = self.run(network, capacity, None).await?;
        Ok(report.devices)
    }

    /// Same as [`discover_onvif_devices`](Self::discover_onvif_devices) with a
    /// caller-chosen wait budget for the standard collection
    pub async fn discover_onvif_devices_with_timeout(
        &self,
        network: &str,
        capacity: usize,
        attempts: u32,
        timeout: Duration,
    ) -> DiscoveryResult<Vec<DeviceRecord>> {
        if attempts == 0 || timeout.is_zero() {
            return Err(DiscoveryError::InvalidArgument(
                "attempts and timeout must be non-zero".to_string(),
            ));
        }

        let plan = CollectPlan { attempts, timeout };
        let report = self.run(network, capacity, Some(plan)).await?;
        Ok(report.devices)
    }

    /// Copy of the last run's devices, at most `max`
    pub fn get_discovered_devices(&self, max: usize) -> Vec<DeviceRecord> {
        self.registry.snapshot(max)
    }

    /// Full run returning a report
    pub async fn run(
        &self,
        network: &str,
        capacity: usize,
        plan: Option<CollectPlan>,
    ) -> DiscoveryResult<DiscoveryReport> {
        if capacity == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "output capacity must be greater than 0".to_string(),
            ));
        }

        let start = Instant::now();
        let capacity = capacity.min(self.registry.capacity());

        let range = NetworkRange::resolve(network, self.config.max_interfaces)?;
        log::info!("Starting ONVIF discovery on {}", range);

        let candidates = RangeScanner::from_config(&self.config).scan(&range).await;
        let candidate_count = candidates.len();

        let mut ctx = DiscoveryContext::new(self.config.clone(), range, candidates, capacity);
        if let Some(plan) = plan {
            ctx = ctx.with_standard_plan(plan);
        }

        let mut devices = Vec::new();
        let mut strategy = None;
        for step in &self.strategies {
            log::debug!("Trying strategy {}", step.name());
            if let Some(found) = step.try_discover(&mut ctx).await {
                log::info!("Strategy {} found {} devices", step.name(), found.len());
                strategy = Some(step.name().to_string());
                devices = found;
                break;
            }
        }
        devices.truncate(capacity);

        self.registry.replace(devices.clone());

        let elapsed = start.elapsed();
        log::info!("Discovery on {} finished in {:?}: {} devices", range, elapsed, devices.len());

        Ok(DiscoveryReport {
            network: range.to_string(),
            candidates: candidate_count,
            strategy,
            devices,
            elapsed,
        })
    }
}
