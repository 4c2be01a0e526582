//! Discovery strategies: unicast probe, broadcast/multicast probe, HTTP fallback

use super::collector::ResponseCollector;
use super::{CollectPlan, DeviceRecord, DiscoveryContext, DiscoveryStrategy, HTTP_MODEL};
use crate::config::DiscoveryConfig;
use reqwest::header::CONTENT_TYPE;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Unauthenticated request every ONVIF device must answer
const GET_SYSTEM_DATE_AND_TIME: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    <GetSystemDateAndTime xmlns="http://www.onvif.org/ver10/device/wsdl"/>
  </s:Body>
</s:Envelope>"#;

const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Standard collection, then a shorter one if nothing answered
async fn collect_with_retry(
    collector: &ResponseCollector,
    standard: CollectPlan,
    retry: CollectPlan,
    capacity: usize,
) -> Option<Vec<DeviceRecord>> {
    let mut devices = collector.collect(standard.attempts, standard.timeout, capacity).await;

    if devices.is_empty() && retry.attempts > 0 {
        log::info!("No replies yet, retrying with {:?} timeout", retry.timeout);
        devices = collector.collect(retry.attempts, retry.timeout, capacity).await;
    }

    (!devices.is_empty()).then_some(devices)
}

/// WS-Discovery probes sent straight to port-scan candidates
#[derive(Debug, Clone, Default)]
pub struct UnicastProbe {
    ports: Vec<u16>,
}

impl UnicastProbe {
    pub fn new(ports: Vec<u16>) -> Self {
        Self { ports }
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for UnicastProbe {
    async fn try_discover(&self, ctx: &mut DiscoveryContext) -> Option<Vec<DeviceRecord>> {
        if ctx.candidates.is_empty() {
            return None;
        }

        let candidates = ctx.candidates.clone();
        let (standard, retry, capacity) = (ctx.standard, ctx.retry, ctx.capacity);
        let collector = ctx.collector().await?;

        collector
            .sender()
            .probe_candidates(collector.socket(), &candidates, &self.ports)
            .await;
        collect_with_retry(collector, standard, retry, capacity).await
    }

    fn name(&self) -> &str {
        "unicast-probe"
    }
}

/// WS-Discovery probes to the subnet broadcast address and the multicast group
#[derive(Debug, Clone, Default)]
pub struct BroadcastProbe;

#[async_trait::async_trait]
impl DiscoveryStrategy for BroadcastProbe {
    async fn try_discover(&self, ctx: &mut DiscoveryContext) -> Option<Vec<DeviceRecord>> {
        if !ctx.candidates.is_empty() {
            return None;
        }

        let broadcast = ctx.network.broadcast();
        let (standard, retry, capacity) = (ctx.standard, ctx.retry, ctx.capacity);
        let collector = ctx.collector().await?;

        collector.sender().probe_broadcast(collector.socket(), broadcast).await;
        collect_with_retry(collector, standard, retry, capacity).await
    }

    fn name(&self) -> &str {
        "broadcast-probe"
    }
}

/// Direct SOAP POSTs to well-known service paths on each candidate
#[derive(Debug, Clone)]
pub struct HttpFallback {
    port: u16,
    paths: Vec<String>,
    timeout: Duration,
}

impl HttpFallback {
    pub fn new(port: u16, paths: Vec<String>, timeout: Duration) -> Self {
        Self { port, paths, timeout }
    }

    pub fn service_url(&self, ip: Ipv4Addr, path: &str) -> String {
        if self.port == 80 {
            format!("http://{}{}", ip, path)
        } else {
            format!("http://{}:{}{}", ip, self.port, path)
        }
    }

    /// Try each path in order; the first 2xx identifies the device
    pub async fn probe_host(&self, client: &reqwest::Client, ip: Ipv4Addr) -> Option<DeviceRecord> {
        for path in &self.paths {
            let url = self.service_url(ip, path);
            let response = client
                .post(&url)
                .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
                .body(GET_SYSTEM_DATE_AND_TIME)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    log::info!("HTTP fallback found ONVIF service at {}", url);
                    return Some(DeviceRecord::new(&ip.to_string(), &url, HTTP_MODEL));
                }
                Ok(resp) => log::debug!("{} answered {}", url, resp.status()),
                Err(e) => log::debug!("{} failed: {}", url, e),
            }
        }
        None
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for HttpFallback {
    async fn try_discover(&self, ctx: &mut DiscoveryContext) -> Option<Vec<DeviceRecord>> {
        if ctx.candidates.is_empty() {
            return None;
        }

        let client = match reqwest::Client::builder().timeout(self.timeout).no_proxy().build() {
            Ok(client) => client,
            Err(e) => {
                log::error!("HTTP fallback unavailable: {}", e);
                return None;
            }
        };

        log::info!("Falling back to HTTP probing of {} candidates", ctx.candidates.len());

        let mut devices = Vec::new();
        for &ip in &ctx.candidates {
            if devices.len() >= ctx.capacity {
                break;
            }
            if let Some(device) = self.probe_host(&client, ip).await {
                devices.push(device);
            }
        }

        (!devices.is_empty()).then_some(devices)
    }

    fn name(&self) -> &str {
        "http-fallback"
    }
}

/// Enum wrapper so the chain can be a plain `Vec`
#[derive(Debug, Clone)]
pub enum StrategyKind {
    Unicast(UnicastProbe),
    Broadcast(BroadcastProbe),
    Http(HttpFallback),
}

impl StrategyKind {
    /// Unicast probe, broadcast/multicast probe, HTTP fallback
    pub fn default_chain(config: &DiscoveryConfig) -> Vec<StrategyKind> {
        vec![
            StrategyKind::Unicast(UnicastProbe::new(config.probe_ports.clone())),
            StrategyKind::Broadcast(BroadcastProbe),
            StrategyKind::Http(HttpFallback::new(
                config.http_port,
                config.http_paths.clone(),
                config.http_timeout_duration(),
            )),
        ]
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for StrategyKind {
    async fn try_discover(&self, ctx: &mut DiscoveryContext) -> Option<Vec<DeviceRecord>> {
        match self {
            StrategyKind::Unicast(strategy) => strategy.try_discover(ctx).await,
            StrategyKind::Broadcast(strategy) => strategy.try_discover(ctx).await,
            StrategyKind::Http(strategy) => strategy.try_discover(ctx).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            StrategyKind::Unicast(strategy) => strategy.name(),
            StrategyKind::Broadcast(strategy) => strategy.name(),
            StrategyKind::Http(strategy) => strategy.name(),
        }
    }
}
