//! Network range scanner: narrows a subnet down to hosts with an ONVIF-ish port open

use crate::config::DiscoveryConfig;
use crate::network::socket::tcp_connect_probe;
use crate::network::NetworkRange;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

/// Sequential TCP connect sweep over a network range
#[derive(Debug, Clone)]
pub struct RangeScanner {
    ports: Vec<u16>,
    timeout: Duration,
    max_candidates: usize,
}

impl RangeScanner {
    pub fn new(ports: Vec<u16>, timeout: Duration, max_candidates: usize) -> Self {
        Self {
            ports,
            timeout,
            max_candidates,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(
            config.scan_ports.clone(),
            config.connect_timeout_duration(),
            config.max_candidates,
        )
    }

    /// Hosts in `range` accepting a connection on any configured port, in
    /// ascending order, capped at the candidate capacity
    pub async fn scan(&self, range: &NetworkRange) -> Vec<Ipv4Addr> {
        let start = Instant::now();
        let mut candidates = Vec::new();

        log::info!(
            "Scanning {} ({} hosts) on ports {:?}",
            range,
            range.host_count(),
            self.ports
        );

        for host in range.hosts() {
            if candidates.len() >= self.max_candidates {
                log::debug!("Candidate capacity {} reached", self.max_candidates);
                break;
            }

            if self.probe_host(host).await {
                log::debug!("Candidate found: {}", host);
                candidates.push(host);
            }
        }

        log::info!(
            "Port scan of {} finished in {:?}: {} candidates",
            range,
            start.elapsed(),
            candidates.len()
        );

        candidates
    }

    /// First open port wins; later ports are not tried
    pub async fn probe_host(&self, host: Ipv4Addr) -> bool {
        for &port in &self.ports {
            if tcp_connect_probe(SocketAddrV4::new(host, port), self.timeout).await {
                return true;
            }
        }
        false
    }
}
