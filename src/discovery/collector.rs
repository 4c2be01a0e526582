//! Response collection: bind, wait, re-probe, drain, deduplicate

use super::parser::parse_probe_match;
use super::probe::ProbeSender;
use super::DeviceRecord;
use crate::config::{DiscoveryConfig, WS_DISCOVERY_PORT};
use crate::error::{retry_delay, DiscoveryError, DiscoveryResult};
use crate::network::socket::{discovery_socket, join_onvif_multicast};
use std::collections::HashSet;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest datagram we accept; WS-Discovery caps messages at 32767 bytes
const RECV_BUFFER_SIZE: usize = 32 * 1024;

/// Owns the discovery socket for one run
#[derive(Debug)]
pub struct ResponseCollector {
    socket: UdpSocket,
    local_port: u16,
    sender: ProbeSender,
    /// Where a timed-out wait cycle sends its fresh probe
    reprobe_target: SocketAddr,
}

impl ResponseCollector {
    /// Bind the preferred port, retrying with backoff, then alternates, then
    /// an ephemeral port. Only failing all of them is an error.
    pub async fn bind(config: &DiscoveryConfig) -> DiscoveryResult<Self> {
        let preferred = config.listen_port;
        let attempts = if preferred == 0 { 1 } else { config.bind_retries.max(1) };

        for attempt in 1..=attempts {
            match Self::bind_port(preferred) {
                Ok(collector) => return Ok(collector),
                Err(e) => {
                    log::warn!(
                        "Bind to port {} failed (attempt {}/{}): {}",
                        preferred,
                        attempt,
                        attempts,
                        e
                    );
                    if attempt < attempts {
                        let delay = retry_delay(config.bind_backoff_duration(), attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        for &port in config.alternate_ports.iter().chain(std::iter::once(&0)) {
            match Self::bind_port(port) {
                Ok(collector) => {
                    log::warn!(
                        "Collecting on port {} instead of {}; multicast replies may be missed",
                        collector.local_port,
                        preferred
                    );
                    return Ok(collector);
                }
                Err(e) => log::debug!("Alternate port {} unavailable: {}", port, e),
            }
        }

        Err(DiscoveryError::ResourceExhaustion(
            "could not bind any UDP socket for discovery".to_string(),
        ))
    }

    fn bind_port(port: u16) -> io::Result<Self> {
        let std_socket = discovery_socket(port)?;
        if let Err(e) = join_onvif_multicast(&std_socket) {
            log::debug!("Could not join multicast group on port {}: {}", port, e);
        }

        let local_port = std_socket.local_addr()?.port();
        let socket = UdpSocket::from_std(std_socket)?;

        Ok(Self {
            socket,
            local_port,
            sender: ProbeSender::new(),
            reprobe_target: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::BROADCAST,
                WS_DISCOVERY_PORT,
            )),
        })
    }

    pub fn with_reprobe_target(mut self, target: SocketAddr) -> Self {
        self.reprobe_target = target;
        self
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn sender(&self) -> &ProbeSender {
        &self.sender
    }

    /// Run up to `attempts` wait cycles of `per_attempt` each.
    ///
    /// A cycle that times out re-probes the limited broadcast address (or the
    /// configured re-probe target). A cycle that sees traffic drains everything
    /// pending. At most `capacity` devices are returned, unique by IP, first
    /// seen wins.
    pub async fn collect(
        &self,
        attempts: u32,
        per_attempt: Duration,
        capacity: usize,
    ) -> Vec<DeviceRecord> {
        let mut devices = Vec::new();
        let mut seen = HashSet::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        for attempt in 1..=attempts {
            if devices.len() >= capacity {
                break;
            }

            match tokio::time::timeout(per_attempt, self.socket.recv_from(&mut buf)).await {
                Err(_) => {
                    log::debug!("Wait cycle {}/{} timed out, re-probing", attempt, attempts);
                    self.sender
                        .send_probes(&self.socket, "re-probe", self.reprobe_target)
                        .await;
                }
                Ok(Err(e)) => {
                    log::warn!("Discovery socket receive failed: {}", e);
                    break;
                }
                Ok(Ok((len, from))) => {
                    accept(&buf[..len], from, &mut devices, &mut seen, capacity);
                    if let Err(e) = self.drain(&mut buf, &mut devices, &mut seen, capacity) {
                        log::warn!("Discovery socket drain failed: {}", e);
                        break;
                    }
                }
            }
        }

        log::info!("Collected {} unique devices on port {}", devices.len(), self.local_port);
        devices
    }

    fn drain(
        &self,
        buf: &mut [u8],
        devices: &mut Vec<DeviceRecord>,
        seen: &mut HashSet<String>,
        capacity: usize,
    ) -> io::Result<()> {
        while devices.len() < capacity {
            match self.socket.try_recv_from(buf) {
                Ok((len, from)) => accept(&buf[..len], from, devices, seen, capacity),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn accept(
    payload: &[u8],
    from: SocketAddr,
    devices: &mut Vec<DeviceRecord>,
    seen: &mut HashSet<String>,
    capacity: usize,
) {
    if devices.len() >= capacity {
        return;
    }

    match parse_probe_match(payload) {
        Some(record) => {
            if seen.insert(record.ip_address.clone()) {
                log::info!(
                    "Device {} ({}) answered from {}",
                    record.ip_address,
                    record.model,
                    from
                );
                devices.push(record);
            } else {
                log::debug!("Duplicate reply for {} from {} dropped", record.ip_address, from);
            }
        }
        None => log::debug!("Ignoring {} byte datagram from {}", payload.len(), from),
    }
}
