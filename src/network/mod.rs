//! Network module: target range resolution and socket helpers

pub mod socket;

use crate::error::{DiscoveryError, DiscoveryResult};
use ipnetwork::{IpNetwork, Ipv4Network};
use std::fmt;
use std::net::Ipv4Addr;

/// WS-Discovery multicast group
pub const ONVIF_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Prefix assumed when a bare address is given
const DEFAULT_PREFIX: u8 = 24;

/// An IPv4 network to search for devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRange {
    network: Ipv4Network,
}

impl NetworkRange {
    /// Wrap an already parsed network
    pub fn new(network: Ipv4Network) -> Self {
        Self { network }
    }

    /// Parse `a.b.c.d/nn`, `a.b.c.d/m.m.m.m` or a bare `a.b.c.d` (taken as /24)
    pub fn parse(spec: &str) -> DiscoveryResult<Self> {
        let spec = spec.trim();
        let invalid =
            || DiscoveryError::InvalidArgument(format!("Unparseable network: {:?}", spec));

        let (addr_part, mask_part) = match spec.split_once('/') {
            Some((addr, mask)) => (addr.trim(), Some(mask.trim())),
            None => (spec, None),
        };

        let addr: Ipv4Addr = addr_part.parse().map_err(|_| invalid())?;

        let prefix = match mask_part {
            None => DEFAULT_PREFIX,
            Some(mask) if mask.contains('.') => {
                let mask: Ipv4Addr = mask.parse().map_err(|_| invalid())?;
                ipnetwork::ipv4_mask_to_prefix(mask).map_err(|_| invalid())?
            }
            Some(prefix) => prefix.parse::<u8>().map_err(|_| invalid())?,
        };

        let network = Ipv4Network::new(addr, prefix).map_err(|_| invalid())?;
        Ok(Self { network })
    }

    /// Resolve a caller-supplied specifier; empty or "auto" triggers auto-detection
    pub fn resolve(spec: &str, max_interfaces: usize) -> DiscoveryResult<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Self::auto_detect(max_interfaces)
        } else {
            Self::parse(trimmed)
        }
    }

    /// Use the first IPv4 prefix of an up, non-loopback local interface
    pub fn auto_detect(max_interfaces: usize) -> DiscoveryResult<Self> {
        let prefixes = local_prefixes(max_interfaces);
        log::debug!("Local IPv4 prefixes: {:?}", prefixes);

        prefixes
            .into_iter()
            .next()
            .map(Self::new)
            .ok_or(DiscoveryError::NoNetwork)
    }

    pub fn network_address(&self) -> Ipv4Addr {
        self.network.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.network.broadcast()
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// Hosts from `network + 2` through `broadcast - 1`, ascending.
    /// The first usable address (usually the gateway) is never visited.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let (first, end) = self.host_bounds();
        (first..end).map(Ipv4Addr::from)
    }

    /// Number of addresses `hosts()` yields
    pub fn host_count(&self) -> usize {
        let (first, end) = self.host_bounds();
        end.saturating_sub(first) as usize
    }

    fn host_bounds(&self) -> (u32, u32) {
        let first = u32::from(self.network_address()).saturating_add(2);
        let end = u32::from(self.broadcast());
        (first, end.max(first))
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_address(), self.prefix())
    }
}

/// Up to `max` IPv4 prefixes from up, non-loopback interfaces
pub fn local_prefixes(max: usize) -> Vec<Ipv4Network> {
    pnet::datalink::interfaces()
        .into_iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback())
        .flat_map(|iface| iface.ips.into_iter())
        .filter_map(|ip| match ip {
            IpNetwork::V4(net) if !net.ip().is_loopback() && !net.ip().is_link_local() => Some(net),
            _ => None,
        })
        .take(max)
        .collect()
}
