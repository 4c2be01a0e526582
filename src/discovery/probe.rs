//! WS-Discovery probe construction and transmission

use crate::config::WS_DISCOVERY_PORT;
use crate::network::ONVIF_MULTICAST_ADDR;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;
use uuid::Uuid;

const WSD_ACTION_PROBE: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";
const WSD_TO: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";

/// Probe message flavors; some firmwares only answer one of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVariant {
    /// Standard probe for `dn:NetworkVideoTransmitter`
    NetworkVideoTransmitter,
    /// Vendor-compatible probe for `tds:Device`
    Device,
}

impl ProbeVariant {
    pub const ALL: [ProbeVariant; 2] =
        [ProbeVariant::NetworkVideoTransmitter, ProbeVariant::Device];

    /// Render the SOAP envelope with the given message id
    pub fn render(&self, message_id: Uuid) -> String {
        match self {
            ProbeVariant::NetworkVideoTransmitter => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing">
  <s:Header>
    <a:Action s:mustUnderstand="1">{action}</a:Action>
    <a:MessageID>urn:uuid:{id}</a:MessageID>
    <a:ReplyTo><a:Address>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</a:Address></a:ReplyTo>
    <a:To s:mustUnderstand="1">{to}</a:To>
  </s:Header>
  <s:Body>
    <Probe xmlns="http://schemas.xmlsoap.org/ws/2005/04/discovery">
      <d:Types xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery" xmlns:dp0="http://www.onvif.org/ver10/network/wsdl">dp0:NetworkVideoTransmitter</d:Types>
    </Probe>
  </s:Body>
</s:Envelope>"#,
                action = WSD_ACTION_PROBE,
                id = message_id,
                to = WSD_TO,
            ),
            ProbeVariant::Device => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:tns="http://schemas.xmlsoap.org/ws/2005/04/discovery" xmlns:tds="http://www.onvif.org/ver10/device/wsdl">
  <SOAP-ENV:Header>
    <wsa:MessageID>uuid:{id}</wsa:MessageID>
    <wsa:To SOAP-ENV:mustUnderstand="true">{to}</wsa:To>
    <wsa:Action SOAP-ENV:mustUnderstand="true">{action}</wsa:Action>
  </SOAP-ENV:Header>
  <SOAP-ENV:Body>
    <tns:Probe>
      <tns:Types>tds:Device</tns:Types>
    </tns:Probe>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
                action = WSD_ACTION_PROBE,
                id = message_id,
                to = WSD_TO,
            ),
        }
    }
}

/// Fire-and-forget sender for the probe family
#[derive(Debug, Clone)]
pub struct ProbeSender {
    variants: Vec<ProbeVariant>,
}

impl Default for ProbeSender {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeSender {
    pub fn new() -> Self {
        Self {
            variants: ProbeVariant::ALL.to_vec(),
        }
    }

    /// Fresh messages, one per variant, each with its own UUID
    pub fn messages(&self) -> Vec<(Uuid, String)> {
        self.variants
            .iter()
            .map(|variant| {
                let id = Uuid::new_v4();
                (id, variant.render(id))
            })
            .collect()
    }

    /// Send every variant to `dest`; returns how many datagrams left the socket
    pub async fn send_probes(&self, socket: &UdpSocket, target: &str, dest: SocketAddr) -> usize {
        let mut sent = 0;
        for (id, message) in self.messages() {
            match socket.send_to(message.as_bytes(), dest).await {
                Ok(_) => {
                    log::debug!("Probe {} sent to {} via {}", id, target, dest);
                    sent += 1;
                }
                Err(e) => log::debug!("Probe to {} via {} failed: {}", target, dest, e),
            }
        }
        sent
    }

    /// Unicast probes to each candidate on each port
    pub async fn probe_candidates(
        &self,
        socket: &UdpSocket,
        candidates: &[Ipv4Addr],
        ports: &[u16],
    ) -> usize {
        let mut sent = 0;
        for ip in candidates {
            let target = ip.to_string();
            for &port in ports {
                let dest = SocketAddr::V4(SocketAddrV4::new(*ip, port));
                sent += self.send_probes(socket, &target, dest).await;
            }
        }
        log::info!("Sent {} unicast probes to {} candidates", sent, candidates.len());
        sent
    }

    /// Probes to the subnet broadcast address and the ONVIF multicast group
    pub async fn probe_broadcast(&self, socket: &UdpSocket, broadcast: Ipv4Addr) -> usize {
        let mut sent = 0;
        for addr in [broadcast, ONVIF_MULTICAST_ADDR] {
            let dest = SocketAddr::V4(SocketAddrV4::new(addr, WS_DISCOVERY_PORT));
            sent += self.send_probes(socket, &addr.to_string(), dest).await;
        }
        log::info!("Sent {} broadcast/multicast probes", sent);
        sent
    }
}
