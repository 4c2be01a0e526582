//! Socket construction and connectivity probes

use super::ONVIF_MULTICAST_ADDR;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpSocket;

/// Non-blocking TCP connect bounded by `timeout`.
///
/// Socket creation failures are treated the same as a closed port.
pub async fn tcp_connect_probe(addr: SocketAddrV4, timeout: Duration) -> bool {
    let socket = match TcpSocket::new_v4() {
        Ok(socket) => socket,
        Err(e) => {
            log::debug!("Could not create probe socket for {}: {}", addr, e);
            return false;
        }
    };

    match tokio::time::timeout(timeout, socket.connect(SocketAddr::V4(addr))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(_)) => false,
        Err(_) => false,
    }
}

/// UDP socket for WS-Discovery: address reuse, broadcast, non-blocking
pub fn discovery_socket(port: u16) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&bind_addr.into())?;

    Ok(socket.into())
}

/// Join the ONVIF multicast group on the default interface
pub fn join_onvif_multicast(socket: &std::net::UdpSocket) -> io::Result<()> {
    socket.join_multicast_v4(&ONVIF_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_socket_on_ephemeral_port() {
        let socket = discovery_socket(0).expect("ephemeral bind");
        let local = socket.local_addr().unwrap();
        assert_ne!(local.port(), 0);
        assert!(socket.broadcast().unwrap());
    }

    #[tokio::test]
    async fn test_connect_probe_sees_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
        assert!(tcp_connect_probe(addr, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_connect_probe_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
        assert!(!tcp_connect_probe(addr, Duration::from_millis(200)).await);
    }
}
