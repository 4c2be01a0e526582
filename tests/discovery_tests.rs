//! End-to-end discovery tests against loopback fakes

mod common;

use onvif_scout::discovery::collector::ResponseCollector;
use onvif_scout::discovery::{DeviceRecord, DiscoveryService, HTTP_MODEL};
use onvif_scout::{DiscoveryConfig, DiscoveryError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use tokio::net::TcpListener;

const CAMERA_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);

/// Loopback config with short waits and no fixed ports
fn loopback_config(network: &str) -> DiscoveryConfig {
    let mut config = DiscoveryConfig::new(network)
        .with_listen_port(0)
        .with_collection(1, 100)
        .with_retry(1, 100);
    config.alternate_ports = Vec::new();
    config
}

fn send_to(port: u16, payload: &str) {
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender.send_to(payload.as_bytes(), ("127.0.0.1", port)).unwrap();
}

#[tokio::test]
async fn test_collector_dedups_and_ignores_probes() {
    let collector = ResponseCollector::bind(&loopback_config("auto")).await.unwrap();
    let port = collector.local_port();

    send_to(port, &common::probe_match("http://10.0.0.5/onvif/device_service"));
    send_to(port, "<d:Probe><d:Types>dn:NetworkVideoTransmitter</d:Types></d:Probe>");
    send_to(port, &common::probe_match("http://10.0.0.5:8080/onvif/device_service"));
    send_to(port, &common::probe_match("http://10.0.0.6/onvif/device_service"));

    let devices = collector.collect(2, Duration::from_millis(500), 10).await;
    let ips: Vec<_> = devices.iter().map(|d| d.ip_address.as_str()).collect();

    assert_eq!(ips, vec!["10.0.0.5", "10.0.0.6"]);
    assert_eq!(devices[0].device_service, "http://10.0.0.5/onvif/device_service");
}

#[tokio::test]
async fn test_collector_respects_capacity() {
    let collector = ResponseCollector::bind(&loopback_config("auto")).await.unwrap();
    let port = collector.local_port();

    for host in 1..=4 {
        send_to(port, &common::probe_match(&format!("http://10.0.1.{}/onvif/device_service", host)));
    }

    let devices = collector.collect(3, Duration::from_millis(500), 2).await;
    assert_eq!(devices.len(), 2);
}

#[tokio::test]
async fn test_collector_silence_returns_empty() {
    let collector = ResponseCollector::bind(&loopback_config("auto")).await.unwrap();
    let devices = collector.collect(2, Duration::from_millis(50), 10).await;
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_unicast_probe_finds_camera() {
    // TCP port for the range scan, UDP responder for the probes
    let tcp = TcpListener::bind((CAMERA_IP, 0)).await.unwrap();
    let camera = UdpSocket::bind((CAMERA_IP, 0)).unwrap();
    camera.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let camera_port = camera.local_addr().unwrap().port();

    let responder = std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        let mut answered = 0;
        while let Ok((len, from)) = camera.recv_from(&mut buf) {
            let probe = String::from_utf8_lossy(&buf[..len]);
            if probe.contains("Probe") && probe.contains("MessageID") {
                let reply = common::probe_match("http://127.0.0.2/onvif/device_service");
                camera.send_to(reply.as_bytes(), from).unwrap();
                answered += 1;
            }
            if answered == 2 {
                break;
            }
        }
        answered
    });

    let mut config = loopback_config("127.0.0.0/29")
        .with_scan_ports(vec![tcp.local_addr().unwrap().port()])
        .with_collection(3, 1000);
    config.probe_ports = vec![camera_port];

    let service = DiscoveryService::new(config);
    let report = service.run("127.0.0.0/29", 10, None).await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.strategy.as_deref(), Some("unicast-probe"));
    assert_eq!(report.devices.len(), 1);
    assert_eq!(report.devices[0].ip_address, "127.0.0.2");
    assert_eq!(service.get_discovered_devices(10), report.devices);

    assert_eq!(responder.join().unwrap(), 2);
}

const DATE_AND_TIME_REPLY: &str =
    "<s:Envelope><s:Body><GetSystemDateAndTimeResponse/></s:Body></s:Envelope>";

#[tokio::test]
async fn test_http_fallback_walks_paths_in_order() {
    let server = common::serve(IpAddr::V4(CAMERA_IP), |path, _body| {
        if path == "/onvif/device" {
            (200, DATE_AND_TIME_REPLY.to_string())
        } else {
            (404, String::new())
        }
    })
    .await;
    let port = server.addr.port();

    let mut config = loopback_config("127.0.0.0/29")
        .with_scan_ports(vec![port])
        .with_http_port(port);
    config.probe_ports = vec![9];

    let service = DiscoveryService::new(config);
    let report = service.run("127.0.0.0/29", 10, None).await.unwrap();

    assert_eq!(report.strategy.as_deref(), Some("http-fallback"));
    assert_eq!(report.devices.len(), 1);

    let device = &report.devices[0];
    assert_eq!(device.ip_address, "127.0.0.2");
    assert_eq!(device.model, HTTP_MODEL);
    assert_eq!(device.device_service, format!("http://127.0.0.2:{}/onvif/device", port));
    assert!(device.device_service.ends_with("/onvif/device"));

    assert_eq!(server.paths(), vec!["/onvif/device_service", "/onvif/services", "/onvif/device"]);
    assert!(server.requests()[0].body.contains("GetSystemDateAndTime"));
}

#[tokio::test]
async fn test_http_fallback_moves_on_to_next_candidate() {
    // 127.0.0.4 never answers 2xx; 127.0.0.5 answers on the second path
    let silent_ip = Ipv4Addr::new(127, 0, 0, 4);
    let answering_ip = Ipv4Addr::new(127, 0, 0, 5);

    let silent = common::serve(IpAddr::V4(silent_ip), |_path, _body| (404, String::new())).await;
    let port = silent.addr.port();
    let answering = common::serve_at(SocketAddr::from((answering_ip, port)), |path, _body| {
        if path == "/onvif/services" {
            (200, DATE_AND_TIME_REPLY.to_string())
        } else {
            (404, String::new())
        }
    })
    .await;

    let mut config = loopback_config("127.0.0.0/29")
        .with_scan_ports(vec![port])
        .with_http_port(port);
    config.probe_ports = vec![9];

    let service = DiscoveryService::new(config);
    let report = service.run("127.0.0.0/29", 10, None).await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.strategy.as_deref(), Some("http-fallback"));
    assert_eq!(report.devices.len(), 1);
    assert_eq!(report.devices[0].ip_address, "127.0.0.5");
    assert_eq!(
        report.devices[0].device_service,
        format!("http://127.0.0.5:{}/onvif/services", port)
    );

    assert_eq!(silent.paths(), vec!["/onvif/device_service", "/onvif/services", "/onvif/device"]);
    assert_eq!(answering.paths(), vec!["/onvif/device_service", "/onvif/services"]);
}

#[tokio::test]
async fn test_auto_without_interfaces_keeps_registry() {
    let mut config = loopback_config("auto");
    config.max_interfaces = 0;
    let service = DiscoveryService::new(config);
    service
        .registry()
        .replace(vec![DeviceRecord::new("10.0.0.1", "http://10.0.0.1/onvif/device_service", "unknown")]);

    let result = service.discover_onvif_devices("auto", 5).await;

    assert!(matches!(result, Err(DiscoveryError::NoNetwork)));
    assert_eq!(service.get_discovered_devices(5).len(), 1);
}

#[tokio::test]
async fn test_empty_network_publishes_empty_registry() {
    let service = DiscoveryService::new(loopback_config("127.0.0.0/31"));
    service
        .registry()
        .replace(vec![DeviceRecord::new("10.0.0.1", "http://10.0.0.1/onvif/device_service", "unknown")]);

    let devices = service
        .discover_onvif_devices_with_timeout("127.0.0.0/31", 5, 1, Duration::from_millis(50))
        .await
        .unwrap();

    assert!(devices.is_empty());
    assert!(service.get_discovered_devices(5).is_empty());
}

#[tokio::test]
async fn test_capacity_above_registry_is_clamped() {
    let service = DiscoveryService::new(loopback_config("127.0.0.0/31").with_max_devices(3));
    let report = service.run("127.0.0.0/31", 50, None).await.unwrap();
    assert!(report.devices.len() <= 3);
    assert_eq!(report.network, "127.0.0.0/31");
}
