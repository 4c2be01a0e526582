//! Configuration loading and validation tests

use onvif_scout::config::{DiscoveryConfig, DEFAULT_HTTP_PATHS, WS_DISCOVERY_PORT};
use onvif_scout::DiscoveryError;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_toml_file() {
    let file = write_toml(
        r#"
network = "192.168.50.0/24"
max_devices = 20
scan_ports = [3702, 80, 8000]
listen_port = 0
collect_attempts = 3
collect_timeout = 2500
http_port = 8080
http_paths = ["/onvif/device_service"]
"#,
    );

    let config = DiscoveryConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.network, "192.168.50.0/24");
    assert_eq!(config.max_devices, 20);
    assert_eq!(config.scan_ports, vec![3702, 80, 8000]);
    assert_eq!(config.listen_port, 0);
    assert_eq!(config.collect_timeout_duration(), Duration::from_millis(2500));
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.http_paths, vec!["/onvif/device_service".to_string()]);
    assert_eq!(config.retry_attempts, 2);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let file = write_toml("max_devices = \"lots\"");
    assert!(matches!(
        DiscoveryConfig::from_toml_file(file.path()),
        Err(DiscoveryError::ConfigError(_))
    ));
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        DiscoveryConfig::from_toml_file(&missing),
        Err(DiscoveryError::ConfigError(_))
    ));
}

#[test]
fn test_invalid_values_fail_validation() {
    let file = write_toml("max_devices = 0");
    assert!(DiscoveryConfig::from_toml_file(file.path()).is_err());

    let file = write_toml("scan_ports = []");
    assert!(DiscoveryConfig::from_toml_file(file.path()).is_err());

    let file = write_toml("collect_attempts = 0");
    assert!(DiscoveryConfig::from_toml_file(file.path()).is_err());
}

#[test]
fn test_builders() {
    let config = DiscoveryConfig::new("10.1.0.0/16")
        .with_collection(2, 750)
        .with_retry(0, 0)
        .with_scan_ports(vec![8899])
        .with_listen_port(3703)
        .with_http_port(8080)
        .with_max_devices(7);

    assert_eq!(config.network, "10.1.0.0/16");
    assert_eq!(config.collect_attempts, 2);
    assert_eq!(config.collect_timeout_duration(), Duration::from_millis(750));
    assert_eq!(config.retry_attempts, 0);
    assert_eq!(config.scan_ports, vec![8899]);
    assert_eq!(config.listen_port, 3703);
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.max_devices, 7);
    assert!(config.validate().is_ok());
}

#[test]
fn test_defaults() {
    let config = DiscoveryConfig::default();
    assert_eq!(config.network, "auto");
    assert_eq!(config.listen_port, WS_DISCOVERY_PORT);
    assert_eq!(config.alternate_ports, vec![3703, 3704, 3705]);
    assert_eq!(config.http_paths.len(), DEFAULT_HTTP_PATHS.len());
    assert_eq!(config.http_timeout_duration(), Duration::from_secs(2));
    assert_eq!(config.retry_timeout_duration(), Duration::from_secs(3));
}
