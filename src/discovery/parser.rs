//! Lenient WS-Discovery ProbeMatch parsing
//!
//! Cameras send anything from textbook SOAP to truncated, oddly prefixed
//! fragments. Elements are matched by local name with plain string scanning,
//! no validating XML parser.

use super::{DeviceRecord, UNKNOWN_MODEL};
use chrono::Utc;

/// Label recorded for devices advertising the ONVIF video transmitter type
pub const NVT_MODEL: &str = "NetworkVideoTransmitter";

/// Parse one datagram into a device record.
///
/// Returns `None` for our own (or anyone's) outbound probes, for payloads
/// with no ONVIF keyword at all, and when no service address can be found.
pub fn parse_probe_match(payload: &[u8]) -> Option<DeviceRecord> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    let text = String::from_utf8_lossy(&payload[..end]);

    if is_outbound_probe(&text) || !looks_like_onvif(&text) {
        return None;
    }

    let xaddrs = extract_xaddrs(&text)?;
    let service_url = xaddrs.split_whitespace().next()?;
    let ip = ip_from_service_url(service_url)?;

    let model = extract_types(&text)
        .filter(|types| types.contains(NVT_MODEL))
        .map(|_| NVT_MODEL)
        .unwrap_or(UNKNOWN_MODEL);

    Some(DeviceRecord {
        ip_address: ip.to_string(),
        device_service: service_url.to_string(),
        endpoint: service_url.to_string(),
        model: model.to_string(),
        discovery_time: Utc::now(),
        online: true,
    })
}

fn is_outbound_probe(text: &str) -> bool {
    text.contains("Probe") && !text.contains("ProbeMatch")
}

fn looks_like_onvif(text: &str) -> bool {
    ["NetworkVideoTransmitter", "Device", "ONVIF"]
        .iter()
        .any(|keyword| text.contains(keyword))
}

/// Service address list: `d:XAddrs`, then `XAddrs`, then any prefix
pub fn extract_xaddrs(xml: &str) -> Option<&str> {
    extract_discovery_field(xml, "XAddrs")
}

/// Advertised types, looked up the same way as the service addresses
pub fn extract_types(xml: &str) -> Option<&str> {
    extract_discovery_field(xml, "Types")
}

fn extract_discovery_field<'a>(xml: &'a str, local: &str) -> Option<&'a str> {
    let prefixed = format!("d:{}", local);
    find_element(xml, |name| name == prefixed)
        .or_else(|| find_element(xml, |name| name == local))
        .or_else(|| extract_tag(xml, local))
}

/// Trimmed text content of the first element whose local name is `tag`,
/// whatever its namespace prefix. Empty content counts as missing.
pub fn extract_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    find_element(xml, |name| local_name(name) == tag)
}

/// Host part of an `http://host[:port][/path]` URL
pub fn ip_from_service_url(url: &str) -> Option<&str> {
    let rest = url.trim().strip_prefix("http://")?;
    let end = rest.find(|c: char| c == ':' || c == '/').unwrap_or(rest.len());
    let host = &rest[..end];
    (!host.is_empty()).then_some(host)
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn find_element<'a>(xml: &'a str, matches: impl Fn(&str) -> bool) -> Option<&'a str> {
    let mut cursor = 0;

    while let Some(offset) = xml[cursor..].find('<') {
        let open = cursor + offset;
        cursor = open + 1;

        let after = &xml[cursor..];
        if after.starts_with(|c: char| matches!(c, '/' | '?' | '!')) {
            continue;
        }

        let name_len = after
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(after.len());
        let name = &after[..name_len];
        if name.is_empty() || !matches(name) {
            continue;
        }

        let tag_end = match after.find('>') {
            Some(i) => cursor + i,
            None => return None,
        };
        if xml[..tag_end].ends_with('/') {
            continue;
        }

        let content_start = tag_end + 1;
        let close = find_closing(&xml[content_start..], local_name(name))?;
        let content = xml[content_start..content_start + close].trim();
        if content.is_empty() {
            continue;
        }
        return Some(content);
    }

    None
}

/// Offset of the first `</...>` closing an element with the given local name
fn find_closing(xml: &str, local: &str) -> Option<usize> {
    let mut cursor = 0;
    while let Some(offset) = xml[cursor..].find("</") {
        let start = cursor + offset;
        let after = &xml[start + 2..];
        let end = after.find('>')?;
        if local_name(after[..end].trim()) == local {
            return Some(start);
        }
        cursor = start + 2;
    }
    None
}
