//! PTZ SOAP envelopes and response parsing

use super::Preset;
use crate::error::DiscoveryResult;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub const PTZ_WSDL_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";

/// Wrap a body (and optional security header) in a SOAP 1.2 envelope
pub fn envelope(security: Option<&str>, body: &str) -> String {
    let header = security
        .map(|h| format!("<s:Header>{}</s:Header>", h))
        .unwrap_or_default();

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" "#,
            r#"xmlns:tptz="{}" xmlns:tt="http://www.onvif.org/ver10/schema">"#,
            r#"{}<s:Body>{}</s:Body></s:Envelope>"#,
        ),
        PTZ_WSDL_NS, header, body
    )
}

fn profile(token: &str) -> String {
    format!("<tptz:ProfileToken>{}</tptz:ProfileToken>", escape(token))
}

fn vector(pan: f32, tilt: f32, zoom: f32) -> String {
    format!(r#"<tt:PanTilt x="{}" y="{}"/><tt:Zoom x="{}"/>"#, pan, tilt, zoom)
}

pub fn continuous_move(token: &str, pan: f32, tilt: f32, zoom: f32) -> String {
    format!(
        "<tptz:ContinuousMove>{}<tptz:Velocity>{}</tptz:Velocity></tptz:ContinuousMove>",
        profile(token),
        vector(pan, tilt, zoom)
    )
}

pub fn stop(token: &str, pan_tilt: bool, zoom: bool) -> String {
    format!(
        "<tptz:Stop>{}<tptz:PanTilt>{}</tptz:PanTilt><tptz:Zoom>{}</tptz:Zoom></tptz:Stop>",
        profile(token),
        pan_tilt,
        zoom
    )
}

pub fn absolute_move(token: &str, x: f32, y: f32, z: f32) -> String {
    format!(
        "<tptz:AbsoluteMove>{}<tptz:Position>{}</tptz:Position></tptz:AbsoluteMove>",
        profile(token),
        vector(x, y, z)
    )
}

pub fn relative_move(token: &str, dx: f32, dy: f32, dz: f32) -> String {
    format!(
        "<tptz:RelativeMove>{}<tptz:Translation>{}</tptz:Translation></tptz:RelativeMove>",
        profile(token),
        vector(dx, dy, dz)
    )
}

pub fn goto_home_position(token: &str) -> String {
    format!("<tptz:GotoHomePosition>{}</tptz:GotoHomePosition>", profile(token))
}

pub fn set_home_position(token: &str) -> String {
    format!("<tptz:SetHomePosition>{}</tptz:SetHomePosition>", profile(token))
}

pub fn get_presets(token: &str) -> String {
    format!("<tptz:GetPresets>{}</tptz:GetPresets>", profile(token))
}

pub fn goto_preset(token: &str, preset: &str) -> String {
    format!(
        "<tptz:GotoPreset>{}<tptz:PresetToken>{}</tptz:PresetToken></tptz:GotoPreset>",
        profile(token),
        escape(preset)
    )
}

pub fn set_preset(token: &str, name: &str) -> String {
    format!(
        "<tptz:SetPreset>{}<tptz:PresetName>{}</tptz:PresetName></tptz:SetPreset>",
        profile(token),
        escape(name)
    )
}

fn token_attribute(start: &BytesStart) -> DiscoveryResult<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == b"token" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Presets from a GetPresetsResponse, matched by local name
pub fn parse_presets(xml: &str) -> DiscoveryResult<Vec<Preset>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut presets = Vec::new();
    let mut in_preset = false;
    let mut in_name = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Preset" => {
                    let token = token_attribute(&e)?.unwrap_or_default();
                    presets.push(Preset::new(token, String::new()));
                    in_preset = true;
                }
                b"Name" if in_preset => in_name = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"Preset" => {
                let token = token_attribute(&e)?.unwrap_or_default();
                presets.push(Preset::new(token, String::new()));
            }
            Event::Text(t) if in_name => {
                if let Some(preset) = presets.last_mut() {
                    preset.name = t.unescape()?.into_owned();
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"Preset" => in_preset = false,
                b"Name" => in_name = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(presets)
}

/// Text of the first element whose local name is one of `names`
pub fn first_text(xml: &str, names: &[&str]) -> DiscoveryResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut capture = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                capture = names.iter().any(|n| n.as_bytes() == local.as_ref());
            }
            Event::Text(t) if capture => return Ok(Some(t.unescape()?.into_owned())),
            Event::End(_) => capture = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Token assigned by SetPreset
pub fn parse_preset_token(xml: &str) -> DiscoveryResult<Option<String>> {
    first_text(xml, &["PresetToken"])
}

/// Human-readable reason from a SOAP 1.2 or 1.1 fault
pub fn parse_fault(xml: &str) -> Option<String> {
    first_text(xml, &["Text", "faultstring"]).ok().flatten()
}
