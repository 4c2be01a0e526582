//! PTZ service client

use super::auth::{security_header, Credentials};
use super::{soap, Preset, PtzCapabilities};
use crate::error::{DiscoveryError, DiscoveryResult};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// PTZ service path for a device service URL
pub fn ptz_service_url(device_service: &str) -> String {
    if device_service.contains("/device_service") {
        return device_service.replacen("/device_service", "/ptz_service", 1);
    }

    let base = device_service.trim_end_matches('/');
    match base.rfind('/') {
        Some(pos) if pos > "http://".len() => format!("{}/ptz_service", &base[..pos]),
        _ => format!("{}/onvif/ptz_service", base),
    }
}

pub struct PtzClient {
    service_url: String,
    profile_token: String,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl PtzClient {
    pub fn new(service_url: &str, profile_token: &str, timeout: Duration) -> DiscoveryResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self {
            service_url: service_url.to_string(),
            profile_token: profile_token.to_string(),
            credentials: None,
            client,
        })
    }

    /// Sign every request with a WS-Security UsernameToken
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn call(&self, action: &str, body: String) -> DiscoveryResult<String> {
        let header = self.credentials.as_ref().map(security_header);
        let envelope = soap::envelope(header.as_deref(), &body);
        let content_type = format!(
            r#"application/soap+xml; charset=utf-8; action="{}/{}""#,
            soap::PTZ_WSDL_NS,
            action
        );

        log::debug!("PTZ {} -> {}", action, self.service_url);
        let response = self
            .client
            .post(&self.service_url)
            .header(CONTENT_TYPE, content_type)
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let fault = soap::parse_fault(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            log::warn!("PTZ {} failed: {} {}", action, status.as_u16(), fault);
            return Err(DiscoveryError::SoapFault {
                status: status.as_u16(),
                fault,
            });
        }

        Ok(text)
    }

    /// Velocities in the normalized -1..1 space
    pub async fn continuous_move(&self, pan: f32, tilt: f32, zoom: f32) -> DiscoveryResult<()> {
        let body = soap::continuous_move(&self.profile_token, pan, tilt, zoom);
        self.call("ContinuousMove", body).await.map(|_| ())
    }

    pub async fn stop(&self, pan_tilt: bool, zoom: bool) -> DiscoveryResult<()> {
        let body = soap::stop(&self.profile_token, pan_tilt, zoom);
        self.call("Stop", body).await.map(|_| ())
    }

    pub async fn absolute_move(&self, x: f32, y: f32, z: f32) -> DiscoveryResult<()> {
        let body = soap::absolute_move(&self.profile_token, x, y, z);
        self.call("AbsoluteMove", body).await.map(|_| ())
    }

    pub async fn relative_move(&self, dx: f32, dy: f32, dz: f32) -> DiscoveryResult<()> {
        let body = soap::relative_move(&self.profile_token, dx, dy, dz);
        self.call("RelativeMove", body).await.map(|_| ())
    }

    pub async fn goto_home_position(&self) -> DiscoveryResult<()> {
        let body = soap::goto_home_position(&self.profile_token);
        self.call("GotoHomePosition", body).await.map(|_| ())
    }

    pub async fn set_home_position(&self) -> DiscoveryResult<()> {
        let body = soap::set_home_position(&self.profile_token);
        self.call("SetHomePosition", body).await.map(|_| ())
    }

    pub async fn get_presets(&self) -> DiscoveryResult<Vec<Preset>> {
        let body = soap::get_presets(&self.profile_token);
        let response = self.call("GetPresets", body).await?;
        soap::parse_presets(&response)
    }

    pub async fn goto_preset(&self, token: &str) -> DiscoveryResult<()> {
        let body = soap::goto_preset(&self.profile_token, token);
        self.call("GotoPreset", body).await.map(|_| ())
    }

    /// Store the current position; returns the token the device assigned
    pub async fn set_preset(&self, name: &str) -> DiscoveryResult<String> {
        let body = soap::set_preset(&self.profile_token, name);
        let response = self.call("SetPreset", body).await?;
        soap::parse_preset_token(&response)?.ok_or_else(|| DiscoveryError::SoapFault {
            status: 200,
            fault: "SetPresetResponse carried no PresetToken".to_string(),
        })
    }

    /// Defaults only; the device is not queried
    pub fn get_capabilities(&self) -> PtzCapabilities {
        PtzCapabilities::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptz_service_url() {
        assert_eq!(
            ptz_service_url("http://10.0.0.5/onvif/device_service"),
            "http://10.0.0.5/onvif/ptz_service"
        );
        assert_eq!(
            ptz_service_url("http://10.0.0.5:2020/onvif/Device"),
            "http://10.0.0.5:2020/onvif/ptz_service"
        );
        assert_eq!(ptz_service_url("http://10.0.0.5"), "http://10.0.0.5/onvif/ptz_service");
    }

    #[test]
    fn test_capabilities_are_defaults() {
        let url = "http://127.0.0.1:1/onvif/ptz_service";
        let client = PtzClient::new(url, "p", Duration::from_millis(50)).unwrap();
        assert_eq!(client.get_capabilities(), PtzCapabilities::default());
    }
}
