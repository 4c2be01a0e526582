//! PTZ control for discovered devices
//!
//! Thin SOAP wrappers, one request per verb, against a device's PTZ service.

pub mod auth;
pub mod client;
pub mod soap;

use serde::{Deserialize, Serialize};

pub use auth::Credentials;
pub use client::PtzClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub token: String,
    pub name: String,
}

impl Preset {
    pub fn new(token: String, name: String) -> Self {
        Self { token, name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
}

impl AxisRange {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// What a PTZ head can do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtzCapabilities {
    pub pan: AxisRange,
    pub tilt: AxisRange,
    pub zoom: AxisRange,
    pub continuous_move: bool,
    pub absolute_move: bool,
    pub relative_move: bool,
    pub home_position: bool,
    pub presets: bool,
}

impl Default for PtzCapabilities {
    /// Normalized ONVIF generic spaces
    fn default() -> Self {
        Self {
            pan: AxisRange { min: -1.0, max: 1.0 },
            tilt: AxisRange { min: -1.0, max: 1.0 },
            zoom: AxisRange { min: 0.0, max: 1.0 },
            continuous_move: true,
            absolute_move: true,
            relative_move: true,
            home_position: true,
            presets: true,
        }
    }
}
