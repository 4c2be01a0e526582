//! Output formatting for discovery reports and PTZ queries

use crate::discovery::DiscoveryReport;
use crate::ptz::{Preset, PtzCapabilities};
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            colored: true,
        }
    }
}

pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn write_report(&self, report: &DiscoveryReport) -> io::Result<()> {
        let output = match self.config.format {
            OutputFormat::Text => self.format_report(report),
            OutputFormat::Json => to_json(report)?,
        };
        self.emit(&output)
    }

    pub fn write_presets(&self, presets: &[Preset]) -> io::Result<()> {
        let output = match self.config.format {
            OutputFormat::Text => self.format_presets(presets),
            OutputFormat::Json => to_json(&presets)?,
        };
        self.emit(&output)
    }

    pub fn write_capabilities(&self, caps: &PtzCapabilities) -> io::Result<()> {
        let output = match self.config.format {
            OutputFormat::Text => format!(
                "pan {:.1}..{:.1}  tilt {:.1}..{:.1}  zoom {:.1}..{:.1}\ncontinuous={} absolute={} relative={} home={} presets={}\n",
                caps.pan.min,
                caps.pan.max,
                caps.tilt.min,
                caps.tilt.max,
                caps.zoom.min,
                caps.zoom.max,
                caps.continuous_move,
                caps.absolute_move,
                caps.relative_move,
                caps.home_position,
                caps.presets
            ),
            OutputFormat::Json => to_json(caps)?,
        };
        self.emit(&output)
    }

    fn emit(&self, output: &str) -> io::Result<()> {
        match &self.config.file {
            Some(filename) => {
                let mut file = File::create(filename)?;
                file.write_all(output.as_bytes())?;
            }
            None => print!("{}", output),
        }
        Ok(())
    }

    /// Device table followed by a one-line summary
    pub fn format_report(&self, report: &DiscoveryReport) -> String {
        let mut output = String::new();

        if report.devices.is_empty() {
            let line = format!("No ONVIF devices found on {}\n", report.network);
            output.push_str(&self.paint(&line, Color::Yellow));
        } else {
            let header = format!("{:<16} {:<20} {}\n", "IP", "MODEL", "SERVICE");
            output.push_str(&self.bold(&header));
            for device in &report.devices {
                let line = format!(
                    "{:<16} {:<20} {}\n",
                    device.ip_address, device.model, device.device_service
                );
                output.push_str(&self.paint(&line, Color::Green));
            }
        }

        output.push_str(&format!(
            "\n{} device(s) on {} via {} ({} candidates, {:.2}s)\n",
            report.devices.len(),
            report.network,
            report.strategy.as_deref().unwrap_or("none"),
            report.candidates,
            report.elapsed.as_secs_f64()
        ));
        output
    }

    pub fn format_presets(&self, presets: &[Preset]) -> String {
        if presets.is_empty() {
            return self.paint("No presets\n", Color::Yellow);
        }

        let mut output = self.bold(&format!("{:<10} {}\n", "TOKEN", "NAME"));
        for preset in presets {
            output.push_str(&format!("{:<10} {}\n", preset.token, preset.name));
        }
        output
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.config.colored {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.config.colored {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    let mut json =
        serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    json.push('\n');
    Ok(json)
}
