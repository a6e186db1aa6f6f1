//! Configuration management
//!
//! Loads the YAML configuration file; every field has a default so a missing
//! file yields a fully working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::input::InputDescriptor;
use crate::transport::TrsJack;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub inputs: InputConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub trs: TrsConfig,
}

/// Discrete input layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Ordered control descriptors; list position is the scanned line index.
    #[serde(default = "default_controls")]
    pub controls: Vec<InputDescriptor>,
    /// Number of key-row lines
    #[serde(default = "default_keys")]
    pub keys: usize,
    /// Control ids whose simultaneous released state opens the firmware
    /// escape hatch
    #[serde(default = "default_maintenance_combo")]
    pub maintenance_combo: [u8; 3],
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            controls: default_controls(),
            keys: default_keys(),
            maintenance_combo: default_maintenance_combo(),
        }
    }
}

/// Scheduler cadences and the double-click window
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            double_click_ms: default_double_click_ms(),
            startup_delay_ms: default_startup_delay_ms(),
        }
    }
}

/// MIDI output settings shared by the modes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// USB MIDI output port pattern (substring match); none = simulated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_port: Option<String>,
    #[serde(default)]
    pub channel: u8,
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    #[serde(default = "default_root_note")]
    pub root_note: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            usb_port: None,
            channel: 0,
            velocity: default_velocity(),
            root_note: default_root_note(),
        }
    }
}

/// TRS output routing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrsConfig {
    #[serde(default = "default_trs_jack")]
    pub jack: TrsJack,
}

impl Default for TrsConfig {
    fn default() -> Self {
        Self {
            jack: default_trs_jack(),
        }
    }
}

fn default_controls() -> Vec<InputDescriptor> {
    vec![
        InputDescriptor {
            id: 0,
            double_click: false,
        },
        InputDescriptor {
            id: 1,
            double_click: true,
        },
        InputDescriptor {
            id: 2,
            double_click: false,
        },
        InputDescriptor {
            id: 3,
            double_click: true,
        },
        InputDescriptor {
            id: 4,
            double_click: false,
        },
    ]
}

fn default_keys() -> usize {
    12
}

fn default_maintenance_combo() -> [u8; 3] {
    [0, 2, 4]
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_double_click_ms() -> u64 {
    300
}

fn default_startup_delay_ms() -> u64 {
    1000
}

fn default_velocity() -> u8 {
    100
}

fn default_root_note() -> u8 {
    48
}

fn default_trs_jack() -> TrsJack {
    TrsJack::A
}

impl AppConfig {
    /// Load the configuration file, or fall back to defaults when it does
    /// not exist.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            tracing::info!("No config file at '{}', using defaults", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path))?;

        Ok(config)
    }
}
