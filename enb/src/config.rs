//! TOML Configuration Structures for the simulation runner

use anyhow::Context;
use common::types::Bandwidth;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SimConfig {
    /// Cell configuration
    #[serde(default)]
    pub cell: CellSettings,
    /// Run configuration
    #[serde(default)]
    pub run: RunSettings,
}

/// Cell configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellSettings {
    /// Cell identity
    #[serde(default = "default_cell_id")]
    pub cell_id: u16,
    /// Downlink carrier frequency in Hz
    #[serde(default = "default_carrier_frequency_hz")]
    pub carrier_frequency_hz: f64,
    /// Number of downlink resource blocks (6, 15, 25, 50, 75 or 100)
    #[serde(default = "default_num_rbs")]
    pub num_rbs: u16,
    /// Total transmit power in dBm
    #[serde(default = "default_tx_power_dbm")]
    pub tx_power_dbm: f64,
    /// UE receiver noise figure in dB
    #[serde(default = "default_noise_figure_db")]
    pub noise_figure_db: f64,
    /// Downlink propagation loss per terminal in dB
    #[serde(default = "default_propagation_loss_db")]
    pub propagation_loss_db: f64,
}

impl Default for CellSettings {
    fn default() -> Self {
        Self {
            cell_id: default_cell_id(),
            carrier_frequency_hz: default_carrier_frequency_hz(),
            num_rbs: default_num_rbs(),
            tx_power_dbm: default_tx_power_dbm(),
            noise_figure_db: default_noise_figure_db(),
            propagation_loss_db: default_propagation_loss_db(),
        }
    }
}

fn default_cell_id() -> u16 {
    1
}

fn default_carrier_frequency_hz() -> f64 {
    2.12e9 // Band 1 downlink
}

fn default_num_rbs() -> u16 {
    25 // 5 MHz
}

fn default_tx_power_dbm() -> f64 {
    43.0
}

fn default_noise_figure_db() -> f64 {
    9.0
}

fn default_propagation_loss_db() -> f64 {
    110.0
}

/// Run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSettings {
    /// Number of radio frames to simulate
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Number of attached terminals
    #[serde(default = "default_ues")]
    pub ues: u16,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            ues: default_ues(),
        }
    }
}

fn default_frames() -> u32 {
    10
}

fn default_ues() -> u16 {
    2
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: SimConfig =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Bandwidth class for the configured resource-block count
    pub fn bandwidth(&self) -> anyhow::Result<Bandwidth> {
        Bandwidth::from_u16(self.cell.num_rbs)
            .with_context(|| format!("invalid resource block count: {}", self.cell.num_rbs))
    }
}
