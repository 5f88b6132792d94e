//! Topology configuration.
//!
//! A JSON document listing devices, their ports and the tie lines between
//! them. [`activate`] turns it into a live [`RoutingFabric`].
//!
//! [`RoutingFabric`]: crate::routing::RoutingFabric

mod activation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FabricError, Result};
use crate::follow::FollowMode;
use crate::routing::{ConnectionType, DeviceId, Selector, SignalType};

pub use activation::{Activation, ActivationReport, activate};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub tie_lines: Vec<TieLineConfig>,
    #[serde(default)]
    pub audio_follows_video: Option<AudioFollowConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    Matrix(MatrixConfig),
    Transmitter(TransmitterConfig),
    Receiver(ReceiverConfig),
}

impl DeviceConfig {
    pub fn key(&self) -> &str {
        match self {
            DeviceConfig::Matrix(c) => &c.key,
            DeviceConfig::Transmitter(c) => &c.key,
            DeviceConfig::Receiver(c) => &c.key,
        }
    }

    /// Construction order: transmitters, then switchers, then receivers
    fn activation_rank(&self) -> u8 {
        match self {
            DeviceConfig::Transmitter(_) => 0,
            DeviceConfig::Matrix(_) => 1,
            DeviceConfig::Receiver(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<PortConfig>,
    #[serde(default)]
    pub outputs: Vec<PortConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitterConfig {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub device_id: DeviceId,
    #[serde(default)]
    pub audio_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub device_id: DeviceId,
    /// When set, the receiver's local audio input is offered as a source
    #[serde(default)]
    pub local_audio_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    pub key: String,
    pub signal: SignalType,
    #[serde(default)]
    pub connection: ConnectionType,
    #[serde(default)]
    pub selector: Option<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieLineConfig {
    pub source_device: String,
    pub source_port: String,
    pub destination_device: String,
    pub destination_port: String,
    /// Defaults to everything both ports can carry
    #[serde(default)]
    pub signal: Option<SignalType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFollowConfig {
    pub primary_video_router: String,
    #[serde(default = "default_mode")]
    pub initial_mode: FollowMode,
}

fn default_mode() -> FollowMode {
    FollowMode::Linked
}

impl TopologyConfig {
    /// `<config dir>/switchyard/topology.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("switchyard").join("topology.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| FabricError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TopologyConfig = serde_json::from_str(&text)?;
        log::info!(
            "Loaded topology from {}: {} devices, {} tie lines",
            path.display(),
            config.devices.len(),
            config.tie_lines.len()
        );
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        let path = Self::default_path().ok_or(FabricError::NoConfigPath)?;
        Self::load(&path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FabricError::ConfigIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| FabricError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }
}
