use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::device::{Routable, TransmitterInfo};
use super::tie_line::{TieLine, TieLineCollection};
use super::types::*;
use crate::error::{FabricError, Result};

/// One routing fabric: the devices and the tie lines between them.
///
/// Constructed once at startup and handed to every component that routes,
/// so independent fabrics can coexist (and be tested in isolation).
#[derive(Default)]
pub struct RoutingFabric {
    devices: RwLock<HashMap<String, Arc<dyn Routable>>>,
    /// Registration order, for stable listings
    device_order: RwLock<Vec<String>>,
    tie_lines: TieLineCollection,
}

impl RoutingFabric {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a device. A second device with the same key is logged and
    /// dropped.
    pub fn add_device(&self, device: Arc<dyn Routable>) -> Result<()> {
        let key = device.key().to_string();
        let mut devices = self.devices.write();
        if devices.contains_key(&key) {
            log::error!("Duplicate device key '{}' dropped", key);
            return Err(FabricError::DuplicateDevice(key));
        }
        log::debug!(
            "Device registered: {} ({} inputs, {} outputs)",
            key,
            device.input_ports().len(),
            device.output_ports().len()
        );
        devices.insert(key.clone(), device);
        self.device_order.write().push(key);
        Ok(())
    }

    pub fn get_device(&self, key: &str) -> Option<Arc<dyn Routable>> {
        self.devices.read().get(key).cloned()
    }

    pub fn require_device(&self, key: &str) -> Result<Arc<dyn Routable>> {
        self.get_device(key)
            .ok_or_else(|| FabricError::DeviceNotFound(key.to_string()))
    }

    /// All devices in registration order
    pub fn devices(&self) -> Vec<Arc<dyn Routable>> {
        let devices = self.devices.read();
        self.device_order
            .read()
            .iter()
            .filter_map(|k| devices.get(k).cloned())
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn tie_lines(&self) -> &TieLineCollection {
        &self.tie_lines
    }

    /// Wire `source_device:source_port` to `destination_device:destination_port`.
    ///
    /// Missing devices or ports and signal types an endpoint cannot carry are
    /// configuration errors; nothing is registered in that case.
    pub fn connect(
        &self,
        source_device: &str,
        source_port: &str,
        destination_device: &str,
        destination_port: &str,
        signal_type: Option<SignalType>,
    ) -> Result<TieLine> {
        let source = self
            .require_device(source_device)?
            .output_ports()
            .require(source_port)?;
        let destination = self
            .require_device(destination_device)?
            .input_ports()
            .require(destination_port)?;

        let tie_line = match signal_type {
            Some(signal) => TieLine::new(source, destination, signal)?,
            None => TieLine::between(source, destination)?,
        };
        self.tie_lines.add(tie_line.clone())?;
        Ok(tie_line)
    }

    /// Every device that identifies as a stream source
    pub fn transmitters(&self) -> Vec<TransmitterInfo> {
        self.devices()
            .iter()
            .filter_map(|d| d.transmitter_info())
            .collect()
    }

    /// Teardown: drop all tie lines, then all devices
    pub fn clear(&self) {
        self.tie_lines.clear();
        self.devices.write().clear();
        self.device_order.write().clear();
        log::info!("Routing fabric cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::MatrixSwitcher;
    use crate::routing::{ConnectionType, RoutingPort};
    use std::sync::mpsc;

    fn matrix(key: &str, tx: mpsc::Sender<crate::routing::SwitchCommand>) -> Arc<MatrixSwitcher> {
        let inputs = vec![RoutingPort::input(key, "In1", SignalType::AUDIO_VIDEO, ConnectionType::Hdmi)];
        let outputs = vec![
            RoutingPort::output(key, "Out1", SignalType::AUDIO_VIDEO, ConnectionType::Hdmi),
            RoutingPort::output(key, "AudioOut", SignalType::AUDIO, ConnectionType::LineAudio),
        ];
        Arc::new(MatrixSwitcher::new(key, key, inputs, outputs, tx).unwrap())
    }

    #[test]
    fn test_duplicate_device_dropped() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("m1", tx.clone())).unwrap();
        let err = fabric.add_device(matrix("m1", tx)).unwrap_err();
        assert!(matches!(err, FabricError::DuplicateDevice(_)));
        assert_eq!(fabric.device_count(), 1);
    }

    #[test]
    fn test_connect_missing_port_is_config_error() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("m1", tx.clone())).unwrap();
        fabric.add_device(matrix("m2", tx)).unwrap();

        let err = fabric.connect("m1", "Out9", "m2", "In1", None).unwrap_err();
        assert!(matches!(err, FabricError::PortNotFound { .. }));
        let err = fabric.connect("m1", "Out1", "m3", "In1", None).unwrap_err();
        assert!(matches!(err, FabricError::DeviceNotFound(_)));
        assert!(fabric.tie_lines().is_empty());

        let tl = fabric.connect("m1", "Out1", "m2", "In1", None).unwrap();
        assert_eq!(tl.signal_type, SignalType::AUDIO_VIDEO);
        assert_eq!(fabric.tie_lines().len(), 1);
    }

    #[test]
    fn test_connect_signal_must_fit() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("m1", tx.clone())).unwrap();
        fabric.add_device(matrix("m2", tx)).unwrap();
        let err = fabric
            .connect("m1", "AudioOut", "m2", "In1", Some(SignalType::AUDIO_VIDEO))
            .unwrap_err();
        assert!(matches!(err, FabricError::SignalMismatch { .. }));
    }

    #[test]
    fn test_devices_in_registration_order_and_clear() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        for key in ["zeta", "alpha", "mid"] {
            fabric.add_device(matrix(key, tx.clone())).unwrap();
        }
        let keys: Vec<String> = fabric.devices().iter().map(|d| d.key().to_string()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        fabric.connect("zeta", "Out1", "alpha", "In1", None).unwrap();
        fabric.clear();
        assert_eq!(fabric.device_count(), 0);
        assert!(fabric.tie_lines().is_empty());
        assert!(fabric.transmitters().is_empty());
    }
}
