use crate::routing::{DeviceId, RoutingFabric, TransmitterInfo};

/// The known transmitters of a fabric, captured once after activation.
///
/// Lookups take the first match in registration order. Id `0` means "no
/// source" and never matches.
#[derive(Debug, Clone, Default)]
pub struct TransmitterDirectory {
    transmitters: Vec<TransmitterInfo>,
}

impl TransmitterDirectory {
    pub fn new(transmitters: Vec<TransmitterInfo>) -> Self {
        Self { transmitters }
    }

    pub fn from_fabric(fabric: &RoutingFabric) -> Self {
        let directory = Self::new(fabric.transmitters());
        log::debug!("Transmitter directory: {} entries", directory.len());
        directory
    }

    pub fn by_key(&self, device_key: &str) -> Option<&TransmitterInfo> {
        self.transmitters.iter().find(|t| t.device_key == device_key)
    }

    pub fn by_name(&self, name: &str) -> Option<&TransmitterInfo> {
        self.transmitters.iter().find(|t| t.name == name)
    }

    pub fn by_id(&self, device_id: DeviceId) -> Option<&TransmitterInfo> {
        if device_id == 0 {
            return None;
        }
        self.transmitters.iter().find(|t| t.device_id == device_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransmitterInfo> {
        self.transmitters.iter()
    }

    pub fn len(&self) -> usize {
        self.transmitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transmitters.is_empty()
    }
}
