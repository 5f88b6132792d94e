use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::types::*;
use crate::error::{FabricError, Result};

/// A routable endpoint on a device.
///
/// Describes what can be connected, never how. Immutable once built; owned
/// by the device's [`PortCollection`] and shared with tie lines by `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPort {
    pub key: String,
    /// Key of the owning device (lookup and diagnostics only)
    pub parent_device_key: String,
    pub direction: PortDirection,
    pub signal_capability: SignalType,
    pub connection_type: ConnectionType,
    /// Device-specific connector token, e.g. the physical input number
    pub selector: Option<Selector>,
}

impl RoutingPort {
    pub fn input(
        parent_device_key: impl Into<String>,
        key: impl Into<String>,
        signal_capability: SignalType,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            key: key.into(),
            parent_device_key: parent_device_key.into(),
            direction: PortDirection::Input,
            signal_capability,
            connection_type,
            selector: None,
        }
    }

    pub fn output(
        parent_device_key: impl Into<String>,
        key: impl Into<String>,
        signal_capability: SignalType,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            direction: PortDirection::Output,
            ..Self::input(parent_device_key, key, signal_capability, connection_type)
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn supports(&self, signal: SignalType) -> bool {
        signal.fits(self.signal_capability)
    }
}

/// `device:port`, as used in logs and tie line printouts
impl fmt::Display for RoutingPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parent_device_key, self.key)
    }
}

/// Keyed set of one device's ports of a single direction
#[derive(Debug, Clone)]
pub struct PortCollection {
    device_key: String,
    direction: PortDirection,
    ports: HashMap<String, Arc<RoutingPort>>,
}

impl PortCollection {
    pub fn new(device_key: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            device_key: device_key.into(),
            direction,
            ports: HashMap::new(),
        }
    }

    /// Register a port. Duplicate keys and ports of the wrong direction are
    /// configuration errors.
    pub fn add(&mut self, port: RoutingPort) -> Result<Arc<RoutingPort>> {
        if port.direction != self.direction {
            return Err(FabricError::WrongDirection {
                device: self.device_key.clone(),
                port: port.key,
                expected: self.direction,
                actual: port.direction,
            });
        }
        if self.ports.contains_key(&port.key) {
            return Err(FabricError::DuplicatePort {
                device: self.device_key.clone(),
                port: port.key,
                direction: self.direction,
            });
        }
        let port = Arc::new(port);
        self.ports.insert(port.key.clone(), port.clone());
        Ok(port)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<RoutingPort>> {
        self.ports.get(key)
    }

    /// Like [`get`](Self::get) but as a configuration error when absent
    pub fn require(&self, key: &str) -> Result<Arc<RoutingPort>> {
        self.ports
            .get(key)
            .cloned()
            .ok_or_else(|| FabricError::PortNotFound {
                device: self.device_key.clone(),
                port: key.to_string(),
                direction: self.direction,
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ports.contains_key(key)
    }

    pub fn find_by_selector(&self, selector: &Selector) -> Option<&Arc<RoutingPort>> {
        self.ports
            .values()
            .find(|p| p.selector.as_ref() == Some(selector))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RoutingPort>> {
        self.ports.values()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }
}
