use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::port::RoutingPort;
use super::types::*;
use crate::error::{FabricError, Result};

/// A directed, signal-typed edge from one device's output port to another
/// device's input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieLine {
    pub source: Arc<RoutingPort>,
    pub destination: Arc<RoutingPort>,
    pub signal_type: SignalType,
    /// When set, replaces `signal_type` for routing decisions
    pub override_type: Option<SignalType>,
}

impl TieLine {
    /// Build a tie line, checking port directions and that `signal_type`
    /// fits both endpoints.
    pub fn new(
        source: Arc<RoutingPort>,
        destination: Arc<RoutingPort>,
        signal_type: SignalType,
    ) -> Result<Self> {
        for (port, expected) in [
            (&source, PortDirection::Output),
            (&destination, PortDirection::Input),
        ] {
            if port.direction != expected {
                return Err(FabricError::WrongDirection {
                    device: port.parent_device_key.clone(),
                    port: port.key.clone(),
                    expected,
                    actual: port.direction,
                });
            }
        }
        let tie_line = Self {
            source,
            destination,
            signal_type,
            override_type: None,
        };
        tie_line.check_fits(signal_type)?;
        Ok(tie_line)
    }

    /// Tie line carrying everything both endpoints can carry
    pub fn between(source: Arc<RoutingPort>, destination: Arc<RoutingPort>) -> Result<Self> {
        let signal = source.signal_capability & destination.signal_capability;
        Self::new(source, destination, signal)
    }

    pub fn effective_type(&self) -> SignalType {
        self.override_type.unwrap_or(self.signal_type)
    }

    pub fn source_device_key(&self) -> &str {
        &self.source.parent_device_key
    }

    pub fn destination_device_key(&self) -> &str {
        &self.destination.parent_device_key
    }

    pub fn carries(&self, signal: SignalType) -> bool {
        self.effective_type().contains(signal)
    }

    /// True when both tie lines join the same two ports
    pub fn same_endpoints(&self, other: &TieLine) -> bool {
        self.source.parent_device_key == other.source.parent_device_key
            && self.source.key == other.source.key
            && self.destination.parent_device_key == other.destination.parent_device_key
            && self.destination.key == other.destination.key
    }

    /// Check that both endpoints can carry `signal`
    pub fn check_fits(&self, signal: SignalType) -> Result<()> {
        for port in [&self.source, &self.destination] {
            if !port.supports(signal) {
                return Err(FabricError::SignalMismatch {
                    signal,
                    port: port.to_string(),
                    capability: port.signal_capability,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for TieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --[{}", self.source, self.signal_type)?;
        if let Some(ov) = self.override_type {
            write!(f, " as {}", ov)?;
        }
        write!(f, "]--> {}", self.destination)
    }
}

#[derive(Debug, Default)]
struct TieLineIndex {
    lines: Vec<TieLine>,
    by_source_device: HashMap<String, Vec<usize>>,
    by_destination_device: HashMap<String, Vec<usize>>,
}

impl TieLineIndex {
    fn collect(&self, indices: Option<&Vec<usize>>) -> Vec<TieLine> {
        indices
            .map(|idx| idx.iter().map(|&i| self.lines[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// The tie-line registry of one routing fabric.
///
/// Written during configuration activation and teardown, read during
/// routing. Every query returns an owned snapshot in insertion order, so a
/// resolution pass is unaffected by concurrent writers.
#[derive(Debug, Default)]
pub struct TieLineCollection {
    inner: RwLock<TieLineIndex>,
}

impl TieLineCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tie line. A second tie line between the same two ports is
    /// logged and dropped.
    pub fn add(&self, tie_line: TieLine) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.lines.iter().any(|l| l.same_endpoints(&tie_line)) {
            log::error!("Duplicate tie line dropped: {}", tie_line);
            return Err(FabricError::DuplicateTieLine(tie_line.to_string()));
        }

        let index = inner.lines.len();
        inner
            .by_source_device
            .entry(tie_line.source_device_key().to_string())
            .or_default()
            .push(index);
        inner
            .by_destination_device
            .entry(tie_line.destination_device_key().to_string())
            .or_default()
            .push(index);
        log::debug!("Tie line added: {}", tie_line);
        inner.lines.push(tie_line);
        Ok(())
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let count = inner.lines.len();
        *inner = TieLineIndex::default();
        log::info!("Cleared {} tie lines", count);
    }

    pub fn len(&self) -> usize {
        self.inner.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().lines.is_empty()
    }

    pub fn snapshot(&self) -> Vec<TieLine> {
        self.inner.read().lines.clone()
    }

    pub fn query(&self, predicate: impl Fn(&TieLine) -> bool) -> Vec<TieLine> {
        self.inner
            .read()
            .lines
            .iter()
            .filter(|l| predicate(l))
            .cloned()
            .collect()
    }

    /// Tie lines whose source port belongs to `device_key`
    pub fn from_device(&self, device_key: &str) -> Vec<TieLine> {
        let inner = self.inner.read();
        inner.collect(inner.by_source_device.get(device_key))
    }

    /// Tie lines whose destination port belongs to `device_key`
    pub fn to_device(&self, device_key: &str) -> Vec<TieLine> {
        let inner = self.inner.read();
        inner.collect(inner.by_destination_device.get(device_key))
    }

    pub fn to_port(&self, device_key: &str, port_key: &str) -> Vec<TieLine> {
        let mut lines = self.to_device(device_key);
        lines.retain(|l| l.destination.key == port_key);
        lines
    }

    pub fn between(&self, source_device: &str, destination_device: &str) -> Vec<TieLine> {
        let mut lines = self.from_device(source_device);
        lines.retain(|l| l.destination_device_key() == destination_device);
        lines
    }

    /// Set `override_type` on every tie line matching `predicate`.
    ///
    /// An override one of the endpoints cannot carry is logged and that tie
    /// line is left unchanged. Returns the number of tie lines written.
    pub fn set_override_where(
        &self,
        predicate: impl Fn(&TieLine) -> bool,
        override_type: Option<SignalType>,
    ) -> usize {
        let mut inner = self.inner.write();
        let mut written = 0;
        for line in inner.lines.iter_mut().filter(|l| predicate(l)) {
            if let Some(ov) = override_type
                && let Err(e) = line.check_fits(ov)
            {
                log::error!("Override {} rejected for {}: {}", ov, line, e);
                continue;
            }
            line.override_type = override_type;
            written += 1;
        }
        written
    }

    /// One printable line per tie line, in insertion order
    pub fn describe(&self) -> Vec<String> {
        self.inner
            .read()
            .lines
            .iter()
            .map(|l| l.to_string())
            .collect()
    }
}
