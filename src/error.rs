//! Configuration-time errors for the routing fabric.
//!
//! Only topology construction can fail. Runtime lookups during route
//! resolution fall back to `0` / [`NO_SOURCE`](crate::routing::NO_SOURCE)
//! and switch requests with unknown selectors are logged no-ops, so neither
//! ever produces one of these.

use std::path::PathBuf;

use crate::routing::{PortDirection, SignalType};

#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// Two ports with the same key on one device
    #[error("device '{device}' already has an {direction} port '{port}'")]
    DuplicatePort {
        device: String,
        port: String,
        direction: PortDirection,
    },

    /// A port was added to a collection of the other direction
    #[error("port '{port}' on '{device}' is an {actual} port, expected {expected}")]
    WrongDirection {
        device: String,
        port: String,
        expected: PortDirection,
        actual: PortDirection,
    },

    #[error("device key '{0}' is already registered")]
    DuplicateDevice(String),

    #[error("device '{0}' not found")]
    DeviceNotFound(String),

    #[error("{direction} port '{port}' not found on device '{device}'")]
    PortNotFound {
        device: String,
        port: String,
        direction: PortDirection,
    },

    /// Tie line signal type is not carried by one of its endpoints
    #[error("signal type {signal} does not fit {port} (capability {capability})")]
    SignalMismatch {
        signal: SignalType,
        port: String,
        capability: SignalType,
    },

    #[error("tie line {0} is already registered")]
    DuplicateTieLine(String),

    /// A device lacks a capability the caller needs (e.g. secondary audio)
    #[error("device '{device}' does not support {capability}")]
    MissingCapability {
        device: String,
        capability: &'static str,
    },

    #[error("feedback node '{0}' is not registered")]
    UnknownFeedbackNode(String),

    #[error("feedback dependency {downstream} -> {upstream} would create a cycle")]
    FeedbackCycle { downstream: String, upstream: String },

    #[error("config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("no config path available (no config directory on this system)")]
    NoConfigPath,
}

pub type Result<T> = std::result::Result<T, FabricError>;
