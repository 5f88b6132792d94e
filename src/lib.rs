//! Switchyard - an AV signal-routing fabric
//!
//! Devices expose typed ports, tie lines wire outputs to inputs, and the
//! engines on top decide whether audio follows video and which transmitter
//! each receiver's secondary audio is actually playing.

pub mod config;
pub mod endpoints;
pub mod error;
pub mod feedback;
pub mod follow;
pub mod resolver;
pub mod routing;

pub use config::{Activation, ActivationReport, TopologyConfig, activate};
pub use error::{FabricError, Result};
pub use routing::RoutingFabric;
