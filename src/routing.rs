mod device;
mod port;
mod route;
mod state;
mod tie_line;
mod types;

pub use device::{Routable, SecondaryAudio, SwitchCommand, TransmitterInfo};
pub(crate) use device::switch_command;
pub use port::{PortCollection, RoutingPort};
pub use route::{RouteDescriptor, RouteSwitch, execute_route, find_route};
pub use state::RoutingFabric;
pub use tie_line::{TieLine, TieLineCollection};
pub use types::*;
