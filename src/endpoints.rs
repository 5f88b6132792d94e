//! Concrete routable devices.
//!
//! Each one owns its ports, turns switch requests into [`SwitchCommand`]s
//! for its transport, and exposes the route state the transport reports back
//! as feedbacks. The transports themselves live outside this crate.
//!
//! [`SwitchCommand`]: crate::routing::SwitchCommand

pub mod matrix;
pub mod receiver;
pub mod transmitter;

pub use matrix::MatrixSwitcher;
pub use receiver::StreamReceiver;
pub use transmitter::StreamTransmitter;
