//! Per-receiver route resolution.
//!
//! Independent of transports: works purely with routing types and the
//! feedbacks receivers expose.

pub mod directory;
pub mod source;

pub use directory::TransmitterDirectory;
pub use source::{ResolvedRoute, RouteResolver, resolve_source_id, resolve_source_name};
