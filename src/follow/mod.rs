//! Audio-follows-video module
//!
//! Decides whether secondary audio mirrors the primary video routing or is
//! switched on its own tie lines.

pub mod engine;

pub use engine::{AudioFollowVideo, FollowMode};
