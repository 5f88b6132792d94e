//! Audio-follows-video engine
//!
//! Two modes:
//! - **Linked**: the tie lines between transmitters, the primary video router
//!   and receivers are re-tagged `AudioVideo`, so audio routes along with
//!   video.
//! - **Independent**: the same tie lines are re-tagged `Video` only, leaving
//!   audio to the secondary audio tie lines.
//!
//! The set of tie lines is fixed when the engine is built. Tie lines whose
//! ports cannot carry `AudioVideo` are left out of it and reported, so both
//! modes always act on exactly the same set.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::FabricError;
use crate::feedback::BoolFeedback;
use crate::routing::{RoutingFabric, SignalType, TieLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowMode {
    Linked,
    Independent,
}

impl FollowMode {
    fn video_tie_line_type(self) -> SignalType {
        match self {
            FollowMode::Linked => SignalType::AUDIO_VIDEO,
            FollowMode::Independent => SignalType::VIDEO,
        }
    }
}

pub struct AudioFollowVideo {
    fabric: Arc<RoutingFabric>,
    primary_video_router: String,
    transmitters: Vec<String>,
    receivers: Vec<String>,
    /// Tie lines re-tagged on every toggle, captured at construction
    managed: Vec<TieLine>,
    /// Matching tie lines that cannot carry `AudioVideo`
    unsupported: Vec<TieLine>,
    mode: Arc<RwLock<FollowMode>>,
    mode_feedback: Arc<BoolFeedback>,
}

impl AudioFollowVideo {
    pub fn new(
        fabric: Arc<RoutingFabric>,
        primary_video_router: impl Into<String>,
        transmitters: Vec<String>,
        receivers: Vec<String>,
        initial: FollowMode,
    ) -> Self {
        let primary_video_router = primary_video_router.into();
        let router = primary_video_router.as_str();
        let candidates = fabric.tie_lines().query(|l| {
            (l.destination_device_key() == router
                && transmitters.iter().any(|t| t == l.source_device_key()))
                || (l.source_device_key() == router
                    && receivers.iter().any(|r| r == l.destination_device_key()))
        });

        let mut managed = Vec::new();
        let mut unsupported = Vec::new();
        for line in candidates {
            match line.check_fits(SignalType::AUDIO_VIDEO) {
                Ok(()) => managed.push(line),
                Err(e) => {
                    log::error!("Audio-follow skips {}: {}", line, e);
                    unsupported.push(line);
                }
            }
        }

        let mode = Arc::new(RwLock::new(initial));
        let mode_feedback = BoolFeedback::new("AudioFollowsVideo", {
            let mode = mode.clone();
            move || *mode.read() == FollowMode::Linked
        });
        Self {
            fabric,
            primary_video_router,
            transmitters,
            receivers,
            managed,
            unsupported,
            mode,
            mode_feedback,
        }
    }

    /// Engine over every transmitter and every secondary-audio receiver
    /// currently registered in `fabric`.
    pub fn from_fabric(
        fabric: Arc<RoutingFabric>,
        primary_video_router: impl Into<String>,
        initial: FollowMode,
    ) -> Self {
        let router = primary_video_router.into();
        let mut transmitters = Vec::new();
        let mut receivers = Vec::new();
        for device in fabric.devices() {
            if device.key() == router {
                continue;
            }
            if device.transmitter_info().is_some() {
                transmitters.push(device.key().to_string());
            }
            if device.secondary_audio().is_some() {
                receivers.push(device.key().to_string());
            }
        }
        log::debug!(
            "Audio-follow over '{}': {} transmitters, {} receivers",
            router,
            transmitters.len(),
            receivers.len()
        );
        Self::new(fabric, router, transmitters, receivers, initial)
    }

    pub fn primary_video_router(&self) -> &str {
        &self.primary_video_router
    }

    pub fn mode(&self) -> FollowMode {
        *self.mode.read()
    }

    /// True while linked
    pub fn audio_follows_video_feedback(&self) -> &Arc<BoolFeedback> {
        &self.mode_feedback
    }

    pub fn set_audio_follows_video_true(&self) -> usize {
        self.set_mode(FollowMode::Linked)
    }

    pub fn set_audio_follows_video_false(&self) -> usize {
        self.set_mode(FollowMode::Independent)
    }

    /// Switch modes, re-tagging every managed tie line. Returns the number
    /// of tie lines written.
    pub fn set_mode(&self, mode: FollowMode) -> usize {
        *self.mode.write() = mode;
        let signal = mode.video_tie_line_type();
        let written = self
            .fabric
            .tie_lines()
            .set_override_where(|l| self.is_managed(l), Some(signal));

        log::info!("Audio follows video: {:?} ({} tie lines set to {})", mode, written, signal);
        self.mode_feedback.fire_update();
        written
    }

    /// Managed tie lines as currently registered, in registration order
    pub fn managed_tie_lines(&self) -> Vec<TieLine> {
        self.fabric.tie_lines().query(|l| self.is_managed(l))
    }

    /// Tie lines left out because their ports cannot carry `AudioVideo`
    pub fn unsupported_tie_lines(&self) -> &[TieLine] {
        &self.unsupported
    }

    /// One [`FabricError::SignalMismatch`] per unsupported tie line
    pub fn configuration_errors(&self) -> Vec<FabricError> {
        self.unsupported
            .iter()
            .filter_map(|l| l.check_fits(SignalType::AUDIO_VIDEO).err())
            .collect()
    }

    fn is_managed(&self, line: &TieLine) -> bool {
        self.managed.iter().any(|m| m.same_endpoints(line))
    }
}
