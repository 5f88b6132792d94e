//! "What is this receiver's secondary audio playing?"
//!
//! Two derived feedbacks per receiver:
//!
//! 1. resolved source id, from the local-audio flag and the upstream audio
//!    source name
//! 2. resolved source name, from the local-audio flag and the result of (1)
//!
//! Neither value is cached. Both are re-evaluated, id first, whenever either
//! upstream feedback changes. The order is declared in a [`FeedbackGraph`].

use std::sync::Arc;

use super::directory::TransmitterDirectory;
use crate::error::{FabricError, Result};
use crate::feedback::{
    BoolFeedback, FeedbackGraph, IntFeedback, StringFeedback, SubscriptionId,
};
use crate::routing::{DeviceId, NO_SOURCE, Routable};

const AUDIO_SOURCE_NAME: &str = "AudioSourceName";
const AUDIO_INPUT_IS_LOCAL: &str = "AudioInputIsLocal";
const RESOLVED_SOURCE_ID: &str = "ResolvedSourceId";
const RESOLVED_SOURCE_NAME: &str = "ResolvedSourceName";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub source_device_id: DeviceId,
    pub source_name: String,
}

/// Device id of the source feeding a receiver's secondary audio, `0` for none.
pub fn resolve_source_id(
    audio_input_is_local: bool,
    upstream_name: &str,
    receiver_key: &str,
    transmitters: &TransmitterDirectory,
) -> DeviceId {
    if audio_input_is_local {
        return match transmitters.by_key(receiver_key) {
            Some(own) => own.device_id,
            None => {
                log::warn!(
                    "{}: local audio active but receiver is not a known transmitter",
                    receiver_key
                );
                0
            }
        };
    }

    if upstream_name == NO_SOURCE {
        return 0;
    }

    match transmitters.by_name(upstream_name) {
        Some(tx) => tx.device_id,
        None => {
            log::debug!(
                "{}: audio source '{}' matches no known transmitter",
                receiver_key,
                upstream_name
            );
            0
        }
    }
}

/// Display name for the result of [`resolve_source_id`], [`NO_SOURCE`] for
/// none.
pub fn resolve_source_name(
    audio_input_is_local: bool,
    source_id: DeviceId,
    transmitters: &TransmitterDirectory,
) -> String {
    if !audio_input_is_local && source_id == 0 {
        return NO_SOURCE.to_string();
    }
    transmitters
        .by_id(source_id)
        .map(|tx| tx.audio_name.clone())
        .unwrap_or_else(|| NO_SOURCE.to_string())
}

/// Resolved-source feedbacks for one receiver.
///
/// Subscribes to the receiver's secondary-audio feedbacks on construction
/// and unsubscribes when dropped.
pub struct RouteResolver {
    receiver_key: String,
    graph: Arc<FeedbackGraph>,
    source_id: Arc<IntFeedback>,
    source_name: Arc<StringFeedback>,
    upstream_name: Arc<StringFeedback>,
    upstream_local: Arc<BoolFeedback>,
    subscriptions: [SubscriptionId; 2],
}

impl RouteResolver {
    /// Build the resolver for `receiver`. The receiver must expose a
    /// secondary audio path.
    pub fn new(receiver: &dyn Routable, transmitters: Arc<TransmitterDirectory>) -> Result<Self> {
        let audio = receiver
            .secondary_audio()
            .ok_or_else(|| FabricError::MissingCapability {
                device: receiver.key().to_string(),
                capability: "secondary audio",
            })?;
        let receiver_key = receiver.key().to_string();
        let upstream_name = audio.audio_source_name_feedback().clone();
        let upstream_local = audio.audio_input_is_local_feedback().clone();

        let source_id = IntFeedback::new(format!("{}-{}", receiver_key, RESOLVED_SOURCE_ID), {
            let name = upstream_name.clone();
            let local = upstream_local.clone();
            let key = receiver_key.clone();
            let transmitters = transmitters.clone();
            move || resolve_source_id(local.value(), &name.value(), &key, &transmitters)
        });
        let source_name = StringFeedback::new(format!("{}-{}", receiver_key, RESOLVED_SOURCE_NAME), {
            let id = source_id.clone();
            let local = upstream_local.clone();
            move || resolve_source_name(local.value(), id.value(), &transmitters)
        });

        let graph = FeedbackGraph::new();
        graph.add_source(AUDIO_SOURCE_NAME);
        graph.add_source(AUDIO_INPUT_IS_LOCAL);
        graph.add_derived(RESOLVED_SOURCE_ID, {
            let fb = source_id.clone();
            move || fb.fire_update()
        });
        graph.add_derived(RESOLVED_SOURCE_NAME, {
            let fb = source_name.clone();
            move || fb.fire_update()
        });
        graph.depend(RESOLVED_SOURCE_ID, AUDIO_SOURCE_NAME)?;
        graph.depend(RESOLVED_SOURCE_ID, AUDIO_INPUT_IS_LOCAL)?;
        graph.depend(RESOLVED_SOURCE_NAME, AUDIO_SOURCE_NAME)?;
        graph.depend(RESOLVED_SOURCE_NAME, AUDIO_INPUT_IS_LOCAL)?;
        graph.depend(RESOLVED_SOURCE_NAME, RESOLVED_SOURCE_ID)?;

        let subscriptions = [
            upstream_name.subscribe({
                let graph = Arc::downgrade(&graph);
                move |_| {
                    if let Some(graph) = graph.upgrade() {
                        graph.propagate(AUDIO_SOURCE_NAME);
                    }
                }
            }),
            upstream_local.subscribe({
                let graph = Arc::downgrade(&graph);
                move |_| {
                    if let Some(graph) = graph.upgrade() {
                        graph.propagate(AUDIO_INPUT_IS_LOCAL);
                    }
                }
            }),
        ];

        let resolver = Self {
            receiver_key,
            graph,
            source_id,
            source_name,
            upstream_name,
            upstream_local,
            subscriptions,
        };
        resolver.refresh();
        Ok(resolver)
    }

    pub fn receiver_key(&self) -> &str {
        &self.receiver_key
    }

    pub fn source_id_feedback(&self) -> &Arc<IntFeedback> {
        &self.source_id
    }

    pub fn source_name_feedback(&self) -> &Arc<StringFeedback> {
        &self.source_name
    }

    /// Evaluate both values against live state
    pub fn resolve(&self) -> ResolvedRoute {
        ResolvedRoute {
            source_device_id: self.source_id.value(),
            source_name: self.source_name.value(),
        }
    }

    /// Re-fire both derived feedbacks, e.g. after a transport reconnect
    pub fn refresh(&self) {
        self.graph.propagate(AUDIO_SOURCE_NAME);
    }
}

impl Drop for RouteResolver {
    fn drop(&mut self) {
        self.upstream_name.unsubscribe(self.subscriptions[0]);
        self.upstream_local.unsubscribe(self.subscriptions[1]);
    }
}
