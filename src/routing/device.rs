use std::sync::Arc;

use super::port::PortCollection;
use super::types::*;
use crate::feedback::{BoolFeedback, StringFeedback};

/// A switch request handed to the transport layer of a device.
///
/// Dispatching one says nothing about its effect; the new route is only
/// known once the device reports it back through its feedbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCommand {
    pub device_key: String,
    pub input_key: String,
    pub input_selector: Option<Selector>,
    pub output_key: String,
    pub output_selector: Option<Selector>,
    pub signal_type: SignalType,
}

/// Identity of a stream source as seen by receivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitterInfo {
    pub device_key: String,
    pub device_id: DeviceId,
    /// Name receivers report when subscribed to this transmitter
    pub name: String,
    /// Name shown for this transmitter's audio
    pub audio_name: String,
}

/// Independent secondary-audio path of a receiver
pub trait SecondaryAudio: Send + Sync {
    /// Name of the stream currently feeding secondary audio, or
    /// [`NO_SOURCE`]
    fn audio_source_name_feedback(&self) -> &Arc<StringFeedback>;

    /// True while the receiver plays its own local audio input
    fn audio_input_is_local_feedback(&self) -> &Arc<BoolFeedback>;
}

/// Contract shared by every routable device: matrix switchers, stream
/// transmitters and receivers, USB routers.
pub trait Routable: Send + Sync {
    fn key(&self) -> &str;

    fn name(&self) -> &str {
        self.key()
    }

    fn input_ports(&self) -> &PortCollection;

    fn output_ports(&self) -> &PortCollection;

    /// Request that `input_key` feed `output_key` for `signal_type`.
    ///
    /// Returns once the request has been dispatched. Unknown port keys are
    /// logged and ignored.
    fn execute_switch(&self, input_key: &str, output_key: &str, signal_type: SignalType);

    /// Present when this device is a stream source receivers can name
    fn transmitter_info(&self) -> Option<TransmitterInfo> {
        None
    }

    /// Present when this device has a secondary audio path
    fn secondary_audio(&self) -> Option<&dyn SecondaryAudio> {
        None
    }
}

/// Look up both ports of a switch request, logging when either is unknown.
pub(crate) fn switch_command(
    device: &dyn Routable,
    input_key: &str,
    output_key: &str,
    signal_type: SignalType,
) -> Option<SwitchCommand> {
    let Some(input) = device.input_ports().get(input_key) else {
        log::error!(
            "{}: switch ignored, unknown input '{}' (output '{}', {})",
            device.key(),
            input_key,
            output_key,
            signal_type
        );
        return None;
    };
    let Some(output) = device.output_ports().get(output_key) else {
        log::error!(
            "{}: switch ignored, unknown output '{}' (input '{}', {})",
            device.key(),
            output_key,
            input_key,
            signal_type
        );
        return None;
    };
    Some(SwitchCommand {
        device_key: device.key().to_string(),
        input_key: input.key.clone(),
        input_selector: input.selector.clone(),
        output_key: output.key.clone(),
        output_selector: output.selector.clone(),
        signal_type,
    })
}
