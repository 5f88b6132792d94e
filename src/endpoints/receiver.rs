use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::error::Result;
use crate::feedback::{BoolFeedback, StringFeedback};
use crate::routing::{
    ConnectionType, DeviceId, NO_SOURCE, PortCollection, PortDirection, Routable, RoutingPort,
    SecondaryAudio, SignalType, SwitchCommand, TransmitterInfo, switch_command,
};

pub const STREAM_IN: &str = "StreamInput";
pub const SECONDARY_AUDIO_IN: &str = "SecondaryAudioInput";
pub const LOCAL_AUDIO_IN: &str = "LocalAudioInput";
pub const HDMI_OUT: &str = "HdmiOut";
pub const ANALOG_AUDIO_OUT: &str = "AnalogAudioOut";

/// Route state as last reported by the device
#[derive(Debug, Clone)]
struct ReceiverState {
    video_route_name: String,
    audio_source_name: String,
    audio_input_is_local: bool,
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self {
            video_route_name: NO_SOURCE.to_string(),
            audio_source_name: NO_SOURCE.to_string(),
            audio_input_is_local: false,
        }
    }
}

/// A network stream decoder with an independent secondary audio path.
///
/// With a `local_audio_name` the receiver also offers its local audio input
/// as a source, and is listed among the known transmitters.
pub struct StreamReceiver {
    key: String,
    name: String,
    device_id: DeviceId,
    local_audio_name: Option<String>,
    inputs: PortCollection,
    outputs: PortCollection,
    state: Arc<RwLock<ReceiverState>>,
    video_route_name: Arc<StringFeedback>,
    audio_source_name: Arc<StringFeedback>,
    audio_input_is_local: Arc<BoolFeedback>,
    commands: Sender<SwitchCommand>,
}

impl StreamReceiver {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        device_id: DeviceId,
        local_audio_name: Option<String>,
        commands: Sender<SwitchCommand>,
    ) -> Result<Self> {
        let key = key.into();

        let mut inputs = PortCollection::new(&key, PortDirection::Input);
        inputs.add(RoutingPort::input(
            &key,
            STREAM_IN,
            SignalType::AUDIO_VIDEO,
            ConnectionType::Streaming,
        ))?;
        inputs.add(RoutingPort::input(
            &key,
            SECONDARY_AUDIO_IN,
            SignalType::AUDIO,
            ConnectionType::Streaming,
        ))?;
        inputs.add(RoutingPort::input(
            &key,
            LOCAL_AUDIO_IN,
            SignalType::AUDIO,
            ConnectionType::LineAudio,
        ))?;

        let mut outputs = PortCollection::new(&key, PortDirection::Output);
        outputs.add(RoutingPort::output(
            &key,
            HDMI_OUT,
            SignalType::AUDIO_VIDEO,
            ConnectionType::Hdmi,
        ))?;
        outputs.add(RoutingPort::output(
            &key,
            ANALOG_AUDIO_OUT,
            SignalType::AUDIO,
            ConnectionType::LineAudio,
        ))?;

        let state: Arc<RwLock<ReceiverState>> = Arc::default();
        let video_route_name = StringFeedback::new(format!("{}-VideoRouteName", key), {
            let state = state.clone();
            move || state.read().video_route_name.clone()
        });
        let audio_source_name = StringFeedback::new(format!("{}-AudioSourceName", key), {
            let state = state.clone();
            move || state.read().audio_source_name.clone()
        });
        let audio_input_is_local = BoolFeedback::new(format!("{}-AudioInputIsLocal", key), {
            let state = state.clone();
            move || state.read().audio_input_is_local
        });

        Ok(Self {
            key,
            name: name.into(),
            device_id,
            local_audio_name,
            inputs,
            outputs,
            state,
            video_route_name,
            audio_source_name,
            audio_input_is_local,
            commands,
        })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn video_route_name_feedback(&self) -> &Arc<StringFeedback> {
        &self.video_route_name
    }

    // ── Transport feedback ─────────────────────────────────────────────────

    /// Stream name now feeding the primary video path
    pub fn update_video_route(&self, name: &str) {
        self.state.write().video_route_name = name.to_string();
        self.video_route_name.fire_update();
    }

    /// Stream name now feeding the secondary audio path
    pub fn update_audio_source(&self, name: &str) {
        self.state.write().audio_source_name = name.to_string();
        self.audio_source_name.fire_update();
    }

    pub fn set_audio_input_local(&self, local: bool) {
        if local && self.local_audio_name.is_none() {
            log::warn!("{}: local audio reported but no local audio source configured", self.key);
        }
        self.state.write().audio_input_is_local = local;
        self.audio_input_is_local.fire_update();
    }
}

impl Routable for StreamReceiver {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_ports(&self) -> &PortCollection {
        &self.inputs
    }

    fn output_ports(&self) -> &PortCollection {
        &self.outputs
    }

    fn execute_switch(&self, input_key: &str, output_key: &str, signal_type: SignalType) {
        if let Some(cmd) = switch_command(self, input_key, output_key, signal_type)
            && self.commands.send(cmd).is_err()
        {
            log::warn!("{}: transport gone, switch not dispatched", self.key);
        }
    }

    fn transmitter_info(&self) -> Option<TransmitterInfo> {
        self.local_audio_name.as_ref().map(|audio_name| TransmitterInfo {
            device_key: self.key.clone(),
            device_id: self.device_id,
            name: self.name.clone(),
            audio_name: audio_name.clone(),
        })
    }

    fn secondary_audio(&self) -> Option<&dyn SecondaryAudio> {
        Some(self)
    }
}

impl SecondaryAudio for StreamReceiver {
    fn audio_source_name_feedback(&self) -> &Arc<StringFeedback> {
        &self.audio_source_name
    }

    fn audio_input_is_local_feedback(&self) -> &Arc<BoolFeedback> {
        &self.audio_input_is_local
    }
}
