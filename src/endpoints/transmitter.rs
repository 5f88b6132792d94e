use std::sync::mpsc::Sender;

use crate::error::Result;
use crate::routing::{
    ConnectionType, DeviceId, PortCollection, PortDirection, Routable, RoutingPort, Selector,
    SignalType, SwitchCommand, TransmitterInfo, switch_command,
};

pub const HDMI_IN_1: &str = "Hdmi1";
pub const HDMI_IN_2: &str = "Hdmi2";
pub const ANALOG_AUDIO_IN: &str = "AnalogAudioIn";
pub const STREAM_OUT: &str = "StreamOutput";
pub const SECONDARY_AUDIO_OUT: &str = "SecondaryAudioOutput";

/// A network stream encoder: local inputs in, one AV stream and one
/// secondary audio stream out.
pub struct StreamTransmitter {
    key: String,
    name: String,
    device_id: DeviceId,
    audio_name: String,
    inputs: PortCollection,
    outputs: PortCollection,
    commands: Sender<SwitchCommand>,
}

impl StreamTransmitter {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        device_id: DeviceId,
        audio_name: Option<String>,
        commands: Sender<SwitchCommand>,
    ) -> Result<Self> {
        let key = key.into();
        let name = name.into();
        if device_id == 0 {
            log::warn!("{}: device id 0 is reserved for 'no source'", key);
        }

        let mut inputs = PortCollection::new(&key, PortDirection::Input);
        inputs.add(
            RoutingPort::input(&key, HDMI_IN_1, SignalType::AUDIO_VIDEO, ConnectionType::Hdmi)
                .with_selector(Selector::Number(1)),
        )?;
        inputs.add(
            RoutingPort::input(&key, HDMI_IN_2, SignalType::AUDIO_VIDEO, ConnectionType::Hdmi)
                .with_selector(Selector::Number(2)),
        )?;
        inputs.add(
            RoutingPort::input(&key, ANALOG_AUDIO_IN, SignalType::AUDIO, ConnectionType::LineAudio)
                .with_selector(Selector::Number(3)),
        )?;

        let mut outputs = PortCollection::new(&key, PortDirection::Output);
        outputs.add(RoutingPort::output(
            &key,
            STREAM_OUT,
            SignalType::AUDIO_VIDEO,
            ConnectionType::Streaming,
        ))?;
        outputs.add(RoutingPort::output(
            &key,
            SECONDARY_AUDIO_OUT,
            SignalType::AUDIO,
            ConnectionType::Streaming,
        ))?;

        Ok(Self {
            audio_name: audio_name.unwrap_or_else(|| name.clone()),
            key,
            name,
            device_id,
            inputs,
            outputs,
            commands,
        })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }
}

impl Routable for StreamTransmitter {
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
            log::warn!("{}: transport gone, input select not dispatched", self.key);
        }
    }

    fn transmitter_info(&self) -> Option<TransmitterInfo> {
        Some(TransmitterInfo {
            device_key: self.key.clone(),
            device_id: self.device_id,
            name: self.name.clone(),
            audio_name: self.audio_name.clone(),
        })
    }
}
