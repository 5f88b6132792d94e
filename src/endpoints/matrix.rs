use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::error::Result;
use crate::feedback::StringFeedback;
use crate::routing::{
    PortCollection, PortDirection, Routable, RoutingPort, SignalType, SwitchCommand, NO_SOURCE,
    switch_command,
};

/// A crosspoint switcher: any input to any output.
///
/// Used for hardware matrices as well as the virtual stream routers that
/// connect transmitters to receivers.
pub struct MatrixSwitcher {
    key: String,
    name: String,
    inputs: PortCollection,
    outputs: PortCollection,
    /// Transport-reported crosspoints, output key -> input key
    crosspoints: Arc<RwLock<HashMap<String, String>>>,
    route_feedbacks: HashMap<String, Arc<StringFeedback>>,
    commands: Sender<SwitchCommand>,
}

impl MatrixSwitcher {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        inputs: Vec<RoutingPort>,
        outputs: Vec<RoutingPort>,
        commands: Sender<SwitchCommand>,
    ) -> Result<Self> {
        let key = key.into();
        let mut input_ports = PortCollection::new(&key, PortDirection::Input);
        for port in inputs {
            input_ports.add(port)?;
        }
        let mut output_ports = PortCollection::new(&key, PortDirection::Output);
        for port in outputs {
            output_ports.add(port)?;
        }

        let crosspoints: Arc<RwLock<HashMap<String, String>>> = Arc::default();
        let route_feedbacks = output_ports
            .iter()
            .map(|port| {
                let output_key = port.key.clone();
                let crosspoints = crosspoints.clone();
                let fb = StringFeedback::new(format!("{}-{}-route", key, output_key), move || {
                    crosspoints
                        .read()
                        .get(&output_key)
                        .cloned()
                        .unwrap_or_else(|| NO_SOURCE.to_string())
                });
                (port.key.clone(), fb)
            })
            .collect();

        Ok(Self {
            key,
            name: name.into(),
            inputs: input_ports,
            outputs: output_ports,
            crosspoints,
            route_feedbacks,
            commands,
        })
    }

    /// Input key currently routed to `output_key`, per transport feedback
    pub fn current_input(&self, output_key: &str) -> Option<String> {
        self.crosspoints.read().get(output_key).cloned()
    }

    pub fn route_feedback(&self, output_key: &str) -> Option<&Arc<StringFeedback>> {
        self.route_feedbacks.get(output_key)
    }

    /// Record a crosspoint reported by the device (`None` = output cleared)
    /// and fire that output's route feedback.
    pub fn apply_route_feedback(&self, output_key: &str, input_key: Option<&str>) -> bool {
        let Some(fb) = self.route_feedbacks.get(output_key) else {
            log::warn!("{}: route feedback for unknown output '{}'", self.key, output_key);
            return false;
        };
        if let Some(input) = input_key
            && !self.inputs.contains(input)
        {
            log::warn!(
                "{}: route feedback names unknown input '{}' on '{}'",
                self.key,
                input,
                output_key
            );
            return false;
        }

        {
            let mut crosspoints = self.crosspoints.write();
            match input_key {
                Some(input) => crosspoints.insert(output_key.to_string(), input.to_string()),
                None => crosspoints.remove(output_key),
            };
        }
        fb.fire_update();
        true
    }
}

impl Routable for MatrixSwitcher {
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
        let Some(cmd) = switch_command(self, input_key, output_key, signal_type) else {
            return;
        };
        log::debug!(
            "{}: switch {} -> {} ({})",
            self.key,
            cmd.input_key,
            cmd.output_key,
            cmd.signal_type
        );
        if self.commands.send(cmd).is_err() {
            log::warn!("{}: transport gone, switch not dispatched", self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ConnectionType, RoutingFabric, Selector};
    use std::sync::mpsc;

    fn switcher() -> (MatrixSwitcher, mpsc::Receiver<SwitchCommand>) {
        let (tx, rx) = mpsc::channel();
        let inputs = (1..=2)
            .map(|n| {
                RoutingPort::input("dm", format!("In{}", n), SignalType::AUDIO_VIDEO, ConnectionType::Hdmi)
                    .with_selector(Selector::Number(n))
            })
            .collect();
        let outputs = vec![
            RoutingPort::output("dm", "Out1", SignalType::AUDIO_VIDEO, ConnectionType::HdBaseT)
                .with_selector(Selector::Number(1)),
        ];
        (MatrixSwitcher::new("dm", "DM Matrix", inputs, outputs, tx).unwrap(), rx)
    }

    #[test]
    fn test_switch_dispatches_command_with_selectors() {
        let (dm, rx) = switcher();
        dm.execute_switch("In2", "Out1", SignalType::VIDEO);
        let cmd = rx.try_recv().unwrap();
        assert_eq!(cmd.device_key, "dm");
        assert_eq!(cmd.input_selector, Some(Selector::Number(2)));
        assert_eq!(cmd.output_selector, Some(Selector::Number(1)));
        assert_eq!(cmd.signal_type, SignalType::VIDEO);
        // dispatch alone does not change the reported route
        assert_eq!(dm.current_input("Out1"), None);
    }

    #[test]
    fn test_unknown_selector_is_noop() {
        let (dm, rx) = switcher();
        dm.execute_switch("In9", "Out1", SignalType::VIDEO);
        dm.execute_switch("In1", "Out9", SignalType::VIDEO);
        assert!(rx.try_recv().is_err());
        assert_eq!(dm.route_feedback("Out1").unwrap().last_fired(), None);
    }

    #[test]
    fn test_unknown_selector_leaves_tie_lines_alone() {
        let (dm, rx) = switcher();
        let dm = Arc::new(dm);
        let (tx, _display_rx) = mpsc::channel();
        let display = MatrixSwitcher::new(
            "display",
            "Display",
            vec![RoutingPort::input("display", "Hdmi1", SignalType::AUDIO_VIDEO, ConnectionType::Hdmi)],
            Vec::new(),
            tx,
        )
        .unwrap();
        let fabric = RoutingFabric::new();
        fabric.add_device(dm.clone()).unwrap();
        fabric.add_device(Arc::new(display)).unwrap();
        fabric.connect("dm", "Out1", "display", "Hdmi1", Some(SignalType::VIDEO)).unwrap();
        let before = fabric.tie_lines().snapshot();

        dm.execute_switch("In9", "Out1", SignalType::VIDEO);
        dm.execute_switch("In1", "Out9", SignalType::AUDIO_VIDEO);

        assert_eq!(fabric.tie_lines().snapshot(), before);
        assert!(rx.try_recv().is_err());
        assert_eq!(dm.current_input("Out1"), None);
    }

    #[test]
    fn test_route_feedback() {
        let (dm, _rx) = switcher();
        let fb = dm.route_feedback("Out1").unwrap().clone();
        assert_eq!(fb.value(), NO_SOURCE);

        assert!(dm.apply_route_feedback("Out1", Some("In2")));
        assert_eq!(fb.last_fired(), Some("In2".to_string()));
        assert_eq!(dm.current_input("Out1"), Some("In2".to_string()));

        assert!(!dm.apply_route_feedback("Out1", Some("In7")));
        assert_eq!(dm.current_input("Out1"), Some("In2".to_string()));

        assert!(dm.apply_route_feedback("Out1", None));
        assert_eq!(fb.last_fired(), Some(NO_SOURCE.to_string()));
        assert!(!dm.apply_route_feedback("Out4", None));
    }

    #[test]
    fn test_dropped_transport_does_not_panic() {
        let (dm, rx) = switcher();
        drop(rx);
        dm.execute_switch("In1", "Out1", SignalType::AUDIO_VIDEO);
    }
}
