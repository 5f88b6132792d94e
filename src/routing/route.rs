//! Path finding across tie lines.
//!
//! Walks backwards from a destination's input ports through switching
//! devices until the requested source is reached. Tie lines are tried in
//! registration order and the first complete path wins, so when several tie
//! lines land on the same port the earliest registered one is preferred.

use std::collections::HashSet;

use super::state::RoutingFabric;
use super::tie_line::TieLine;
use super::types::*;

/// One switch a midpoint device must make for a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSwitch {
    pub device_key: String,
    pub input_key: String,
    pub output_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub source_key: String,
    pub destination_key: String,
    /// Destination input port the route lands on
    pub destination_input: String,
    pub signal_type: SignalType,
    /// Ordered from the source side towards the destination
    pub switches: Vec<RouteSwitch>,
}

/// Find a path carrying `signal_type` from `source_key` to `destination_key`.
pub fn find_route(
    fabric: &RoutingFabric,
    destination_key: &str,
    source_key: &str,
    signal_type: SignalType,
) -> Option<RouteDescriptor> {
    if fabric.get_device(destination_key).is_none() {
        log::warn!("Route lookup for unknown destination '{}'", destination_key);
        return None;
    }
    if source_key == destination_key {
        log::debug!("No route from '{}' to itself", source_key);
        return None;
    }

    let mut visited = HashSet::from([destination_key.to_string()]);
    for tie_line in inbound(fabric, destination_key, signal_type) {
        let mut switches = Vec::new();
        if walk(fabric, &tie_line, source_key, signal_type, &mut visited, &mut switches) {
            return Some(RouteDescriptor {
                source_key: source_key.to_string(),
                destination_key: destination_key.to_string(),
                destination_input: tie_line.destination.key.clone(),
                signal_type,
                switches,
            });
        }
    }

    log::debug!(
        "No {} route from '{}' to '{}'",
        signal_type,
        source_key,
        destination_key
    );
    None
}

/// Dispatch every switch of `route`, source side first. Returns how many
/// switch requests were handed to devices.
pub fn execute_route(fabric: &RoutingFabric, route: &RouteDescriptor) -> usize {
    let mut dispatched = 0;
    for step in &route.switches {
        match fabric.get_device(&step.device_key) {
            Some(device) => {
                device.execute_switch(&step.input_key, &step.output_key, route.signal_type);
                dispatched += 1;
            }
            None => log::warn!(
                "Route {} -> {}: midpoint '{}' no longer registered",
                route.source_key,
                route.destination_key,
                step.device_key
            ),
        }
    }
    dispatched
}

fn inbound(fabric: &RoutingFabric, device_key: &str, signal_type: SignalType) -> Vec<TieLine> {
    let mut lines = fabric.tie_lines().to_device(device_key);
    lines.retain(|l| l.carries(signal_type));
    lines
}

fn walk(
    fabric: &RoutingFabric,
    tie_line: &TieLine,
    source_key: &str,
    signal_type: SignalType,
    visited: &mut HashSet<String>,
    switches: &mut Vec<RouteSwitch>,
) -> bool {
    let upstream = tie_line.source_device_key();
    if upstream == source_key {
        return true;
    }
    if !visited.insert(upstream.to_string()) {
        return false;
    }

    for feeding in inbound(fabric, upstream, signal_type) {
        if walk(fabric, &feeding, source_key, signal_type, visited, switches) {
            switches.push(RouteSwitch {
                device_key: upstream.to_string(),
                input_key: feeding.destination.key.clone(),
                output_key: tie_line.source.key.clone(),
            });
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::MatrixSwitcher;
    use crate::routing::{ConnectionType, RoutingPort, SwitchCommand};
    use std::sync::Arc;
    use std::sync::mpsc;

    fn matrix(
        key: &str,
        ins: usize,
        outs: usize,
        tx: &mpsc::Sender<SwitchCommand>,
    ) -> Arc<MatrixSwitcher> {
        let inputs = (1..=ins)
            .map(|n| RoutingPort::input(key, format!("In{}", n), SignalType::AUDIO_VIDEO, ConnectionType::Hdmi))
            .collect();
        let outputs = (1..=outs)
            .map(|n| RoutingPort::output(key, format!("Out{}", n), SignalType::AUDIO_VIDEO, ConnectionType::Hdmi))
            .collect();
        Arc::new(MatrixSwitcher::new(key, key, inputs, outputs, tx.clone()).unwrap())
    }

    /// laptop -> dm(In2) -> dm(Out1) -> scaler(In1) -> scaler(Out1) -> display(In1)
    fn chain() -> (Arc<RoutingFabric>, mpsc::Receiver<SwitchCommand>) {
        let (tx, rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("laptop", 0, 1, &tx)).unwrap();
        fabric.add_device(matrix("camera", 0, 1, &tx)).unwrap();
        fabric.add_device(matrix("dm", 2, 1, &tx)).unwrap();
        fabric.add_device(matrix("scaler", 1, 1, &tx)).unwrap();
        fabric.add_device(matrix("display", 1, 0, &tx)).unwrap();
        fabric.connect("camera", "Out1", "dm", "In1", None).unwrap();
        fabric.connect("laptop", "Out1", "dm", "In2", None).unwrap();
        fabric.connect("dm", "Out1", "scaler", "In1", Some(SignalType::VIDEO)).unwrap();
        fabric.connect("scaler", "Out1", "display", "In1", None).unwrap();
        (fabric, rx)
    }

    #[test]
    fn test_route_through_midpoints() {
        let (fabric, _rx) = chain();
        let route = find_route(&fabric, "display", "laptop", SignalType::VIDEO).unwrap();
        assert_eq!(route.destination_input, "In1");
        assert_eq!(
            route.switches,
            vec![
                RouteSwitch {
                    device_key: "dm".into(),
                    input_key: "In2".into(),
                    output_key: "Out1".into(),
                },
                RouteSwitch {
                    device_key: "scaler".into(),
                    input_key: "In1".into(),
                    output_key: "Out1".into(),
                },
            ]
        );
    }

    #[test]
    fn test_route_respects_signal_type() {
        let (fabric, _rx) = chain();
        // dm -> scaler only carries video
        assert!(find_route(&fabric, "display", "laptop", SignalType::AUDIO).is_none());
        fabric
            .tie_lines()
            .set_override_where(|l| l.source_device_key() == "dm", Some(SignalType::AUDIO_VIDEO));
        assert!(find_route(&fabric, "display", "laptop", SignalType::AUDIO).is_some());
    }

    #[test]
    fn test_direct_tie_line_has_no_switches() {
        let (fabric, _rx) = chain();
        let route = find_route(&fabric, "dm", "camera", SignalType::AUDIO_VIDEO).unwrap();
        assert_eq!(route.destination_input, "In1");
        assert!(route.switches.is_empty());
    }

    #[test]
    fn test_unknown_or_unreachable() {
        let (fabric, _rx) = chain();
        assert!(find_route(&fabric, "projector", "laptop", SignalType::VIDEO).is_none());
        assert!(find_route(&fabric, "laptop", "display", SignalType::VIDEO).is_none());
    }

    #[test]
    fn test_cycle_terminates() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("a", 1, 1, &tx)).unwrap();
        fabric.add_device(matrix("b", 1, 2, &tx)).unwrap();
        fabric.add_device(matrix("sink", 1, 0, &tx)).unwrap();
        fabric.connect("a", "Out1", "b", "In1", None).unwrap();
        fabric.connect("b", "Out1", "a", "In1", None).unwrap();
        fabric.connect("b", "Out2", "sink", "In1", None).unwrap();
        assert!(find_route(&fabric, "sink", "nowhere", SignalType::VIDEO).is_none());
    }

    #[test]
    fn test_no_route_to_self_through_cycle() {
        let (tx, _rx) = mpsc::channel();
        let fabric = RoutingFabric::new();
        fabric.add_device(matrix("a", 1, 1, &tx)).unwrap();
        fabric.add_device(matrix("b", 1, 1, &tx)).unwrap();
        fabric.connect("a", "Out1", "b", "In1", None).unwrap();
        fabric.connect("b", "Out1", "a", "In1", None).unwrap();
        assert!(find_route(&fabric, "a", "a", SignalType::VIDEO).is_none());
        assert!(find_route(&fabric, "a", "b", SignalType::VIDEO).is_some());
    }

    #[test]
    fn test_execute_route_dispatches_in_order() {
        let (fabric, rx) = chain();
        let route = find_route(&fabric, "display", "camera", SignalType::VIDEO).unwrap();
        assert_eq!(execute_route(&fabric, &route), 2);
        let first = rx.try_recv().unwrap();
        assert_eq!((first.device_key.as_str(), first.input_key.as_str()), ("dm", "In1"));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.device_key, "scaler");
        assert!(rx.try_recv().is_err());
    }
}
