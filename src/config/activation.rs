use std::sync::Arc;
use std::sync::mpsc::Sender;

use super::{DeviceConfig, PortConfig, TopologyConfig};
use crate::endpoints::{MatrixSwitcher, StreamReceiver, StreamTransmitter};
use crate::error::{FabricError, Result};
use crate::follow::AudioFollowVideo;
use crate::resolver::{RouteResolver, TransmitterDirectory};
use crate::routing::{Routable, RoutingFabric, RoutingPort, SwitchCommand};

/// What [`activate`] managed to bring up
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub devices: usize,
    pub tie_lines: usize,
    /// Entries that were logged and skipped
    pub errors: Vec<FabricError>,
}

impl ActivationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A live fabric built from a [`TopologyConfig`]
pub struct Activation {
    pub fabric: Arc<RoutingFabric>,
    pub audio_follow: Option<AudioFollowVideo>,
    pub resolvers: Vec<RouteResolver>,
    pub report: ActivationReport,
}

/// Build devices, then tie lines, then the engines that sit on top of them.
///
/// Bad entries are logged and skipped so one typo does not take the whole
/// fabric down; they are collected in [`ActivationReport::errors`].
pub fn activate(config: &TopologyConfig, commands: Sender<SwitchCommand>) -> Activation {
    let fabric = RoutingFabric::new();
    let mut report = ActivationReport::default();

    // ── Devices ──
    let mut ordered: Vec<&DeviceConfig> = config.devices.iter().collect();
    ordered.sort_by_key(|d| d.activation_rank());
    for device in ordered {
        let added = build_device(device, commands.clone()).and_then(|d| fabric.add_device(d));
        match added {
            Ok(()) => report.devices += 1,
            Err(e) => {
                log::error!("Skipping device '{}': {}", device.key(), e);
                report.errors.push(e);
            }
        }
    }

    // ── Tie lines ──
    for tl in &config.tie_lines {
        match fabric.connect(
            &tl.source_device,
            &tl.source_port,
            &tl.destination_device,
            &tl.destination_port,
            tl.signal,
        ) {
            Ok(line) => {
                log::debug!("Tie line: {}", line);
                report.tie_lines += 1;
            }
            Err(e) => {
                log::error!(
                    "Skipping tie line {}:{} -> {}:{}: {}",
                    tl.source_device,
                    tl.source_port,
                    tl.destination_device,
                    tl.destination_port,
                    e
                );
                report.errors.push(e);
            }
        }
    }

    // ── Audio follows video ──
    let audio_follow = config.audio_follows_video.as_ref().and_then(|afv| {
        if fabric.get_device(&afv.primary_video_router).is_none() {
            log::error!(
                "Audio-follow disabled: primary video router '{}' not found",
                afv.primary_video_router
            );
            report
                .errors
                .push(FabricError::DeviceNotFound(afv.primary_video_router.clone()));
            return None;
        }
        let engine =
            AudioFollowVideo::from_fabric(fabric.clone(), &afv.primary_video_router, afv.initial_mode);
        report.errors.extend(engine.configuration_errors());
        engine.set_mode(afv.initial_mode);
        Some(engine)
    });

    // ── Resolvers ──
    let directory = Arc::new(TransmitterDirectory::from_fabric(&fabric));
    let mut resolvers = Vec::new();
    for device in fabric.devices() {
        if device.secondary_audio().is_none() {
            continue;
        }
        match RouteResolver::new(device.as_ref(), directory.clone()) {
            Ok(resolver) => resolvers.push(resolver),
            Err(e) => {
                log::error!("No route resolver for '{}': {}", device.key(), e);
                report.errors.push(e);
            }
        }
    }

    log::info!(
        "Fabric active: {} devices, {} tie lines, {} resolvers, {} errors",
        report.devices,
        report.tie_lines,
        resolvers.len(),
        report.errors.len()
    );

    Activation {
        fabric,
        audio_follow,
        resolvers,
        report,
    }
}

fn build_device(config: &DeviceConfig, commands: Sender<SwitchCommand>) -> Result<Arc<dyn Routable>> {
    let device: Arc<dyn Routable> = match config {
        DeviceConfig::Matrix(m) => {
            let name = m.name.clone().unwrap_or_else(|| m.key.clone());
            let inputs = m
                .inputs
                .iter()
                .map(|p| port(p, RoutingPort::input(&m.key, &p.key, p.signal, p.connection)))
                .collect();
            let outputs = m
                .outputs
                .iter()
                .map(|p| port(p, RoutingPort::output(&m.key, &p.key, p.signal, p.connection)))
                .collect();
            Arc::new(MatrixSwitcher::new(&m.key, name, inputs, outputs, commands)?)
        }
        DeviceConfig::Transmitter(t) => {
            let name = t.name.clone().unwrap_or_else(|| t.key.clone());
            Arc::new(StreamTransmitter::new(
                &t.key,
                name,
                t.device_id,
                t.audio_name.clone(),
                commands,
            )?)
        }
        DeviceConfig::Receiver(r) => {
            let name = r.name.clone().unwrap_or_else(|| r.key.clone());
            Arc::new(StreamReceiver::new(
                &r.key,
                name,
                r.device_id,
                r.local_audio_name.clone(),
                commands,
            )?)
        }
    };
    Ok(device)
}

fn port(config: &PortConfig, port: RoutingPort) -> RoutingPort {
    match &config.selector {
        Some(selector) => port.with_selector(selector.clone()),
        None => port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::receiver::SECONDARY_AUDIO_IN;
    use crate::follow::FollowMode;
    use crate::routing::{NO_SOURCE, SignalType};
    use std::sync::mpsc;

    const TOPOLOGY: &str = r#"{
        "devices": [
            { "type": "receiver", "key": "rx-1", "device_id": 11 },
            { "type": "matrix", "key": "video",
              "inputs":  [ { "key": "In1", "signal": "AudioVideo" } ],
              "outputs": [ { "key": "Out1", "signal": "AudioVideo" } ] },
            { "type": "transmitter", "key": "tx-1", "name": "Lectern", "device_id": 5 },
            { "type": "transmitter", "key": "tx-1", "device_id": 6 }
        ],
        "tie_lines": [
            { "source_device": "tx-1", "source_port": "StreamOutput",
              "destination_device": "video", "destination_port": "In1", "signal": "Video" },
            { "source_device": "video", "source_port": "Out1",
              "destination_device": "rx-1", "destination_port": "StreamInput", "signal": "Video" },
            { "source_device": "video", "source_port": "Out9",
              "destination_device": "rx-1", "destination_port": "StreamInput" }
        ],
        "audio_follows_video": { "primary_video_router": "video" }
    }"#;

    fn activated() -> Activation {
        let config: TopologyConfig = serde_json::from_str(TOPOLOGY).unwrap();
        let (tx, _rx) = mpsc::channel();
        activate(&config, tx)
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let activation = activated();
        let report = &activation.report;
        assert_eq!(report.devices, 3);
        assert_eq!(report.tie_lines, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[0], FabricError::DuplicateDevice(_)));
        assert!(matches!(report.errors[1], FabricError::PortNotFound { .. }));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_devices_registered_in_activation_order() {
        let activation = activated();
        let keys: Vec<String> = activation
            .fabric
            .devices()
            .iter()
            .map(|d| d.key().to_string())
            .collect();
        assert_eq!(keys, vec!["tx-1", "video", "rx-1"]);
        let tx = activation.fabric.get_device("tx-1").unwrap();
        assert_eq!(tx.name(), "Lectern");
    }

    #[test]
    fn test_initial_follow_mode_applied() {
        let activation = activated();
        let afv = activation.audio_follow.as_ref().unwrap();
        assert_eq!(afv.mode(), FollowMode::Linked);
        for line in activation.fabric.tie_lines().snapshot() {
            assert_eq!(line.effective_type(), SignalType::AUDIO_VIDEO);
        }
    }

    #[test]
    fn test_missing_router_disables_follow() {
        let mut config: TopologyConfig = serde_json::from_str(TOPOLOGY).unwrap();
        if let Some(afv) = config.audio_follows_video.as_mut() {
            afv.primary_video_router = "nowhere".to_string();
        }
        let (tx, _rx) = mpsc::channel();
        let activation = activate(&config, tx);
        assert!(activation.audio_follow.is_none());
        assert!(matches!(
            activation.report.errors.last(),
            Some(FabricError::DeviceNotFound(k)) if k == "nowhere"
        ));
    }

    #[test]
    fn test_resolver_per_secondary_audio_receiver() {
        let activation = activated();
        assert_eq!(activation.resolvers.len(), 1);
        let resolver = &activation.resolvers[0];
        assert_eq!(resolver.receiver_key(), "rx-1");
        let resolved = resolver.resolve();
        assert_eq!(resolved.source_device_id, 0);
        assert_eq!(resolved.source_name, NO_SOURCE);

        let rx = activation.fabric.get_device("rx-1").unwrap();
        assert!(rx.input_ports().contains(SECONDARY_AUDIO_IN));
    }

    #[test]
    fn test_video_only_router_reported() {
        let config: TopologyConfig = serde_json::from_str(
            r#"{
            "devices": [
                { "type": "transmitter", "key": "tx-1", "device_id": 5 },
                { "type": "matrix", "key": "video",
                  "inputs":  [ { "key": "In1", "signal": "Video" } ],
                  "outputs": [ { "key": "Out1", "signal": "Video" } ] },
                { "type": "receiver", "key": "rx-1", "device_id": 11 }
            ],
            "tie_lines": [
                { "source_device": "tx-1", "source_port": "StreamOutput",
                  "destination_device": "video", "destination_port": "In1" },
                { "source_device": "video", "source_port": "Out1",
                  "destination_device": "rx-1", "destination_port": "StreamInput" }
            ],
            "audio_follows_video": { "primary_video_router": "video", "initial_mode": "Independent" }
        }"#,
        )
        .unwrap();
        let (tx, _rx) = mpsc::channel();
        let activation = activate(&config, tx);

        assert_eq!(activation.report.tie_lines, 2);
        assert_eq!(activation.report.errors.len(), 2);
        assert!(activation
            .report
            .errors
            .iter()
            .all(|e| matches!(e, FabricError::SignalMismatch { .. })));

        let afv = activation.audio_follow.as_ref().unwrap();
        assert_eq!(afv.set_audio_follows_video_true(), 0);
        assert_eq!(afv.set_audio_follows_video_false(), 0);
        for line in activation.fabric.tie_lines().snapshot() {
            assert_eq!(line.override_type, None);
            assert_eq!(line.effective_type(), SignalType::VIDEO);
        }
    }

    #[test]
    fn test_empty_config() {
        let (tx, _rx) = mpsc::channel();
        let activation = activate(&TopologyConfig::default(), tx);
        assert_eq!(activation.fabric.device_count(), 0);
        assert!(activation.audio_follow.is_none());
        assert!(activation.resolvers.is_empty());
        assert!(activation.report.is_clean());
    }
}
