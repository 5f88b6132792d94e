//! Switchyard - loads a topology, brings the fabric up and reports on it.
//!
//! Device transports live elsewhere; switch commands are logged here.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use switchyard::TopologyConfig;
use switchyard::routing::SwitchCommand;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting switchyard");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => TopologyConfig::load(&path),
        None => TopologyConfig::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load topology: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Command worker: stands in for the device transports
    let (cmd_tx, cmd_rx) = mpsc::channel::<SwitchCommand>();
    let worker = std::thread::Builder::new()
        .name("switch-commands".to_string())
        .spawn(move || {
            for cmd in cmd_rx {
                log::info!(
                    "Switch {}: {} -> {} ({})",
                    cmd.device_key,
                    cmd.input_key,
                    cmd.output_key,
                    cmd.signal_type
                );
            }
            log::debug!("Command channel closed");
        });
    let worker = match worker {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to spawn command worker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let activation = switchyard::activate(&config, cmd_tx);
    for e in &activation.report.errors {
        log::warn!("Topology error: {}", e);
    }

    println!("Tie lines:");
    for line in activation.fabric.tie_lines().describe() {
        println!("  {}", line);
    }
    if let Some(afv) = &activation.audio_follow {
        println!("Audio follows video: {:?}", afv.mode());
    }
    println!("Secondary audio:");
    for resolver in &activation.resolvers {
        let route = resolver.resolve();
        println!(
            "  {}: {} (id {})",
            resolver.receiver_key(),
            route.source_name,
            route.source_device_id
        );
    }

    let clean = activation.report.is_clean();
    activation.fabric.clear();
    // Dropping the activation drops the last command sender
    drop(activation);
    if worker.join().is_err() {
        log::error!("Command worker panicked");
    }

    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
