//! doorbot: door access controller.
//!
//! Usage: `doorbot [CONFIG]` (defaults to `doorbot.toml`, which is optional).
//! Hardware is simulated on the console; see [`console`] for the commands.

mod collaborators;
mod config;
mod console;

use anyhow::Context;
use collaborators::LogCollaborators;
use config::{Config, DEFAULT_CONFIG_PATH};
use console::{ConsoleDriver, ConsoleInput, stdin_lines};
use doorbot_engine::{
    Controller, DecisionEngine, FileHealthProbe, HealthMonitor, Outbox, build_outputs, deliver,
    run_health,
};
use doorbot_hardware::{Edge, InputKind, LineId, LineWatch, events};
use doorbot_storage::{CsvRecordStore, Matcher};
use tokio::sync::mpsc;
use tracing::info;

/// Capacity of the hardware event channel.
const EVENT_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&path).with_context(|| format!("loading {path}"))?;
    init_tracing(&config.logging.filter);

    info!(
        version = doorbot_core::VERSION,
        device = %config.device.name,
        records = %config.records.path.display(),
        "configuration loaded"
    );

    let (outbox, outbox_rx) = Outbox::channel();
    let (sender, hardware) = events::channel(EVENT_CAPACITY);
    let (health_tx, health_rx) = mpsc::channel(1);

    let outputs = build_outputs(
        ConsoleDriver::new(config.active_low()),
        config.output_lines(),
        &config.actuation,
    );
    let engine = DecisionEngine::new(
        Matcher::new(CsvRecordStore::new(&config.records.path)),
        outbox,
        config.actuation.clone(),
        config.device.name.clone(),
    );
    let controller = Controller::new(outputs, engine, config.controller_config());

    let collaborators = LogCollaborators::default();
    let probe = FileHealthProbe::new(
        &config.health.error_log,
        CsvRecordStore::new(&config.records.path),
    );
    let health_config = config.health_config();
    let monitor = HealthMonitor::new(health_config.stale_after);

    let input = ConsoleInput::new(
        sender,
        watch(config.lines.doorbell, &config, InputKind::Doorbell),
        watch(config.lines.request_to_exit, &config, InputKind::RequestToExit),
    );
    let lines = stdin_lines().context("starting console input")?;
    let console = async {
        tokio::select! {
            result = input.run(lines) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                Ok(())
            }
        }
    };

    // The health loop never finishes on its own; it stops with the controller.
    let control = async {
        tokio::select! {
            () = controller.run(hardware, health_rx) => {}
            () = run_health(
                monitor,
                &probe,
                &collaborators.notifier,
                health_config,
                health_tx,
            ) => {}
        }
    };

    let ((), (), console) = tokio::join!(control, deliver(outbox_rx, &collaborators), console);
    console?;

    info!("door controller stopped");
    Ok(())
}

fn watch(line: u8, config: &Config, kind: InputKind) -> LineWatch {
    LineWatch::new(LineId::new(line), Edge::Rising, config.debounce(), kind)
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
