//! Entry decisions, health monitoring and the dispatch loop.
//!
//! # Architecture
//!
//! - [`DecisionEngine`] turns an [`EntryCode`](doorbot_core::EntryCode) into
//!   a grant or a denial and triggers the outputs
//! - [`HealthMonitor`] keeps edge-triggered alert state per condition
//! - [`Outbox`] carries fire-and-forget events to the collaborators in
//!   [`ports`], delivered by [`deliver`]
//! - [`Controller`] owns all of the above plus the keypad accumulator and
//!   the output bank, and runs the single dispatch loop
//!
//! Nothing here is shared between tasks: the controller, the delivery worker
//! and the health loop are three futures joined by the binary, talking over
//! channels.
//!
//! # Example
//!
//! ```no_run
//! use doorbot_engine::*;
//! use doorbot_engine::mock::Recorder;
//! use doorbot_hardware::{events, LineId, OutputId};
//! use doorbot_hardware::mock::MockDriver;
//! use doorbot_storage::{CsvRecordStore, Matcher};
//!
//! # async fn example() {
//! let recorder = Recorder::new();
//! let collaborators = recorder.collaborators();
//! let (outbox, outbox_rx) = Outbox::channel();
//! let (_sender, hardware) = events::channel(64);
//! let (_health_tx, health_rx) = tokio::sync::mpsc::channel(4);
//!
//! let actuation = ActuationConfig::default();
//! let (driver, _lines) = MockDriver::new();
//! let outputs = build_outputs(driver, [(OutputId::GateLock, LineId::new(17))], &actuation);
//! let engine = DecisionEngine::new(
//!     Matcher::new(CsvRecordStore::new("members.csv")),
//!     outbox,
//!     actuation,
//!     "front-door",
//! );
//! let controller = Controller::new(outputs, engine, ControllerConfig::default());
//!
//! tokio::join!(
//!     controller.run(hardware, health_rx),
//!     deliver(outbox_rx, &collaborators),
//! );
//! # }
//! ```

pub mod controller;
pub mod decision;
pub mod health;
pub mod mock;
pub mod outbox;
pub mod ports;

pub use controller::{Controller, ControllerConfig, build_outputs};
pub use decision::{
    ActuationConfig, Attempt, AttemptState, Decision, DecisionEngine, DenyReason,
};
pub use health::{
    AlertState, FileHealthProbe, HealthCondition, HealthConfig, HealthMonitor, HealthProbe,
    HealthReport, HealthSample, StatusIndicator, run_health,
};
pub use outbox::{AccessEvent, Outbox, OutboxReceiver, deliver};
pub use ports::{
    ActivitySink, AudioCue, AudioPlayer, Collaborators, DisplayMessage, DisplayPanel, Notifier,
};
