//! The dispatch loop.
//!
//! [`Controller::run`] is the only place where controller state changes. It
//! waits on every source at once and handles one wake-up at a time:
//!
//! ```text
//!                ┌─────────────────────────────────────────┐
//!  hardware ────►│                                         │
//!  events        │              Controller                 │
//!  health   ────►│  keypad ─► decision engine ─► outputs   │────► lines
//!  reports       │                   │                     │
//!  timers   ────►│                   └────► outbox ────────│────► collaborators
//!                └─────────────────────────────────────────┘
//! ```
//!
//! Timers are the earliest output reversion, the keypad inactivity tick, the
//! run LED heartbeat, the status LED blink step and the error chirp. After
//! every wake-up due output reversions are applied.

use crate::decision::{ActuationConfig, Decision, DecisionEngine};
use crate::health::{HealthCondition, HealthReport, StatusIndicator};
use crate::outbox::AccessEvent;
use doorbot_core::EntryCode;
use doorbot_core::constants::{
    DEFAULT_CHIRP_INTERVAL_SECS, DEFAULT_KEYPAD_TICK_MS, DEFAULT_KEYPAD_TIMEOUT_MS, HEARTBEAT_MS,
    STATUS_BLINK_STEP_MS,
};
use doorbot_hardware::{
    HardwareEvent, HardwareEvents, KeypadInput, Level, LineDriver, LineId, OutputBank, OutputId,
    TriggerOptions,
};
use doorbot_keypad::{CodeAccumulator, KeyOutcome};
use doorbot_reader::{DecodedInput, decode_frame, decode_value};
use doorbot_storage::RecordStore;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

/// Timings of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub keypad_timeout: Duration,
    pub keypad_tick: Duration,
    pub heartbeat: Duration,
    pub blink_step: Duration,
    pub chirp_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            keypad_timeout: Duration::from_millis(DEFAULT_KEYPAD_TIMEOUT_MS),
            keypad_tick: Duration::from_millis(DEFAULT_KEYPAD_TICK_MS),
            heartbeat: Duration::from_millis(HEARTBEAT_MS),
            blink_step: Duration::from_millis(STATUS_BLINK_STEP_MS),
            chirp_interval: Duration::from_secs(DEFAULT_CHIRP_INTERVAL_SECS),
        }
    }
}

/// Build an output bank mapping each output to its line, with default
/// durations taken from `actuation`.
pub fn build_outputs<D, I>(driver: D, lines: I, actuation: &ActuationConfig) -> OutputBank<D>
where
    D: LineDriver,
    I: IntoIterator<Item = (OutputId, LineId)>,
{
    lines
        .into_iter()
        .fold(OutputBank::new(driver), |bank, (id, line)| {
            bank.with_output(id, line, actuation.duration(id))
        })
}

/// Owns every piece of controller state.
pub struct Controller<D: LineDriver, S> {
    outputs: OutputBank<D>,
    keypad: CodeAccumulator,
    engine: DecisionEngine<S>,
    status: StatusIndicator,
    config: ControllerConfig,
    error_pending: bool,
    run_led: bool,
}

impl<D: LineDriver, S: RecordStore> Controller<D, S> {
    pub fn new(
        outputs: OutputBank<D>,
        engine: DecisionEngine<S>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            outputs,
            keypad: CodeAccumulator::new(config.keypad_timeout),
            engine,
            status: StatusIndicator::new(),
            config,
            error_pending: false,
            run_led: false,
        }
    }

    pub fn outputs(&self) -> &OutputBank<D> {
        &self.outputs
    }

    /// Run until every hardware event sender is dropped.
    ///
    /// Lines are driven idle on start and on exit.
    pub async fn run(
        mut self,
        mut events: HardwareEvents,
        mut health: mpsc::Receiver<HealthReport>,
    ) {
        self.outputs.reset_all();
        info!(action = "START", "door controller started");
        self.engine.outbox().post(AccessEvent::Startup);

        let start = Instant::now();
        let mut keypad_tick = ticker(start, self.config.keypad_tick);
        let mut heartbeat = ticker(start, self.config.heartbeat);
        let mut blink = ticker(start, self.config.blink_step);
        let mut chirp = ticker(start, self.config.chirp_interval);

        loop {
            let deadline = self.outputs.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event).await;
                    }
                    None => break,
                },
                Some(report) = health.recv() => self.apply_health(&report),
                () = wait_until(deadline) => {}
                _ = keypad_tick.tick() => {
                    self.keypad.tick(Instant::now());
                }
                _ = heartbeat.tick() => self.toggle_run_led(),
                _ = blink.tick() => self.step_status(),
                _ = chirp.tick() => self.chirp(),
            }
            self.outputs.poll(Instant::now());
        }

        info!("hardware events closed, stopping controller");
        self.outputs.reset_all();
    }

    /// Handle one hardware event. Returns the decision it led to, if any.
    pub async fn handle_event(&mut self, event: HardwareEvent) -> Option<Decision> {
        match event {
            HardwareEvent::Key(input) => self.key(input).await,
            HardwareEvent::ReaderValue(value) => Some(self.validate(decode_value(value)).await),
            HardwareEvent::ReaderFrame(bits) => match decode_frame(bits) {
                DecodedInput::Code(code) => Some(self.validate(code).await),
                DecodedInput::Key(input) => self.key(input).await,
            },
            HardwareEvent::Doorbell => {
                self.engine.doorbell();
                None
            }
            HardwareEvent::RequestToExit => Some(self.engine.request_to_exit(&mut self.outputs)),
            HardwareEvent::SourceError { source, error } => {
                warn!(%source, "input source failed: {}", error);
                None
            }
        }
    }

    /// Apply the latest health report to the status LED and error chirp.
    pub fn apply_health(&mut self, report: &HealthReport) {
        self.status.show(report.first());
        self.error_pending = report.contains(HealthCondition::ErrorLog);
    }

    async fn key(&mut self, input: KeypadInput) -> Option<Decision> {
        let outcome = self.keypad.on_key(input, Instant::now());
        if outcome != KeyOutcome::Ignored {
            self.trigger(OutputId::KeypadBeeper);
        }
        match outcome.into_code() {
            Some(code) => Some(self.validate(code).await),
            None => None,
        }
    }

    async fn validate(&mut self, code: EntryCode) -> Decision {
        self.engine.validate(&code, &mut self.outputs).await
    }

    fn toggle_run_led(&mut self) {
        self.run_led = !self.run_led;
        self.steady(OutputId::RunLed, Level::from(self.run_led));
    }

    fn step_status(&mut self) {
        let level = self.status.step();
        self.steady(OutputId::StatusLed, level);
    }

    fn chirp(&mut self) {
        if self.error_pending {
            self.trigger(OutputId::InsideBuzzer);
        }
    }

    fn trigger(&mut self, id: OutputId) {
        if let Err(e) = self
            .outputs
            .trigger(id, Instant::now(), TriggerOptions::default())
        {
            debug!(output = %id, "trigger skipped: {}", e);
        }
    }

    fn steady(&mut self, id: OutputId, level: Level) {
        if let Err(e) = self.outputs.set_steady(id, level) {
            debug!(output = %id, "steady level skipped: {}", e);
        }
    }
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = interval_at(start + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
