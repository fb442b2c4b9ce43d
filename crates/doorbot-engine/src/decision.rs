//! Entry decisions.
//!
//! # Attempt states
//!
//! - `Received`: code arrived from the keypad or the reader
//! - `Validating`: matcher consulted
//! - `DeniedShort`: code shorter than the minimum, matcher never consulted
//! - `Granted` / `Denied`: outcome of the match
//!
//! # Valid transitions
//!
//! - Received → DeniedShort
//! - Received → Validating → Granted/Denied
//!
//! Once the outputs are triggered the decision is final. Anything that goes
//! wrong afterwards (notification, audit post) happens in the outbox and
//! cannot reach it.

use crate::outbox::{AccessEvent, Outbox};
use chrono::Utc;
use doorbot_core::constants::{
    DEFAULT_CHIRP_MS, DEFAULT_DENY_BUZZER_MS, DEFAULT_GATE_RELEASE_MS,
    DEFAULT_GRANT_INDICATOR_MS, DEFAULT_GRANT_PIP_MS, DEFAULT_KEY_PIP_MS,
    DEFAULT_STRIKE_RELEASE_MS,
};
use doorbot_core::{EntryCode, MembershipRecord};
use doorbot_hardware::{LineDriver, OutputBank, OutputId, TriggerOptions};
use doorbot_storage::{Matcher, RecordStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-attempt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Received,
    Validating,
    DeniedShort,
    Granted,
    Denied,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            AttemptState::Received => "Received",
            AttemptState::Validating => "Validating",
            AttemptState::DeniedShort => "DeniedShort",
            AttemptState::Granted => "Granted",
            AttemptState::Denied => "Denied",
        };
        write!(f, "{}", state_str)
    }
}

impl AttemptState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorbot_engine::AttemptState;
    ///
    /// assert!(AttemptState::Received.can_transition_to(&AttemptState::Validating));
    /// assert!(!AttemptState::Received.can_transition_to(&AttemptState::Granted));
    /// ```
    pub fn can_transition_to(&self, target: &AttemptState) -> bool {
        matches!(
            (self, target),
            (
                AttemptState::Received,
                AttemptState::Validating | AttemptState::DeniedShort
            ) | (
                AttemptState::Validating,
                AttemptState::Granted | AttemptState::Denied
            )
        )
    }

    /// Whether the attempt has reached an outcome.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AttemptState::DeniedShort | AttemptState::Granted | AttemptState::Denied
        )
    }
}

/// Path one attempt took through [`AttemptState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    history: Vec<AttemptState>,
}

impl Attempt {
    fn new() -> Self {
        Self {
            history: vec![AttemptState::Received],
        }
    }

    fn advance(&mut self, to: AttemptState) {
        debug_assert!(
            self.state().can_transition_to(&to),
            "invalid attempt transition {} -> {}",
            self.state(),
            to
        );
        self.history.push(to);
    }

    pub fn state(&self) -> AttemptState {
        self.history
            .last()
            .copied()
            .unwrap_or(AttemptState::Received)
    }

    pub fn history(&self) -> &[AttemptState] {
        &self.history
    }
}

/// Why an attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Shorter than the minimum length (includes the invalid sentinel).
    TooShort,
    /// No record admits the code, or the snapshot could not be read.
    Unrecognized,
}

/// Outcome of a validation or a request to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted(MembershipRecord),
    /// Request to exit: lock released without matching.
    Released,
    Denied(DenyReason),
}

impl Decision {
    /// Whether the lock was released.
    pub fn is_grant(&self) -> bool {
        matches!(self, Decision::Granted(_) | Decision::Released)
    }
}

/// Output durations used by the decision engine and the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuationConfig {
    pub gate_release_ms: u64,
    pub strike_release_ms: u64,
    pub grant_indicator_ms: u64,
    pub grant_pip_ms: u64,
    pub deny_buzzer_ms: u64,
    pub key_pip_ms: u64,
    pub chirp_ms: u64,
    /// Show codes that matched nothing on the display.
    pub show_unrecognized: bool,
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            gate_release_ms: DEFAULT_GATE_RELEASE_MS,
            strike_release_ms: DEFAULT_STRIKE_RELEASE_MS,
            grant_indicator_ms: DEFAULT_GRANT_INDICATOR_MS,
            grant_pip_ms: DEFAULT_GRANT_PIP_MS,
            deny_buzzer_ms: DEFAULT_DENY_BUZZER_MS,
            key_pip_ms: DEFAULT_KEY_PIP_MS,
            chirp_ms: DEFAULT_CHIRP_MS,
            show_unrecognized: true,
        }
    }
}

impl ActuationConfig {
    /// Default duration of a timed output.
    pub fn duration(&self, id: OutputId) -> Duration {
        let ms = match id {
            OutputId::GateLock => self.gate_release_ms,
            OutputId::StrikeLock => self.strike_release_ms,
            OutputId::GrantIndicator => self.grant_indicator_ms,
            OutputId::DenyBuzzer => self.deny_buzzer_ms,
            OutputId::KeypadBeeper => self.key_pip_ms,
            OutputId::InsideBuzzer => self.chirp_ms,
            // Pattern-driven LEDs; the value only bounds a stray trigger.
            OutputId::StatusLed | OutputId::RunLed => self.grant_pip_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Turns entry codes into grant/deny actuation.
pub struct DecisionEngine<S> {
    matcher: Matcher<S>,
    outbox: Outbox,
    actuation: ActuationConfig,
    device: String,
}

impl<S: RecordStore> DecisionEngine<S> {
    pub fn new(
        matcher: Matcher<S>,
        outbox: Outbox,
        actuation: ActuationConfig,
        device: impl Into<String>,
    ) -> Self {
        Self {
            matcher,
            outbox,
            actuation,
            device: device.into(),
        }
    }

    pub fn actuation(&self) -> &ActuationConfig {
        &self.actuation
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Decide on `code` and drive the outputs accordingly.
    ///
    /// Codes shorter than the minimum are denied without consulting the
    /// matcher. A store failure is indistinguishable from an unknown code.
    pub async fn validate<D: LineDriver>(
        &self,
        code: &EntryCode,
        outputs: &mut OutputBank<D>,
    ) -> Decision {
        let mut attempt = Attempt::new();

        if code.is_too_short() {
            attempt.advance(AttemptState::DeniedShort);
            info!(action = "DENY", code = %code, reason = "too short", "entry denied");
            self.deny(code, DenyReason::TooShort, outputs);
            debug!(states = ?attempt.history(), "attempt finished");
            return Decision::Denied(DenyReason::TooShort);
        }

        attempt.advance(AttemptState::Validating);
        info!(action = "VALIDATE", code = %code, "validating entry code");

        let decision = match self.matcher.find(code).await {
            Some(record) => {
                attempt.advance(AttemptState::Granted);
                self.grant(&record, outputs);
                Decision::Granted(record)
            }
            None => {
                attempt.advance(AttemptState::Denied);
                info!(action = "DENY", code = %code, reason = "unrecognized", "entry denied");
                self.deny(code, DenyReason::Unrecognized, outputs);
                Decision::Denied(DenyReason::Unrecognized)
            }
        };
        debug!(states = ?attempt.history(), "attempt finished");
        decision
    }

    /// Request-to-exit button: release the gate without matching.
    pub fn request_to_exit<D: LineDriver>(&self, outputs: &mut OutputBank<D>) -> Decision {
        info!(action = "REX", "request to exit");
        self.fire(outputs, OutputId::GateLock, TriggerOptions::default());
        Decision::Released
    }

    pub fn doorbell(&self) {
        info!(action = "DOORBELL", "doorbell pressed");
        self.outbox.post(AccessEvent::Doorbell);
    }

    fn grant<D: LineDriver>(&self, record: &MembershipRecord, outputs: &mut OutputBank<D>) {
        info!(
            action = "ENTRY",
            code_id = %record.code_id,
            member = %record.announce_name(),
            "entry granted"
        );

        self.fire(outputs, OutputId::GateLock, TriggerOptions::default());
        self.fire(outputs, OutputId::StrikeLock, TriggerOptions::default());
        self.fire(outputs, OutputId::GrantIndicator, TriggerOptions::blocking());
        self.fire(
            outputs,
            OutputId::KeypadBeeper,
            TriggerOptions::default()
                .for_duration(Duration::from_millis(self.actuation.grant_pip_ms)),
        );

        self.outbox.post(AccessEvent::Granted {
            display_name: record.display_name.clone(),
            member_id: record.member_id.clone(),
        });
        self.outbox.post(AccessEvent::Activity {
            code_id: record.code_id.clone(),
            device: self.device.clone(),
            timestamp: Utc::now(),
        });
    }

    fn deny<D: LineDriver>(
        &self,
        code: &EntryCode,
        reason: DenyReason,
        outputs: &mut OutputBank<D>,
    ) {
        self.fire(outputs, OutputId::DenyBuzzer, TriggerOptions::blocking());

        if reason == DenyReason::Unrecognized && self.actuation.show_unrecognized {
            self.outbox.post(AccessEvent::Unrecognized {
                code: code.as_str().to_string(),
            });
        }
    }

    fn fire<D: LineDriver>(
        &self,
        outputs: &mut OutputBank<D>,
        id: OutputId,
        options: TriggerOptions,
    ) {
        if let Err(e) = outputs.trigger(id, Instant::now(), options) {
            warn!(output = %id, "trigger failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::OutboxReceiver;
    use doorbot_hardware::mock::{MockDriver, MockDriverHandle};
    use doorbot_hardware::{LineId, OutputState};
    use doorbot_storage::MemoryRecordStore;
    use rstest::rstest;

    const GATE: LineId = LineId::new(17);
    const STRIKE: LineId = LineId::new(22);
    const INDICATOR: LineId = LineId::new(5);
    const BUZZER: LineId = LineId::new(6);
    const BEEPER: LineId = LineId::new(13);

    struct Fixture {
        engine: DecisionEngine<MemoryRecordStore>,
        store: MemoryRecordStore,
        outputs: OutputBank<MockDriver>,
        lines: MockDriverHandle,
        events: OutboxReceiver,
    }

    fn fixture() -> Fixture {
        let store = MemoryRecordStore::new(vec![
            MembershipRecord::from_fields("ff135790", "Alice", "M-1"),
            MembershipRecord::from_fields("4D3C2B1A00", "", "M-2"),
        ]);
        let (outbox, events) = Outbox::channel();
        let actuation = ActuationConfig::default();
        let (driver, lines) = MockDriver::new();
        let outputs = OutputBank::new(driver)
            .with_output(OutputId::GateLock, GATE, actuation.duration(OutputId::GateLock))
            .with_output(OutputId::StrikeLock, STRIKE, actuation.duration(OutputId::StrikeLock))
            .with_output(
                OutputId::GrantIndicator,
                INDICATOR,
                actuation.duration(OutputId::GrantIndicator),
            )
            .with_output(OutputId::DenyBuzzer, BUZZER, actuation.duration(OutputId::DenyBuzzer))
            .with_output(
                OutputId::KeypadBeeper,
                BEEPER,
                actuation.duration(OutputId::KeypadBeeper),
            );
        let engine = DecisionEngine::new(Matcher::new(store.clone()), outbox, actuation, "front");
        Fixture {
            engine,
            store,
            outputs,
            lines,
            events,
        }
    }

    #[rstest]
    #[case(EntryCode::keypad("12345"))]
    #[case(EntryCode::keypad(""))]
    #[case(EntryCode::invalid(doorbot_core::Mode::Reader))]
    #[tokio::test]
    async fn test_short_code_denied_without_matching(#[case] code: EntryCode) {
        let mut f = fixture();

        let decision = f.engine.validate(&code, &mut f.outputs).await;

        assert_eq!(decision, Decision::Denied(DenyReason::TooShort));
        assert_eq!(f.store.reads(), 0);
        assert_eq!(f.lines.activations(BUZZER), 1);
        assert_eq!(f.lines.activations(GATE), 0);
    }

    #[tokio::test]
    async fn test_grant_sequence() {
        let mut f = fixture();

        let decision = f
            .engine
            .validate(&EntryCode::keypad("135790"), &mut f.outputs)
            .await;

        assert!(decision.is_grant());
        for line in [GATE, STRIKE, INDICATOR, BEEPER] {
            assert_eq!(f.lines.activations(line), 1, "line {line}");
        }
        assert_eq!(f.lines.activations(BUZZER), 0);
        assert_eq!(
            f.outputs.state(OutputId::GrantIndicator),
            Some(OutputState::Blocked)
        );

        assert_eq!(
            f.events.recv().await,
            Some(AccessEvent::Granted {
                display_name: Some("Alice".to_string()),
                member_id: Some("M-1".to_string()),
            })
        );
        match f.events.recv().await {
            Some(AccessEvent::Activity {
                code_id, device, ..
            }) => {
                assert_eq!(code_id, "ff135790");
                assert_eq!(device, "front");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reader_grant_announces_member_id() {
        let mut f = fixture();

        let decision = f
            .engine
            .validate(&EntryCode::reader("4d3c2b1a"), &mut f.outputs)
            .await;

        assert!(matches!(decision, Decision::Granted(_)));
        assert_eq!(
            f.events.recv().await,
            Some(AccessEvent::Granted {
                display_name: None,
                member_id: Some("M-2".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_code_denied_and_shown() {
        let mut f = fixture();

        let decision = f
            .engine
            .validate(&EntryCode::keypad("000000"), &mut f.outputs)
            .await;

        assert_eq!(decision, Decision::Denied(DenyReason::Unrecognized));
        assert_eq!(f.lines.activations(BUZZER), 1);
        assert_eq!(f.lines.activations(GATE), 0);
        assert_eq!(
            f.events.recv().await,
            Some(AccessEvent::Unrecognized {
                code: "000000".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_store_failure_runs_denial() {
        let mut f = fixture();
        f.store.set_failure(Some("unreadable"));

        let decision = f
            .engine
            .validate(&EntryCode::keypad("135790"), &mut f.outputs)
            .await;

        assert_eq!(decision, Decision::Denied(DenyReason::Unrecognized));
        assert_eq!(f.lines.activations(BUZZER), 1);
        assert_eq!(f.lines.activations(GATE), 0);
    }

    #[tokio::test]
    async fn test_repeat_denial_does_not_extend_buzzer() {
        let mut f = fixture();
        let code = EntryCode::keypad("000000");

        f.engine.validate(&code, &mut f.outputs).await;
        let first_deadline = f.outputs.next_deadline();
        f.engine.validate(&code, &mut f.outputs).await;

        assert_eq!(f.lines.activations(BUZZER), 1);
        assert_eq!(f.outputs.next_deadline(), first_deadline);
    }

    #[tokio::test]
    async fn test_request_to_exit_releases_gate_only() {
        let mut f = fixture();
        f.store.set_failure(Some("unreadable"));

        let decision = f.engine.request_to_exit(&mut f.outputs);

        assert_eq!(decision, Decision::Released);
        assert_eq!(f.lines.activations(GATE), 1);
        assert_eq!(f.lines.activations(STRIKE), 0);
        assert_eq!(f.store.reads(), 0);
    }

    #[tokio::test]
    async fn test_doorbell_posts_event() {
        let mut f = fixture();
        f.engine.doorbell();
        assert_eq!(f.events.recv().await, Some(AccessEvent::Doorbell));
    }

    #[test]
    fn test_attempt_transitions() {
        let mut attempt = Attempt::new();
        attempt.advance(AttemptState::Validating);
        attempt.advance(AttemptState::Denied);

        assert!(attempt.state().is_final());
        assert_eq!(
            attempt.history(),
            &[
                AttemptState::Received,
                AttemptState::Validating,
                AttemptState::Denied
            ]
        );
        assert!(!AttemptState::Validating.can_transition_to(&AttemptState::DeniedShort));
        assert!(!AttemptState::Granted.can_transition_to(&AttemptState::Received));
    }
}
