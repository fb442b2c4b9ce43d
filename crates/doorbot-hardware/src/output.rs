//! Timed outputs.
//!
//! A [`TimedOutput`] is the logical state of one actuator: triggering makes it
//! active and arms a reversion [`Deadline`]. Retrigger semantics:
//!
//! - while idle or active (not blocked): the pending reversion is replaced,
//!   so the window restarts and never stacks;
//! - while blocked: the trigger is dropped until the blocking window has
//!   elapsed.
//!
//! [`OutputBank`] owns one state record per [`OutputId`] together with the
//! [`LineDriver`], and is the only place that writes output lines.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use doorbot_hardware::output::{TimedOutput, TriggerOptions, TriggerOutcome};
//!
//! let now = Instant::now();
//! let mut buzzer = TimedOutput::new(Duration::from_millis(500));
//!
//! assert_eq!(buzzer.trigger(now, TriggerOptions::blocking()), TriggerOutcome::Activated);
//! assert_eq!(buzzer.trigger(now, TriggerOptions::default()), TriggerOutcome::Ignored);
//! assert!(buzzer.poll(now + Duration::from_millis(500)));
//! assert!(buzzer.is_idle());
//! ```

use crate::error::{HardwareError, Result};
use crate::timer::Deadline;
use crate::traits::LineDriver;
use crate::types::{Level, LineId, OutputId};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Logical state of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Idle,
    Active,
    /// Active, and ignoring triggers until its reversion fires.
    Blocked,
}

/// Per-call trigger options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerOptions {
    /// Overrides the output's default duration.
    pub duration: Option<Duration>,

    /// Drop further triggers until this activation ends.
    pub blocking: bool,
}

impl TriggerOptions {
    /// Blocking trigger with the default duration.
    #[must_use]
    pub fn blocking() -> Self {
        Self {
            duration: None,
            blocking: true,
        }
    }

    /// Set a duration override.
    #[must_use]
    pub fn for_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// What a trigger call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Output went from idle to active.
    Activated,
    /// Output was already active; its window restarted.
    Restarted,
    /// Output is blocked; nothing changed.
    Ignored,
}

/// Logical state of one actuator with its pending reversion.
#[derive(Debug, Clone)]
pub struct TimedOutput {
    default_duration: Duration,
    state: OutputState,
    reversion: Deadline,
}

impl TimedOutput {
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            default_duration,
            state: OutputState::Idle,
            reversion: Deadline::new(),
        }
    }

    /// Activate the output and (re)arm its reversion.
    pub fn trigger(&mut self, now: Instant, options: TriggerOptions) -> TriggerOutcome {
        if self.state == OutputState::Blocked {
            return TriggerOutcome::Ignored;
        }

        let outcome = if self.state == OutputState::Idle {
            TriggerOutcome::Activated
        } else {
            TriggerOutcome::Restarted
        };

        self.state = if options.blocking {
            OutputState::Blocked
        } else {
            OutputState::Active
        };
        self.reversion
            .arm(now, options.duration.unwrap_or(self.default_duration));

        outcome
    }

    /// Revert to idle if the reversion is due. Returns `true` when it did.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.reversion.take_due(now) {
            self.state = OutputState::Idle;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn state(&self) -> OutputState {
        self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == OutputState::Idle
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.state == OutputState::Blocked
    }

    /// Instant of the pending reversion.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.reversion.at()
    }

    #[must_use]
    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }
}

struct Channel {
    line: LineId,
    output: TimedOutput,
}

/// All timed outputs of the controller plus the driver that moves the lines.
pub struct OutputBank<D: LineDriver> {
    driver: D,
    channels: BTreeMap<OutputId, Channel>,
}

impl<D: LineDriver> OutputBank<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            channels: BTreeMap::new(),
        }
    }

    /// Map an output to a line with its default duration.
    #[must_use]
    pub fn with_output(mut self, id: OutputId, line: LineId, default_duration: Duration) -> Self {
        self.channels.insert(
            id,
            Channel {
                line,
                output: TimedOutput::new(default_duration),
            },
        );
        self
    }

    /// Drive every mapped line to idle. Called once at startup.
    pub fn reset_all(&mut self) {
        let lines: Vec<LineId> = self.channels.values().map(|c| c.line).collect();
        for line in lines {
            self.write(line, Level::Idle);
        }
    }

    /// Trigger a timed output.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not mapped. Line write failures are logged,
    /// not returned: the logical state advances regardless.
    pub fn trigger(
        &mut self,
        id: OutputId,
        now: Instant,
        options: TriggerOptions,
    ) -> Result<TriggerOutcome> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or_else(|| HardwareError::unknown_output(id.name()))?;

        let outcome = channel.output.trigger(now, options);
        let line = channel.line;
        match outcome {
            TriggerOutcome::Activated => {
                debug!(output = %id, %line, "output activated");
                self.write(line, Level::Active);
            }
            TriggerOutcome::Restarted => debug!(output = %id, "output window restarted"),
            TriggerOutcome::Ignored => debug!(output = %id, "output blocked, trigger ignored"),
        }
        Ok(outcome)
    }

    /// Revert every output whose deadline has passed. Returns the reverted ids.
    pub fn poll(&mut self, now: Instant) -> Vec<OutputId> {
        let mut reverted = Vec::new();
        for (id, channel) in &mut self.channels {
            if channel.output.poll(now) {
                reverted.push((*id, channel.line));
            }
        }
        reverted
            .into_iter()
            .map(|(id, line)| {
                debug!(output = %id, %line, "output reverted");
                self.write(line, Level::Idle);
                id
            })
            .collect()
    }

    /// Earliest pending reversion across all outputs.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.channels
            .values()
            .filter_map(|c| c.output.deadline())
            .min()
    }

    /// Set a steady level on an output that is not currently timed.
    ///
    /// Used for LEDs driven by patterns (heartbeat, status blink). A timed
    /// activation in progress wins over the steady level.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not mapped.
    pub fn set_steady(&mut self, id: OutputId, level: Level) -> Result<()> {
        let channel = self
            .channels
            .get(&id)
            .ok_or_else(|| HardwareError::unknown_output(id.name()))?;
        if channel.output.is_idle() {
            let line = channel.line;
            self.write(line, level);
        }
        Ok(())
    }

    /// Logical state of an output.
    #[must_use]
    pub fn state(&self, id: OutputId) -> Option<OutputState> {
        self.channels.get(&id).map(|c| c.output.state())
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn write(&mut self, line: LineId, level: Level) {
        if let Err(e) = self.driver.set_line(line, level) {
            warn!(%line, ?level, "line write failed: {}", e);
        }
    }
}
