//! Code accumulator state machine.
//!
//! # States
//!
//! - `Idle`: nothing buffered
//! - `Accumulating`: at least one digit buffered, inactivity timer armed
//!
//! # Transitions
//!
//! - Idle → Accumulating on a digit
//! - Accumulating → Idle on ENTER (code emitted), CLEAR, or inactivity timeout
//!   (silent)
//!
//! ENTER while idle emits an empty keypad code, which is too short to match.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use doorbot_core::EntryCode;
//! use doorbot_hardware::KeypadInput;
//! use doorbot_keypad::{CodeAccumulator, KeyOutcome};
//!
//! let mut keypad = CodeAccumulator::new(Duration::from_secs(30));
//! let now = Instant::now();
//!
//! for d in [1, 2, 3] {
//!     keypad.on_key(KeypadInput::Digit(d), now);
//! }
//! assert_eq!(
//!     keypad.on_key(KeypadInput::Enter, now),
//!     KeyOutcome::Submitted(EntryCode::keypad("123"))
//! );
//! ```

use doorbot_core::EntryCode;
use doorbot_core::constants::DEFAULT_KEYPAD_TIMEOUT_MS;
use doorbot_hardware::KeypadInput;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Digits kept before further digits are dropped.
const MAX_BUFFERED_DIGITS: usize = 32;

/// Accumulator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Idle,
    Accumulating,
}

/// Result of one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Digit appended to the buffer.
    Buffered,
    /// ENTER submitted the buffered code.
    Submitted(EntryCode),
    /// CLEAR discarded the buffer.
    Cleared,
    /// Key had no effect (digit out of range or past the buffer limit).
    Ignored,
}

impl KeyOutcome {
    /// The submitted code, if any.
    pub fn into_code(self) -> Option<EntryCode> {
        match self {
            KeyOutcome::Submitted(code) => Some(code),
            _ => None,
        }
    }
}

/// Keypad digit buffer with inactivity timeout.
///
/// Only the keypad event stream and the periodic tick touch it, both from the
/// controller's dispatch loop.
#[derive(Debug, Clone)]
pub struct CodeAccumulator {
    buffer: String,
    last_key: Option<Instant>,
    timeout: Duration,
}

impl Default for CodeAccumulator {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_KEYPAD_TIMEOUT_MS))
    }
}

impl CodeAccumulator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_key: None,
            timeout,
        }
    }

    /// Handle one key press at `now`.
    ///
    /// An expired buffer is dropped before the key is applied, so a late key
    /// never joins a stale code even if no tick ran in between.
    pub fn on_key(&mut self, input: KeypadInput, now: Instant) -> KeyOutcome {
        self.tick(now);

        match input {
            KeypadInput::Digit(d) => {
                let Some(digit) = input.as_char() else {
                    debug!(value = d, "keypad digit out of range");
                    return KeyOutcome::Ignored;
                };
                if self.buffer.len() >= MAX_BUFFERED_DIGITS {
                    return KeyOutcome::Ignored;
                }
                self.buffer.push(digit);
                self.last_key = Some(now);
                KeyOutcome::Buffered
            }
            KeypadInput::Enter => {
                let code = EntryCode::keypad(std::mem::take(&mut self.buffer));
                self.reset();
                KeyOutcome::Submitted(code)
            }
            KeypadInput::Clear => {
                self.reset();
                KeyOutcome::Cleared
            }
        }
    }

    /// Drop the buffer if it has been idle for longer than the timeout. A gap
    /// of exactly the timeout still counts as active.
    ///
    /// Returns `true` when a buffered code was discarded.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .last_key
            .is_some_and(|last| now.saturating_duration_since(last) > self.timeout);
        if expired {
            debug!(digits = self.buffer.len(), "keypad entry timed out");
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> AccumulatorState {
        if self.buffer.is_empty() {
            AccumulatorState::Idle
        } else {
            AccumulatorState::Accumulating
        }
    }

    /// Number of buffered digits.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Instant of the last accepted digit.
    pub fn last_key(&self) -> Option<Instant> {
        self.last_key
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last_key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn type_digits(keypad: &mut CodeAccumulator, digits: &[u8], now: Instant) {
        for d in digits {
            assert_eq!(keypad.on_key(KeypadInput::Digit(*d), now), KeyOutcome::Buffered);
        }
    }

    #[test]
    fn test_enter_emits_keypad_code() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[1, 2, 3], now);
        assert_eq!(keypad.state(), AccumulatorState::Accumulating);

        let code = keypad.on_key(KeypadInput::Enter, now + secs(2)).into_code();
        assert_eq!(code, Some(EntryCode::keypad("123")));
        assert_eq!(keypad.state(), AccumulatorState::Idle);
    }

    #[test]
    fn test_gap_longer_than_timeout_emits_nothing() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[1, 2, 3], now);
        assert_eq!(
            keypad.on_key(KeypadInput::Enter, now + secs(31)),
            KeyOutcome::Submitted(EntryCode::keypad(""))
        );
        assert!(keypad.is_empty());
    }

    #[test]
    fn test_tick_clears_silently() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[4, 2], now);
        assert!(!keypad.tick(now + secs(29)));
        assert_eq!(keypad.len(), 2);
        assert!(keypad.tick(now + secs(31)));
        assert_eq!(keypad.state(), AccumulatorState::Idle);
        assert!(!keypad.tick(now + secs(32)));
    }

    #[test]
    fn test_timeout_boundary_is_exclusive() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[1, 3, 5, 7, 9, 0], now);
        assert!(!keypad.tick(now + secs(30)));

        let code = keypad.on_key(KeypadInput::Enter, now + secs(30)).into_code();
        assert_eq!(code, Some(EntryCode::keypad("135790")));

        type_digits(&mut keypad, &[2], now + secs(40));
        assert!(keypad.tick(now + secs(70) + Duration::from_millis(1)));
    }

    #[test]
    fn test_each_key_refreshes_timeout() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[1], now);
        type_digits(&mut keypad, &[2], now + secs(20));
        type_digits(&mut keypad, &[3], now + secs(40));

        let code = keypad.on_key(KeypadInput::Enter, now + secs(60)).into_code();
        assert_eq!(code, Some(EntryCode::keypad("123")));
    }

    #[test]
    fn test_clear_discards_buffer() {
        let mut keypad = CodeAccumulator::new(secs(30));
        let now = Instant::now();

        type_digits(&mut keypad, &[9, 9], now);
        assert_eq!(keypad.on_key(KeypadInput::Clear, now), KeyOutcome::Cleared);
        type_digits(&mut keypad, &[5, 6, 7, 8, 9, 0], now);

        let code = keypad.on_key(KeypadInput::Enter, now).into_code();
        assert_eq!(code, Some(EntryCode::keypad("567890")));
    }

    #[rstest]
    #[case(KeypadInput::Enter, KeyOutcome::Submitted(EntryCode::keypad("")))]
    #[case(KeypadInput::Clear, KeyOutcome::Cleared)]
    fn test_control_keys_when_idle(#[case] input: KeypadInput, #[case] expected: KeyOutcome) {
        let mut keypad = CodeAccumulator::default();
        assert_eq!(keypad.on_key(input, Instant::now()), expected);
        assert_eq!(keypad.state(), AccumulatorState::Idle);
    }

    #[test]
    fn test_buffer_limit() {
        let mut keypad = CodeAccumulator::default();
        let now = Instant::now();

        for _ in 0..MAX_BUFFERED_DIGITS {
            keypad.on_key(KeypadInput::Digit(1), now);
        }
        assert_eq!(keypad.on_key(KeypadInput::Digit(1), now), KeyOutcome::Ignored);
        assert_eq!(keypad.len(), MAX_BUFFERED_DIGITS);
    }

    #[rstest]
    #[case(10)]
    #[case(208)]
    #[case(255)]
    fn test_out_of_range_digit_ignored(#[case] d: u8) {
        let mut keypad = CodeAccumulator::default();
        let now = Instant::now();

        type_digits(&mut keypad, &[1], now);
        assert_eq!(keypad.on_key(KeypadInput::Digit(d), now), KeyOutcome::Ignored);
        assert_eq!(keypad.len(), 1);
    }

    #[test]
    fn test_last_key_tracks_activity() {
        let mut keypad = CodeAccumulator::default();
        let now = Instant::now();
        assert_eq!(keypad.last_key(), None);

        keypad.on_key(KeypadInput::Digit(3), now);
        assert_eq!(keypad.last_key(), Some(now));

        keypad.on_key(KeypadInput::Clear, now);
        assert_eq!(keypad.last_key(), None);
    }
}
