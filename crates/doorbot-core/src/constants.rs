//! Core constants for the door controller.
//!
//! Matching rules, keypad behaviour and the default timings used when a
//! component is built without explicit configuration. Components take their
//! timings from typed config structs; the values here are only the defaults
//! those structs fall back to.
//!
//! # Usage
//!
//! ```
//! use doorbot_core::constants::*;
//!
//! assert_eq!(MIN_CODE_LENGTH, 6);
//! assert!("ff123456".starts_with(KEYPAD_MARKER));
//! ```

// ============================================================================
// Matching
// ============================================================================

/// Shortest entry code that is ever sent to the matcher.
///
/// Anything shorter is denied straight away.
pub const MIN_CODE_LENGTH: usize = 6;

/// Marker prefix on a stored code id that flags a keypad PIN row.
///
/// The marker is compared case-sensitively: credential ids are stored as
/// upper-case hex by the membership service, so `FF...` stays a credential.
pub const KEYPAD_MARKER: &str = "ff";

/// Number of leading characters compared for reader credentials.
///
/// # Examples
///
/// ```
/// use doorbot_core::constants::CREDENTIAL_PREFIX_LEN;
///
/// let stored = "1a2b3c4d5e";
/// let presented = "1A2B3CFFFF";
/// assert!(
///     stored[..CREDENTIAL_PREFIX_LEN].eq_ignore_ascii_case(&presented[..CREDENTIAL_PREFIX_LEN])
/// );
/// ```
pub const CREDENTIAL_PREFIX_LEN: usize = 6;

/// Number of comma separated fields in a membership row.
pub const RECORD_FIELD_COUNT: usize = 3;

// ============================================================================
// Keypad
// ============================================================================

/// Inactivity window after which a partially entered code is discarded (ms).
pub const DEFAULT_KEYPAD_TIMEOUT_MS: u64 = 30_000;

/// Interval of the keypad inactivity check (ms).
pub const DEFAULT_KEYPAD_TICK_MS: u64 = 1_000;

/// Key that terminates and submits a keypad code.
pub const KEY_ENTER: char = '#';

/// Key that discards the keypad buffer.
pub const KEY_CLEAR: char = '*';

// ============================================================================
// Actuation (ms)
// ============================================================================

/// Gate lock release window.
pub const DEFAULT_GATE_RELEASE_MS: u64 = 3_000;

/// Strike lock release window.
pub const DEFAULT_STRIKE_RELEASE_MS: u64 = 5_000;

/// Reader LED "granted" indication.
pub const DEFAULT_GRANT_INDICATOR_MS: u64 = 3_000;

/// Short confirmation pip on grant.
pub const DEFAULT_GRANT_PIP_MS: u64 = 200;

/// Denial buzzer. Always longer than the grant pip.
pub const DEFAULT_DENY_BUZZER_MS: u64 = 3_000;

/// Key-press feedback pip.
pub const DEFAULT_KEY_PIP_MS: u64 = 50;

/// Inside buzzer chirp while an error is pending.
pub const DEFAULT_CHIRP_MS: u64 = 100;

/// Debounce applied to watched input lines (doorbell, request-to-exit).
pub const DEFAULT_INPUT_DEBOUNCE_MS: u64 = 100;

// ============================================================================
// Health
// ============================================================================

/// Health monitor sampling interval (seconds).
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 300;

/// Record snapshot age after which it counts as stale (seconds).
pub const DEFAULT_STALE_AFTER_SECS: u64 = 6 * 60 * 60;

/// Interval between error chirps on the inside buzzer (seconds).
pub const DEFAULT_CHIRP_INTERVAL_SECS: u64 = 30;

/// Half period of the run LED heartbeat (ms).
pub const HEARTBEAT_MS: u64 = 1_000;

/// Step length of the status LED blink pattern (ms).
pub const STATUS_BLINK_STEP_MS: u64 = 250;

/// Dark steps between two blink groups of the status LED.
pub const STATUS_BLINK_PAUSE_STEPS: usize = 6;
