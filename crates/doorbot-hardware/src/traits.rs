//! Hardware trait definitions.
//!
//! [`LineDriver`] is the only path to physical outputs. It is deliberately
//! synchronous: writing a GPIO level never suspends, and keeping it sync lets
//! timed outputs stay plain state machines that tests drive with explicit
//! instants.

use crate::error::{HardwareError, Result};
use crate::types::{Level, LineId};
use doorbot_core::constants::{KEY_CLEAR, KEY_ENTER};

/// Input from the keypad.
///
/// Digits are buffered by the accumulator; the two control keys never
/// produce a code themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadInput {
    /// Numeric digit (0-9).
    Digit(u8),

    /// Submit the buffered code (`#`).
    Enter,

    /// Discard the buffered code (`*`).
    Clear,
}

impl KeypadInput {
    /// Create a digit input.
    ///
    /// # Errors
    ///
    /// Returns an error if the digit is greater than 9.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorbot_hardware::KeypadInput;
    ///
    /// let input = KeypadInput::digit(5).unwrap();
    /// assert_eq!(input.as_digit(), Some(5));
    ///
    /// assert!(KeypadInput::digit(10).is_err());
    /// ```
    pub fn digit(d: u8) -> Result<Self> {
        if d > 9 {
            return Err(HardwareError::invalid_data(format!(
                "Digit must be 0-9, got {d}"
            )));
        }
        Ok(Self::Digit(d))
    }

    /// Map a key label from the 4x3 matrix keypad.
    ///
    /// # Errors
    ///
    /// Returns an error for labels that are not on the keypad.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorbot_hardware::KeypadInput;
    ///
    /// assert_eq!(KeypadInput::from_key('7').unwrap(), KeypadInput::Digit(7));
    /// assert_eq!(KeypadInput::from_key('#').unwrap(), KeypadInput::Enter);
    /// assert_eq!(KeypadInput::from_key('*').unwrap(), KeypadInput::Clear);
    /// assert!(KeypadInput::from_key('A').is_err());
    /// ```
    pub fn from_key(key: char) -> Result<Self> {
        match key {
            KEY_ENTER => Ok(Self::Enter),
            KEY_CLEAR => Ok(Self::Clear),
            _ => key
                .to_digit(10)
                .map(|d| Self::Digit(d as u8))
                .ok_or_else(|| HardwareError::invalid_data(format!("Unknown key '{key}'"))),
        }
    }

    /// Check if this input is a digit.
    pub fn is_digit(&self) -> bool {
        matches!(self, Self::Digit(_))
    }

    /// Get the digit value if this is a digit input.
    pub fn as_digit(&self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(*d),
            _ => None,
        }
    }

    /// The character this input is shown as, `None` for an out-of-range
    /// digit.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Digit(d) => char::from_digit(u32::from(*d), 10),
            Self::Enter => Some(KEY_ENTER),
            Self::Clear => Some(KEY_CLEAR),
        }
    }
}

/// Output line driver.
///
/// Implementations own the mapping from logical [`Level`] to the electrical
/// level (active-low relays, inverted LEDs). A failed write is reported to
/// the caller once; the caller does not retry.
///
/// # Examples
///
/// ```
/// use doorbot_hardware::{Level, LineDriver, LineId};
/// use doorbot_hardware::mock::MockDriver;
///
/// let (mut driver, handle) = MockDriver::new();
/// driver.set_line(LineId::new(17), Level::Active).unwrap();
/// assert_eq!(handle.level(LineId::new(17)), Some(Level::Active));
/// ```
pub trait LineDriver: Send {
    /// Set a line to the given logical level.
    ///
    /// # Errors
    ///
    /// Returns an error if the physical write failed.
    fn set_line(&mut self, line: LineId, level: Level) -> Result<()>;
}

impl<D: LineDriver + ?Sized> LineDriver for Box<D> {
    fn set_line(&mut self, line: LineId, level: Level) -> Result<()> {
        (**self).set_line(line, level)
    }
}
