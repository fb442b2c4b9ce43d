//! Mock line driver that records writes.

use crate::error::{HardwareError, Result};
use crate::traits::LineDriver;
use crate::types::{Level, LineId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct DriverState {
    writes: Vec<(LineId, Level)>,
    levels: HashMap<LineId, Level>,
    failing: HashSet<LineId>,
}

/// Line driver that remembers every successful write.
///
/// Returned together with a [`MockDriverHandle`] that tests keep to inspect
/// writes after the driver has moved into an output bank.
///
/// # Examples
///
/// ```
/// use doorbot_hardware::{Level, LineDriver, LineId};
/// use doorbot_hardware::mock::MockDriver;
///
/// let (mut driver, handle) = MockDriver::new();
/// driver.set_line(LineId::new(18), Level::Active).unwrap();
/// driver.set_line(LineId::new(18), Level::Idle).unwrap();
///
/// assert_eq!(handle.writes_to(LineId::new(18)), vec![Level::Active, Level::Idle]);
/// ```
#[derive(Debug)]
pub struct MockDriver {
    state: Arc<Mutex<DriverState>>,
}

impl MockDriver {
    pub fn new() -> (Self, MockDriverHandle) {
        let state = Arc::new(Mutex::new(DriverState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockDriverHandle { state },
        )
    }
}

impl LineDriver for MockDriver {
    fn set_line(&mut self, line: LineId, level: Level) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing.contains(&line) {
            return Err(HardwareError::write_failed(line, "simulated failure"));
        }
        state.writes.push((line, level));
        state.levels.insert(line, level);
        Ok(())
    }
}

/// Inspection and fault-injection handle for a [`MockDriver`].
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    state: Arc<Mutex<DriverState>>,
}

impl MockDriverHandle {
    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(LineId, Level)> {
        lock(&self.state).writes.clone()
    }

    /// Successful writes to one line, in order.
    pub fn writes_to(&self, line: LineId) -> Vec<Level> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|(l, _)| *l == line)
            .map(|(_, level)| *level)
            .collect()
    }

    /// Number of idle→active writes on a line.
    pub fn activations(&self, line: LineId) -> usize {
        self.writes_to(line)
            .iter()
            .filter(|level| level.is_active())
            .count()
    }

    /// Last level written to a line.
    pub fn level(&self, line: LineId) -> Option<Level> {
        lock(&self.state).levels.get(&line).copied()
    }

    /// Make every write to `line` fail.
    pub fn fail_line(&self, line: LineId) {
        lock(&self.state).failing.insert(line);
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        lock(&self.state).writes.clear();
    }
}

fn lock(state: &Mutex<DriverState>) -> MutexGuard<'_, DriverState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_writes() {
        let (mut driver, handle) = MockDriver::new();
        let line = LineId::new(5);

        driver.set_line(line, Level::Active).unwrap();
        driver.set_line(line, Level::Idle).unwrap();

        assert_eq!(handle.writes_to(line), vec![Level::Active, Level::Idle]);
        assert_eq!(handle.activations(line), 1);
        assert_eq!(handle.level(line), Some(Level::Idle));
    }

    #[test]
    fn test_fail_line() {
        let (mut driver, handle) = MockDriver::new();
        let line = LineId::new(15);
        handle.fail_line(line);

        let err = driver.set_line(line, Level::Active).unwrap_err();
        assert!(matches!(err, HardwareError::WriteFailed { .. }));
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn test_clear() {
        let (mut driver, handle) = MockDriver::new();
        driver.set_line(LineId::new(1), Level::Active).unwrap();
        handle.clear();
        assert!(handle.writes().is_empty());
        assert_eq!(handle.level(LineId::new(1)), Some(Level::Active));
    }
}
