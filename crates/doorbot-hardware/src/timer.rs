//! Cancellable deadline.
//!
//! Every output reversion in the controller is a [`Deadline`] owned by the
//! output it belongs to. Arming
//! replaces the previous instant, so a replaced action can never fire late:
//! there is no detached timer task to forget about.

use std::time::Duration;
use tokio::time::Instant;

/// A single re-armable point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// An unarmed deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) to fire `after` from `now`.
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.at = Some(now + after);
    }

    /// Disarm. A cancelled deadline is never due.
    pub fn cancel(&mut self) {
        self.at = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Whether the deadline is armed and `now` has reached it.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.at.is_some_and(|at| now >= at)
    }

    /// Disarm and report if it was due. Used by pollers so a deadline fires
    /// exactly once.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.at = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    /// Time left until the deadline, zero once due.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_is_never_due() {
        let deadline = Deadline::new();
        assert!(!deadline.is_armed());
        assert!(!deadline.is_due(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_arm_and_due() {
        let now = Instant::now();
        let mut deadline = Deadline::new();
        deadline.arm(now, Duration::from_millis(100));

        assert!(!deadline.is_due(now + Duration::from_millis(99)));
        assert!(deadline.is_due(now + Duration::from_millis(100)));
        assert_eq!(
            deadline.remaining(now + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
    }

    #[test]
    fn test_rearm_replaces_previous() {
        let now = Instant::now();
        let mut deadline = Deadline::new();
        deadline.arm(now, Duration::from_millis(100));
        deadline.arm(now + Duration::from_millis(80), Duration::from_millis(100));

        assert!(!deadline.is_due(now + Duration::from_millis(150)));
        assert!(deadline.is_due(now + Duration::from_millis(180)));
    }

    #[test]
    fn test_take_due_fires_once() {
        let now = Instant::now();
        let mut deadline = Deadline::new();
        deadline.arm(now, Duration::from_millis(10));

        let later = now + Duration::from_millis(20);
        assert!(deadline.take_due(later));
        assert!(!deadline.take_due(later));
        assert!(!deadline.is_armed());
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut deadline = Deadline::new();
        deadline.arm(now, Duration::ZERO);
        deadline.cancel();
        assert!(!deadline.is_due(now));
        assert_eq!(deadline.remaining(now), None);
    }
}
