//! Watched input lines.
//!
//! A [`LineWatch`] turns raw level changes on one input line into at most one
//! [`HardwareEvent`](crate::events::HardwareEvent) per debounce window. Drivers
//! feed it level samples; it remembers the last level and applies the edge
//! filter and debounce itself.

use crate::events::HardwareEvent;
use crate::types::{Edge, Level, LineId};
use std::time::Duration;
use tokio::time::Instant;

/// Rejects edges closer together than the debounce window.
#[derive(Debug, Clone)]
pub struct EdgeDebouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl EdgeDebouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Accept an edge at `now` unless one was accepted within the window.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }
}

/// What a watched input line means to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Doorbell,
    RequestToExit,
}

impl InputKind {
    fn event(self) -> HardwareEvent {
        match self {
            InputKind::Doorbell => HardwareEvent::Doorbell,
            InputKind::RequestToExit => HardwareEvent::RequestToExit,
        }
    }
}

/// Edge-triggered, debounced watch on one input line.
#[derive(Debug, Clone)]
pub struct LineWatch {
    line: LineId,
    edge: Edge,
    kind: InputKind,
    level: Level,
    debouncer: EdgeDebouncer,
}

impl LineWatch {
    #[must_use]
    pub fn new(line: LineId, edge: Edge, debounce: Duration, kind: InputKind) -> Self {
        Self {
            line,
            edge,
            kind,
            level: Level::Idle,
            debouncer: EdgeDebouncer::new(debounce),
        }
    }

    #[must_use]
    pub fn line(&self) -> LineId {
        self.line
    }

    #[must_use]
    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// Feed a level sample. Returns the event to dispatch, if any.
    pub fn sample(&mut self, level: Level, now: Instant) -> Option<HardwareEvent> {
        let previous = std::mem::replace(&mut self.level, level);
        if self.edge.fires(previous, level) && self.debouncer.accept(now) {
            Some(self.kind.event())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_window() {
        let now = Instant::now();
        let mut debouncer = EdgeDebouncer::new(ms(100));

        assert!(debouncer.accept(now));
        assert!(!debouncer.accept(now + ms(50)));
        assert!(!debouncer.accept(now + ms(99)));
        assert!(debouncer.accept(now + ms(100)));
    }

    #[test]
    fn test_rising_edge_watch() {
        let now = Instant::now();
        let mut watch = LineWatch::new(LineId::new(4), Edge::Rising, ms(100), InputKind::Doorbell);

        assert_eq!(
            watch.sample(Level::Active, now),
            Some(HardwareEvent::Doorbell)
        );
        // Holding the level is not an edge.
        assert_eq!(watch.sample(Level::Active, now + ms(500)), None);
        assert_eq!(watch.sample(Level::Idle, now + ms(600)), None);
        assert_eq!(
            watch.sample(Level::Active, now + ms(700)),
            Some(HardwareEvent::Doorbell)
        );
    }

    #[test]
    fn test_contact_bounce_is_filtered() {
        let now = Instant::now();
        let mut watch = LineWatch::new(
            LineId::new(27),
            Edge::Rising,
            ms(100),
            InputKind::RequestToExit,
        );

        let mut events = 0;
        for (i, level) in [Level::Active, Level::Idle, Level::Active, Level::Idle, Level::Active]
            .into_iter()
            .enumerate()
        {
            if watch.sample(level, now + ms(i as u64 * 10)).is_some() {
                events += 1;
            }
        }
        assert_eq!(events, 1);
    }
}
