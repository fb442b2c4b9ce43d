//! Hardware event channel.
//!
//! Every input source (keypad scanner, reader, watched lines) pushes typed
//! [`HardwareEvent`]s into one channel, and the controller consumes them in a
//! single dispatch loop. Events from one source keep their arrival order;
//! there is no ordering between sources.
//!
//! ```text
//! ┌──────────┐       ┌─────────────────┐
//! │ Keypad   │──────►│                 │
//! └──────────┘       │  Event Channel  │
//! ┌──────────┐       │  (mpsc)         │──────► Controller
//! │ Reader   │──────►│                 │
//! └──────────┘       │                 │
//! ┌──────────┐       │                 │
//! │ Lines    │──────►│                 │
//! └──────────┘       └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use doorbot_hardware::events::{self, HardwareEvent};
//! use doorbot_hardware::KeypadInput;
//!
//! #[tokio::main]
//! async fn main() -> doorbot_hardware::Result<()> {
//!     let (sender, mut events) = events::channel(16);
//!
//!     sender.send(HardwareEvent::Key(KeypadInput::Digit(1))).await?;
//!     assert_eq!(events.recv().await, Some(HardwareEvent::Key(KeypadInput::Digit(1))));
//!     Ok(())
//! }
//! ```

use crate::error::{HardwareError, Result};
use crate::traits::KeypadInput;
use std::fmt;
use tokio::sync::mpsc;

/// Raw input from any source, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareEvent {
    /// Key pressed on the matrix keypad.
    Key(KeypadInput),

    /// Wiegand frame from the reader, one entry per bit, first bit first.
    ReaderFrame(Vec<bool>),

    /// Credential value already assembled by the reader driver.
    ReaderValue(u64),

    /// Doorbell button pressed.
    Doorbell,

    /// Request-to-exit button pressed.
    RequestToExit,

    /// An input source failed and stopped.
    SourceError {
        source: SourceKind,
        error: String,
    },
}

/// Type of input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Keypad,
    Reader,
    Lines,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keypad => write!(f, "Keypad"),
            Self::Reader => write!(f, "Reader"),
            Self::Lines => write!(f, "Lines"),
        }
    }
}

/// Create a bounded event channel.
#[must_use]
pub fn channel(capacity: usize) -> (EventSender, HardwareEvents) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, HardwareEvents { rx })
}

/// Producer side, cloned into every input source.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<HardwareEvent>,
}

impl EventSender {
    /// Send an event, waiting for channel capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller has stopped.
    pub async fn send(&self, event: HardwareEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Hardware event channel closed"))
    }

    /// Send without waiting. Used from non-async driver callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is full or closed.
    pub fn try_send(&self, event: HardwareEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                HardwareError::invalid_data("Hardware event channel full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                HardwareError::disconnected("Hardware event channel closed")
            }
        })
    }
}

/// Consumer side, owned by the controller.
#[derive(Debug)]
pub struct HardwareEvents {
    rx: mpsc::Receiver<HardwareEvent>,
}

impl HardwareEvents {
    /// Receive the next event.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<HardwareEvent> {
        self.rx.recv().await
    }
}
