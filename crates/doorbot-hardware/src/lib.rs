//! Hardware abstraction layer for the door controller.
//!
//! Everything physical goes through this crate: output lines are written by
//! a [`LineDriver`], input sources push [`HardwareEvent`]s into one channel,
//! and actuator timing lives in [`OutputBank`].
//!
//! # Design
//!
//! - **Logical levels only**: drivers map idle/active onto the wiring
//!   (active-low relays and the like). Nothing above the driver knows about
//!   polarity.
//! - **No scattered timers**: outputs and input debouncers are plain state
//!   machines over [`tokio::time::Instant`]. The controller's dispatch loop
//!   sleeps until [`OutputBank::next_deadline`] and then polls.
//! - **Single owner**: each output's state is owned by the bank and mutated
//!   only through its methods.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use doorbot_hardware::{LineId, OutputBank, OutputId, TriggerOptions};
//! use doorbot_hardware::mock::MockDriver;
//!
//! let (driver, handle) = MockDriver::new();
//! let mut outputs = OutputBank::new(driver)
//!     .with_output(OutputId::GateLock, LineId::new(17), Duration::from_secs(3));
//!
//! let now = Instant::now();
//! outputs.trigger(OutputId::GateLock, now, TriggerOptions::default()).unwrap();
//! outputs.poll(now + Duration::from_secs(3));
//!
//! assert_eq!(handle.activations(LineId::new(17)), 1);
//! ```

pub mod error;
pub mod events;
pub mod mock;
pub mod output;
pub mod timer;
pub mod traits;
pub mod types;
pub mod watch;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use events::{EventSender, HardwareEvent, HardwareEvents, SourceKind};
pub use output::{OutputBank, OutputState, TimedOutput, TriggerOptions, TriggerOutcome};
pub use timer::Deadline;
pub use traits::{KeypadInput, LineDriver};
pub use types::{Edge, Level, LineId, OutputId};
pub use watch::{EdgeDebouncer, InputKind, LineWatch};
