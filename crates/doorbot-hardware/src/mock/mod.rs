//! Mock driver and input for testing and development.
//!
//! These stand in for real GPIO so the controller can be exercised without
//! hardware.

pub mod driver;
pub mod input;

// Re-export commonly used types
pub use driver::{MockDriver, MockDriverHandle};
pub use input::MockInput;
