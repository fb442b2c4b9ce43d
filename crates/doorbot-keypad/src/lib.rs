//! Keypad code accumulation.
//!
//! Buffers digits from the matrix keypad until ENTER submits them or CLEAR
//! discards them. A partially typed code is silently dropped after a period
//! of inactivity.

pub mod accumulator;

pub use accumulator::{AccumulatorState, CodeAccumulator, KeyOutcome};
