//! Reader decoder.
//!
//! Turns what the card/fob reader delivers into normalized input:
//!
//! - [`decode_value`]: credential value → hexadecimal [`EntryCode`] with the
//!   byte order reversed (the reader reports the UID little-endian).
//! - [`WiegandFrame`]: raw Wiegand bit frames, either credential frames
//!   (26/34 bits with parity) or keypad bursts (4/8 bits).
//! - [`decode_frame`]: the combination used by the controller. Malformed
//!   frames never surface as errors; they become the invalid sentinel code.
//!
//! # Examples
//!
//! ```
//! use doorbot_reader::decode_value;
//!
//! assert_eq!(decode_value(0x1A2B3C4D).as_str(), "4D3C2B1A");
//! ```

pub mod decode;
pub mod wiegand;

pub use decode::{DecodedInput, decode_frame, decode_value};
pub use wiegand::{ReaderSignal, WiegandFrame};
