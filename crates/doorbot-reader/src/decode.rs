use crate::wiegand::{ReaderSignal, WiegandFrame};
use doorbot_core::{EntryCode, Mode};
use doorbot_hardware::KeypadInput;
use tracing::warn;

/// Normalized reader input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedInput {
    /// A credential, ready for a decision. May be the invalid sentinel.
    Code(EntryCode),
    /// A key press, for the code accumulator.
    Key(KeypadInput),
}

/// Convert a credential value into its entry code.
///
/// The value is written as upper-case hexadecimal, left-padded with a zero to
/// an even number of digits, split into byte pairs, and the pair order is
/// reversed. A zero value means the reader produced no UID and yields the
/// invalid sentinel.
///
/// # Examples
///
/// ```
/// use doorbot_reader::decode_value;
///
/// assert_eq!(decode_value(0x1A2B3C4D).as_str(), "4D3C2B1A");
/// assert_eq!(decode_value(0xABCDE).as_str(), "DEBC0A");
/// assert!(decode_value(0).is_invalid());
/// ```
#[must_use]
pub fn decode_value(value: u64) -> EntryCode {
    if value == 0 {
        return EntryCode::invalid(Mode::Reader);
    }

    let mut hex = format!("{value:X}");
    if hex.len() % 2 == 1 {
        hex.insert(0, '0');
    }

    let reversed: String = hex
        .as_bytes()
        .chunks(2)
        .rev()
        .map(|pair| std::str::from_utf8(pair).unwrap_or_default())
        .collect();
    EntryCode::reader(reversed)
}

/// Decode a raw Wiegand frame.
///
/// Never fails: a malformed frame is logged and becomes the invalid reader
/// sentinel, which the decision engine denies.
#[must_use]
pub fn decode_frame(bits: Vec<bool>) -> DecodedInput {
    let frame = WiegandFrame::new(bits);
    match frame.decode() {
        Ok(ReaderSignal::Credential(value)) => DecodedInput::Code(decode_value(value)),
        Ok(ReaderSignal::Key(input)) => DecodedInput::Key(input),
        Err(e) => {
            warn!(bits = frame.len(), "discarding reader frame: {}", e);
            DecodedInput::Code(EntryCode::invalid(Mode::Reader))
        }
    }
}
