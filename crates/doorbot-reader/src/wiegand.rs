//! Wiegand frame decoding.
//!
//! Credential frames carry a leading even-parity bit over the first half of
//! the data bits and a trailing odd-parity bit over the second half:
//!
//! ```text
//!  26-bit:  E DDDDDDDDDDDD DDDDDDDDDDDD O
//!  34-bit:  E DDDDDDDDDDDDDDDD DDDDDDDDDDDDDDDD O
//! ```
//!
//! Keypads wired to the same data lines send one burst per key press: either
//! the bare 4-bit key value, or 8 bits where the high nibble is the
//! complement of the low nibble.

use doorbot_core::{Error, Result};
use doorbot_hardware::KeypadInput;

/// Frame lengths that carry a credential.
const CREDENTIAL_FRAME_LENGTHS: [usize; 2] = [26, 34];

/// Key value the reader keypad sends for `*`.
const KEY_VALUE_CLEAR: u8 = 10;

/// Key value the reader keypad sends for `#`.
const KEY_VALUE_ENTER: u8 = 11;

/// What a frame turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderSignal {
    /// Credential value, parity checked.
    Credential(u64),
    /// Key pressed on a reader-integrated keypad.
    Key(KeypadInput),
}

/// One Wiegand transmission, first bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiegandFrame {
    bits: Vec<bool>,
}

impl WiegandFrame {
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Build a parity-correct credential frame of `len` bits.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported lengths or a value that does not fit
    /// the data bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorbot_reader::{ReaderSignal, WiegandFrame};
    ///
    /// let frame = WiegandFrame::credential(0x1A2B3C4D, 34).unwrap();
    /// assert_eq!(frame.decode().unwrap(), ReaderSignal::Credential(0x1A2B3C4D));
    /// ```
    pub fn credential(value: u64, len: usize) -> Result<Self> {
        if !CREDENTIAL_FRAME_LENGTHS.contains(&len) {
            return Err(Error::InputDecode(format!(
                "Unsupported credential frame length {len}"
            )));
        }
        let data_len = len - 2;
        if value >> data_len != 0 {
            return Err(Error::InputDecode(format!(
                "Value {value:#X} does not fit in {data_len} data bits"
            )));
        }

        let data: Vec<bool> = (0..data_len)
            .rev()
            .map(|shift| (value >> shift) & 1 == 1)
            .collect();
        let half = data_len / 2;
        let even = ones(&data[..half]) % 2 == 1;
        let odd = ones(&data[half..]) % 2 == 0;

        let mut bits = Vec::with_capacity(len);
        bits.push(even);
        bits.extend(data);
        bits.push(odd);
        Ok(Self { bits })
    }

    /// Frame for one key press in 8-bit burst format.
    pub fn key(input: KeypadInput) -> Self {
        let value = match input {
            KeypadInput::Digit(d) => d,
            KeypadInput::Clear => KEY_VALUE_CLEAR,
            KeypadInput::Enter => KEY_VALUE_ENTER,
        };
        let byte = ((!value & 0x0F) << 4) | value;
        Self {
            bits: (0..8).rev().map(|shift| (byte >> shift) & 1 == 1).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Decode the frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputDecode`] for empty frames, unsupported lengths,
    /// parity failures and unknown key values.
    pub fn decode(&self) -> Result<ReaderSignal> {
        match self.bits.len() {
            0 => Err(Error::InputDecode("Empty frame".to_string())),
            4 => key_from_value(to_value(&self.bits) as u8).map(ReaderSignal::Key),
            8 => {
                let byte = to_value(&self.bits) as u8;
                let (high, low) = (byte >> 4, byte & 0x0F);
                if high != (!low & 0x0F) {
                    return Err(Error::InputDecode(format!(
                        "Key burst {byte:#04X} fails nibble check"
                    )));
                }
                key_from_value(low).map(ReaderSignal::Key)
            }
            len if CREDENTIAL_FRAME_LENGTHS.contains(&len) => self.decode_credential(),
            len => Err(Error::InputDecode(format!("Unsupported frame length {len}"))),
        }
    }

    fn decode_credential(&self) -> Result<ReaderSignal> {
        let len = self.bits.len();
        let half = (len - 2) / 2;
        let (leading, trailing) = self.bits.split_at(1 + half);

        if ones(leading) % 2 != 0 {
            return Err(Error::InputDecode(format!(
                "{len}-bit frame fails leading even parity"
            )));
        }
        if ones(trailing) % 2 != 1 {
            return Err(Error::InputDecode(format!(
                "{len}-bit frame fails trailing odd parity"
            )));
        }

        Ok(ReaderSignal::Credential(to_value(&self.bits[1..len - 1])))
    }
}

fn ones(bits: &[bool]) -> usize {
    bits.iter().filter(|b| **b).count()
}

fn to_value(bits: &[bool]) -> u64 {
    bits.iter().fold(0, |acc, bit| (acc << 1) | u64::from(*bit))
}

fn key_from_value(value: u8) -> Result<KeypadInput> {
    match value {
        0..=9 => Ok(KeypadInput::Digit(value)),
        KEY_VALUE_CLEAR => Ok(KeypadInput::Clear),
        KEY_VALUE_ENTER => Ok(KeypadInput::Enter),
        _ => Err(Error::InputDecode(format!("Unknown key value {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().filter(|c| !c.is_whitespace()).map(|c| c == '1').collect()
    }

    #[test]
    fn test_decode_known_26_bit_frame() {
        // Facility 1, card 1: data 0x010001, both halves carry one set bit.
        let frame = WiegandFrame::new(bits("1 000000010000 000000000001 0"));
        assert_eq!(frame.decode().unwrap(), ReaderSignal::Credential(0x010001));
    }

    #[test]
    fn test_leading_parity_failure() {
        let frame = WiegandFrame::new(bits("0 000000010000 000000000001 0"));
        assert!(matches!(frame.decode(), Err(Error::InputDecode(_))));
    }

    #[test]
    fn test_trailing_parity_failure() {
        let frame = WiegandFrame::new(bits("1 000000010000 000000000001 1"));
        assert!(matches!(frame.decode(), Err(Error::InputDecode(_))));
    }

    #[rstest]
    #[case("0111", KeypadInput::Digit(7))]
    #[case("1010", KeypadInput::Clear)]
    #[case("1011", KeypadInput::Enter)]
    fn test_four_bit_keys(#[case] frame: &str, #[case] expected: KeypadInput) {
        let frame = WiegandFrame::new(bits(frame));
        assert_eq!(frame.decode().unwrap(), ReaderSignal::Key(expected));
    }

    #[test]
    fn test_four_bit_unknown_value() {
        assert!(WiegandFrame::new(bits("1111")).decode().is_err());
    }

    #[rstest]
    #[case(KeypadInput::Digit(0))]
    #[case(KeypadInput::Digit(5))]
    #[case(KeypadInput::Enter)]
    fn test_eight_bit_key_burst(#[case] input: KeypadInput) {
        let frame = WiegandFrame::key(input);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.decode().unwrap(), ReaderSignal::Key(input));
    }

    #[test]
    fn test_eight_bit_nibble_mismatch() {
        // 0x55: high nibble is not the complement of the low nibble.
        assert!(WiegandFrame::new(bits("01010101")).decode().is_err());
    }

    #[rstest]
    #[case(0)]
    #[case(25)]
    #[case(37)]
    fn test_unsupported_lengths(#[case] len: usize) {
        let frame = WiegandFrame::new(vec![false; len]);
        assert!(matches!(frame.decode(), Err(Error::InputDecode(_))));
    }

    #[test]
    fn test_credential_value_too_wide() {
        assert!(WiegandFrame::credential(1 << 24, 26).is_err());
        assert!(WiegandFrame::credential(1, 30).is_err());
    }

    proptest! {
        #[test]
        fn prop_credential_frames_decode(value in 0u64..(1 << 32)) {
            let frame = WiegandFrame::credential(value, 34).unwrap();
            prop_assert_eq!(frame.decode().unwrap(), ReaderSignal::Credential(value));
        }

        #[test]
        fn prop_any_single_bit_flip_is_rejected(value in 0u64..(1 << 24), flip in 0usize..26) {
            let mut bits = WiegandFrame::credential(value, 26).unwrap().bits().to_vec();
            bits[flip] = !bits[flip];
            prop_assert!(WiegandFrame::new(bits).decode().is_err());
        }
    }
}
