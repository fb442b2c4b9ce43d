use crate::constants::{CREDENTIAL_PREFIX_LEN, KEYPAD_MARKER, MIN_CODE_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input path an entry code arrived on.
///
/// The mode decides which subset of membership records may match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Keypad,
    Reader,
}

impl Mode {
    /// Name used in logs and audit records.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Keypad => "keypad",
            Mode::Reader => "reader",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized code derived from a keypad sequence or a scanned credential.
///
/// An entry code lives for exactly one decision. Malformed input is not an
/// error: it becomes the invalid sentinel (an empty code), which is always
/// shorter than [`MIN_CODE_LENGTH`] and therefore denied without matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryCode {
    code: String,
    mode: Mode,
}

impl EntryCode {
    /// Create an entry code from already normalized text.
    #[must_use]
    pub fn new(code: impl Into<String>, mode: Mode) -> Self {
        Self {
            code: code.into(),
            mode,
        }
    }

    /// Shorthand for a keypad code.
    #[must_use]
    pub fn keypad(code: impl Into<String>) -> Self {
        Self::new(code, Mode::Keypad)
    }

    /// Shorthand for a reader credential code.
    #[must_use]
    pub fn reader(code: impl Into<String>) -> Self {
        Self::new(code, Mode::Reader)
    }

    /// The sentinel produced for malformed or empty input.
    #[must_use]
    pub fn invalid(mode: Mode) -> Self {
        Self::new(String::new(), mode)
    }

    /// Returns `true` for the sentinel produced by [`EntryCode::invalid`].
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.code.is_empty()
    }

    /// Returns `true` when the code is too short to be worth matching.
    #[must_use]
    pub fn is_too_short(&self) -> bool {
        self.len() < MIN_CODE_LENGTH
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.chars().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Display for EntryCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "<invalid {}>", self.mode)
        } else {
            write!(f, "{} ({})", self.code, self.mode)
        }
    }
}

/// One row of the membership snapshot.
///
/// A `code_id` starting with [`KEYPAD_MARKER`] is a keypad PIN (the PIN is
/// the remainder after the marker); anything else is a credential id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Stored code id, case preserved.
    pub code_id: String,

    /// Name announced on entry.
    pub display_name: Option<String>,

    /// Member id in the membership service.
    pub member_id: Option<String>,
}

impl MembershipRecord {
    /// Build a record from the three raw fields. Empty fields become `None`.
    #[must_use]
    pub fn from_fields(code_id: &str, display_name: &str, member_id: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            code_id: code_id.to_string(),
            display_name: non_empty(display_name),
            member_id: non_empty(member_id),
        }
    }

    /// Returns `true` for a keypad PIN row.
    #[must_use]
    pub fn is_keypad_pin(&self) -> bool {
        self.code_id.starts_with(KEYPAD_MARKER)
    }

    /// The PIN of a keypad row, `None` for credential rows.
    #[must_use]
    pub fn keypad_pin(&self) -> Option<&str> {
        self.code_id.strip_prefix(KEYPAD_MARKER)
    }

    /// Whether this record admits `code`.
    ///
    /// Keypad rows compare the PIN exactly. Credential rows compare the first
    /// [`CREDENTIAL_PREFIX_LEN`] characters, ignoring ASCII case. A record never
    /// matches a code from the other mode.
    #[must_use]
    pub fn admits(&self, code: &EntryCode) -> bool {
        match (code.mode(), self.keypad_pin()) {
            (Mode::Keypad, Some(pin)) => pin == code.as_str(),
            (Mode::Reader, None) => {
                credential_prefix(&self.code_id) == credential_prefix(code.as_str())
            }
            _ => false,
        }
    }

    /// Name to announce: display name, then member id, then a generic label.
    #[must_use]
    pub fn announce_name(&self) -> &str {
        announce_name(self.display_name.as_deref(), self.member_id.as_deref())
    }
}

/// Pick the name announced for a member.
#[must_use]
pub fn announce_name<'a>(display_name: Option<&'a str>, member_id: Option<&'a str>) -> &'a str {
    display_name.or(member_id).unwrap_or("A member")
}

fn credential_prefix(code: &str) -> String {
    code.chars()
        .take(CREDENTIAL_PREFIX_LEN)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_invalid_sentinel() {
        let code = EntryCode::invalid(Mode::Reader);
        assert!(code.is_invalid());
        assert!(code.is_too_short());
        assert_eq!(code.to_string(), "<invalid reader>");
    }

    #[rstest]
    #[case("12345", true)]
    #[case("123456", false)]
    #[case("1234567890", false)]
    fn test_too_short(#[case] code: &str, #[case] short: bool) {
        assert_eq!(EntryCode::keypad(code).is_too_short(), short);
    }

    #[test]
    fn test_record_from_fields_empty_optionals() {
        let record = MembershipRecord::from_fields("ff123456", "", "");
        assert_eq!(record.display_name, None);
        assert_eq!(record.member_id, None);
        assert!(record.is_keypad_pin());
        assert_eq!(record.keypad_pin(), Some("123456"));
    }

    #[rstest]
    #[case("abc123", true)]
    #[case("abc124", false)]
    #[case("ABC123", false)]
    fn test_keypad_record_admits(#[case] code: &str, #[case] expected: bool) {
        let record = MembershipRecord::from_fields("ffabc123", "Ada", "7");
        assert_eq!(record.admits(&EntryCode::keypad(code)), expected);
    }

    #[rstest]
    #[case("1A2B3C", true)]
    #[case("1a2b3c99", true)]
    #[case("1a2b3d", false)]
    fn test_credential_record_admits(#[case] code: &str, #[case] expected: bool) {
        let record = MembershipRecord::from_fields("1a2b3c4d5e", "Ada", "7");
        assert_eq!(record.admits(&EntryCode::reader(code)), expected);
    }

    #[test]
    fn test_modes_never_cross() {
        let pin = MembershipRecord::from_fields("ffabc123", "", "");
        let card = MembershipRecord::from_fields("abc123", "", "");
        assert!(!pin.admits(&EntryCode::reader("abc123")));
        assert!(!card.admits(&EntryCode::keypad("abc123")));
    }

    #[test]
    fn test_upper_case_marker_is_a_credential() {
        let record = MembershipRecord::from_fields("FF00AA11", "", "");
        assert!(!record.is_keypad_pin());
        assert!(record.admits(&EntryCode::reader("ff00aa")));
    }

    #[test]
    fn test_announce_name_fallbacks() {
        assert_eq!(
            MembershipRecord::from_fields("x", "Ada", "7").announce_name(),
            "Ada"
        );
        assert_eq!(
            MembershipRecord::from_fields("x", "", "7").announce_name(),
            "7"
        );
        assert_eq!(
            MembershipRecord::from_fields("x", "", "").announce_name(),
            "A member"
        );
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&Mode::Keypad).unwrap();
        assert_eq!(json, "\"keypad\"");
    }
}
