use crate::{Result, constants::FOB_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Credential identifier (10 digits, zero-padded)
///
/// Identifiers read from the scanner are normalized with [`FobId::from_scan`].
/// Identifiers deserialized from the credential cache or the authorization
/// service are taken verbatim: membership is an exact string match.
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when comparing credentials during authorization.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FobId(String);

impl FobId {
    /// Normalize one line of scanner output.
    ///
    /// Surrounding whitespace is stripped and the value is left-padded with
    /// zeros to [`FOB_LENGTH`] characters.
    ///
    /// # Errors
    /// Returns `Error::InvalidFobFormat` if:
    /// - The line is empty after trimming
    /// - The line contains anything other than ASCII digits
    /// - The line is longer than 10 digits
    pub fn from_scan(line: &str) -> Result<Self> {
        let digits = line.trim();

        if digits.is_empty() {
            return Err(Error::InvalidFobFormat("empty scan".to_string()));
        }

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidFobFormat(format!(
                "fob must be numeric, got {digits:?}"
            )));
        }

        if digits.len() > FOB_LENGTH {
            return Err(Error::InvalidFobFormat(format!(
                "fob must be at most {FOB_LENGTH} digits, got {}",
                digits.len()
            )));
        }

        Ok(FobId(format!("{:0>width$}", digits, width = FOB_LENGTH)))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FobId::from_scan(s)
    }
}

/// Constant-time comparison implementation for FobId
impl PartialEq for FobId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for FobId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Physical position of the door as reported by the contact sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum DoorPosition {
    /// No sensor reading yet (or no sensor configured).
    Unknown = -1,
    Closed = 0,
    Open = 1,
}

impl DoorPosition {
    /// Decode the tri-state flag stored in the shared record.
    ///
    /// # Errors
    /// Returns `Error::InvalidDoorPosition` for codes other than -1, 0 and 1.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            -1 => Ok(DoorPosition::Unknown),
            0 => Ok(DoorPosition::Closed),
            1 => Ok(DoorPosition::Open),
            _ => Err(Error::InvalidDoorPosition { code }),
        }
    }

    #[inline]
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, DoorPosition::Open)
    }
}

impl fmt::Display for DoorPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DoorPosition::Unknown => write!(f, "unknown"),
            DoorPosition::Closed => write!(f, "closed"),
            DoorPosition::Open => write!(f, "open"),
        }
    }
}

/// Why the strike is being energized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockReason {
    /// An authorized credential was presented.
    Fob(FobId),
    /// Operator override delivered out of band.
    Remote,
}

impl fmt::Display for UnlockReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnlockReason::Fob(fob) => write!(f, "fob {fob}"),
            UnlockReason::Remote => write!(f, "remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234567", "0001234567")]
    #[case("0001234567", "0001234567")]
    #[case("1", "0000000001")]
    #[case("  42 \n", "0000000042")]
    #[case("9999999999", "9999999999")]
    fn test_fob_from_scan_valid(#[case] input: &str, #[case] expected: &str) {
        let fob = FobId::from_scan(input).unwrap();
        assert_eq!(fob.as_str(), expected);
    }

    #[rstest]
    #[case("")] // empty
    #[case("   ")] // whitespace only
    #[case("12a45")] // non-numeric
    #[case("12345678901")] // too long
    #[case("-123")] // sign is not a digit
    fn test_fob_from_scan_invalid(#[case] input: &str) {
        let result = FobId::from_scan(input);
        assert!(matches!(result, Err(Error::InvalidFobFormat(_))));
    }

    #[test]
    fn test_fob_deserializes_verbatim() {
        let fob: FobId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(fob.as_str(), "42");
        assert_ne!(fob, FobId::from_scan("42").unwrap());
    }

    #[test]
    fn test_fob_serializes_as_plain_string() {
        let fob = FobId::from_scan("1234567").unwrap();
        assert_eq!(serde_json::to_string(&fob).unwrap(), "\"0001234567\"");
    }

    #[test]
    fn test_door_position_codes() {
        assert_eq!(DoorPosition::from_code(-1).unwrap(), DoorPosition::Unknown);
        assert_eq!(DoorPosition::from_code(0).unwrap(), DoorPosition::Closed);
        assert_eq!(DoorPosition::from_code(1).unwrap(), DoorPosition::Open);
        assert!(DoorPosition::from_code(2).is_err());

        assert_eq!(DoorPosition::Open.code(), 1);
        assert!(DoorPosition::Open.is_open());
        assert!(!DoorPosition::Unknown.is_open());
    }

    #[test]
    fn test_unlock_reason_display() {
        let fob = FobId::from_scan("7").unwrap();
        assert_eq!(UnlockReason::Fob(fob).to_string(), "fob 0000000007");
        assert_eq!(UnlockReason::Remote.to_string(), "remote");
    }
}
