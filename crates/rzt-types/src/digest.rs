use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 256-bit integrity digest.
///
/// On the wire a `Digest` is always 64 lowercase hex characters. Parsing is
/// strict: uppercase input, wrong lengths, and non-hex characters are all
/// rejected so a stamped hash can be compared byte-for-byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Number of hex characters in the textual form.
    pub const HEX_LEN: usize = 64;

    /// Create a `Digest` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TypeError::NotLowercase(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns `true` if `s` is a well-formed digest string.
    pub fn is_valid_hex(s: &str) -> bool {
        s.len() == Self::HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let digest = Digest::from_hash([0xab; 32]);
        let parsed = Digest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn display_is_64_lowercase_chars() {
        let digest = Digest::from_hash([0xCD; 32]);
        let display = format!("{digest}");
        assert_eq!(display.len(), Digest::HEX_LEN);
        assert!(Digest::is_valid_hex(&display));
    }

    #[test]
    fn rejects_uppercase() {
        let upper = "AB".repeat(32);
        assert!(matches!(
            Digest::from_hex(&upper),
            Err(TypeError::NotLowercase(_))
        ));
        assert!(!Digest::is_valid_hex(&upper));
    }

    #[test]
    fn rejects_short_input() {
        let err = Digest::from_hex("deadbeef").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 4
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            Digest::from_hex(&"zz".repeat(32)),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let digest = Digest::from_hash([1; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn deserialize_rejects_malformed() {
        assert!(serde_json::from_str::<Digest>("\"deadbeef\"").is_err());
    }
}
