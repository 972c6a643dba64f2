//! 32-byte digests: transaction hashes and sign-doc digests
//!
//! Rendered the way block explorers and the CLI show transaction hashes:
//! upper-case hex without a prefix. Parsing is lenient about case and an
//! optional `0x`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DIGEST_LEN: usize = 32;

/// Digest parsing error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Not hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Wrong number of bytes
    #[error("invalid hash length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },
}

/// 32-byte digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct H256([u8; DIGEST_LEN]);

/// Transaction hash
pub type Hash = H256;

impl H256 {
    /// Size in bytes
    pub const LEN: usize = DIGEST_LEN;

    /// All-zero digest
    pub const ZERO: H256 = H256([0u8; DIGEST_LEN]);

    /// Wrap hasher output
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        H256(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Upper-case hex, no prefix
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// First four bytes, for log lines
    pub fn short(&self) -> String {
        hex::encode_upper(&self.0[..4])
    }
}

impl TryFrom<&[u8]> for H256 {
    type Error = HashError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        <[u8; DIGEST_LEN]>::try_from(slice)
            .map(H256)
            .map_err(|_| HashError::InvalidLength {
                expected: DIGEST_LEN,
                got: slice.len(),
            })
    }
}

impl FromStr for H256 {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        H256::try_from(bytes.as_slice())
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for H256 {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        H256(bytes)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for H256 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for H256 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_HASH: &str = "5F2B8A3C0D9E4F1A6B7C8D9E0F1A2B3C4D5E6F708192A3B4C5D6E7F8091A2B3C";

    #[test]
    fn test_display_is_upper_hex() {
        let hash: H256 = TX_HASH.to_lowercase().parse().unwrap();
        assert_eq!(hash.to_string(), TX_HASH);
        assert_eq!(hash.short(), "5F2B8A3C");
        assert!(!hash.is_zero());
    }

    #[test]
    fn test_parse_accepts_prefix() {
        let prefixed: H256 = format!("0x{}", TX_HASH).parse().unwrap();
        assert_eq!(prefixed, TX_HASH.parse::<H256>().unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "0x".parse::<H256>(),
            Err(HashError::InvalidLength {
                expected: 32,
                got: 0
            })
        );
        assert!(matches!("zz".parse::<H256>(), Err(HashError::InvalidHex(_))));
        assert!(H256::try_from(&[1u8; 31][..]).is_err());
    }
}
