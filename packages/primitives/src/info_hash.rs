//! The identifier of a torrent.
//!
//! Two wire formats coexist: the 20-byte SHA-1 digest used by `BitTorrent` v1
//! metainfo and the 32-byte SHA-256 digest introduced by v2 (BEP-52). A v2
//! hash has a canonical v1 projection obtained by truncating it to its first
//! 20 bytes, which is how v1-only clients address a hybrid torrent.
use std::panic::Location;

use thiserror::Error;

/// Number of bytes of a v1 (SHA-1) infohash.
pub const INFO_HASH_V1_BYTES_LEN: usize = 20;

/// Number of bytes of a v2 (SHA-256) infohash.
pub const INFO_HASH_V2_BYTES_LEN: usize = 32;

/// A `BitTorrent` infohash, either v1 (20 bytes) or v2 (32 bytes).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub enum InfoHash {
    /// A 20-byte SHA-1 infohash.
    V1([u8; INFO_HASH_V1_BYTES_LEN]),
    /// A 32-byte SHA-256 infohash.
    V2([u8; INFO_HASH_V2_BYTES_LEN]),
}

impl InfoHash {
    /// Builds an `InfoHash` from raw bytes.
    ///
    /// # Errors
    ///
    /// Will return a `ConversionError` if the slice is neither 20 nor 32
    /// bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConversionError> {
        match bytes.len() {
            INFO_HASH_V1_BYTES_LEN => {
                let mut data = [0u8; INFO_HASH_V1_BYTES_LEN];
                data.copy_from_slice(bytes);
                Ok(Self::V1(data))
            }
            INFO_HASH_V2_BYTES_LEN => {
                let mut data = [0u8; INFO_HASH_V2_BYTES_LEN];
                data.copy_from_slice(bytes);
                Ok(Self::V2(data))
            }
            len => Err(ConversionError::InvalidLength {
                location: Location::caller(),
                len,
            }),
        }
    }

    /// Builds an `InfoHash` from a hex string (40 chars for v1, 64 for v2).
    ///
    /// # Errors
    ///
    /// Will return a `ConversionError` if the input has the wrong length or
    /// contains non-hexadecimal characters.
    pub fn from_hex(hex: &str) -> Result<Self, ConversionError> {
        match hex.len() {
            l if l == INFO_HASH_V1_BYTES_LEN * 2 => {
                let mut data = [0u8; INFO_HASH_V1_BYTES_LEN];
                decode_hex(hex, &mut data)?;
                Ok(Self::V1(data))
            }
            l if l == INFO_HASH_V2_BYTES_LEN * 2 => {
                let mut data = [0u8; INFO_HASH_V2_BYTES_LEN];
                decode_hex(hex, &mut data)?;
                Ok(Self::V2(data))
            }
            len => Err(ConversionError::InvalidLength {
                location: Location::caller(),
                len,
            }),
        }
    }

    /// Returns the raw bytes of the infohash.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::V1(data) => data,
            Self::V2(data) => data,
        }
    }

    /// Returns true for a v2 (32-byte) infohash.
    #[must_use]
    pub fn is_v2(&self) -> bool {
        matches!(self, Self::V2(_))
    }

    /// Returns the v1 projection of the infohash.
    ///
    /// A v2 hash is truncated to its first 20 bytes (BEP-52); a v1 hash is
    /// returned unchanged.
    #[must_use]
    pub fn truncate_v1(&self) -> InfoHash {
        match self {
            Self::V1(_) => *self,
            Self::V2(data) => {
                let mut truncated = [0u8; INFO_HASH_V1_BYTES_LEN];
                truncated.copy_from_slice(&data[..INFO_HASH_V1_BYTES_LEN]);
                Self::V1(truncated)
            }
        }
    }

    /// Returns the infohash as a lowercase hex string.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

fn decode_hex(hex: &str, output: &mut [u8]) -> Result<(), ConversionError> {
    binascii::hex2bin(hex.as_bytes(), output).map_err(|_| ConversionError::InvalidHexChars {
        location: Location::caller(),
        value: hex.to_owned(),
    })?;
    Ok(())
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; INFO_HASH_V2_BYTES_LEN * 2];
        let bytes = self.bytes();
        let hex = binascii::bin2hex(bytes, &mut chars[..bytes.len() * 2]).expect("output buffer has the exact size");
        write!(f, "{}", std::str::from_utf8(hex).expect("hex digits are valid UTF-8"))
    }
}

impl std::str::FromStr for InfoHash {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<Vec<u8>> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(&bytes)
    }
}

impl From<[u8; INFO_HASH_V1_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_V1_BYTES_LEN]) -> Self {
        Self::V1(bytes)
    }
}

impl From<[u8; INFO_HASH_V2_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_V2_BYTES_LEN]) -> Self {
        Self::V2(bytes)
    }
}

/// Errors returned when building an [`InfoHash`] from an external input.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    /// The input was neither 20 nor 32 bytes (or hex pairs) long.
    #[error("invalid infohash length {len}, expected 20 or 32 bytes in {location}")]
    InvalidLength {
        location: &'static Location<'static>,
        len: usize,
    },
    /// The input contained characters outside `[0-9a-fA-F]`.
    #[error("invalid hex string {value} in {location}")]
    InvalidHexChars {
        location: &'static Location<'static>,
        value: String,
    },
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl serde::de::Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 or 64 character long hex string")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        InfoHash::from_hex(v).map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &"a 40 or 64 character long hex string")
        })
    }
}
