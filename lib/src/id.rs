use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size in bytes of identifiers produced by [`Id::create`] (SHA-256).
pub const DEFAULT_ID_SIZE: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("identifier must contain at least one byte")]
    Empty,
    #[error("identifier size must be between 1 and {max} bytes, got {size}")]
    InvalidSize { size: usize, max: usize },
    #[error("invalid hex identifier: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("power of two {power} is out of range for a {bits}-bit identifier")]
    PowerOutOfRange { power: usize, bits: usize },
    #[error("identifier length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A position on the identifier ring.
///
/// Identifiers are big-endian byte strings. All identifiers taking part in one
/// overlay share the same length; ordering is plain unsigned comparison and
/// every arithmetic operation wraps modulo `2^bit_length`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id {
    bytes: Vec<u8>,
}

impl Id {
    pub fn new(bytes: Vec<u8>) -> Result<Self, IdError> {
        if bytes.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Id { bytes })
    }

    /// Hashes `value` with SHA-256 into a full-width identifier.
    pub fn create(value: &str) -> Self {
        let digest = Sha256::digest(value.as_bytes());
        Id {
            bytes: digest.to_vec(),
        }
    }

    /// Hashes `value` and keeps the first `size` bytes of the digest.
    pub fn create_with_size(value: &str, size: usize) -> Result<Self, IdError> {
        if size == 0 || size > DEFAULT_ID_SIZE {
            return Err(IdError::InvalidSize {
                size,
                max: DEFAULT_ID_SIZE,
            });
        }
        let mut digest = Sha256::digest(value.as_bytes()).to_vec();
        digest.truncate(size);
        Ok(Id { bytes: digest })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, IdError> {
        Self::new(hex::decode(hex_str)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    pub fn bit_length(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn ensure_same_length(&self, other: &Id) -> Result<(), IdError> {
        if self.bytes.len() != other.bytes.len() {
            return Err(IdError::LengthMismatch {
                expected: self.bytes.len(),
                actual: other.bytes.len(),
            });
        }
        Ok(())
    }

    /// Open clockwise interval test `(from, to)`.
    ///
    /// When `from == to` the interval spans the whole ring except `from`.
    pub fn is_in_interval(&self, from: &Id, to: &Id) -> bool {
        debug_assert_eq!(self.bytes.len(), from.bytes.len());
        debug_assert_eq!(self.bytes.len(), to.bytes.len());

        if from == to {
            return self != from;
        }
        if from < to {
            from < self && self < to
        } else {
            from < self || self < to
        }
    }

    /// Returns `self + 2^power` wrapped around the ring.
    pub fn add_power_of_two(&self, power: usize) -> Result<Id, IdError> {
        let bits = self.bit_length();
        if power >= bits {
            return Err(IdError::PowerOutOfRange { power, bits });
        }

        let mut bytes = self.bytes.clone();
        let mut position = bytes.len() - 1 - power / 8;
        let mut carry = 1u16 << (power % 8);
        loop {
            let Some(byte) = bytes.get_mut(position) else {
                break;
            };
            let sum = u16::from(*byte) + carry;
            *byte = (sum & 0xff) as u8;
            carry = sum >> 8;
            if carry == 0 || position == 0 {
                // overflow past the most significant byte wraps to zero
                break;
            }
            position -= 1;
        }
        Ok(Id { bytes })
    }

    /// Clockwise distance from `other` to `self`, i.e. `(self - other) mod 2^bits`.
    pub fn sub(&self, other: &Id) -> Id {
        debug_assert_eq!(self.bytes.len(), other.bytes.len());

        let modulus = BigUint::one() << self.bit_length();
        let a = BigUint::from_bytes_be(&self.bytes);
        let b = BigUint::from_bytes_be(&other.bytes) % &modulus;
        let difference = (a + &modulus - b) % &modulus;
        Id {
            bytes: to_fixed_bytes(&difference, self.bytes.len()),
        }
    }

    /// `floor(log2(self - other))`, or `None` when both identifiers are equal.
    pub fn interval_power_of_two_from(&self, other: &Id) -> Option<usize> {
        let distance = BigUint::from_bytes_be(&self.sub(other).bytes);
        if distance.is_zero() {
            return None;
        }
        usize::try_from(distance.bits() - 1).ok()
    }
}

fn to_fixed_bytes(value: &BigUint, length: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut bytes = vec![0u8; length.saturating_sub(raw.len())];
    bytes.extend(raw.iter().skip(raw.len().saturating_sub(length)));
    bytes
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.to_hex())
    }
}

impl TryFrom<String> for Id {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Id::from_hex(&value)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_hex()
    }
}
