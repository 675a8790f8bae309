// This file derives the 256-bit product hash and the other Keccak digests the ledger relies on.

use primitive_types::{H160, H256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}

/// Content identifier of a registered product; the lookup key for every ledger operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductHash(H256);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashParseError {
    #[error("product hash must start with 0x")]
    MissingPrefix,
    #[error("product hash must be 64 hex digits, got {0}")]
    BadLength(usize),
    #[error("product hash is not valid hex")]
    NotHex,
}

impl ProductHash {
    pub fn as_h256(&self) -> H256 {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for ProductHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or(HashParseError::MissingPrefix)?;
        if digits.len() != 64 {
            return Err(HashParseError::BadLength(digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|_| HashParseError::NotHex)?;
        Ok(Self(H256::from_slice(&bytes)))
    }
}

impl fmt::Display for ProductHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for ProductHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductHash({})", self)
    }
}

impl Serialize for ProductHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Derives the product hash from its attributes.
///
/// The UTF-8 bytes of each field are concatenated in this exact order, with no
/// separators, and hashed with Keccak-256. Hashes already on the ledger were
/// produced this way; reordering fields or changing the encoding orphans them.
/// A missing `additional_details` hashes the same as an empty string.
pub fn derive_product_hash(
    name: &str,
    manufacturing_date: &str,
    batch_number: &str,
    location: &str,
    additional_details: Option<&str>,
) -> ProductHash {
    let mut hasher = Keccak256::new();
    hasher.update(name.as_bytes());
    hasher.update(manufacturing_date.as_bytes());
    hasher.update(batch_number.as_bytes());
    hasher.update(location.as_bytes());
    hasher.update(additional_details.unwrap_or("").as_bytes());
    ProductHash(H256::from_slice(&hasher.finalize()))
}

/// First four bytes of the Keccak-256 of a Solidity function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest.as_bytes()[..4]);
    selector
}

/// EIP-55 mixed-case checksum rendering of an account address.
pub fn checksum_address(address: &H160) -> String {
    let lower = hex::encode(address.as_bytes());
    let digest = hex::encode(keccak256(lower.as_bytes()).as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (c, h) in lower.chars().zip(digest.chars()) {
        let nibble = h.to_digit(16).unwrap_or(0);
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
