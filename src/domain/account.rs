//! Ledger account identifiers.

use crate::crypto::hashing::checksum_address;
use primitive_types::H160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 20-byte ledger account. Displays in EIP-55 checksum form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub H160);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid account address '{0}'")]
pub struct AddressParseError(pub String);

impl Address {
    pub fn as_h160(&self) -> H160 {
        self.0
    }

    /// Short form for user-facing notices: first 6 and last 4 characters.
    pub fn redacted(&self) -> String {
        redact_account(&self.to_string())
    }
}

/// `0xf39Fd6e5...2266` -> `0xf39F...2266`. Short inputs are returned unchanged.
pub fn redact_account(account: &str) -> String {
    if account.len() <= 10 || !account.is_ascii() {
        return account.to_string();
    }
    format!("{}...{}", &account[..6], &account[account.len() - 4..])
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if digits.len() != 40 {
            return Err(AddressParseError(s.to_string()));
        }
        let bytes = hex::decode(digits).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(H160::from_slice(&bytes)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&checksum_address(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
