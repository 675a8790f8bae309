//! Product records and scan history as they live on the ledger.

use crate::crypto::hashing::{derive_product_hash, ProductHash};
use crate::domain::account::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Attributes a manufacturer submits when registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttributes {
    pub name: String,
    pub manufacturing_date: String,
    pub batch_number: String,
    pub location: String,
    #[serde(default)]
    pub additional_details: Option<String>,
}

impl ProductAttributes {
    pub fn new(
        name: impl Into<String>,
        manufacturing_date: impl Into<String>,
        batch_number: impl Into<String>,
        location: impl Into<String>,
        additional_details: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            manufacturing_date: manufacturing_date.into(),
            batch_number: batch_number.into(),
            location: location.into(),
            additional_details,
        }
    }

    pub fn product_hash(&self) -> ProductHash {
        derive_product_hash(
            &self.name,
            &self.manufacturing_date,
            &self.batch_number,
            &self.location,
            self.additional_details.as_deref(),
        )
    }

    /// Details as they are written to the ledger (absent becomes empty).
    pub fn details_or_empty(&self) -> &str {
        self.additional_details.as_deref().unwrap_or("")
    }
}

/// A registered product as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub manufacturing_date: String,
    pub batch_number: String,
    pub location: String,
    pub additional_details: String,
    #[schema(value_type = String)]
    pub manufacturer: Address,
    /// Ledger-assigned, seconds since epoch.
    pub timestamp: u64,
    #[serde(rename = "isRegistered")]
    pub registered: bool,
}

impl ProductRecord {
    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        unix_seconds(self.timestamp)
    }

    /// Whether this record carries exactly the submitted attributes.
    pub fn matches(&self, attrs: &ProductAttributes) -> bool {
        self.name == attrs.name
            && self.manufacturing_date == attrs.manufacturing_date
            && self.batch_number == attrs.batch_number
            && self.location == attrs.location
            && self.additional_details == attrs.details_or_empty()
    }
}

/// Who scanned a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum UserType {
    Consumer,
    Distributor,
    Retailer,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown user type '{0}' (expected Consumer, Distributor or Retailer)")]
pub struct UserTypeParseError(pub String);

impl UserType {
    pub const ALL: [UserType; 3] = [UserType::Consumer, UserType::Distributor, UserType::Retailer];

    /// The exact text stored on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Consumer => "Consumer",
            UserType::Distributor => "Distributor",
            UserType::Retailer => "Retailer",
        }
    }
}

impl FromStr for UserType {
    type Err = UserTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UserTypeParseError(s.to_string()))
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only scan record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanLogEntry {
    #[schema(value_type = String)]
    pub scanner: Address,
    pub location: String,
    pub user_type: UserType,
    pub timestamp: u64,
}

impl ScanLogEntry {
    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        unix_seconds(self.timestamp)
    }
}

fn unix_seconds(secs: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}
