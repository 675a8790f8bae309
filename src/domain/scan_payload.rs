//! Decoding of scanned product labels.
//!
//! A label carries either a JSON object with at least a `hash` field, or the bare
//! hash text itself. Structured decode is attempted first; the bare form is only
//! accepted when the raw text has the hash's lexical shape.

use crate::crypto::hashing::{HashParseError, ProductHash};
use crate::domain::product::ProductAttributes;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    Structured {
        hash: ProductHash,
        name: Option<String>,
        batch: Option<String>,
        date: Option<String>,
    },
    BareHash(ProductHash),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanPayloadError {
    #[error("Invalid QR code: Missing product hash")]
    MissingHash,
    #[error("Invalid QR code: {0}")]
    InvalidHash(HashParseError),
    #[error("Invalid QR code format")]
    UnrecognizedFormat,
}

/// Label body written by a label generator.
#[derive(Debug, Serialize, Deserialize)]
struct LabelBody {
    hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

impl ScanPayload {
    pub fn parse(raw: &str) -> Result<Self, ScanPayloadError> {
        let raw = raw.trim();
        match serde_json::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Object(map)) => {
                let hash = match map.get("hash").and_then(JsonValue::as_str) {
                    Some(h) if !h.is_empty() => h,
                    _ => return Err(ScanPayloadError::MissingHash),
                };
                let hash = hash.parse().map_err(ScanPayloadError::InvalidHash)?;
                let text = |key: &str| map.get(key).and_then(JsonValue::as_str).map(str::to_string);
                Ok(ScanPayload::Structured {
                    hash,
                    name: text("name"),
                    batch: text("batch"),
                    date: text("date"),
                })
            }
            _ if raw.starts_with("0x") => raw
                .parse()
                .map(ScanPayload::BareHash)
                .map_err(ScanPayloadError::InvalidHash),
            _ => Err(ScanPayloadError::UnrecognizedFormat),
        }
    }

    pub fn hash(&self) -> ProductHash {
        match self {
            ScanPayload::Structured { hash, .. } => *hash,
            ScanPayload::BareHash(hash) => *hash,
        }
    }

    /// The structured label content for a freshly registered product.
    pub fn for_product(hash: ProductHash, attrs: &ProductAttributes) -> Self {
        ScanPayload::Structured {
            hash,
            name: Some(attrs.name.clone()),
            batch: Some(attrs.batch_number.clone()),
            date: Some(attrs.manufacturing_date.clone()),
        }
    }

    /// Text to embed in a label.
    pub fn encode(&self) -> String {
        match self {
            ScanPayload::BareHash(hash) => hash.to_string(),
            ScanPayload::Structured { hash, name, batch, date } => {
                let body = LabelBody {
                    hash: hash.to_string(),
                    name: name.clone(),
                    batch: batch.clone(),
                    date: date.clone(),
                };
                serde_json::to_string(&body).unwrap_or_else(|_| hash.to_string())
            }
        }
    }
}
