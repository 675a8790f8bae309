pub mod hashing;

pub use hashing::{derive_product_hash, HashParseError, ProductHash};
