// Assembles a product's scan history from the ledger's indexed reads.

use crate::crypto::hashing::ProductHash;
use crate::domain::product::ScanLogEntry;
use crate::infra::evm::{ContractError, ProductRegistry};
use tracing::debug;

pub struct ScanLogPager<'a> {
    registry: &'a ProductRegistry,
}

impl<'a> ScanLogPager<'a> {
    pub fn new(registry: &'a ProductRegistry) -> Self {
        Self { registry }
    }

    /// Reads the entry count once, then every index below it in increasing order.
    ///
    /// The count is a snapshot: entries appended while the per-index reads are in
    /// flight are not included. A failed read fails the whole fetch.
    pub async fn fetch_all(&self, hash: &ProductHash) -> Result<Vec<ScanLogEntry>, ContractError> {
        let count = self.registry.get_scan_logs_count(hash).await?;
        debug!(hash = %hash, count, "fetching scan logs");

        let mut logs = Vec::with_capacity(usize::try_from(count).unwrap_or(0).min(1024));
        for index in 0..count {
            logs.push(self.registry.get_scan_log(hash, index).await?);
        }
        Ok(logs)
    }
}
