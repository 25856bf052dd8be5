//! Batch receipts — proof that a batch committed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::identity::AppId;
use crate::ledger::Operation;

/// Unique identifier for a committed batch.
///
/// Format: `abatch_` + base58 of the first 16 bytes of
/// SHA-256(clock || canonical bytes of every operation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of a committed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Content-derived id.
    pub id: BatchId,
    /// Logical clock value the batch ran at.
    pub clock: u64,
    /// Number of top-level operations.
    pub operations: usize,
    /// Number of inner operations issued by programs.
    pub inner_operations: usize,
    /// Apps deployed by the batch, in deploy order.
    pub created_apps: Vec<AppId>,
    /// Wall-clock commit time (microseconds since epoch).
    pub committed_at: u64,
}

impl BatchReceipt {
    pub(crate) fn new(
        ops: &[Operation],
        clock: u64,
        inner_operations: usize,
        created_apps: Vec<AppId>,
    ) -> Result<Self> {
        Ok(Self {
            id: batch_id(ops, clock)?,
            clock,
            operations: ops.len(),
            inner_operations,
            created_apps,
            committed_at: crate::time::now_micros(),
        })
    }

    /// First app deployed by this batch.
    pub fn created_app(&self) -> Option<AppId> {
        self.created_apps.first().copied()
    }
}

/// Compute the id a batch of `ops` would get at `clock`.
pub fn batch_id(ops: &[Operation], clock: u64) -> Result<BatchId> {
    let mut hasher = Sha256::new();
    hasher.update(clock.to_be_bytes());
    for op in ops {
        let bytes = op.canonical_bytes()?;
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }
    let digest = hasher.finalize();
    let encoded = bs58::encode(&digest[..16]).into_string();
    Ok(BatchId(format!("abatch_{encoded}")))
}
