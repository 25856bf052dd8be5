//! Receipt persistence — one JSON file per committed batch.
//!
//! Each receipt is stored as `{batch_id}.json` inside the base directory:
//! ```json
//! {
//!     "version": 1,
//!     "receipt": { ... BatchReceipt ... }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchId, BatchReceipt};
use crate::error::{AuthorityError, Result};

// ── File format constants ─────────────────────────────────────────────────────

const RECEIPT_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Wrapper written to disk for each committed batch.
#[derive(Debug, Serialize, Deserialize)]
struct ReceiptFile {
    /// Format version number.
    version: u32,
    /// Receipt of the committed batch.
    receipt: BatchReceipt,
}

// ── ReceiptStore ──────────────────────────────────────────────────────────────

/// Filesystem-backed store for `BatchReceipt` records.
///
/// Single-process use only; concurrent writers are not coordinated.
pub struct ReceiptStore {
    base_dir: PathBuf,
}

impl ReceiptStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::StorageError` if `base_dir` exists but is not
    /// a directory, or `AuthorityError::Io` if it cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        if base_dir.exists() && !base_dir.is_dir() {
            return Err(AuthorityError::StorageError(format!(
                "receipt store path {} is not a directory",
                base_dir.display()
            )));
        }
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Persist a receipt. An existing file with the same id is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::SerializationError` if JSON serialization
    /// fails, or `AuthorityError::Io` for filesystem errors.
    pub fn save(&self, receipt: &BatchReceipt) -> Result<()> {
        let file = ReceiptFile {
            version: RECEIPT_FILE_VERSION,
            receipt: receipt.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| AuthorityError::SerializationError(e.to_string()))?;
        std::fs::write(self.receipt_path(&receipt.id), json.as_bytes())?;
        Ok(())
    }

    /// Load a receipt by batch id.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::NotFound` if no file exists for `id`,
    /// `AuthorityError::InvalidFileFormat` if it cannot be parsed, or
    /// `AuthorityError::Io` for other filesystem errors.
    pub fn load(&self, id: &BatchId) -> Result<BatchReceipt> {
        let path = self.receipt_path(id);
        if !path.exists() {
            return Err(AuthorityError::NotFound(format!("receipt not found: {id}")));
        }

        let bytes = std::fs::read(&path)?;
        let file: ReceiptFile = serde_json::from_slice(&bytes).map_err(|e| {
            AuthorityError::InvalidFileFormat(format!(
                "failed to parse receipt file {}: {e}",
                path.display()
            ))
        })?;
        Ok(file.receipt)
    }

    /// Ids of all stored receipts, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::Io` if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<BatchId>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(BatchId(stem.to_string()));
            }
        }
        Ok(ids)
    }

    /// All stored receipts ordered by ledger clock, then commit time.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`list`](Self::list) or [`load`](Self::load).
    pub fn load_all(&self) -> Result<Vec<BatchReceipt>> {
        let mut receipts = self
            .list()?
            .iter()
            .map(|id| self.load(id))
            .collect::<Result<Vec<_>>>()?;
        receipts.sort_by_key(|r| (r.clock, r.committed_at));
        Ok(receipts)
    }

    fn receipt_path(&self, id: &BatchId) -> PathBuf {
        self.base_dir.join(format!("{}.json", id.0))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
