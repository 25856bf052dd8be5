//! Ledger file — the whole committed `LedgerState` as one JSON document.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "saved_at": 1700000000000000,
//!     "ledger": { ... LedgerState ... }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, Result};
use crate::ledger::LedgerState;

// ── File format constants ─────────────────────────────────────────────────────

const LEDGER_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Wrapper written to disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerFile {
    /// Format version number.
    pub version: u32,
    /// Wall-clock save time (microseconds since epoch).
    pub saved_at: u64,
    /// The stored state.
    pub ledger: LedgerState,
}

/// Persist `state` to `path`, replacing any previous file atomically.
///
/// # Errors
///
/// Returns `AuthorityError::SerializationError` if serialization fails, or
/// `AuthorityError::Io` for filesystem errors.
pub fn save_ledger(state: &LedgerState, path: &Path) -> Result<()> {
    let file = LedgerFile {
        version: LEDGER_FILE_VERSION,
        saved_at: crate::time::now_micros(),
        ledger: state.clone(),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| AuthorityError::SerializationError(e.to_string()))?;
    write_atomic(path, json.as_bytes())
}

/// Load a ledger previously written by [`save_ledger`].
///
/// # Errors
///
/// Returns `AuthorityError::NotFound` if `path` does not exist,
/// `AuthorityError::InvalidFileFormat` for malformed files or unknown
/// versions, or `AuthorityError::Io` for other filesystem errors.
pub fn load_ledger(path: &Path) -> Result<LedgerState> {
    if !path.exists() {
        return Err(AuthorityError::NotFound(format!(
            "ledger file not found: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)?;
    let file: LedgerFile = serde_json::from_slice(&bytes).map_err(|e| {
        AuthorityError::InvalidFileFormat(format!(
            "failed to parse ledger file {}: {e}",
            path.display()
        ))
    })?;

    if file.version != LEDGER_FILE_VERSION {
        return Err(AuthorityError::InvalidFileFormat(format!(
            "unsupported ledger file version {}",
            file.version
        )));
    }

    Ok(file.ledger)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Write `data` to `path` through a sibling temp file and rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
