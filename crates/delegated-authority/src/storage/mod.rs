//! Storage layer for the ledger file and batch receipts.
//!
//! # Directory layout
//!
//! By convention the default root is `~/.dauth/`:
//!
//! ```text
//! ~/.dauth/
//! ├── ledger.json
//! └── receipts/
//!     └── {batch_id}.json
//! ```
//!
//! # Modules
//!
//! - [`ledger_file`]: atomic save/load of the whole `LedgerState`.
//! - [`receipt_store`]: one file per committed `BatchReceipt`.
//! - [`hex_map`]: serde adapter writing byte-keyed app storage as hex.

pub mod hex_map;
pub mod ledger_file;
pub mod receipt_store;

pub use ledger_file::{load_ledger, save_ledger, LedgerFile};
pub use receipt_store::ReceiptStore;
