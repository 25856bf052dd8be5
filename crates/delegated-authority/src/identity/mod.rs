//! Identities on the ledger — account addresses, app ids, asset ids.

pub mod address;

pub use address::{Address, AppId, AssetId, NATIVE_ASSET};
