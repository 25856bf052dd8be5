//! Persistent ledger state — accounts, apps, and the logical clock.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId, AssetId, NATIVE_ASSET};

use super::program::ProgramKind;

/// Keyed storage owned by one app. Keys and values are raw bytes.
pub type Storage = BTreeMap<Vec<u8>, Vec<u8>>;

/// First id handed out to deployed apps.
pub const FIRST_APP_ID: u64 = 1000;

/// One account's balances and authority slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Holdings per asset. Presence of a non-native key means opted in.
    #[serde(default)]
    pub balances: BTreeMap<AssetId, u64>,
    /// Rekeyed signer. `Address::ZERO` means the account signs for itself.
    #[serde(default)]
    pub auth: Address,
    /// Nonce the account's next top-level operation must carry.
    #[serde(default)]
    pub nonce: u64,
}

impl AccountState {
    /// Balance of `asset`, zero when not held.
    pub fn balance(&self, asset: AssetId) -> u64 {
        self.balances.get(&asset).copied().unwrap_or(0)
    }

    /// Whether the account may receive `asset`.
    pub fn holds(&self, asset: AssetId) -> bool {
        asset == NATIVE_ASSET || self.balances.contains_key(&asset)
    }
}

/// A deployed program and its storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    /// App id.
    pub id: AppId,
    /// Account that deployed the app.
    pub creator: Address,
    /// Which program runs under this id.
    pub kind: ProgramKind,
    /// Program storage.
    #[serde(with = "crate::storage::hex_map")]
    pub storage: Storage,
}

impl AppRecord {
    /// Decode a bincode value stored under `key`.
    pub fn value<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        decode_value(&self.storage, key)
    }
}

/// Decode a bincode value from `storage`.
pub fn decode_value<T: DeserializeOwned>(storage: &Storage, key: &[u8]) -> Result<Option<T>> {
    storage
        .get(key)
        .map(|bytes| bincode::deserialize(bytes).map_err(AuthorityError::from))
        .transpose()
}

/// Encode and store a bincode value in `storage`.
pub fn encode_value<T: Serialize>(storage: &mut Storage, key: &[u8], value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    storage.insert(key.to_vec(), bytes);
    Ok(())
}

/// Complete ledger state. Cloned per batch and swapped in on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Logical clock value batches execute at.
    pub clock: u64,
    /// Next id assigned by a deploy.
    pub next_app_id: u64,
    /// Number of batches committed so far.
    pub committed_batches: u64,
    /// Accounts that have ever held anything or been rekeyed.
    pub accounts: BTreeMap<Address, AccountState>,
    /// Deployed apps.
    pub apps: BTreeMap<AppId, AppRecord>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            clock: 0,
            next_app_id: FIRST_APP_ID,
            committed_batches: 0,
            accounts: BTreeMap::new(),
            apps: BTreeMap::new(),
        }
    }
}

impl LedgerState {
    /// Account state, or an empty account when never touched.
    pub fn account(&self, address: &Address) -> AccountState {
        self.accounts.get(address).cloned().unwrap_or_default()
    }

    /// Mutable account state, created on first touch.
    pub fn account_mut(&mut self, address: &Address) -> &mut AccountState {
        self.accounts.entry(*address).or_default()
    }

    /// The raw authority slot (`ZERO` when unset).
    pub fn auth_addr(&self, address: &Address) -> Address {
        self.accounts
            .get(address)
            .map(|a| a.auth)
            .unwrap_or(Address::ZERO)
    }

    /// Whoever must authorize operations sent by `address`.
    pub fn effective_signer(&self, address: &Address) -> Address {
        let auth = self.auth_addr(address);
        if auth.is_zero() {
            *address
        } else {
            auth
        }
    }

    /// Replace the authority slot. Targeting the account itself or `ZERO`
    /// clears the slot.
    pub fn set_auth(&mut self, address: &Address, target: Address) {
        let normalized = normalize_auth(address, target);
        self.account_mut(address).auth = normalized;
    }

    /// Nonce the next top-level operation sent by `address` must carry.
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Check `found` against the sender's nonce and advance it.
    pub fn consume_nonce(&mut self, address: &Address, found: u64) -> Result<()> {
        let expected = self.nonce(address);
        if found != expected {
            return Err(AuthorityError::InvalidNonce {
                account: address.to_string(),
                expected,
                found,
            });
        }
        self.account_mut(address).nonce = expected + 1;
        Ok(())
    }

    pub fn balance(&self, address: &Address, asset: AssetId) -> u64 {
        self.accounts
            .get(address)
            .map(|a| a.balance(asset))
            .unwrap_or(0)
    }

    /// Look up an app.
    pub fn app(&self, id: AppId) -> Result<&AppRecord> {
        self.apps
            .get(&id)
            .ok_or_else(|| AuthorityError::NotFound(format!("app not found: {id}")))
    }

    /// Look up an app for mutation.
    pub fn app_mut(&mut self, id: AppId) -> Result<&mut AppRecord> {
        self.apps
            .get_mut(&id)
            .ok_or_else(|| AuthorityError::NotFound(format!("app not found: {id}")))
    }

    /// Credit `amount` of `asset` outside of any batch (genesis funding).
    pub fn mint(&mut self, address: &Address, asset: AssetId, amount: u64) -> Result<()> {
        let entry = self
            .account_mut(address)
            .balances
            .entry(asset)
            .or_insert(0);
        *entry = entry.checked_add(amount).ok_or_else(|| {
            AuthorityError::InvalidArgument(format!("balance overflow minting asset {asset}"))
        })?;
        Ok(())
    }
}

/// Canonical form of an authority target for `address`.
pub fn normalize_auth(address: &Address, target: Address) -> Address {
    if target == *address {
        Address::ZERO
    } else {
        target
    }
}
