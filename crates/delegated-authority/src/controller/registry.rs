//! Permission registry — `(delegate, caller scope) -> expiry`.
//!
//! Entries live in the controller's storage under
//! `b"p" || delegate u64 BE || caller 32 bytes`, where the all-zero caller
//! is the wildcard. The value is the expiry as a u64 BE logical clock value.
//! An entry is active while `now < expiry`: `u64::MAX` never expires, `0`
//! is always expired.

use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId};
use crate::ledger::Storage;

/// Storage tag for permission entries.
pub const PERMISSION_PREFIX: &[u8] = b"p";

/// Length of a permission key: tag + app id + caller.
pub const PERMISSION_KEY_LEN: usize = 1 + 8 + 32;

/// Expiry that never lapses.
pub const NEVER_EXPIRES: u64 = u64::MAX;

/// Which callers a permission entry admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerScope {
    /// Any caller.
    Any,
    /// Exactly this caller.
    Caller(Address),
}

impl CallerScope {
    /// Scope for `address`, mapping the zero address to the wildcard.
    pub fn from_address(address: Address) -> Self {
        if address.is_zero() {
            CallerScope::Any
        } else {
            CallerScope::Caller(address)
        }
    }

    /// Fixed-width caller bytes used in the storage key.
    pub fn key_bytes(&self) -> [u8; 32] {
        match self {
            CallerScope::Any => [0u8; 32],
            CallerScope::Caller(a) => *a.as_bytes(),
        }
    }

    fn normalized(self) -> Self {
        match self {
            CallerScope::Caller(a) => CallerScope::from_address(a),
            any => any,
        }
    }
}

impl std::fmt::Display for CallerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerScope::Any => f.write_str("*"),
            CallerScope::Caller(a) => write!(f, "{a}"),
        }
    }
}

/// One decoded registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub delegate: AppId,
    pub scope: CallerScope,
    pub expiry: u64,
}

impl PermissionEntry {
    /// Whether the entry admits delegation at `now`.
    pub fn is_active(&self, now: u64) -> bool {
        is_active(self.expiry, now)
    }
}

/// Whether an entry with `expiry` is active at `now`.
pub fn is_active(expiry: u64, now: u64) -> bool {
    now < expiry
}

/// Storage key for `(delegate, scope)`.
pub fn permission_key(delegate: AppId, scope: &CallerScope) -> Vec<u8> {
    let mut key = Vec::with_capacity(PERMISSION_KEY_LEN);
    key.extend_from_slice(PERMISSION_PREFIX);
    key.extend_from_slice(&delegate.to_be_bytes());
    key.extend_from_slice(&scope.key_bytes());
    key
}

/// Inverse of [`permission_key`].
pub fn parse_permission_key(key: &[u8]) -> Option<(AppId, CallerScope)> {
    if key.len() != PERMISSION_KEY_LEN || !key.starts_with(PERMISSION_PREFIX) {
        return None;
    }
    let id: [u8; 8] = key[1..9].try_into().ok()?;
    let caller: [u8; 32] = key[9..].try_into().ok()?;
    Some((
        AppId(u64::from_be_bytes(id)),
        CallerScope::from_address(Address::from_bytes(caller)),
    ))
}

fn decode_expiry(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| {
        AuthorityError::SerializationError(format!("expiry must be 8 bytes, got {}", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(arr))
}

/// Create or overwrite an entry. Returns the previous expiry.
pub fn grant(
    storage: &mut Storage,
    delegate: AppId,
    scope: CallerScope,
    expiry: u64,
) -> Result<Option<u64>> {
    let key = permission_key(delegate, &scope.normalized());
    storage
        .insert(key, expiry.to_be_bytes().to_vec())
        .map(|prev| decode_expiry(&prev))
        .transpose()
}

/// Delete an entry. Returns its expiry, or `NotFound` when absent.
pub fn revoke(storage: &mut Storage, delegate: AppId, scope: CallerScope) -> Result<u64> {
    let scope = scope.normalized();
    let key = permission_key(delegate, &scope);
    match storage.remove(&key) {
        Some(bytes) => decode_expiry(&bytes),
        None => Err(AuthorityError::NotFound(format!(
            "no permission for {delegate} scoped to {scope}"
        ))),
    }
}

/// Stored expiry for exactly `(delegate, scope)`, active or not.
pub fn get(storage: &Storage, delegate: AppId, scope: CallerScope) -> Result<Option<u64>> {
    storage
        .get(&permission_key(delegate, &scope.normalized()))
        .map(|b| decode_expiry(b))
        .transpose()
}

/// Find an active entry admitting `caller` to delegate to `delegate`.
///
/// Tries the caller-specific entry first, then the wildcard. Either being
/// active suffices; an expired specific entry does not shadow an active
/// wildcard.
pub fn lookup(
    storage: &Storage,
    delegate: AppId,
    caller: &Address,
    now: u64,
) -> Result<Option<PermissionEntry>> {
    for scope in [CallerScope::from_address(*caller), CallerScope::Any] {
        if let Some(expiry) = get(storage, delegate, scope)? {
            let entry = PermissionEntry {
                delegate,
                scope,
                expiry,
            };
            if entry.is_active(now) {
                return Ok(Some(entry));
            }
        }
    }
    Ok(None)
}

/// Every entry in `storage`, in key order.
pub fn entries(storage: &Storage) -> Result<Vec<PermissionEntry>> {
    storage
        .range(PERMISSION_PREFIX.to_vec()..)
        .take_while(|(k, _)| k.starts_with(PERMISSION_PREFIX))
        .filter_map(|(k, v)| parse_permission_key(k).map(|parsed| (parsed, v)))
        .map(|((delegate, scope), v)| {
            Ok(PermissionEntry {
                delegate,
                scope,
                expiry: decode_expiry(v)?,
            })
        })
        .collect()
}
