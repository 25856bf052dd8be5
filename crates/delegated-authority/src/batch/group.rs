//! Group ids bind signed operations to the batch they were signed for.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AuthorityError, Result};
use crate::ledger::Operation;

/// Digest of a batch's operations.
///
/// Format: `agrp_` + base58 of SHA-256 over every operation's canonical
/// bytes with the group field cleared. Nonces are covered, so the same
/// operations signed twice never share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the group id of `ops`.
pub fn group_id(ops: &[Operation]) -> Result<GroupId> {
    let mut hasher = Sha256::new();
    hasher.update((ops.len() as u64).to_be_bytes());
    for op in ops {
        let bytes = op.ungrouped_bytes()?;
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }
    let encoded = bs58::encode(hasher.finalize()).into_string();
    Ok(GroupId(format!("agrp_{encoded}")))
}

/// Check that every operation in `ops` carries the batch's group id.
///
/// A single operation may go ungrouped. Anything larger must be grouped
/// as a whole.
pub fn verify_group(ops: &[Operation]) -> Result<()> {
    let expected = expected_group(ops)?;
    ops.iter()
        .try_for_each(|op| check_member(op, expected.as_ref(), ops.len()))
}

/// The group id every member of `ops` must carry, `None` for a lone
/// ungrouped operation.
pub(crate) fn expected_group(ops: &[Operation]) -> Result<Option<GroupId>> {
    if ops.len() == 1 && ops[0].group.is_none() {
        return Ok(None);
    }
    group_id(ops).map(Some)
}

pub(crate) fn check_member(
    op: &Operation,
    expected: Option<&GroupId>,
    batch_len: usize,
) -> Result<()> {
    match (&op.group, expected) {
        (None, None) => Ok(()),
        (Some(group), Some(expected)) if group == expected => Ok(()),
        (Some(group), Some(expected)) => Err(AuthorityError::GroupMismatch(format!(
            "operation belongs to {group}, batch is {expected}"
        ))),
        (None, Some(_)) => Err(AuthorityError::GroupMismatch(format!(
            "ungrouped operation in a batch of {batch_len}"
        ))),
        (Some(group), None) => Err(AuthorityError::GroupMismatch(format!(
            "operation belongs to {group}, batch is ungrouped"
        ))),
    }
}

/// Stamp `ops` with their group id. Single operations stay ungrouped.
pub(crate) fn assign_group(ops: &mut [Operation]) -> Result<()> {
    if ops.len() < 2 {
        return Ok(());
    }
    let group = group_id(ops)?;
    for op in ops.iter_mut() {
        op.group = Some(group.clone());
    }
    Ok(())
}
