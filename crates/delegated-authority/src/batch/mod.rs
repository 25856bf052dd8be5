//! Atomic batches — building them, checking them, and their receipts.

pub mod group;
pub mod invariant;
pub mod receipt;

pub use group::{group_id, verify_group, GroupId};
pub use invariant::{find_restoring_operation, require_authority_restored, RestoreExpectation};
pub use receipt::{batch_id, BatchId, BatchReceipt};

use std::collections::HashMap;

use crate::crypto::KeyPair;
use crate::error::Result;
use crate::identity::Address;
use crate::ledger::{Ledger, Operation, SignedOperation};

/// Collects operations and the keys that will sign them, in submission
/// order.
///
/// `build` assigns each sender's next nonces from the ledger, stamps the
/// group id and signs. Any nonce or group already set on a pushed
/// operation is overwritten.
#[derive(Default)]
pub struct BatchBuilder<'k> {
    ops: Vec<(Operation, &'k KeyPair)>,
}

impl<'k> BatchBuilder<'k> {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Append `op`, to be signed with `key`.
    pub fn push(mut self, op: Operation, key: &'k KeyPair) -> Self {
        self.ops.push((op, key));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Sign the batch for submission to `ledger`.
    pub fn build(self, ledger: &Ledger) -> Result<Vec<SignedOperation>> {
        let mut next: HashMap<Address, u64> = HashMap::new();
        let mut ops = Vec::with_capacity(self.ops.len());
        let mut keys = Vec::with_capacity(self.ops.len());
        for (mut op, key) in self.ops {
            let nonce = next
                .entry(op.sender)
                .or_insert_with(|| ledger.next_nonce(&op.sender));
            op.nonce = *nonce;
            *nonce += 1;
            ops.push(op);
            keys.push(key);
        }

        group::assign_group(&mut ops)?;
        ops.into_iter()
            .zip(keys)
            .map(|(op, key)| op.sign(key))
            .collect()
    }
}

impl std::fmt::Debug for BatchBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBuilder")
            .field("operations", &self.ops.len())
            .finish()
    }
}
