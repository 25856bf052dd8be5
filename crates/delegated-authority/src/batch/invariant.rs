//! Restore-before-commit check.
//!
//! Whenever authority over a controlled account leaves the controller
//! mid-batch, some later top-level operation must hand it back. Because a
//! batch commits all-or-nothing, rejecting the delegation when no such
//! operation exists means no committed batch can leave authority
//! delegated.
//!
//! The scan is forward-only and looks at top-level operations strictly
//! after `from_index`. Two shapes count as restoring:
//!
//! 1. An operation sent by the controlled account whose rekey target
//!    resolves to the at-rest signer.
//! 2. A call to the controller's `verify_authority_returned`.

use crate::controller::ControllerCall;
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId};
use crate::ledger::state::normalize_auth;
use crate::ledger::{AppCall, Operation};

/// What a restoring operation has to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreExpectation {
    /// The controller app whose verify call counts.
    pub controller: AppId,
    /// Account whose authority must come back.
    pub controlled: Address,
    /// Authority value meaning "no active delegation".
    pub at_rest: Address,
}

impl RestoreExpectation {
    /// Whether `op` restores authority on its own.
    pub fn is_restoring(&self, op: &Operation) -> bool {
        if op.sender == self.controlled {
            if let Some(target) = op.rekey_to {
                if normalize_auth(&self.controlled, target) == self.at_rest {
                    return true;
                }
            }
        }
        op.is_call_to(
            self.controller,
            &AppCall::Controller(ControllerCall::VerifyAuthorityReturned),
        )
    }
}

/// Index of the first restoring operation after `from_index`, if any.
pub fn find_restoring_operation(
    batch: &[Operation],
    from_index: usize,
    expect: &RestoreExpectation,
) -> Option<usize> {
    batch
        .iter()
        .enumerate()
        .skip(from_index.saturating_add(1))
        .find(|(_, op)| expect.is_restoring(op))
        .map(|(i, _)| i)
}

/// Like [`find_restoring_operation`], failing with `AuthorityNotRestored`.
pub fn require_authority_restored(
    batch: &[Operation],
    from_index: usize,
    expect: &RestoreExpectation,
) -> Result<usize> {
    find_restoring_operation(batch, from_index, expect).ok_or(AuthorityError::AuthorityNotRestored)
}
