//! Operation execution.
//!
//! Runs one operation against a scratch `LedgerState`. The caller owns
//! atomicity: a failed batch simply drops the scratch copy.

use log::{debug, info};

use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId, AssetId, NATIVE_ASSET};

use super::context::AppContext;
use super::operation::{OpBody, Operation};
use super::program;
use super::state::{AppRecord, LedgerState, Storage};
use super::LedgerConfig;

/// Batch-wide facts shared by every operation in the batch.
pub(crate) struct BatchEnv<'b> {
    pub batch: &'b [Operation],
    pub group_index: usize,
    pub config: &'b LedgerConfig,
}

/// Counters accumulated while a batch runs.
#[derive(Debug, Default)]
pub(crate) struct ExecStats {
    pub inner_operations: usize,
    pub created_apps: Vec<AppId>,
}

/// Execute `op` as authorized by `authorizer`.
///
/// `depth` is 0 for top-level operations and grows by one per inner call.
pub(crate) fn execute(
    state: &mut LedgerState,
    env: &BatchEnv<'_>,
    stats: &mut ExecStats,
    op: &Operation,
    authorizer: Address,
    depth: usize,
) -> Result<()> {
    if depth > env.config.max_inner_depth {
        return Err(AuthorityError::DepthExceeded(depth));
    }

    let signer = state.effective_signer(&op.sender);
    if signer != authorizer {
        return Err(AuthorityError::Unauthorized(format!(
            "operation from {} must be authorized by {signer}, not {authorizer}",
            op.sender
        )));
    }

    debug!(
        "exec[{}:{depth}] sender={} body={:?}",
        env.group_index, op.sender, op.body
    );

    match &op.body {
        OpBody::Transfer {
            receiver,
            asset,
            amount,
        } => transfer(state, &op.sender, receiver, *asset, *amount)?,
        OpBody::OptIn { asset } => {
            if *asset != NATIVE_ASSET {
                state
                    .account_mut(&op.sender)
                    .balances
                    .entry(*asset)
                    .or_insert(0);
            }
        }
        OpBody::AppCall { app, call } => {
            let kind = state.app(*app)?.kind;
            let mut ctx = AppContext::new(state, env, stats, *app, op.sender, depth);
            program::call(&mut ctx, kind, call)?;
        }
        OpBody::Deploy { program: init } => {
            let id = AppId(state.next_app_id);
            state.next_app_id += 1;
            state.apps.insert(
                id,
                AppRecord {
                    id,
                    creator: op.sender,
                    kind: init.kind(),
                    storage: Storage::new(),
                },
            );
            stats.created_apps.push(id);
            info!("deploying {} as {id} ({})", init.kind(), id.address());
            let mut ctx = AppContext::new(state, env, stats, id, op.sender, depth);
            program::create(&mut ctx, init)?;
        }
    }

    if let Some(target) = op.rekey_to {
        state.set_auth(&op.sender, target);
        info!(
            "authority of {} now {}",
            op.sender,
            state.effective_signer(&op.sender)
        );
    }

    Ok(())
}

fn transfer(
    state: &mut LedgerState,
    sender: &Address,
    receiver: &Address,
    asset: AssetId,
    amount: u64,
) -> Result<()> {
    if !state.account(receiver).holds(asset) {
        return Err(AuthorityError::NotOptedIn {
            account: receiver.to_string(),
            asset,
        });
    }
    if amount == 0 {
        return Ok(());
    }

    let balance = state.balance(sender, asset);
    if balance < amount {
        return Err(AuthorityError::InsufficientFunds {
            balance,
            required: amount,
        });
    }
    state
        .account_mut(sender)
        .balances
        .insert(asset, balance - amount);

    let credited = state
        .balance(receiver, asset)
        .checked_add(amount)
        .ok_or_else(|| AuthorityError::InvalidArgument("receiver balance overflow".into()))?;
    state.account_mut(receiver).balances.insert(asset, credited);
    Ok(())
}
