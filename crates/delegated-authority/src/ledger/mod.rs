//! In-process ledger — the host the controller and plugins run on.
//!
//! The ledger provides:
//! - Accounts with balances and a single authority slot
//! - Apps (deployed programs) with keyed byte storage
//! - Signed top-level operations and program-issued inner operations
//! - A logical clock advanced only between batches
//! - All-or-nothing batch commit

pub mod context;
pub(crate) mod executor;
pub mod operation;
pub mod program;
pub mod state;

pub use context::AppContext;
pub use operation::{OpBody, Operation, SignedOperation};
pub use program::{AppCall, Program, ProgramInit, ProgramKind};
pub use state::{AccountState, AppRecord, LedgerState, Storage};

use log::{info, warn};
use serde::de::DeserializeOwned;

use crate::batch::{group, BatchReceipt};
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId, AssetId};

use executor::{BatchEnv, ExecStats};

/// Execution limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum nesting of inner operations below a top-level operation.
    pub max_inner_depth: usize,
    /// Maximum number of top-level operations per batch.
    pub max_batch_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_inner_depth: 8,
            max_batch_size: 16,
        }
    }
}

/// A ledger: committed state plus execution limits.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: LedgerState,
    config: LedgerConfig,
}

impl Ledger {
    /// Empty ledger with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously committed state.
    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state,
            config: LedgerConfig::default(),
        }
    }

    /// Override execution limits.
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Committed state.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Consume the ledger, returning its state.
    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ── Clock ─────────────────────────────────────────────────────────────────

    /// Current logical clock value.
    pub fn clock(&self) -> u64 {
        self.state.clock
    }

    /// Move the clock forward by `delta`.
    pub fn advance_clock(&mut self, delta: u64) -> u64 {
        self.state.clock = self.state.clock.saturating_add(delta);
        self.state.clock
    }

    /// Set the clock. The clock never runs backwards.
    pub fn set_clock(&mut self, value: u64) -> Result<()> {
        if value < self.state.clock {
            return Err(AuthorityError::InvalidArgument(format!(
                "clock cannot move backwards from {} to {value}",
                self.state.clock
            )));
        }
        self.state.clock = value;
        Ok(())
    }

    // ── Genesis ───────────────────────────────────────────────────────────────

    /// Credit funds outside any batch.
    pub fn mint(&mut self, account: &Address, asset: AssetId, amount: u64) -> Result<()> {
        self.state.mint(account, asset, amount)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn balance(&self, account: &Address, asset: AssetId) -> u64 {
        self.state.balance(account, asset)
    }

    /// Raw authority slot (`ZERO` when unset).
    pub fn auth_addr(&self, account: &Address) -> Address {
        self.state.auth_addr(account)
    }

    /// Who must authorize operations sent by `account`.
    pub fn effective_signer(&self, account: &Address) -> Address {
        self.state.effective_signer(account)
    }

    /// Nonce the next top-level operation sent by `account` must carry.
    pub fn next_nonce(&self, account: &Address) -> u64 {
        self.state.nonce(account)
    }

    /// Look up a deployed app.
    pub fn app(&self, id: AppId) -> Result<&AppRecord> {
        self.state.app(id)
    }

    /// Decode a value from an app's storage.
    pub fn app_value<T: DeserializeOwned>(&self, id: AppId, key: &[u8]) -> Result<Option<T>> {
        self.state.app(id)?.value(key)
    }

    // ── Batches ───────────────────────────────────────────────────────────────

    /// Execute `batch` atomically.
    ///
    /// Every operation runs in order against a scratch copy of the state.
    /// Before it runs, its signature, group id and sender nonce are
    /// checked. The first failure discards the copy and is returned wrapped
    /// in `BatchFailed` with its position; otherwise the copy is committed.
    pub fn submit(&mut self, batch: &[SignedOperation]) -> Result<BatchReceipt> {
        if batch.is_empty() {
            return Err(AuthorityError::InvalidArgument("empty batch".into()));
        }
        if batch.len() > self.config.max_batch_size {
            return Err(AuthorityError::InvalidArgument(format!(
                "batch of {} exceeds maximum of {}",
                batch.len(),
                self.config.max_batch_size
            )));
        }

        let ops: Vec<Operation> = batch.iter().map(|s| s.operation.clone()).collect();
        let expected_group = group::expected_group(&ops)?;
        let mut scratch = self.state.clone();
        let mut stats = ExecStats::default();

        for (index, signed) in batch.iter().enumerate() {
            let env = BatchEnv {
                batch: &ops,
                group_index: index,
                config: &self.config,
            };
            let op = &signed.operation;
            let result = signed
                .verify_signature()
                .and_then(|_| group::check_member(op, expected_group.as_ref(), ops.len()))
                .and_then(|_| scratch.consume_nonce(&op.sender, op.nonce))
                .and_then(|_| {
                    executor::execute(&mut scratch, &env, &mut stats, op, signed.signer, 0)
                });
            if let Err(e) = result {
                warn!("batch rejected at operation {index}: {e}");
                return Err(AuthorityError::BatchFailed {
                    index,
                    source: Box::new(e),
                });
            }
        }

        scratch.committed_batches += 1;
        let receipt = BatchReceipt::new(
            &ops,
            scratch.clock,
            stats.inner_operations,
            stats.created_apps,
        )?;
        self.state = scratch;
        info!(
            "committed {} ({} operations, {} inner) at clock {}",
            receipt.id, receipt.operations, receipt.inner_operations, receipt.clock
        );
        Ok(receipt)
    }
}
