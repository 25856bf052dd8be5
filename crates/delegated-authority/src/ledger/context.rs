//! Execution context handed to a running program.
//!
//! The context is the program's only window onto the ledger: its own
//! storage, read-only views of other apps, the batch it runs in, and the
//! ability to issue inner operations authorized by its own address.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::identity::{Address, AppId};

use super::executor::{self, BatchEnv, ExecStats};
use super::operation::Operation;
use super::program::ProgramKind;
use super::state::{decode_value, encode_value, AccountState, LedgerState, Storage};

/// Context for one program invocation.
pub struct AppContext<'a> {
    state: &'a mut LedgerState,
    env: &'a BatchEnv<'a>,
    stats: &'a mut ExecStats,
    app: AppId,
    sender: Address,
    depth: usize,
}

impl<'a> AppContext<'a> {
    pub(crate) fn new(
        state: &'a mut LedgerState,
        env: &'a BatchEnv<'a>,
        stats: &'a mut ExecStats,
        app: AppId,
        sender: Address,
        depth: usize,
    ) -> Self {
        Self {
            state,
            env,
            stats,
            app,
            sender,
            depth,
        }
    }

    /// Id of the running app.
    pub fn app_id(&self) -> AppId {
        self.app
    }

    /// Account address of the running app.
    pub fn app_address(&self) -> Address {
        self.app.address()
    }

    /// Sender of the operation that invoked the app.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Current logical clock value.
    pub fn now(&self) -> u64 {
        self.state.clock
    }

    /// The top-level operations of the enclosing batch.
    pub fn batch(&self) -> &[Operation] {
        self.env.batch
    }

    /// Position of the top-level operation currently executing.
    pub fn group_index(&self) -> usize {
        self.env.group_index
    }

    // ── Own storage ───────────────────────────────────────────────────────────

    /// The running app's storage.
    pub fn storage(&self) -> Result<&Storage> {
        Ok(&self.state.app(self.app)?.storage)
    }

    /// The running app's storage, mutable.
    pub fn storage_mut(&mut self) -> Result<&mut Storage> {
        Ok(&mut self.state.app_mut(self.app)?.storage)
    }

    /// Remove `key`, returning the removed value.
    pub fn delete(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let app = self.state.app_mut(self.app)?;
        Ok(app.storage.remove(key))
    }

    /// Decode a bincode value from own storage.
    pub fn load<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        decode_value(&self.state.app(self.app)?.storage, key)
    }

    /// Encode a bincode value into own storage.
    pub fn store<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<()> {
        let app = self.state.app_mut(self.app)?;
        encode_value(&mut app.storage, key, value)
    }

    // ── Read-only views ───────────────────────────────────────────────────────

    /// Program kind of another app.
    pub fn app_kind(&self, app: AppId) -> Result<ProgramKind> {
        Ok(self.state.app(app)?.kind)
    }

    /// Decode a bincode value from another app's storage.
    pub fn load_foreign<T: DeserializeOwned>(&self, app: AppId, key: &[u8]) -> Result<Option<T>> {
        decode_value(&self.state.app(app)?.storage, key)
    }

    /// Raw authority slot of `account` (`ZERO` when unset).
    pub fn auth_addr(&self, account: &Address) -> Address {
        self.state.auth_addr(account)
    }

    /// Snapshot of `account`.
    pub fn account(&self, account: &Address) -> AccountState {
        self.state.account(account)
    }

    // ── Inner operations ──────────────────────────────────────────────────────

    /// Execute `op` authorized by this app's address.
    ///
    /// Succeeds only when the running app is the effective signer of
    /// `op.sender`: its own account, or an account currently rekeyed to it.
    pub fn submit_inner(&mut self, op: Operation) -> Result<()> {
        self.stats.inner_operations += 1;
        let authorizer = self.app.address();
        executor::execute(
            self.state,
            self.env,
            self.stats,
            &op,
            authorizer,
            self.depth + 1,
        )
    }
}
