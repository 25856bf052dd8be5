//! DelegatedAuthority — lend an account's signing authority to vetted
//! programs for exactly one atomic batch.
//!
//! Provides an in-process ledger with rekeyable accounts, an authority
//! controller with an expiring permission registry, a batch invariant
//! checker that guarantees authority comes back, and plugins for social
//! recovery, spending limits, scheduled payments, and asset opt-in.

pub mod batch;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod plugins;
pub mod storage;
pub mod time;

// Re-export primary types
pub use batch::{BatchBuilder, BatchId, BatchReceipt, GroupId};
pub use controller::{
    AuthorityController, CallerScope, ControllerCall, ControllerInit, ControllerView,
    PermissionEntry, NEVER_EXPIRES,
};
pub use crypto::KeyPair;
pub use error::{AuthorityError, Result};
pub use identity::{Address, AppId, AssetId, NATIVE_ASSET};
pub use ledger::{
    AppCall, Ledger, LedgerConfig, LedgerState, Operation, ProgramInit, ProgramKind,
    SignedOperation,
};

// Re-export plugin types
pub use plugins::asset_optin::{AssetOptInCall, AssetOptInInit, AssetOptInPlugin};
pub use plugins::recovery::{
    RecoveryCall, RecoveryInit, RecoveryPhase, RecoveryPlugin, RecoveryState,
};
pub use plugins::scheduled_payment::{
    Schedule, ScheduledPaymentCall, ScheduledPaymentInit, ScheduledPaymentPlugin,
};
pub use plugins::spending_limit::{
    Quota, SpendingLimitCall, SpendingLimitConfig, SpendingLimitInit, SpendingLimitPlugin,
};
