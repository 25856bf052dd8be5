//! Programs — the code that runs under an app id.
//!
//! Each program kind implements [`Program`] with its own constructor and
//! call types. The ledger stores only the [`ProgramKind`] per app and
//! dispatches statically through [`create`] and [`call`].

use serde::{Deserialize, Serialize};

use crate::controller::{AuthorityController, ControllerCall, ControllerInit};
use crate::error::{AuthorityError, Result};
use crate::plugins::asset_optin::{AssetOptInCall, AssetOptInInit, AssetOptInPlugin};
use crate::plugins::recovery::{RecoveryCall, RecoveryInit, RecoveryPlugin};
use crate::plugins::scheduled_payment::{
    ScheduledPaymentCall, ScheduledPaymentInit, ScheduledPaymentPlugin,
};
use crate::plugins::spending_limit::{SpendingLimitCall, SpendingLimitInit, SpendingLimitPlugin};

use super::context::AppContext;

/// A program that can be deployed and called on the ledger.
pub trait Program {
    /// Constructor arguments.
    type Init;
    /// Call arguments.
    type Call;

    /// Runs once when the app is deployed. `ctx.sender()` is the deployer.
    fn create(ctx: &mut AppContext<'_>, init: &Self::Init) -> Result<()>;

    /// Runs for every call to the app.
    fn call(ctx: &mut AppContext<'_>, call: &Self::Call) -> Result<()>;
}

/// Which program an app runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    Controller,
    Recovery,
    SpendingLimit,
    ScheduledPayment,
    AssetOptIn,
}

impl std::fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProgramKind::Controller => "controller",
            ProgramKind::Recovery => "recovery",
            ProgramKind::SpendingLimit => "spending_limit",
            ProgramKind::ScheduledPayment => "scheduled_payment",
            ProgramKind::AssetOptIn => "asset_opt_in",
        };
        f.write_str(name)
    }
}

/// Constructor arguments for any program kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramInit {
    Controller(ControllerInit),
    Recovery(RecoveryInit),
    SpendingLimit(SpendingLimitInit),
    ScheduledPayment(ScheduledPaymentInit),
    AssetOptIn(AssetOptInInit),
}

impl ProgramInit {
    /// The kind of app this constructor deploys.
    pub fn kind(&self) -> ProgramKind {
        match self {
            ProgramInit::Controller(_) => ProgramKind::Controller,
            ProgramInit::Recovery(_) => ProgramKind::Recovery,
            ProgramInit::SpendingLimit(_) => ProgramKind::SpendingLimit,
            ProgramInit::ScheduledPayment(_) => ProgramKind::ScheduledPayment,
            ProgramInit::AssetOptIn(_) => ProgramKind::AssetOptIn,
        }
    }
}

/// Call arguments for any program kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppCall {
    Controller(ControllerCall),
    Recovery(RecoveryCall),
    SpendingLimit(SpendingLimitCall),
    ScheduledPayment(ScheduledPaymentCall),
    AssetOptIn(AssetOptInCall),
}

impl AppCall {
    /// The kind of app this call targets.
    pub fn kind(&self) -> ProgramKind {
        match self {
            AppCall::Controller(_) => ProgramKind::Controller,
            AppCall::Recovery(_) => ProgramKind::Recovery,
            AppCall::SpendingLimit(_) => ProgramKind::SpendingLimit,
            AppCall::ScheduledPayment(_) => ProgramKind::ScheduledPayment,
            AppCall::AssetOptIn(_) => ProgramKind::AssetOptIn,
        }
    }
}

macro_rules! impl_into_app_call {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AppCall {
                fn from(call: $ty) -> Self {
                    AppCall::$variant(call)
                }
            }
        )*
    };
}

impl_into_app_call! {
    Controller => ControllerCall,
    Recovery => RecoveryCall,
    SpendingLimit => SpendingLimitCall,
    ScheduledPayment => ScheduledPaymentCall,
    AssetOptIn => AssetOptInCall,
}

/// Run the constructor matching `init`.
pub(crate) fn create(ctx: &mut AppContext<'_>, init: &ProgramInit) -> Result<()> {
    match init {
        ProgramInit::Controller(i) => AuthorityController::create(ctx, i),
        ProgramInit::Recovery(i) => RecoveryPlugin::create(ctx, i),
        ProgramInit::SpendingLimit(i) => SpendingLimitPlugin::create(ctx, i),
        ProgramInit::ScheduledPayment(i) => ScheduledPaymentPlugin::create(ctx, i),
        ProgramInit::AssetOptIn(i) => AssetOptInPlugin::create(ctx, i),
    }
}

/// Run `call` against an app of `kind`.
pub(crate) fn call(ctx: &mut AppContext<'_>, kind: ProgramKind, call: &AppCall) -> Result<()> {
    match (kind, call) {
        (ProgramKind::Controller, AppCall::Controller(c)) => AuthorityController::call(ctx, c),
        (ProgramKind::Recovery, AppCall::Recovery(c)) => RecoveryPlugin::call(ctx, c),
        (ProgramKind::SpendingLimit, AppCall::SpendingLimit(c)) => {
            SpendingLimitPlugin::call(ctx, c)
        }
        (ProgramKind::ScheduledPayment, AppCall::ScheduledPayment(c)) => {
            ScheduledPaymentPlugin::call(ctx, c)
        }
        (ProgramKind::AssetOptIn, AppCall::AssetOptIn(c)) => AssetOptInPlugin::call(ctx, c),
        (kind, call) => Err(AuthorityError::InvalidArgument(format!(
            "{} call sent to {} app {}",
            call.kind(),
            kind,
            ctx.app_id()
        ))),
    }
}
