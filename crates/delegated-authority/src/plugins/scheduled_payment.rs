//! Fixed recurring payment from the controlled account.
//!
//! Anyone the registry admits may trigger the payment; the plugin itself
//! enforces amount, receiver, and interval.

use log::info;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerLink;
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId, AssetId};
use crate::ledger::{AppContext, Ledger, Operation, Program};

use super::{restore_authority, CONFIG_KEY};

/// Constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPaymentInit {
    pub controller: AppId,
    pub receiver: Address,
    pub asset: AssetId,
    pub amount: u64,
    /// Minimum clock units between payments. Must be non-zero.
    pub interval: u64,
}

/// Calls accepted by the scheduled-payment plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledPaymentCall {
    MakePayment,
}

/// Persisted schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub controller: AppId,
    pub receiver: Address,
    pub asset: AssetId,
    pub amount: u64,
    pub interval: u64,
    pub last_paid_at: Option<u64>,
}

impl Schedule {
    /// Earliest clock value at which the next payment may run.
    pub fn next_due(&self) -> u64 {
        self.last_paid_at
            .map(|t| t.saturating_add(self.interval))
            .unwrap_or(0)
    }

    /// Read the schedule of app `app` on a committed ledger.
    pub fn load(ledger: &Ledger, app: AppId) -> Result<Self> {
        ledger
            .app_value(app, CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::NotFound(format!("schedule for {app}")))
    }
}

/// The scheduled-payment plugin program.
pub struct ScheduledPaymentPlugin;

impl Program for ScheduledPaymentPlugin {
    type Init = ScheduledPaymentInit;
    type Call = ScheduledPaymentCall;

    fn create(ctx: &mut AppContext<'_>, init: &ScheduledPaymentInit) -> Result<()> {
        ControllerLink::load(ctx, init.controller)?;
        if init.interval == 0 {
            return Err(AuthorityError::InvalidArgument(
                "payment interval must be non-zero".into(),
            ));
        }
        ctx.store(
            CONFIG_KEY,
            &Schedule {
                controller: init.controller,
                receiver: init.receiver,
                asset: init.asset,
                amount: init.amount,
                interval: init.interval,
                last_paid_at: None,
            },
        )
    }

    fn call(ctx: &mut AppContext<'_>, call: &ScheduledPaymentCall) -> Result<()> {
        let ScheduledPaymentCall::MakePayment = call;
        let mut schedule: Schedule = ctx
            .load(CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::InvalidState("schedule not configured".into()))?;
        let link = ControllerLink::load(ctx, schedule.controller)?;

        let now = ctx.now();
        let due = schedule.next_due();
        if now < due {
            return Err(AuthorityError::InvalidState(format!(
                "next payment due at {due}, now {now}"
            )));
        }

        ctx.submit_inner(Operation::transfer(
            link.controlled,
            schedule.receiver,
            schedule.asset,
            schedule.amount,
        ))?;
        restore_authority(ctx, &link)?;

        schedule.last_paid_at = Some(now);
        ctx.store(CONFIG_KEY, &schedule)?;
        info!(
            "scheduled payment of {} (asset {}) to {} at {now}",
            schedule.amount, schedule.asset, schedule.receiver
        );
        Ok(())
    }
}
