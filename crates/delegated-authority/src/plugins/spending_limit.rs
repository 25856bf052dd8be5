//! Per-spender, per-asset spending quotas over fixed time windows.
//!
//! Quotas live under `b"q" || spender 32 bytes || asset u64 BE`. A window
//! starts at `now - now % window_size`; spending in a later window starts
//! again from zero.

use log::info;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerLink;
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId, AssetId};
use crate::ledger::{AppContext, Ledger, Operation, Program};
use crate::time::window_start;

use super::{restore_authority, CONFIG_KEY};

/// Storage tag for quota entries.
pub const QUOTA_PREFIX: &[u8] = b"q";

/// Length of a quota key: tag + spender + asset.
pub const QUOTA_KEY_LEN: usize = 1 + 32 + 8;

/// Storage key for `(spender, asset)`.
pub fn quota_key(spender: &Address, asset: AssetId) -> Vec<u8> {
    let mut key = Vec::with_capacity(QUOTA_KEY_LEN);
    key.extend_from_slice(QUOTA_PREFIX);
    key.extend_from_slice(spender.as_bytes());
    key.extend_from_slice(&asset.to_be_bytes());
    key
}

/// Constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimitInit {
    pub controller: AppId,
    /// Window length in clock units. Must be non-zero.
    pub window_size: u64,
}

/// Persisted plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimitConfig {
    pub controller: AppId,
    pub window_size: u64,
}

impl SpendingLimitConfig {
    /// Read the configuration of app `app` on a committed ledger.
    pub fn load(ledger: &Ledger, app: AppId) -> Result<Self> {
        ledger
            .app_value(app, CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::NotFound(format!("spending limit config for {app}")))
    }
}

/// Calls accepted by the spending-limit plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingLimitCall {
    /// Admin only. Creates a quota or changes its limit.
    SetLimit {
        spender: Address,
        asset: AssetId,
        limit: u64,
    },
    /// Admin only.
    RemoveLimit { spender: Address, asset: AssetId },
    /// Pay from the controlled account within the sender's quota.
    Spend {
        asset: AssetId,
        amount: u64,
        receiver: Address,
    },
}

/// One spender's allowance for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub limit: u64,
    pub window_start: u64,
    pub spent: u64,
}

impl Quota {
    /// Quota after spending `amount` at `now`, or `QuotaExceeded`.
    pub fn charge(&self, now: u64, window_size: u64, amount: u64) -> Result<Quota> {
        let bucket = window_start(now, window_size);
        let already = if self.window_start == bucket {
            self.spent
        } else {
            0
        };
        let spent = already.checked_add(amount).ok_or(AuthorityError::QuotaExceeded {
            spent: u64::MAX,
            limit: self.limit,
        })?;
        if spent > self.limit {
            return Err(AuthorityError::QuotaExceeded {
                spent,
                limit: self.limit,
            });
        }
        Ok(Quota {
            limit: self.limit,
            window_start: bucket,
            spent,
        })
    }

    /// Remaining allowance in the window containing `now`.
    pub fn remaining(&self, now: u64, window_size: u64) -> u64 {
        if self.window_start == window_start(now, window_size) {
            self.limit.saturating_sub(self.spent)
        } else {
            self.limit
        }
    }

    /// Read a quota from a committed ledger.
    pub fn load(
        ledger: &Ledger,
        app: AppId,
        spender: &Address,
        asset: AssetId,
    ) -> Result<Option<Quota>> {
        ledger.app_value(app, &quota_key(spender, asset))
    }
}

/// The spending-limit plugin program.
pub struct SpendingLimitPlugin;

impl Program for SpendingLimitPlugin {
    type Init = SpendingLimitInit;
    type Call = SpendingLimitCall;

    fn create(ctx: &mut AppContext<'_>, init: &SpendingLimitInit) -> Result<()> {
        ControllerLink::load(ctx, init.controller)?;
        if init.window_size == 0 {
            return Err(AuthorityError::InvalidArgument(
                "window size must be non-zero".into(),
            ));
        }
        ctx.store(
            CONFIG_KEY,
            &SpendingLimitConfig {
                controller: init.controller,
                window_size: init.window_size,
            },
        )
    }

    fn call(ctx: &mut AppContext<'_>, call: &SpendingLimitCall) -> Result<()> {
        let config: SpendingLimitConfig = ctx
            .load(CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::InvalidState("spending limit not configured".into()))?;
        let link = ControllerLink::load(ctx, config.controller)?;

        match call {
            SpendingLimitCall::SetLimit {
                spender,
                asset,
                limit,
            } => {
                require_controller_admin(ctx, &link)?;
                let key = quota_key(spender, *asset);
                let quota = match ctx.load::<Quota>(&key)? {
                    Some(existing) => Quota {
                        limit: *limit,
                        ..existing
                    },
                    None => Quota {
                        limit: *limit,
                        window_start: window_start(ctx.now(), config.window_size),
                        spent: 0,
                    },
                };
                ctx.store(&key, &quota)?;
                info!("limit for {spender} on asset {asset} set to {limit}");
                Ok(())
            }
            SpendingLimitCall::RemoveLimit { spender, asset } => {
                require_controller_admin(ctx, &link)?;
                ctx.delete(&quota_key(spender, *asset))?.ok_or_else(|| {
                    AuthorityError::NotFound(format!("no limit for {spender} on asset {asset}"))
                })?;
                info!("limit for {spender} on asset {asset} removed");
                Ok(())
            }
            SpendingLimitCall::Spend {
                asset,
                amount,
                receiver,
            } => {
                let sender = ctx.sender();
                let key = quota_key(&sender, *asset);
                let quota: Quota = ctx.load(&key)?.ok_or_else(|| {
                    AuthorityError::NotFound(format!("no limit for {sender} on asset {asset}"))
                })?;
                let charged = quota.charge(ctx.now(), config.window_size, *amount)?;
                ctx.store(&key, &charged)?;

                ctx.submit_inner(Operation::transfer(
                    link.controlled,
                    *receiver,
                    *asset,
                    *amount,
                ))?;
                restore_authority(ctx, &link)?;
                info!(
                    "{sender} spent {amount} of asset {asset} ({} of {} this window)",
                    charged.spent, charged.limit
                );
                Ok(())
            }
        }
    }
}

fn require_controller_admin(ctx: &AppContext<'_>, link: &ControllerLink) -> Result<()> {
    if ctx.sender() != link.admin {
        return Err(AuthorityError::Unauthorized(format!(
            "{} is not the admin of {}",
            ctx.sender(),
            link.controller
        )));
    }
    Ok(())
}
