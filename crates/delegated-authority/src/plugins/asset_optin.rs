//! Opt the controlled account in to assets without the admin key.

use log::info;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerLink;
use crate::error::{AuthorityError, Result};
use crate::identity::{AppId, AssetId};
use crate::ledger::{AppContext, Operation, Program};

use super::{restore_authority, CONFIG_KEY};

/// Constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOptInInit {
    pub controller: AppId,
}

/// Calls accepted by the opt-in plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOptInCall {
    OptIn { assets: Vec<AssetId> },
}

/// The asset opt-in plugin program.
pub struct AssetOptInPlugin;

impl Program for AssetOptInPlugin {
    type Init = AssetOptInInit;
    type Call = AssetOptInCall;

    fn create(ctx: &mut AppContext<'_>, init: &AssetOptInInit) -> Result<()> {
        ControllerLink::load(ctx, init.controller)?;
        ctx.store(CONFIG_KEY, &init.controller)
    }

    fn call(ctx: &mut AppContext<'_>, call: &AssetOptInCall) -> Result<()> {
        let AssetOptInCall::OptIn { assets } = call;
        if assets.is_empty() {
            return Err(AuthorityError::InvalidArgument("no assets listed".into()));
        }
        let controller: AppId = ctx
            .load(CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::InvalidState("opt-in not configured".into()))?;
        let link = ControllerLink::load(ctx, controller)?;

        let account = ctx.account(&link.controlled);
        let mut added = 0usize;
        for asset in assets {
            if !account.holds(*asset) {
                ctx.submit_inner(Operation::opt_in(link.controlled, *asset))?;
                added += 1;
            }
        }
        restore_authority(ctx, &link)?;
        info!(
            "{} opted in to {added} of {} listed assets",
            link.controlled,
            assets.len()
        );
        Ok(())
    }
}
