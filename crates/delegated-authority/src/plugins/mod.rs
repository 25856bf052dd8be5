//! Plugins — programs that act on a controlled account while holding
//! delegated authority.
//!
//! A plugin never checks the permission registry itself. It simply issues
//! inner operations as the controlled account; the ledger only accepts
//! them while the controller has rekeyed that account to the plugin, which
//! it does only for callers the registry admits. Every plugin hands
//! authority back before returning.
//!
//! - [`recovery`]: timed social recovery of the admin role
//! - [`spending_limit`]: per-spender, per-asset windowed quotas
//! - [`scheduled_payment`]: fixed payment at a fixed interval
//! - [`asset_optin`]: opt the account in to assets

pub mod asset_optin;
pub mod recovery;
pub mod scheduled_payment;
pub mod spending_limit;

use crate::controller::ControllerLink;
use crate::error::Result;
use crate::ledger::{AppContext, Operation};

/// Storage key of each plugin's configuration record.
pub const CONFIG_KEY: &[u8] = b"config";

/// Hand the controlled account's authority back to its at-rest signer.
pub(crate) fn restore_authority(ctx: &mut AppContext<'_>, link: &ControllerLink) -> Result<()> {
    ctx.submit_inner(Operation::rekey(link.controlled, link.at_rest()))
}
