//! The authority controller program.

use log::info;

use crate::batch::require_authority_restored;
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId};
use crate::ledger::{AppContext, Operation, Program};

use super::registry::{self, CallerScope};
use super::types::{ControllerCall, ControllerInit, ControllerLink, ADMIN_KEY, CONTROLLED_KEY};

/// Holds an account's authority and lends it to registered plugins one
/// batch at a time.
pub struct AuthorityController;

impl Program for AuthorityController {
    type Init = ControllerInit;
    type Call = ControllerCall;

    fn create(ctx: &mut AppContext<'_>, init: &ControllerInit) -> Result<()> {
        let sender = ctx.sender();
        let explicit = init.controlled.filter(|a| !a.is_zero());

        if init.admin.is_zero() {
            return Err(AuthorityError::InvalidArgument(
                "admin must not be the zero address".into(),
            ));
        }
        if explicit == Some(init.admin) {
            return Err(AuthorityError::InvalidArgument(
                "admin and controlled account must differ".into(),
            ));
        }
        if sender != init.admin && Some(sender) != explicit {
            return Err(AuthorityError::Unauthorized(format!(
                "{sender} is neither the admin nor the controlled account"
            )));
        }

        let controlled = explicit.unwrap_or_else(|| ctx.app_address());
        ctx.store(ADMIN_KEY, &init.admin)?;
        ctx.store(CONTROLLED_KEY, &controlled)?;
        info!(
            "controller {} created: admin={} controlled={controlled}",
            ctx.app_id(),
            init.admin
        );
        Ok(())
    }

    fn call(ctx: &mut AppContext<'_>, call: &ControllerCall) -> Result<()> {
        let link = ControllerLink::load(ctx, ctx.app_id())?;
        match call {
            ControllerCall::ChangeAdmin { new_admin } => change_admin(ctx, &link, *new_admin),
            ControllerCall::VerifyAuthorityReturned => verify_authority_returned(ctx, &link),
            ControllerCall::DelegateTo { delegate } => delegate_to(ctx, &link, *delegate),
            ControllerCall::RekeyTo { target, transient } => {
                rekey_to(ctx, &link, *target, *transient)
            }
            ControllerCall::Grant {
                delegate,
                scope,
                expiry,
            } => grant(ctx, &link, *delegate, *scope, *expiry),
            ControllerCall::Revoke { delegate, scope } => revoke(ctx, &link, *delegate, *scope),
        }
    }
}

fn require_admin(ctx: &AppContext<'_>, link: &ControllerLink) -> Result<()> {
    if ctx.sender() != link.admin {
        return Err(AuthorityError::Unauthorized(format!(
            "{} is not the admin of {}",
            ctx.sender(),
            link.controller
        )));
    }
    Ok(())
}

fn change_admin(ctx: &mut AppContext<'_>, link: &ControllerLink, new_admin: Address) -> Result<()> {
    // Sending as the controlled account already proves the sender holds
    // its authority; the ledger checked that before dispatching here.
    let sender = ctx.sender();
    if sender != link.admin && sender != link.controlled {
        return Err(AuthorityError::Unauthorized(format!(
            "{sender} may not change the admin of {}",
            link.controller
        )));
    }
    if new_admin.is_zero() {
        return Err(AuthorityError::InvalidArgument(
            "admin must not be the zero address".into(),
        ));
    }
    ctx.store(ADMIN_KEY, &new_admin)?;
    info!(
        "controller {} admin changed {} -> {new_admin}",
        link.controller, link.admin
    );
    Ok(())
}

fn verify_authority_returned(ctx: &AppContext<'_>, link: &ControllerLink) -> Result<()> {
    let auth = ctx.auth_addr(&link.controlled);
    if auth != link.at_rest() {
        return Err(AuthorityError::AuthorityNotRestored);
    }
    Ok(())
}

fn delegate_to(ctx: &mut AppContext<'_>, link: &ControllerLink, delegate: AppId) -> Result<()> {
    let sender = ctx.sender();
    let entry = registry::lookup(ctx.storage()?, delegate, &sender, ctx.now())?.ok_or_else(|| {
        AuthorityError::PermissionDenied(format!(
            "{sender} holds no active permission for {delegate}"
        ))
    })?;

    ctx.submit_inner(Operation::rekey(link.controlled, delegate.address()))?;
    require_authority_restored(ctx.batch(), ctx.group_index(), &link.restore_expectation())?;

    info!(
        "controller {} delegated to {delegate} for {sender} (scope {}, expiry {})",
        link.controller, entry.scope, entry.expiry
    );
    Ok(())
}

fn rekey_to(
    ctx: &mut AppContext<'_>,
    link: &ControllerLink,
    target: Address,
    transient: bool,
) -> Result<()> {
    require_admin(ctx, link)?;
    ctx.submit_inner(Operation::rekey(link.controlled, target))?;
    if transient {
        require_authority_restored(ctx.batch(), ctx.group_index(), &link.restore_expectation())?;
    }
    info!(
        "controller {} rekeyed {} to {target} (transient={transient})",
        link.controller, link.controlled
    );
    Ok(())
}

fn grant(
    ctx: &mut AppContext<'_>,
    link: &ControllerLink,
    delegate: AppId,
    scope: CallerScope,
    expiry: u64,
) -> Result<()> {
    require_admin(ctx, link)?;
    let previous = registry::grant(ctx.storage_mut()?, delegate, scope, expiry)?;
    info!(
        "controller {} granted {delegate} to {scope} until {expiry} (previous {previous:?})",
        link.controller
    );
    Ok(())
}

fn revoke(
    ctx: &mut AppContext<'_>,
    link: &ControllerLink,
    delegate: AppId,
    scope: CallerScope,
) -> Result<()> {
    require_admin(ctx, link)?;
    registry::revoke(ctx.storage_mut()?, delegate, scope)?;
    info!(
        "controller {} revoked {delegate} for {scope}",
        link.controller
    );
    Ok(())
}
