//! Timed social recovery.
//!
//! A designated recovery agent can take over the controller's admin role,
//! but only after announcing the attempt and waiting out a grace window
//! during which the controlled account can cancel it.
//!
//! ```text
//! Idle --initiate (agent)--> Pending --abort (controlled)--> Idle
//!                            Pending --finalize (agent, grace elapsed)--> Idle
//!                                      + controller.change_admin(agent)
//! ```

use log::info;
use serde::{Deserialize, Serialize};

use crate::controller::{ControllerCall, ControllerLink};
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId};
use crate::ledger::{AppContext, Ledger, Operation, Program};

use super::{restore_authority, CONFIG_KEY};

/// Constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryInit {
    /// Controller whose admin role can be recovered.
    pub controller: AppId,
    /// Identity that may initiate and finalize recovery.
    pub recovery_agent: Address,
    /// Clock units that must pass between initiate and finalize.
    pub grace_window: u64,
}

/// Calls accepted by the recovery plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCall {
    Initiate,
    Abort,
    Finalize,
}

/// Where a recovery attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    Idle,
    Pending { since: u64 },
}

/// Persisted recovery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryState {
    pub controller: AppId,
    pub recovery_agent: Address,
    pub grace_window: u64,
    pub recovery_started_at: Option<u64>,
}

impl RecoveryState {
    pub fn phase(&self) -> RecoveryPhase {
        match self.recovery_started_at {
            None => RecoveryPhase::Idle,
            Some(since) => RecoveryPhase::Pending { since },
        }
    }

    /// Earliest clock value at which finalize may succeed.
    pub fn finalizable_at(&self) -> Option<u64> {
        self.recovery_started_at
            .map(|since| since.saturating_add(self.grace_window))
    }

    /// Read the state of recovery app `app` on a committed ledger.
    pub fn load(ledger: &Ledger, app: AppId) -> Result<Self> {
        ledger
            .app_value(app, CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::NotFound(format!("recovery state for {app}")))
    }
}

/// The recovery plugin program.
pub struct RecoveryPlugin;

impl Program for RecoveryPlugin {
    type Init = RecoveryInit;
    type Call = RecoveryCall;

    fn create(ctx: &mut AppContext<'_>, init: &RecoveryInit) -> Result<()> {
        ControllerLink::load(ctx, init.controller)?;
        if init.recovery_agent.is_zero() {
            return Err(AuthorityError::InvalidArgument(
                "recovery agent must not be the zero address".into(),
            ));
        }
        ctx.store(
            CONFIG_KEY,
            &RecoveryState {
                controller: init.controller,
                recovery_agent: init.recovery_agent,
                grace_window: init.grace_window,
                recovery_started_at: None,
            },
        )
    }

    fn call(ctx: &mut AppContext<'_>, call: &RecoveryCall) -> Result<()> {
        let mut state: RecoveryState = ctx
            .load(CONFIG_KEY)?
            .ok_or_else(|| AuthorityError::InvalidState("recovery not configured".into()))?;
        let link = ControllerLink::load(ctx, state.controller)?;
        let sender = ctx.sender();
        let now = ctx.now();

        match call {
            RecoveryCall::Initiate => {
                if sender != state.recovery_agent {
                    return Err(AuthorityError::Unauthorized(format!(
                        "{sender} is not the recovery agent"
                    )));
                }
                if let RecoveryPhase::Pending { since } = state.phase() {
                    return Err(AuthorityError::InvalidState(format!(
                        "recovery already pending since {since}"
                    )));
                }
                state.recovery_started_at = Some(now);
                info!("recovery of {} initiated at {now}", link.controller);
            }
            RecoveryCall::Abort => {
                if sender != link.controlled {
                    return Err(AuthorityError::Unauthorized(format!(
                        "only the controlled account may abort recovery, not {sender}"
                    )));
                }
                state.recovery_started_at = None;
                info!("recovery of {} aborted", link.controller);
            }
            RecoveryCall::Finalize => {
                if sender != state.recovery_agent {
                    return Err(AuthorityError::Unauthorized(format!(
                        "{sender} is not the recovery agent"
                    )));
                }
                let ready_at = state
                    .finalizable_at()
                    .ok_or_else(|| AuthorityError::InvalidState("no recovery pending".into()))?;
                if now < ready_at {
                    return Err(AuthorityError::InvalidState(format!(
                        "grace window open until {ready_at}, now {now}"
                    )));
                }

                ctx.submit_inner(Operation::call(
                    link.controlled,
                    link.controller,
                    ControllerCall::ChangeAdmin {
                        new_admin: state.recovery_agent,
                    },
                ))?;
                restore_authority(ctx, &link)?;
                state.recovery_started_at = None;
                info!(
                    "recovery of {} finalized: admin is now {}",
                    link.controller, state.recovery_agent
                );
            }
        }

        ctx.store(CONFIG_KEY, &state)
    }
}
