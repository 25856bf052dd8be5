//! Controller call surface and read-only views.

use serde::{Deserialize, Serialize};

use crate::batch::RestoreExpectation;
use crate::error::{AuthorityError, Result};
use crate::identity::{Address, AppId};
use crate::ledger::{AppContext, AppRecord, Ledger, ProgramKind};

use super::registry::{self, CallerScope, PermissionEntry};

/// Storage key of the admin address.
pub const ADMIN_KEY: &[u8] = b"admin";

/// Storage key of the controlled account.
pub const CONTROLLED_KEY: &[u8] = b"controlled";

/// Constructor arguments for a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInit {
    /// Account to control. `None` (or `ZERO`) controls the app's own account.
    #[serde(default)]
    pub controlled: Option<Address>,
    /// Initial admin.
    pub admin: Address,
}

/// Calls accepted by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerCall {
    /// Replace the admin. Sender: admin, or the controlled account.
    ChangeAdmin { new_admin: Address },
    /// Assert the controlled account's authority is at rest.
    VerifyAuthorityReturned,
    /// Hand authority to a registered plugin for the rest of the batch.
    DelegateTo { delegate: AppId },
    /// Hand authority to any address. Admin only.
    RekeyTo {
        target: Address,
        #[serde(default)]
        transient: bool,
    },
    /// Create or overwrite a permission entry. Admin only.
    Grant {
        delegate: AppId,
        scope: CallerScope,
        expiry: u64,
    },
    /// Delete a permission entry. Admin only.
    Revoke { delegate: AppId, scope: CallerScope },
}

/// Authority value of `controlled` when nothing is delegated.
///
/// A controller that controls its own account leaves the slot unset; any
/// other controlled account is rekeyed to the controller.
pub fn at_rest_signer(controller: AppId, controlled: &Address) -> Address {
    if *controlled == controller.address() {
        Address::ZERO
    } else {
        controller.address()
    }
}

/// Identity record of one controller, decoded from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerLink {
    pub controller: AppId,
    pub admin: Address,
    pub controlled: Address,
}

impl ControllerLink {
    /// Read a controller's identity from inside another program.
    pub fn load(ctx: &AppContext<'_>, controller: AppId) -> Result<Self> {
        if ctx.app_kind(controller)? != ProgramKind::Controller {
            return Err(AuthorityError::InvalidArgument(format!(
                "{controller} is not a controller"
            )));
        }
        Ok(Self {
            controller,
            admin: required(ctx.load_foreign(controller, ADMIN_KEY)?, ADMIN_KEY)?,
            controlled: required(ctx.load_foreign(controller, CONTROLLED_KEY)?, CONTROLLED_KEY)?,
        })
    }

    /// Read a controller's identity from its app record.
    pub fn from_record(record: &AppRecord) -> Result<Self> {
        if record.kind != ProgramKind::Controller {
            return Err(AuthorityError::InvalidArgument(format!(
                "{} is not a controller",
                record.id
            )));
        }
        Ok(Self {
            controller: record.id,
            admin: required(record.value(ADMIN_KEY)?, ADMIN_KEY)?,
            controlled: required(record.value(CONTROLLED_KEY)?, CONTROLLED_KEY)?,
        })
    }

    /// See [`at_rest_signer`].
    pub fn at_rest(&self) -> Address {
        at_rest_signer(self.controller, &self.controlled)
    }

    /// What the batch checker must find for this controller.
    pub fn restore_expectation(&self) -> RestoreExpectation {
        RestoreExpectation {
            controller: self.controller,
            controlled: self.controlled,
            at_rest: self.at_rest(),
        }
    }
}

fn required<T>(value: Option<T>, key: &[u8]) -> Result<T> {
    value.ok_or_else(|| {
        AuthorityError::InvalidState(format!(
            "controller storage missing {}",
            String::from_utf8_lossy(key)
        ))
    })
}

/// Read-only view of a controller on a committed ledger.
#[derive(Debug, Clone)]
pub struct ControllerView {
    link: ControllerLink,
    permissions: Vec<PermissionEntry>,
    auth: Address,
}

impl ControllerView {
    /// Load controller `app` from `ledger`.
    pub fn load(ledger: &Ledger, app: AppId) -> Result<Self> {
        let record = ledger.app(app)?;
        let link = ControllerLink::from_record(record)?;
        Ok(Self {
            permissions: registry::entries(&record.storage)?,
            auth: ledger.auth_addr(&link.controlled),
            link,
        })
    }

    pub fn app(&self) -> AppId {
        self.link.controller
    }

    /// Current admin.
    pub fn admin(&self) -> Address {
        self.link.admin
    }

    pub fn controlled(&self) -> Address {
        self.link.controlled
    }

    pub fn at_rest(&self) -> Address {
        self.link.at_rest()
    }

    /// Whether the controlled account's authority is at rest.
    pub fn is_at_rest(&self) -> bool {
        self.auth == self.at_rest()
    }

    /// Stored expiry for exactly `(delegate, scope)`.
    pub fn permission(&self, delegate: AppId, scope: CallerScope) -> Option<u64> {
        let key_scope = CallerScope::from_address(Address::from_bytes(scope.key_bytes()));
        self.permissions
            .iter()
            .find(|e| e.delegate == delegate && e.scope == key_scope)
            .map(|e| e.expiry)
    }

    /// Every registry entry.
    pub fn permissions(&self) -> &[PermissionEntry] {
        &self.permissions
    }
}
