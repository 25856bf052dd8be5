//! Authority controller — lends an account's authority to vetted plugins.
//!
//! The controller module provides:
//! - The permission registry (`(delegate, caller) -> expiry`)
//! - The controller program: admin changes, grants, revocations,
//!   delegation, rekeying, and proof of returned authority
//! - Read-only views for hosts and for other programs
//!
//! A delegation only succeeds when a later operation in the same batch
//! hands authority back (see [`crate::batch::invariant`]).

pub mod engine;
pub mod registry;
pub mod types;

pub use engine::AuthorityController;
pub use registry::{
    lookup, permission_key, CallerScope, PermissionEntry, NEVER_EXPIRES, PERMISSION_PREFIX,
};
pub use types::{
    at_rest_signer, ControllerCall, ControllerInit, ControllerLink, ControllerView, ADMIN_KEY,
    CONTROLLED_KEY,
};
