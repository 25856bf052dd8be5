//! Operations — the unit of work inside an atomic batch.
//!
//! Every operation names a sender and may carry a rekey target that
//! replaces the sender's authority slot once the body has executed.
//! Top-level operations are signed; inner operations issued by a program
//! are authorized by the program's own address.
//!
//! A signature covers the sender's nonce and the batch's group id, so a
//! signed operation is valid exactly once and only inside the batch it was
//! signed for.

use serde::{Deserialize, Serialize};

use crate::batch::GroupId;
use crate::crypto::signing;
use crate::crypto::KeyPair;
use crate::error::Result;
use crate::identity::{Address, AppId, AssetId};

use super::program::{AppCall, ProgramInit};

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpBody {
    /// Move `amount` of `asset` from the sender to `receiver`.
    Transfer {
        receiver: Address,
        asset: AssetId,
        amount: u64,
    },
    /// Start holding a non-native asset.
    OptIn { asset: AssetId },
    /// Invoke a deployed program.
    AppCall { app: AppId, call: AppCall },
    /// Deploy a new program.
    Deploy { program: ProgramInit },
}

/// A single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Account the operation acts as.
    pub sender: Address,
    /// Sender's sequence number. Must equal the sender's ledger nonce.
    /// Ignored for inner operations.
    #[serde(default)]
    pub nonce: u64,
    /// New authority for the sender, applied after the body.
    #[serde(default)]
    pub rekey_to: Option<Address>,
    /// Digest of the batch this operation belongs to. Required whenever the
    /// batch holds more than one operation.
    #[serde(default)]
    pub group: Option<GroupId>,
    /// The operation itself.
    pub body: OpBody,
}

impl Operation {
    /// Transfer `amount` of `asset`.
    pub fn transfer(sender: Address, receiver: Address, asset: AssetId, amount: u64) -> Self {
        Self {
            sender,
            nonce: 0,
            rekey_to: None,
            group: None,
            body: OpBody::Transfer {
                receiver,
                asset,
                amount,
            },
        }
    }

    /// Zero-value self transfer, the carrier for a bare rekey.
    pub fn rekey(sender: Address, target: Address) -> Self {
        Self::transfer(sender, sender, crate::identity::NATIVE_ASSET, 0).with_rekey(target)
    }

    /// Opt the sender in to `asset`.
    pub fn opt_in(sender: Address, asset: AssetId) -> Self {
        Self {
            sender,
            nonce: 0,
            rekey_to: None,
            group: None,
            body: OpBody::OptIn { asset },
        }
    }

    /// Call a deployed app.
    pub fn call(sender: Address, app: AppId, call: impl Into<AppCall>) -> Self {
        Self {
            sender,
            nonce: 0,
            rekey_to: None,
            group: None,
            body: OpBody::AppCall {
                app,
                call: call.into(),
            },
        }
    }

    /// Deploy a program.
    pub fn deploy(sender: Address, program: ProgramInit) -> Self {
        Self {
            sender,
            nonce: 0,
            rekey_to: None,
            group: None,
            body: OpBody::Deploy { program },
        }
    }

    /// Attach a rekey target.
    pub fn with_rekey(mut self, target: Address) -> Self {
        self.rekey_to = Some(target);
        self
    }

    /// Set the sender's sequence number.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Bind the operation to batch `group`.
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// Canonical bytes covered by the signature.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Canonical bytes with the group id cleared. The group id is computed
    /// over these.
    pub fn ungrouped_bytes(&self) -> Result<Vec<u8>> {
        if self.group.is_none() {
            return self.canonical_bytes();
        }
        let mut ungrouped = self.clone();
        ungrouped.group = None;
        ungrouped.canonical_bytes()
    }

    /// Sign with `key`. The key's address becomes the claimed signer.
    pub fn sign(self, key: &KeyPair) -> Result<SignedOperation> {
        let bytes = self.canonical_bytes()?;
        let signature = signing::sign_to_base64(key.signing_key(), &bytes);
        Ok(SignedOperation {
            operation: self,
            signer: key.address(),
            signature,
        })
    }

    /// True when this is a call to `app` carrying `call`.
    pub fn is_call_to(&self, app: AppId, call: &AppCall) -> bool {
        matches!(&self.body, OpBody::AppCall { app: a, call: c } if *a == app && c == call)
    }
}

/// A top-level operation with its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    /// The signed operation.
    pub operation: Operation,
    /// Address of the key that signed.
    pub signer: Address,
    /// Base64 Ed25519 signature over `operation.canonical_bytes()`.
    pub signature: String,
}

impl SignedOperation {
    /// Check the signature against `signer`.
    pub fn verify_signature(&self) -> Result<()> {
        let bytes = self.operation.canonical_bytes()?;
        signing::verify_from_base64(&self.signer, &bytes, &self.signature)
    }
}
