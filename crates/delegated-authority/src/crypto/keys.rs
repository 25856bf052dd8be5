//! Ed25519 key pairs for key-held accounts.
//!
//! The verifying key bytes are the account address.

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{AuthorityError, Result};
use crate::identity::Address;

/// Domain separator for deterministic development keys.
const DEV_KEY_CONTEXT: &str = "delegated-authority/dev-key/";

/// An Ed25519 key pair controlling one account.
///
/// The signing key is zeroized on drop to prevent leakage.
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Deterministic key for a named development account.
    ///
    /// The seed is `SHA-256(context || name)`, so anyone who knows the name
    /// can sign for the account. Never use these outside local ledgers.
    pub fn dev(name: &str) -> Self {
        let mut seed: [u8; 32] = Sha256::digest(format!("{DEV_KEY_CONTEXT}{name}")).into();
        let kp = Self::from_signing_key_bytes(&seed);
        seed.zeroize();
        kp
    }

    /// Reconstruct a verifying key from an address.
    pub fn verifying_key_from_address(address: &Address) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(address.as_bytes())
            .map_err(|e| AuthorityError::InvalidArgument(format!("address is not a public key: {e}")))
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_bytes(self.verifying_key.to_bytes())
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}
