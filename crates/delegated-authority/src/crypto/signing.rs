//! Ed25519 signing and verification.
//!
//! Signatures travel as base64 strings so batch files stay readable.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};

use crate::error::{AuthorityError, Result};
use crate::identity::Address;

use super::keys::KeyPair;

/// Sign a message and return the signature as a base64-encoded string.
pub fn sign_to_base64(signing_key: &SigningKey, message: &[u8]) -> String {
    let sig: Signature = signing_key.sign(message);
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, sig.to_bytes())
}

/// Verify a base64-encoded signature made by the key behind `signer`.
pub fn verify_from_base64(signer: &Address, message: &[u8], signature_b64: &str) -> Result<()> {
    let verifying_key =
        KeyPair::verifying_key_from_address(signer).map_err(|_| AuthorityError::InvalidSignature)?;

    let sig_bytes =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, signature_b64)
            .map_err(|_| AuthorityError::InvalidSignature)?;

    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| AuthorityError::InvalidSignature)?;

    let signature = Signature::from_bytes(&sig_array);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| AuthorityError::InvalidSignature)
}
