//! Cryptographic primitives.
//!
//! This module provides:
//! - Ed25519 key pairs whose public key doubles as an account address
//! - Signing and verification of canonical operation bytes

pub mod keys;
pub mod signing;

pub use keys::KeyPair;
