//! Account addresses and program identifiers.
//!
//! An address is 32 bytes. Key-held accounts use their Ed25519 public key
//! as the address; program accounts derive theirs from the app id so that
//! nobody holds a key for them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{AuthorityError, Result};

/// Asset identifier. Asset `0` is the native currency.
pub type AssetId = u64;

/// The native currency. Every account holds it without opting in.
pub const NATIVE_ASSET: AssetId = 0;

/// Domain separator for program account addresses.
const APP_ADDRESS_PREFIX: &[u8] = b"appID";

/// Numeric identifier of a deployed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(pub u64);

impl AppId {
    /// Fixed-width big-endian encoding used in storage keys.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// The account address owned by this program.
    pub fn address(self) -> Address {
        Address::for_app(self)
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

/// A 32-byte account address.
///
/// Displayed and serialized to human-readable formats as base58; binary
/// formats receive the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address. Used as "unset" for authority slots and as the
    /// wildcard caller in permission keys.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Derive the account address of a program.
    ///
    /// `SHA-256("appID" || id as u64 big-endian)`.
    pub fn for_app(app: AppId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(APP_ADDRESS_PREFIX);
        hasher.update(app.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// Build an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a base58 address string.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| AuthorityError::InvalidArgument(format!("invalid address {s}: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            AuthorityError::InvalidArgument(format!("address {s} must decode to 32 bytes"))
        })?;
        Ok(Self(arr))
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::ZERO
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl std::str::FromStr for Address {
    type Err = AuthorityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::parse(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Address)
        }
    }
}
