//! Error types for delegated authority.
//!
//! Every failure is fatal to the enclosing batch. Variants stay distinct so
//! callers and tests can assert on the specific cause.

/// Authority error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authority not restored before end of batch")]
    AuthorityNotRestored,

    #[error("Quota exceeded: spent {spent} of limit {limit}")]
    QuotaExceeded { spent: u64, limit: u64 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("Account {account} is not opted in to asset {asset}")]
    NotOptedIn { account: String, asset: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid nonce for {account}: expected {expected}, got {found}")]
    InvalidNonce {
        account: String,
        expected: u64,
        found: u64,
    },

    #[error("Group mismatch: {0}")]
    GroupMismatch(String),

    #[error("Inner call depth exceeded: {0}")]
    DepthExceeded(usize),

    #[error("Batch failed at operation {index}: {source}")]
    BatchFailed {
        index: usize,
        #[source]
        source: Box<AuthorityError>,
    },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthorityError {
    /// Unwrap any `BatchFailed` layers and return the underlying failure.
    pub fn root_cause(&self) -> &AuthorityError {
        match self {
            AuthorityError::BatchFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<bincode::Error> for AuthorityError {
    fn from(e: bincode::Error) -> Self {
        AuthorityError::SerializationError(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, AuthorityError>;
