//! Common error types for Locafoto containers.

use thiserror::Error;

/// Top-level error type for container operations.
///
/// Every variant is terminal for the call that produced it. The two
/// verification failures carry no detail on purpose: callers must not be able
/// to tell a wrong key from a flipped bit.
#[derive(Debug, Error)]
pub enum Error {
    /// Key identifier exceeds the fixed header width.
    #[error("Key name too long: {len} bytes (max {max})")]
    KeyNameTooLong { len: usize, max: usize },

    /// Key identifier contains a byte that cannot be framed unambiguously.
    #[error("Invalid key name: {0}")]
    InvalidKeyName(String),

    /// Raw key material has the wrong size.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// LFS container is truncated or its header cannot be read.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// No key is known under the identifier found in the container.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// AEAD tag verification failed.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// The wrapped bundle key could not be recovered.
    #[error("Key unwrap failed")]
    KeyUnwrapFailure,

    /// Decrypted payload length disagrees with the declared size.
    #[error("Size mismatch: metadata declares {expected} bytes, payload has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Bundle carries a version this implementation does not read.
    #[error("Unsupported bundle version: {0}")]
    UnsupportedVersion(String),

    /// Bundle record is not valid.
    #[error("Malformed bundle: {0}")]
    MalformedBundle(String),

    /// Key-file record is not valid.
    #[error("Malformed key file: {0}")]
    MalformedKeyFile(String),

    /// A cryptographic primitive failed outside of verification.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization of an output record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error means the input was rejected by an integrity check.
    ///
    /// Such failures indicate a wrong key, corruption, or tampering and can
    /// never succeed on retry.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailure | Error::KeyUnwrapFailure | Error::SizeMismatch { .. }
        )
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
