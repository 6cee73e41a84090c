//! Symmetric key type with secure memory handling.
//!
//! Keys zeroize their memory on drop so sensitive material does not
//! outlive the encode or decode call that needed it.

use rand_core::CryptoRngCore;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use locafoto_common::{Error, Result};

/// Length of symmetric keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// AES-256 key used for a single payload or for a named pre-shared slot.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: [u8; KEY_LENGTH],
}

impl SymmetricKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Create a key from a slice of raw key material.
    ///
    /// # Errors
    /// - `InvalidKeyLength` if `bytes` is not exactly KEY_LENGTH bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LENGTH {
            return Err(Error::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Generate a random key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a random key from the supplied random source.
    pub fn generate_with<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    /// Parse a key from its hex text form (64 hex digits).
    ///
    /// Surrounding whitespace is ignored so a key pasted from a text file
    /// with a trailing newline still parses.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(text.trim())
                .map_err(|e| Error::MalformedKeyFile(format!("Invalid hex key: {}", e)))?,
        );
        Self::from_slice(&bytes)
    }

    /// Hex text form of the key.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key))
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}
