//! Authenticated encryption using AES-256-GCM with a detached tag.
//!
//! Both container formats store the nonce and tag in their own fields, so
//! this module hands them back separately instead of as one blob. No
//! associated data is ever bound.

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use crate::keys::SymmetricKey;
use locafoto_common::{Error, Result};

/// Nonce size for AES-GCM (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Ciphertext and its detached authentication tag.
#[derive(Debug, Clone)]
pub struct Sealed {
    /// Encrypted payload, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag.
    pub tag: [u8; TAG_SIZE],
}

/// Draw a fresh nonce from a cryptographically secure random source.
///
/// Every encryption must use a nonce produced by this function; callers never
/// supply or reuse one.
pub fn generate_nonce<R: CryptoRngCore + ?Sized>(rng: &mut R) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}

fn cipher(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()))
}

/// Encrypt plaintext using AES-256-GCM.
///
/// # Preconditions
/// - `nonce` has never been used with `key` before
///
/// # Postconditions
/// - `ciphertext.len() == plaintext.len()`
/// - The tag authenticates the ciphertext and empty associated data
///
/// # Errors
/// - Returns `Crypto` if the plaintext exceeds the GCM length limit
pub fn encrypt(key: &SymmetricKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Sealed> {
    let mut buffer = plaintext.to_vec();
    let tag = cipher(key)
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut buffer)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Decrypt ciphertext using AES-256-GCM.
///
/// # Postconditions
/// - Returns the plaintext only if the tag verifies
///
/// # Errors
/// - Returns `AuthenticationFailure` on any verification failure, with no
///   further detail
///
/// # Security
/// - The tag comparison is constant-time
/// - The working buffer is zeroized before an error is returned, so no
///   unverified plaintext escapes
pub fn decrypt(
    key: &SymmetricKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>> {
    let mut buffer = ciphertext.to_vec();
    match cipher(key).decrypt_in_place_detached(
        GenericArray::from_slice(nonce),
        b"",
        &mut buffer,
        GenericArray::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => {
            buffer.zeroize();
            Err(Error::AuthenticationFailure)
        }
    }
}
