//! Asymmetric wrapping of per-bundle symmetric keys.
//!
//! The bundle format wraps its one-time AES key under the recipient's
//! RSA public key with OAEP padding, SHA-256 for both the hash and MGF1 and
//! an empty label. Only the recipient's private key can unwrap it.

use rand_core::{CryptoRngCore, OsRng};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::keys::{SymmetricKey, KEY_LENGTH};
use locafoto_common::{Error, Result};

/// Modulus size of recipient keys generated by this crate.
pub const RSA_KEY_BITS: usize = 2048;

/// Public half of a key-wrapping scheme.
pub trait KeyWrap {
    /// Encrypt `key` so only the matching private key can recover it.
    fn wrap_key(&self, rng: &mut dyn CryptoRngCore, key: &SymmetricKey) -> Result<Vec<u8>>;
}

/// Private half of a key-wrapping scheme.
pub trait KeyUnwrap {
    /// Recover a wrapped key.
    ///
    /// # Errors
    /// - `KeyUnwrapFailure` on any failure. Implementations must not reveal
    ///   which check failed.
    fn unwrap_key(&self, wrapped: &[u8]) -> Result<SymmetricKey>;
}

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

impl KeyWrap for RsaPublicKey {
    fn wrap_key(&self, mut rng: &mut dyn CryptoRngCore, key: &SymmetricKey) -> Result<Vec<u8>> {
        self.encrypt(&mut rng, oaep(), key.as_bytes())
            .map_err(|e| Error::Crypto(format!("Key wrap failed: {}", e)))
    }
}

impl KeyUnwrap for RsaPrivateKey {
    fn unwrap_key(&self, wrapped: &[u8]) -> Result<SymmetricKey> {
        let unwrapped = Zeroizing::new(
            self.decrypt_blinded(&mut OsRng, oaep(), wrapped)
                .map_err(|_| Error::KeyUnwrapFailure)?,
        );
        if unwrapped.len() != KEY_LENGTH {
            return Err(Error::KeyUnwrapFailure);
        }
        SymmetricKey::from_slice(&unwrapped).map_err(|_| Error::KeyUnwrapFailure)
    }
}

/// Generate a recipient keypair of [`RSA_KEY_BITS`] bits.
pub fn generate_recipient_key<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<RsaPrivateKey> {
    RsaPrivateKey::new(rng, RSA_KEY_BITS)
        .map_err(|e| Error::Crypto(format!("RSA key generation failed: {}", e)))
}

/// Encode a private key as PKCS#8 PEM.
pub fn private_key_to_pem(key: &RsaPrivateKey) -> Result<Zeroizing<String>> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::Serialization(format!("Private key encoding failed: {}", e)))
}

/// Decode a PKCS#8 PEM private key.
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| Error::Crypto(format!("Invalid private key: {}", e)))
}

/// Encode a public key as SPKI PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Serialization(format!("Public key encoding failed: {}", e)))
}

/// Decode an SPKI PEM public key.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| Error::Crypto(format!("Invalid public key: {}", e)))
}
