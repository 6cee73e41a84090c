//! Cryptographic primitives for Locafoto containers.
//!
//! This module provides:
//! - Authenticated encryption using AES-256-GCM with detached tags
//! - Symmetric key management with automatic zeroization
//! - RSA-OAEP wrapping of per-bundle keys for a recipient
//!
//! # Security Guarantees
//! - All symmetric key material is zeroized on drop
//! - Nonces are always drawn from a caller-supplied CSPRNG, never reused
//! - Verification failures carry no detail about their cause

pub mod aead;
pub mod keys;
pub mod wrap;

pub use aead::{decrypt, encrypt, generate_nonce, Sealed, NONCE_SIZE, TAG_SIZE};
pub use keys::{SymmetricKey, KEY_LENGTH};
pub use wrap::{KeyUnwrap, KeyWrap, RSA_KEY_BITS};

pub use rand_core::{CryptoRngCore, OsRng};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
