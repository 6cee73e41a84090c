//! Self-wrapped photo bundle (`.locaphoto`) codec.
//!
//! A bundle carries its own one-time AES key, wrapped under the recipient's
//! public key, so nothing has to be shared ahead of time:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "photo": {
//!     "id": "<uuid>",
//!     "encryptedData": "<base64>",
//!     "encryptedKey": "<base64>",
//!     "iv": "<base64, 12 bytes>",
//!     "authTag": "<base64, 16 bytes>"
//!   },
//!   "metadata": {
//!     "originalSize": 1234,
//!     "captureDate": "2024-05-01T10:20:30.123456Z",
//!     "width": 4032,
//!     "height": 3024,
//!     "format": "JPEG"
//!   }
//! }
//! ```
//!
//! In memory every binary field is raw bytes; base64 only exists in the text
//! form. Metadata is not bound into the AEAD, so only `originalSize` is
//! checked (against the decrypted length).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroize;

use locafoto_common::{Error, Result};
use locafoto_crypto::{
    decrypt, encrypt, generate_nonce, CryptoRngCore, KeyUnwrap, KeyWrap, OsRng, SymmetricKey,
    NONCE_SIZE, TAG_SIZE,
};

/// Bundle format version written and accepted by this codec.
pub const BUNDLE_VERSION: &str = "1.0";

/// Conventional file extension for bundles.
pub const BUNDLE_EXTENSION: &str = "locaphoto";

/// A self-contained encrypted photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Format version, currently always [`BUNDLE_VERSION`].
    pub version: String,
    /// Encrypted payload and key material.
    pub photo: EncryptedPhoto,
    /// Plain descriptive metadata.
    pub metadata: PhotoMetadata,
}

/// Encrypted part of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPhoto {
    /// Unique photo identifier, generated when the bundle is made.
    pub id: Uuid,
    /// AES-256-GCM ciphertext of the photo.
    #[serde(with = "base64_field")]
    pub encrypted_data: Vec<u8>,
    /// Bundle key wrapped under the recipient's public key.
    #[serde(with = "base64_field")]
    pub encrypted_key: Vec<u8>,
    /// GCM nonce.
    #[serde(with = "base64_field")]
    pub iv: [u8; NONCE_SIZE],
    /// GCM authentication tag.
    #[serde(with = "base64_field")]
    pub auth_tag: [u8; TAG_SIZE],
}

/// Descriptive metadata stored next to the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    /// Length of the plaintext photo in bytes.
    pub original_size: u64,
    /// When the photo was taken.
    pub capture_date: DateTime<Utc>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Image format tag such as `JPEG`, `PNG` or `HEIC`.
    pub format: String,
}

/// Caller-supplied description of the photo being bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Image format tag.
    pub format: String,
    /// When the photo was taken.
    pub capture_date: DateTime<Utc>,
}

impl PhotoInfo {
    /// Describe a photo captured now.
    pub fn new(width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            format: format.into(),
            capture_date: Utc::now(),
        }
    }

    /// Set the capture timestamp.
    pub fn with_capture_date(mut self, capture_date: DateTime<Utc>) -> Self {
        self.capture_date = capture_date;
        self
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<String>,
}

impl Bundle {
    /// Fail with `UnsupportedVersion` unless this is a version 1.0 bundle.
    pub fn check_version(&self) -> Result<()> {
        if self.version != BUNDLE_VERSION {
            return Err(Error::UnsupportedVersion(self.version.clone()));
        }
        Ok(())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Serialize to pretty-printed JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Deserialize from JSON bytes.
    ///
    /// The version is read before anything else, so a bundle from a newer
    /// format fails with `UnsupportedVersion` rather than a parse error.
    ///
    /// # Errors
    /// - `MalformedBundle` if the input is not a bundle record
    /// - `UnsupportedVersion` if the version is not 1.0
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedBundle(e.to_string()))?;
        match probe.version.as_deref() {
            Some(BUNDLE_VERSION) => {}
            Some(other) => return Err(Error::UnsupportedVersion(other.to_string())),
            None => return Err(Error::MalformedBundle("Missing field 'version'".to_string())),
        }

        serde_json::from_slice(bytes).map_err(|e| Error::MalformedBundle(e.to_string()))
    }
}

/// Encrypt a photo for a recipient using the operating system's random
/// source.
pub fn encode<W: KeyWrap + ?Sized>(plaintext: &[u8], info: PhotoInfo, recipient: &W) -> Result<Bundle> {
    encode_with_rng(&mut OsRng, plaintext, info, recipient)
}

/// Encrypt a photo for a recipient, drawing all randomness from `rng`.
///
/// # Postconditions
/// - A fresh key, nonce and photo id are drawn for every call
/// - `metadata.original_size == plaintext.len()`
/// - The bundle key exists in the clear only for the duration of this call
///
/// # Errors
/// - `Crypto` if the recipient key cannot wrap a 32-byte key
pub fn encode_with_rng<R: CryptoRngCore, W: KeyWrap + ?Sized>(
    rng: &mut R,
    plaintext: &[u8],
    info: PhotoInfo,
    recipient: &W,
) -> Result<Bundle> {
    let key = SymmetricKey::generate_with(rng);
    let nonce = generate_nonce(rng);

    let sealed = encrypt(&key, &nonce, plaintext)?;
    let encrypted_key = recipient.wrap_key(&mut *rng, &key)?;
    drop(key);

    let mut id_bytes = [0u8; 16];
    rng.fill_bytes(&mut id_bytes);
    let id = uuid::Builder::from_random_bytes(id_bytes).into_uuid();

    debug!(photo_id = %id, size = plaintext.len(), "Encoded photo bundle");

    Ok(Bundle {
        version: BUNDLE_VERSION.to_string(),
        photo: EncryptedPhoto {
            id,
            encrypted_data: sealed.ciphertext,
            encrypted_key,
            iv: nonce,
            auth_tag: sealed.tag,
        },
        metadata: PhotoMetadata {
            original_size: plaintext.len() as u64,
            capture_date: info.capture_date,
            width: info.width,
            height: info.height,
            format: info.format,
        },
    })
}

/// Decrypt a bundle with the recipient's private key.
///
/// # Errors
/// - `UnsupportedVersion` if the bundle is not version 1.0
/// - `KeyUnwrapFailure` if the bundle key cannot be recovered
/// - `AuthenticationFailure` if the payload tag does not verify
/// - `SizeMismatch` if the payload length disagrees with `originalSize`
pub fn decode<U: KeyUnwrap + ?Sized>(bundle: &Bundle, recipient: &U) -> Result<Vec<u8>> {
    bundle.check_version()?;

    let key = recipient
        .unwrap_key(&bundle.photo.encrypted_key)
        .map_err(|_| Error::KeyUnwrapFailure)?;

    let mut plaintext = decrypt(
        &key,
        &bundle.photo.iv,
        &bundle.photo.encrypted_data,
        &bundle.photo.auth_tag,
    )?;
    drop(key);

    let actual = plaintext.len() as u64;
    if actual != bundle.metadata.original_size {
        plaintext.zeroize();
        return Err(Error::SizeMismatch {
            expected: bundle.metadata.original_size,
            actual,
        });
    }

    debug!(photo_id = %bundle.photo.id, size = plaintext.len(), "Decoded photo bundle");

    Ok(plaintext)
}

/// Serde adapter storing byte fields as standard padded base64 strings.
mod base64_field {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(text.trim()).map_err(D::Error::custom)?;
        let len = bytes.len();
        T::try_from(bytes)
            .map_err(|_| D::Error::custom(format!("unexpected length {} for binary field", len)))
    }
}
