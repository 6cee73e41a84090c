//! Key-file records used to provision pre-shared keys.
//!
//! A key file is a small JSON object, conventionally saved with the
//! `.lfkey` extension:
//!
//! ```json
//! {
//!   "name": "SampleKey",
//!   "keyData": "<base64 of 32 key bytes>"
//! }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use locafoto_common::{Error, KeyName, Result};
use locafoto_crypto::{CryptoRngCore, SymmetricKey, KEY_LENGTH};

/// Conventional file extension for key files.
pub const KEY_FILE_EXTENSION: &str = "lfkey";

/// Wire form of a key file.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct KeyFileRecord {
    name: Option<String>,
    key_data: Option<String>,
}

/// Decoded key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFile {
    /// Name the key is looked up by.
    pub name: String,
    /// The 32-byte key.
    pub key: SymmetricKey,
}

impl KeyFile {
    /// Identifier form of the name, as written into LFS headers.
    pub fn key_name(&self) -> Result<KeyName> {
        KeyName::new(self.name.clone())
    }
}

/// Encode a key-file record.
///
/// The output is pretty-printed JSON with a two-space indent.
pub fn encode(name: &str, key: &SymmetricKey) -> Result<Vec<u8>> {
    let record = KeyFileRecord {
        name: Some(name.to_string()),
        key_data: Some(STANDARD.encode(key.as_bytes())),
    };
    serde_json::to_vec_pretty(&record).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a key-file record.
///
/// # Errors
/// - `MalformedKeyFile` if the record is not JSON, `name` or `keyData` is
///   missing, `keyData` is not base64, or the key is not exactly 32 bytes
pub fn decode(bytes: &[u8]) -> Result<KeyFile> {
    let mut record: KeyFileRecord = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedKeyFile(format!("Invalid record: {}", e)))?;

    let name = record
        .name
        .take()
        .ok_or_else(|| Error::MalformedKeyFile("Missing field 'name'".to_string()))?;
    let key_data = record
        .key_data
        .as_deref()
        .ok_or_else(|| Error::MalformedKeyFile("Missing field 'keyData'".to_string()))?;

    let key_bytes = Zeroizing::new(
        STANDARD
            .decode(key_data.trim())
            .map_err(|e| Error::MalformedKeyFile(format!("Invalid keyData encoding: {}", e)))?,
    );
    if key_bytes.len() != KEY_LENGTH {
        return Err(Error::MalformedKeyFile(format!(
            "Key must be {} bytes, got {}",
            KEY_LENGTH,
            key_bytes.len()
        )));
    }

    let key = SymmetricKey::from_slice(&key_bytes)?;
    Ok(KeyFile { name, key })
}

/// Generate a fresh key and its encoded key file.
///
/// # Errors
/// - `KeyNameTooLong` or `InvalidKeyName` if `name` could not be written
///   into an LFS header
pub fn generate<R: CryptoRngCore>(rng: &mut R, name: &str) -> Result<(KeyFile, Vec<u8>)> {
    KeyName::new(name)?;
    let key = SymmetricKey::generate_with(rng);
    let encoded = encode(name, &key)?;
    Ok((
        KeyFile {
            name: name.to_string(),
            key,
        },
        encoded,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_encode_decode() {
        let key = SymmetricKey::from_bytes([7u8; KEY_LENGTH]);
        let encoded = encode("SampleKey", &key).unwrap();
        let decoded = decode(&encoded).unwrap();

        assert_eq!(decoded.name, "SampleKey");
        assert_eq!(decoded.key, key);
    }

    #[test]
    fn test_wire_format() {
        let key = SymmetricKey::from_bytes([0u8; KEY_LENGTH]);
        let encoded = encode("k", &key).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(value["name"], "k");
        assert_eq!(
            value["keyData"],
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
        );
        assert!(String::from_utf8(encoded).unwrap().contains("\n  \"name\""));
    }

    #[test]
    fn test_decode_foreign_record() {
        // As written by other tools: different field order, extra whitespace
        let json = br#"{ "keyData": "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=", "name": "family" }"#;
        let decoded = decode(json).unwrap();

        assert_eq!(decoded.name, "family");
        assert_eq!(decoded.key, SymmetricKey::from_bytes([1u8; KEY_LENGTH]));
        assert_eq!(decoded.key_name().unwrap().as_str(), "family");
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            decode(br#"{"keyData": "AAAA"}"#),
            Err(Error::MalformedKeyFile(_))
        ));
        assert!(matches!(
            decode(br#"{"name": "k"}"#),
            Err(Error::MalformedKeyFile(_))
        ));
        assert!(matches!(decode(b"{}"), Err(Error::MalformedKeyFile(_))));
    }

    #[test]
    fn test_wrong_key_length() {
        // 16 bytes
        let json = br#"{"name": "k", "keyData": "AAAAAAAAAAAAAAAAAAAAAA=="}"#;
        assert!(matches!(decode(json), Err(Error::MalformedKeyFile(_))));

        // 33 bytes
        let json = br#"{"name": "k", "keyData": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#;
        assert!(matches!(decode(json), Err(Error::MalformedKeyFile(_))));
    }

    #[test]
    fn test_not_json_or_not_base64() {
        assert!(matches!(decode(b"abcdef"), Err(Error::MalformedKeyFile(_))));
        assert!(matches!(
            decode(br#"{"name": "k", "keyData": "!!not base64!!"}"#),
            Err(Error::MalformedKeyFile(_))
        ));
        assert!(matches!(
            decode(br#"{"name": 5, "keyData": "AAAA"}"#),
            Err(Error::MalformedKeyFile(_))
        ));
    }

    #[test]
    fn test_generate() {
        let mut rng = StdRng::seed_from_u64(3);
        let (file, encoded) = generate(&mut rng, "new-key").unwrap();

        assert_eq!(decode(&encoded).unwrap(), file);
        assert!(matches!(
            generate(&mut rng, &"n".repeat(129)),
            Err(Error::KeyNameTooLong { .. })
        ));
    }
}
