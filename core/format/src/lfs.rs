//! Named-key container (`.lfs`) codec.
//!
//! # Format
//! ```text
//! [KEY NAME 128B][UTF-8, zero-padded]
//! [CIPHERTEXT variable][AES-256-GCM, same length as plaintext]
//! [NONCE 12B][random]
//! [TAG 16B][GCM auth tag]
//! ```
//!
//! There is no magic number and no version field. The receiver must already
//! hold the key named in the header.

use tracing::debug;

use locafoto_common::{Error, KeyName, Result, MAX_KEY_NAME_LEN};
use locafoto_crypto::{
    decrypt, encrypt, generate_nonce, CryptoRngCore, OsRng, SymmetricKey, NONCE_SIZE, TAG_SIZE,
};

use crate::keyring::KeyResolver;

/// Width of the key-name header field.
pub const KEY_NAME_FIELD_SIZE: usize = MAX_KEY_NAME_LEN;

/// Smallest valid container: header, nonce and tag around an empty payload.
pub const MIN_CONTAINER_SIZE: usize = KEY_NAME_FIELD_SIZE + NONCE_SIZE + TAG_SIZE;

/// Conventional file extension for containers.
pub const CONTAINER_EXTENSION: &str = "lfs";

/// Borrowed view of the regions of an LFS container.
#[derive(Debug, Clone, Copy)]
pub struct LfsContainer<'a> {
    key_name: &'a str,
    ciphertext: &'a [u8],
    nonce: &'a [u8; NONCE_SIZE],
    tag: &'a [u8; TAG_SIZE],
}

impl<'a> LfsContainer<'a> {
    /// Split a container into its regions without decrypting.
    ///
    /// # Errors
    /// - `MalformedContainer` if the input is shorter than
    ///   [`MIN_CONTAINER_SIZE`] or the header is not a valid identifier
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < MIN_CONTAINER_SIZE {
            return Err(Error::MalformedContainer(format!(
                "Container is {} bytes, minimum is {}",
                data.len(),
                MIN_CONTAINER_SIZE
            )));
        }

        let (header, rest) = data.split_at(KEY_NAME_FIELD_SIZE);
        let (ciphertext, trailer) = rest.split_at(rest.len() - NONCE_SIZE - TAG_SIZE);
        let (nonce, tag) = trailer.split_at(NONCE_SIZE);

        let nonce = nonce
            .try_into()
            .map_err(|_| Error::MalformedContainer("Invalid nonce".to_string()))?;
        let tag = tag
            .try_into()
            .map_err(|_| Error::MalformedContainer("Invalid tag".to_string()))?;

        Ok(Self {
            key_name: parse_header(header)?,
            ciphertext,
            nonce,
            tag,
        })
    }

    /// Key identifier stored in the header.
    pub fn key_name(&self) -> &'a str {
        self.key_name
    }

    /// Encrypted payload.
    pub fn ciphertext(&self) -> &'a [u8] {
        self.ciphertext
    }

    /// Nonce the payload was encrypted under.
    pub fn nonce(&self) -> &'a [u8; NONCE_SIZE] {
        self.nonce
    }

    /// Authentication tag.
    pub fn tag(&self) -> &'a [u8; TAG_SIZE] {
        self.tag
    }

    /// Length the payload will have once decrypted.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Recover the identifier from a zero-padded header field.
///
/// The name ends at the first zero byte and every byte after it must also be
/// zero; anything else means the header was not written by this codec.
fn parse_header(header: &[u8]) -> Result<&str> {
    let end = header.iter().position(|&b| b == 0).unwrap_or(header.len());
    if header[end..].iter().any(|&b| b != 0) {
        return Err(Error::MalformedContainer(
            "Key name field has data after padding".to_string(),
        ));
    }
    std::str::from_utf8(&header[..end])
        .map_err(|_| Error::MalformedContainer("Key name is not valid UTF-8".to_string()))
}

fn write_header(out: &mut Vec<u8>, name: &KeyName) {
    let bytes = name.as_bytes();
    out.extend_from_slice(bytes);
    out.resize(out.len() + KEY_NAME_FIELD_SIZE - bytes.len(), 0);
}

/// Encrypt a payload under a named pre-shared key.
///
/// Uses the operating system's random source for the nonce.
///
/// # Errors
/// - `KeyNameTooLong` if `key_name` is longer than 128 UTF-8 bytes
/// - `InvalidKeyName` if `key_name` contains a NUL byte
pub fn encode(key_name: &str, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    encode_with_rng(&mut OsRng, key_name, key, plaintext)
}

/// Encrypt a payload under a named pre-shared key, drawing the nonce from
/// `rng`.
///
/// # Postconditions
/// - Output length is `128 + plaintext.len() + 12 + 16`
/// - A fresh nonce is drawn for every call
pub fn encode_with_rng<R: CryptoRngCore>(
    rng: &mut R,
    key_name: &str,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let name = KeyName::new(key_name)?;

    let nonce = generate_nonce(rng);
    let sealed = encrypt(key, &nonce, plaintext)?;

    let mut output = Vec::with_capacity(MIN_CONTAINER_SIZE + sealed.ciphertext.len());
    write_header(&mut output, &name);
    output.extend_from_slice(&sealed.ciphertext);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed.tag);

    debug!(key_name = %name, size = output.len(), "Encoded LFS container");

    Ok(output)
}

/// Decrypt a container, looking up its key through `resolver`.
///
/// # Errors
/// - `MalformedContainer` if the container is truncated or its header is
///   invalid
/// - `UnknownKey` if the resolver has no key for the stored identifier
/// - `AuthenticationFailure` if the tag does not verify
pub fn decode<K: KeyResolver + ?Sized>(container: &[u8], resolver: &K) -> Result<Vec<u8>> {
    let parsed = LfsContainer::parse(container)?;

    let name = KeyName::new(parsed.key_name())
        .map_err(|_| Error::MalformedContainer("Invalid key name".to_string()))?;
    let key = resolver
        .resolve(&name)
        .ok_or_else(|| Error::UnknownKey(name.to_string()))?;

    let plaintext = decrypt(&key, parsed.nonce(), parsed.ciphertext(), parsed.tag())?;

    debug!(key_name = %name, size = plaintext.len(), "Decoded LFS container");

    Ok(plaintext)
}

/// Read the key identifier a container needs, without decrypting it.
pub fn peek_key_name(container: &[u8]) -> Result<KeyName> {
    let parsed = LfsContainer::parse(container)?;
    KeyName::new(parsed.key_name())
        .map_err(|_| Error::MalformedContainer("Invalid key name".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::Keyring;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    fn sample_key() -> SymmetricKey {
        SymmetricKey::from_bytes([0x42u8; 32])
    }

    fn keyring_with(name: &str, key: SymmetricKey) -> Keyring {
        let mut keyring = Keyring::new();
        keyring.insert(KeyName::new(name).unwrap(), key);
        keyring
    }

    #[test]
    fn test_encode_decode() {
        let key = sample_key();
        let plaintext = b"FAKE JPEG DATA 1234567890";

        let container = encode("SampleKey", &key, plaintext).unwrap();
        let decoded = decode(&container, &keyring_with("SampleKey", key)).unwrap();

        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn test_layout() {
        let key = sample_key();
        let plaintext = b"payload";
        let mut rng = StdRng::seed_from_u64(99);

        let mut expected_nonce = [0u8; NONCE_SIZE];
        rng.clone().fill_bytes(&mut expected_nonce);

        let container = encode_with_rng(&mut rng, "SampleKey", &key, plaintext).unwrap();

        assert_eq!(container.len(), 128 + plaintext.len() + 12 + 16);
        assert_eq!(&container[..9], b"SampleKey");
        assert!(container[9..128].iter().all(|&b| b == 0));

        let nonce_start = container.len() - 28;
        assert_eq!(&container[nonce_start..nonce_start + 12], &expected_nonce);

        let sealed = encrypt(&key, &expected_nonce, plaintext).unwrap();
        assert_eq!(&container[128..nonce_start], sealed.ciphertext.as_slice());
        assert_eq!(&container[container.len() - 16..], &sealed.tag);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = sample_key();
        let container = encode("k", &key, b"").unwrap();

        assert_eq!(container.len(), MIN_CONTAINER_SIZE);
        assert_eq!(decode(&container, &keyring_with("k", key)).unwrap(), b"");
    }

    #[test]
    fn test_key_name_boundary() {
        let key = sample_key();
        let name128 = "n".repeat(128);

        let container = encode(&name128, &key, b"x").unwrap();
        assert_eq!(&container[..128], name128.as_bytes());
        assert_eq!(peek_key_name(&container).unwrap().as_str(), name128);
        assert_eq!(decode(&container, &keyring_with(&name128, key.clone())).unwrap(), b"x");

        assert!(matches!(
            encode(&"n".repeat(129), &key, b"x"),
            Err(Error::KeyNameTooLong { len: 129, max: 128 })
        ));
    }

    #[test]
    fn test_multibyte_key_name() {
        let key = sample_key();
        let name = "Familienfotos 📷";

        let container = encode(name, &key, b"data").unwrap();
        assert_eq!(peek_key_name(&container).unwrap().as_str(), name);
        assert_eq!(decode(&container, &keyring_with(name, key)).unwrap(), b"data");
    }

    #[test]
    fn test_nonce_uniqueness() {
        let key = sample_key();
        let plaintext = b"Same plaintext";

        let c1 = encode("k", &key, plaintext).unwrap();
        let c2 = encode("k", &key, plaintext).unwrap();

        let n1 = LfsContainer::parse(&c1).unwrap();
        let n2 = LfsContainer::parse(&c2).unwrap();
        assert_ne!(n1.nonce(), n2.nonce());
        assert_ne!(n1.ciphertext(), n2.ciphertext());
    }

    #[test]
    fn test_too_short_is_malformed() {
        let resolver = keyring_with("k", sample_key());

        for len in [0usize, 1, 128, 155] {
            assert!(matches!(
                decode(&vec![0u8; len], &resolver),
                Err(Error::MalformedContainer(_))
            ));
        }
        assert!(matches!(
            peek_key_name(&[0u8; 100]),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_unknown_key() {
        let container = encode("work", &sample_key(), b"data").unwrap();
        let result = decode(&container, &keyring_with("family", sample_key()));

        match result {
            Err(Error::UnknownKey(name)) => assert_eq!(name, "work"),
            other => panic!("expected UnknownKey, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let container = encode("k", &sample_key(), b"data").unwrap();
        let resolver = keyring_with("k", SymmetricKey::from_bytes([1u8; 32]));

        assert!(matches!(
            decode(&container, &resolver),
            Err(Error::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_garbage_after_padding_is_malformed() {
        let mut container = encode("k", &sample_key(), b"data").unwrap();
        container[100] = b'x';

        assert!(matches!(
            LfsContainer::parse(&container),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_header_is_malformed() {
        let mut container = encode("k", &sample_key(), b"data").unwrap();
        container[0] = 0xFF;

        assert!(matches!(
            peek_key_name(&container),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_resolver_sees_stripped_name() {
        let key = sample_key();
        let container = encode("SampleKey", &key, b"data").unwrap();

        let resolver = |name: &KeyName| {
            assert_eq!(name.as_bytes().len(), 9);
            Some(key.clone())
        };
        assert_eq!(decode(&container, &resolver).unwrap(), b"data");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_roundtrip(
            name in "[a-zA-Z0-9 _.-]{0,128}",
            key in any::<[u8; 32]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let key = SymmetricKey::from_bytes(key);
            let container = encode(&name, &key, &plaintext).unwrap();
            prop_assert_eq!(container.len(), MIN_CONTAINER_SIZE + plaintext.len());

            let decoded = decode(&container, &keyring_with(&name, key)).unwrap();
            prop_assert_eq!(decoded, plaintext);
        }

        #[test]
        fn prop_any_bit_flip_after_header_fails(
            plaintext in proptest::collection::vec(any::<u8>(), 0..64),
            offset in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = sample_key();
            let mut container = encode("k", &key, &plaintext).unwrap();

            let body_len = container.len() - KEY_NAME_FIELD_SIZE;
            let position = KEY_NAME_FIELD_SIZE + offset.index(body_len);
            container[position] ^= 1 << bit;

            prop_assert!(matches!(
                decode(&container, &keyring_with("k", key)),
                Err(Error::AuthenticationFailure)
            ));
        }
    }
}
