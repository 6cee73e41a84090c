//! Resolution of key identifiers to pre-shared keys.

use std::collections::HashMap;

use locafoto_common::{KeyName, Result};
use locafoto_crypto::SymmetricKey;

use crate::keyfile::KeyFile;

/// Looks up the pre-shared key named in an LFS header.
///
/// Returning `None` makes the decode fail with `UnknownKey`.
pub trait KeyResolver {
    /// Resolve a key identifier to its key.
    fn resolve(&self, name: &KeyName) -> Option<SymmetricKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&KeyName) -> Option<SymmetricKey>,
{
    fn resolve(&self, name: &KeyName) -> Option<SymmetricKey> {
        self(name)
    }
}

/// In-memory set of named pre-shared keys.
///
/// Keys are zeroized when the keyring is dropped.
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<KeyName, SymmetricKey>,
}

impl Keyring {
    /// Create a new empty keyring.
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Add a key, replacing any previous key of the same name.
    ///
    /// Returns true if a key with this name was already present.
    pub fn insert(&mut self, name: KeyName, key: SymmetricKey) -> bool {
        self.keys.insert(name, key).is_some()
    }

    /// Add the key carried by a decoded key file.
    ///
    /// # Errors
    /// - `KeyNameTooLong` or `InvalidKeyName` if the file's name cannot be
    ///   used as an LFS identifier
    pub fn insert_key_file(&mut self, file: KeyFile) -> Result<bool> {
        let name = KeyName::new(file.name)?;
        Ok(self.insert(name, file.key))
    }

    /// Check if a key with this name is present.
    pub fn contains(&self, name: &KeyName) -> bool {
        self.keys.contains_key(name)
    }

    /// Remove a key, returning whether it was present.
    pub fn remove(&mut self, name: &KeyName) -> bool {
        self.keys.remove(name).is_some()
    }

    /// Names of all keys, sorted.
    pub fn names(&self) -> Vec<&KeyName> {
        let mut names: Vec<_> = self.keys.keys().collect();
        names.sort();
        names
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the keyring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for Keyring {
    fn resolve(&self, name: &KeyName) -> Option<SymmetricKey> {
        self.keys.get(name).cloned()
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").field("names", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locafoto_common::Error;

    fn name(s: &str) -> KeyName {
        KeyName::new(s).unwrap()
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let mut keyring = Keyring::new();
        let key = SymmetricKey::from_bytes([3u8; 32]);
        assert!(!keyring.insert(name("family"), key.clone()));

        assert_eq!(keyring.resolve(&name("family")), Some(key));
        assert_eq!(keyring.resolve(&name("work")), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut keyring = Keyring::new();
        keyring.insert(name("k"), SymmetricKey::from_bytes([1u8; 32]));
        assert!(keyring.insert(name("k"), SymmetricKey::from_bytes([2u8; 32])));

        assert_eq!(keyring.len(), 1);
        assert_eq!(
            keyring.resolve(&name("k")),
            Some(SymmetricKey::from_bytes([2u8; 32]))
        );
    }

    #[test]
    fn test_insert_key_file_validates_name() {
        let mut keyring = Keyring::new();
        let file = KeyFile {
            name: "x".repeat(129),
            key: SymmetricKey::generate(),
        };

        assert!(matches!(
            keyring.insert_key_file(file),
            Err(Error::KeyNameTooLong { .. })
        ));
        assert!(keyring.is_empty());
    }

    #[test]
    fn test_names_sorted_and_remove() {
        let mut keyring = Keyring::new();
        keyring.insert(name("b"), SymmetricKey::generate());
        keyring.insert(name("a"), SymmetricKey::generate());

        let names: Vec<&str> = keyring.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        assert!(keyring.remove(&name("a")));
        assert!(!keyring.contains(&name("a")));
        assert!(!keyring.remove(&name("a")));
    }

    #[test]
    fn test_closure_resolver() {
        let key = SymmetricKey::from_bytes([5u8; 32]);
        let resolver = |n: &KeyName| (n.as_str() == "only").then(|| key.clone());

        assert!(resolver.resolve(&name("only")).is_some());
        assert!(resolver.resolve(&name("other")).is_none());
    }

    #[test]
    fn test_debug_shows_names_only() {
        let mut keyring = Keyring::new();
        keyring.insert(name("SampleKey"), SymmetricKey::from_bytes([0x41; 32]));

        let debug = format!("{:?}", keyring);
        assert!(debug.contains("SampleKey"));
        assert!(!debug.contains("65"));
    }
}
