//! Common types used throughout Locafoto.

use std::fmt;

/// Maximum UTF-8 byte length of a key identifier.
///
/// This is also the width of the LFS header field the identifier is packed
/// into.
pub const MAX_KEY_NAME_LEN: usize = 128;

/// Identifier naming a pre-shared symmetric key.
///
/// Any UTF-8 string of at most [`MAX_KEY_NAME_LEN`] bytes is accepted, except
/// that NUL bytes are rejected: the LFS header pads with zeros, so an embedded
/// NUL would make the stored name ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyName(String);

impl KeyName {
    /// Create a new KeyName from a string.
    ///
    /// # Errors
    /// - `KeyNameTooLong` if the UTF-8 encoding exceeds 128 bytes
    /// - `InvalidKeyName` if the name contains a NUL byte
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.len() > MAX_KEY_NAME_LEN {
            return Err(crate::Error::KeyNameTooLong {
                len: name.len(),
                max: MAX_KEY_NAME_LEN,
            });
        }
        if name.contains('\0') {
            return Err(crate::Error::InvalidKeyName(
                "Key name cannot contain NUL bytes".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the UTF-8 bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for KeyName {
    type Error = crate::Error;

    fn try_from(value: &str) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for KeyName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}
