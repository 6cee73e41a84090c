//! Container formats for moving photos between trusted endpoints.
//!
//! Two formats share the AES-256-GCM primitive from `locafoto-crypto`:
//! - [`lfs`]: compact binary container keyed by a named pre-shared key
//! - [`bundle`]: JSON bundle that carries its own key, wrapped under the
//!   recipient's RSA public key
//!
//! Pre-shared keys are provisioned as [`keyfile`] records and looked up
//! through a [`keyring::KeyResolver`].
//!
//! Every operation is a pure in-memory transformation. Nothing here reads or
//! writes files, and calls may run concurrently from any number of threads.

pub mod bundle;
pub mod keyfile;
pub mod keyring;
pub mod lfs;

pub use bundle::{Bundle, EncryptedPhoto, PhotoInfo, PhotoMetadata, BUNDLE_VERSION};
pub use keyfile::KeyFile;
pub use keyring::{KeyResolver, Keyring};
pub use lfs::LfsContainer;
