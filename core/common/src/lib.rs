//! Common types shared across the Locafoto container crates.
//!
//! This module provides the error type every codec reports through and the
//! validated key identifier that names pre-shared keys.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{KeyName, MAX_KEY_NAME_LEN};
