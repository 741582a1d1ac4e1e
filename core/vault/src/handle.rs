//! Externally visible secret references.

use std::fmt;

use crate::config::HandleLayout;
use crate::token::{self, KEY_TOKEN_LEN, SECRET_ID_LEN};
use sealbox_common::{Error, Result};

/// The reference returned by seal and required by reveal.
///
/// In the split layout `id` addresses the ciphertext record and `key` is
/// the independent token addressing the key record; both are required to
/// decrypt. In the combined layout `id` is the only token and `key` is
/// absent.
#[derive(Clone, PartialEq, Eq)]
pub struct Handle {
    /// Storage identifier of the ciphertext record.
    pub id: String,
    /// Key-capability token (split layout only).
    pub key: Option<String>,
}

impl Handle {
    /// Build a combined-layout handle.
    pub fn single(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
        }
    }

    /// Build a split-layout handle.
    pub fn split(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: Some(key.into()),
        }
    }

    /// Check this handle's shape against a layout.
    ///
    /// # Errors
    /// - `Error::Validation` if a token has the wrong length or alphabet,
    ///   a key token is missing for the split layout, or one is supplied
    ///   for the combined layout
    pub fn validate(&self, layout: HandleLayout) -> Result<()> {
        match layout {
            HandleLayout::Split => {
                if !token::is_well_formed(&self.id, SECRET_ID_LEN) {
                    return Err(Error::Validation(format!(
                        "identifier must be {} alphanumeric characters",
                        SECRET_ID_LEN
                    )));
                }
                match &self.key {
                    Some(key) if token::is_well_formed(key, KEY_TOKEN_LEN) => Ok(()),
                    Some(_) => Err(Error::Validation(format!(
                        "key token must be {} alphanumeric characters",
                        KEY_TOKEN_LEN
                    ))),
                    None => Err(Error::Validation(
                        "this store requires both an identifier and a key token".to_string(),
                    )),
                }
            }
            HandleLayout::Combined => {
                if !token::is_well_formed(&self.id, KEY_TOKEN_LEN) {
                    return Err(Error::Validation(format!(
                        "identifier must be {} alphanumeric characters",
                        KEY_TOKEN_LEN
                    )));
                }
                if self.key.is_some() {
                    return Err(Error::Validation(
                        "this store does not use a separate key token".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

// The key token is a decryption capability; it never reaches logs.
impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id16() -> String {
        "a".repeat(SECRET_ID_LEN)
    }

    fn token32() -> String {
        "b".repeat(KEY_TOKEN_LEN)
    }

    #[test]
    fn test_split_handle_validates() {
        let handle = Handle::split(id16(), token32());
        assert!(handle.validate(HandleLayout::Split).is_ok());
    }

    #[test]
    fn test_combined_handle_validates() {
        let handle = Handle::single(token32());
        assert!(handle.validate(HandleLayout::Combined).is_ok());
    }

    #[test]
    fn test_split_requires_key_token() {
        let handle = Handle::single(id16());
        assert!(matches!(
            handle.validate(HandleLayout::Split),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_combined_rejects_key_token() {
        let handle = Handle::split(token32(), token32());
        assert!(matches!(
            handle.validate(HandleLayout::Combined),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let handle = Handle::split(token32(), token32());
        assert!(handle.validate(HandleLayout::Split).is_err());

        let handle = Handle::split(id16(), id16());
        assert!(handle.validate(HandleLayout::Split).is_err());

        let handle = Handle::single(id16());
        assert!(handle.validate(HandleLayout::Combined).is_err());
    }

    #[test]
    fn test_debug_redacts_key_token() {
        let handle = Handle::split(id16(), "supersecrettoken");
        let debug = format!("{:?}", handle);

        assert!(!debug.contains("supersecrettoken"));
        assert!(debug.contains(&id16()));
    }
}
