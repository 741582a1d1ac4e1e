//! One-time-secret vault for sealbox.
//!
//! This module provides:
//! - Seal and reveal orchestration with at-most-once semantics
//! - Handle layouts (split and combined) and their wire formats
//! - Random identifier generation
//! - Persisted store configuration with format versioning
//!
//! # Architecture
//! The vault sits between the request layer and the secret store,
//! handling all encryption/decryption and the one-time-use guarantee
//! transparently. Expiry is delegated to the store.

pub mod config;
pub mod handle;
pub mod locks;
pub mod record;
pub mod token;
pub mod vault;

pub use config::{
    HandleLayout, StoreConfig, StoreVersion, VaultOptions, STORE_CONFIG_FILENAME,
};
pub use handle::Handle;
pub use record::{KeyRecord, SecretRecord};
pub use token::{KEY_TOKEN_LEN, SECRET_ID_LEN};
pub use vault::Vault;
