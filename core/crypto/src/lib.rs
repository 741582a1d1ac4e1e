//! Cryptographic primitives for sealbox.
//!
//! This module provides:
//! - Per-secret key generation with automatic zeroization
//! - A transportable exported-key form (JWK-style symmetric key object)
//! - Authenticated encryption using AES-256-GCM
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No key material is ever logged or exposed through `Debug`
//! - Every encryption draws a fresh random nonce, and a key encrypts
//!   exactly one message, so a (key, nonce) pair can never repeat

pub mod aead;
pub mod keys;

pub use aead::{decrypt, encrypt, NONCE_SIZE, TAG_SIZE};
pub use keys::{ExportedKey, SecretKey, KEY_LENGTH};
