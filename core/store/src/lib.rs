//! Expiring key-value storage for sealbox.
//!
//! This module provides a trait-based interface for the record store the
//! vault persists into, and a backend registry for dynamic resolution.
//!
//! # Design Principles
//! - Backend isolation: no backend-specific logic in vault or crypto modules
//! - The store, not the vault, is the authority on expiry
//! - A deleted or expired record is gone: `get` after `delete`, and `get`
//!   after the TTL elapses, both report absence

pub mod dir;
pub mod memory;
pub mod registry;
pub mod store;

pub use dir::DirStore;
pub use memory::MemoryStore;
pub use registry::{create_default_registry, StoreFactory, StoreRegistry};
pub use store::SecretStore;
