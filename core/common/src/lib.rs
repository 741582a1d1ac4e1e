//! Common error types shared across sealbox crates.
//!
//! Every crate in the workspace reports failures through the one error
//! taxonomy defined here, so outcomes keep their meaning across the
//! crypto/store/vault boundaries.

pub mod error;

pub use error::{Error, Result};
