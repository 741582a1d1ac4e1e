//! Random identifier generation.
//!
//! Every sealed secret is addressed by opaque tokens drawn from a fixed
//! alphanumeric alphabet. A storage identifier only needs to be
//! unguessable as an address; a key token doubles as a capability to
//! decrypt and carries twice the length.

use rand::{rngs::OsRng, RngCore};

use sealbox_common::{Error, Result};

/// Token alphabet: 62 alphanumeric symbols.
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a storage identifier (split layout).
pub const SECRET_ID_LEN: usize = 16;

/// Length of a key-capability token. Also the identifier length in the
/// combined layout, where the identifier alone grants decryption.
pub const KEY_TOKEN_LEN: usize = 32;

/// Largest multiple of the alphabet size that fits in a byte; bytes at or
/// above it are rejected so every symbol is equally likely.
const REJECT_THRESHOLD: u8 = (62 * 4) as u8;

/// Generate a random token of `len` symbols from [`ALPHABET`].
///
/// Uses rejection sampling over OS randomness so the distribution over the
/// alphabet is uniform.
///
/// # Errors
/// - `Error::Entropy` if the randomness source fails; fatal, callers must
///   not retry
pub fn generate(len: usize) -> Result<String> {
    let mut token = String::with_capacity(len);
    let mut buf = [0u8; 64];

    while token.len() < len {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| Error::Entropy(e.to_string()))?;

        for &byte in buf.iter() {
            if byte >= REJECT_THRESHOLD {
                continue;
            }
            token.push(ALPHABET[(byte % 62) as usize] as char);
            if token.len() == len {
                break;
            }
        }
    }

    Ok(token)
}

/// Check that `token` has exactly `len` symbols, all from [`ALPHABET`].
pub fn is_well_formed(token: &str, len: usize) -> bool {
    token.len() == len && token.bytes().all(|b| b.is_ascii_alphanumeric())
}
