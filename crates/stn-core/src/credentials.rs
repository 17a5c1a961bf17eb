//! Credential generation: public identifiers and symmetric keys.

use rand_core::{OsRng, RngCore};
use regex::Regex;
use std::sync::OnceLock;

use crate::{errors::Error, Result};

/// Fresh random public id: a v4 UUID rendered as 32 lowercase hex characters.
pub fn new_public_id() -> Result<String> {
    let mut bytes = [0u8; 16];
    fill_random(&mut bytes)?;
    let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Ok(id.simple().to_string())
}

/// 32 random bytes, hex-encoded to 64 characters.
///
/// Only the OS CSPRNG is used; if it fails the caller gets `Error::Entropy`.
pub fn new_symmetric_key() -> Result<String> {
    let mut key = [0u8; 32];
    fill_random(&mut key)?;
    Ok(hex::encode(key))
}

/// Cheap shape check used before hitting the store with an arbitrary path segment.
pub fn is_well_formed_public_id(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[0-9a-f]{32}$").expect("valid regex"))
        .is_match(s)
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::Entropy(e.to_string()))
}
