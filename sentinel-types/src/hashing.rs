//! SHA-256 hashing helpers shared by the data model.
//!
//! `message_hash`, `pattern_hash`, and `config_hash` (§3) are all a 64-hex
//! prefix of a SHA-256 digest — which for SHA-256 is simply the full hex
//! digest, since it is already 64 hex characters. The helpers here exist so
//! every call site agrees on that encoding rather than re-deriving it.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `input`, truncated to 64 hex characters.
///
/// SHA-256 digests are 32 bytes (64 hex chars), so the truncation is a
/// no-op today; it is kept explicit because §3 specifies the stored column
/// as a "64-hex prefix" rather than "the digest", and a future hash swap
/// must preserve the truncation contract.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let full = hex::encode(digest);
    full.chars().take(64).collect()
}

/// Pattern hash per §3: SHA-256 of `lowercase(trim(text))`.
#[must_use]
pub fn pattern_hash(text: &str) -> String {
    sha256_hex(&text.trim().to_lowercase())
}
