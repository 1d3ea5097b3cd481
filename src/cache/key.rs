//! Cache key derivation.
//!
//! Keys are `catalog:` followed by the hex MD5 digest of a canonical request
//! identity. Identical identities always produce the same key.

const KEY_PREFIX: &str = "catalog:";

pub fn derive_key(canonical_identity: &str) -> String {
    let digest = md5::compute(canonical_identity.as_bytes());
    format!("{}{}", KEY_PREFIX, hex::encode(digest.0))
}
