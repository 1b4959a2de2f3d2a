use std::fmt;

use serde::Serialize;

use crate::address::Address;
use crate::error::TypeError;

/// The kind of object being addressed.
///
/// Each domain contributes its own tag to the digest, so a tree and a commit
/// with byte-identical encodings still receive different addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashDomain {
    Tree,
    Commit,
}

impl HashDomain {
    /// The tag mixed into every digest of this domain.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Tree => "lake-tree-v1",
            Self::Commit => "lake-commit-v1",
        }
    }
}

impl fmt::Display for HashDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The hashing collaborator: `Hash(serialized) -> Address`.
///
/// Implementations must be deterministic and stable across process
/// restarts; the index persists addresses and compares them later.
pub trait ContentHash: Send + Sync {
    /// Digest already-serialized bytes.
    fn hash(&self, domain: HashDomain, data: &[u8]) -> Address;
}

/// Serialize `value` canonically (JSON) and digest it.
///
/// Callers are responsible for using ordered containers so the encoding is
/// canonical.
pub fn hash_canonical<T: Serialize + ?Sized>(
    hasher: &dyn ContentHash,
    domain: HashDomain,
    value: &T,
) -> Result<Address, TypeError> {
    let data = serde_json::to_vec(value).map_err(|e| TypeError::Encoding(e.to_string()))?;
    Ok(hasher.hash(domain, &data))
}

/// Domain-separated BLAKE3 hasher.
///
/// The digest covers `tag ":" data`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHash for Blake3Hasher {
    fn hash(&self, domain: HashDomain, data: &[u8]) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.tag().as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Address::from_hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn hash_is_deterministic() {
        let h = Blake3Hasher::new();
        assert_eq!(
            h.hash(HashDomain::Tree, b"entries"),
            h.hash(HashDomain::Tree, b"entries")
        );
    }

    #[test]
    fn domains_are_separated() {
        let h = Blake3Hasher::new();
        assert_ne!(
            h.hash(HashDomain::Tree, b"same"),
            h.hash(HashDomain::Commit, b"same")
        );
    }

    #[test]
    fn digest_differs_from_plain_blake3() {
        let h = Blake3Hasher::new();
        let plain = *blake3::hash(b"data").as_bytes();
        assert_ne!(h.hash(HashDomain::Commit, b"data").as_bytes(), &plain);
    }

    #[test]
    fn canonical_hash_ignores_map_insertion_order() {
        let h = Blake3Hasher::new();
        let mut a = BTreeMap::new();
        a.insert("x", 1);
        a.insert("y", 2);
        let mut b = BTreeMap::new();
        b.insert("y", 2);
        b.insert("x", 1);
        assert_eq!(
            hash_canonical(&h, HashDomain::Commit, &a).unwrap(),
            hash_canonical(&h, HashDomain::Commit, &b).unwrap()
        );
    }

    proptest::proptest! {
        #[test]
        fn different_payloads_rarely_collide(a in ".{0,64}", b in ".{0,64}") {
            proptest::prop_assume!(a != b);
            let h = Blake3Hasher::new();
            proptest::prop_assert_ne!(
                h.hash(HashDomain::Tree, a.as_bytes()),
                h.hash(HashDomain::Tree, b.as_bytes())
            );
        }
    }
}
