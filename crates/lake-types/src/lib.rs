//! Foundation types for the lake versioning index.
//!
//! Every other `lake-*` crate depends on this one for the identifier that
//! names immutable objects and for the hashing seam that produces it.
//!
//! # Key Types
//!
//! - [`Address`] -- 32-byte content address of a tree or commit
//! - [`ContentHash`] -- the hashing collaborator, `Hash(bytes) -> Address`
//! - [`Blake3Hasher`] -- the default, domain-separated BLAKE3 implementation
//! - [`HashDomain`] -- which kind of object is being hashed

pub mod address;
pub mod error;
pub mod hash;

pub use address::Address;
pub use error::TypeError;
pub use hash::{hash_canonical, Blake3Hasher, ContentHash, HashDomain};
