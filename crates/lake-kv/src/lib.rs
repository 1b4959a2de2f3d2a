//! Transactional key-value storage for the lake versioning index.
//!
//! The index never owns object bytes and never keeps authoritative state in
//! process memory: every branch pointer, workspace entry, tree, and commit
//! lives in a [`KvStore`]. This crate defines that collaborator and ships an
//! in-memory implementation.
//!
//! # Contract
//!
//! - [`KvStore::begin`] opens a [`KvTxn`] offering get/set/delete/scan.
//! - A transaction sees its own writes.
//! - [`KvTxn::commit`] applies every write atomically, or fails with
//!   [`KvError::Conflict`] if anything the transaction read changed since it
//!   was read. Dropping a transaction aborts it.
//! - [`KvTxn::validate`] runs the same check without committing.
//! - [`transact`] wraps begin/run/commit for closures.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{KvError, KvResult};
pub use memory::InMemoryKvStore;
pub use traits::{transact, KvPair, KvStore, KvTxn};
