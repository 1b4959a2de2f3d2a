//! Immutable value types of the index and their canonical encodings.
//!
//! - [`Entry`] -- a named reference to an object or a subtree
//! - [`Tree`] -- a sorted set of entries, addressed by its content
//! - [`Commit`] -- a snapshot of a root tree linked to its parent
//! - [`Branch`] / [`Repo`] -- the mutable records pointing into history

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lake_types::{hash_canonical, Address, ContentHash, HashDomain};

use crate::error::IndexResult;

/// Free-form commit metadata. Ordered so the encoding is canonical.
pub type Metadata = BTreeMap<String, String>;

/// What an [`Entry`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Object,
    Tree,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// A named leaf of a tree.
///
/// Object entries carry whatever address the caller assigned to the object
/// bytes (possibly none, since the index does not own them). Tree entries
/// always carry the address of the subtree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Entry {
    /// A new object entry with no address or metadata.
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Object,
            address: None,
            size: 0,
            timestamp: None,
        }
    }

    /// A tree entry pointing at a persisted subtree.
    pub fn tree(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Tree,
            address: Some(address),
            size: 0,
            timestamp: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_tree(&self) -> bool {
        self.entry_type == EntryType::Tree
    }

    /// Identity of the entry inside its tree.
    fn key(&self) -> (&str, EntryType) {
        (&self.name, self.entry_type)
    }
}

/// An ordered set of entries sharing a path prefix.
///
/// Entries are unique by `(name, type)` and kept sorted by that key, so a
/// tree's address never depends on insertion order. A name may appear once
/// as an object and once as a subtree: `a/foo` and `a/foo/bar` coexist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<Entry>,
}

impl Tree {
    /// Build a tree from entries in any order. Later duplicates win.
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut tree = Self::empty();
        for entry in entries {
            tree.upsert(entry);
        }
        tree
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by name and type.
    pub fn get(&self, name: &str, entry_type: EntryType) -> Option<&Entry> {
        self.position((name, entry_type))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Insert or replace the entry with the same name and type.
    pub fn upsert(&mut self, entry: Entry) {
        match self.position(entry.key()) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Remove an entry. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str, entry_type: EntryType) -> bool {
        match self.position((name, entry_type)) {
            Ok(i) => {
                self.entries.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Content address of this tree.
    pub fn address(&self, hasher: &dyn ContentHash) -> IndexResult<Address> {
        Ok(hash_canonical(hasher, HashDomain::Tree, &self.entries)?)
    }

    fn position(&self, key: (&str, EntryType)) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key().cmp(&key))
    }
}

/// An immutable snapshot of a root tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub address: Address,
    pub tree: Address,
    pub parent: Option<Address>,
    pub committer: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// The hashed fields of a commit; everything except the address itself.
#[derive(Serialize)]
struct CommitBody<'a> {
    tree: &'a Address,
    parent: &'a Option<Address>,
    committer: &'a str,
    message: &'a str,
    timestamp: &'a DateTime<Utc>,
    metadata: &'a Metadata,
}

impl Commit {
    /// Build a commit and compute its address.
    pub fn new(
        hasher: &dyn ContentHash,
        tree: Address,
        parent: Option<Address>,
        committer: impl Into<String>,
        message: impl Into<String>,
        metadata: Metadata,
        timestamp: DateTime<Utc>,
    ) -> IndexResult<Self> {
        let committer = committer.into();
        let message = message.into();
        let body = CommitBody {
            tree: &tree,
            parent: &parent,
            committer: &committer,
            message: &message,
            timestamp: &timestamp,
            metadata: &metadata,
        };
        let address = hash_canonical(hasher, HashDomain::Commit, &body)?;
        Ok(Self {
            address,
            tree,
            parent,
            committer,
            message,
            timestamp,
            metadata,
        })
    }

    /// Recompute the address from the other fields.
    pub fn verify(&self, hasher: &dyn ContentHash) -> IndexResult<bool> {
        let rebuilt = Self::new(
            hasher,
            self.tree,
            self.parent,
            self.committer.clone(),
            self.message.clone(),
            self.metadata.clone(),
            self.timestamp,
        )?;
        Ok(rebuilt.address == self.address)
    }
}

/// A mutable, named pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: Address,
}

/// A repository record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub id: String,
    pub default_branch: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_types::Blake3Hasher;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2020-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn tree_keeps_entries_sorted() {
        let tree = Tree::new(vec![
            Entry::object("zeta"),
            Entry::object("alpha"),
            Entry::object("mid"),
        ]);
        let names: Vec<&str> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn tree_address_is_order_independent() {
        let h = Blake3Hasher::new();
        let a = Tree::new(vec![Entry::object("x"), Entry::object("y")]);
        let b = Tree::new(vec![Entry::object("y"), Entry::object("x")]);
        assert_eq!(a.address(&h).unwrap(), b.address(&h).unwrap());
    }

    #[test]
    fn tree_address_depends_on_content() {
        let h = Blake3Hasher::new();
        let a = Tree::new(vec![Entry::object("x")]);
        let b = Tree::new(vec![Entry::object("x").with_size(1)]);
        assert_ne!(a.address(&h).unwrap(), b.address(&h).unwrap());
    }

    #[test]
    fn object_and_subtree_share_a_name() {
        let sub = Address::from_hash([9; 32]);
        let mut tree = Tree::new(vec![Entry::object("foo"), Entry::tree("foo", sub)]);
        assert_eq!(tree.len(), 2);
        assert!(tree.get("foo", EntryType::Object).is_some());
        assert_eq!(
            tree.get("foo", EntryType::Tree).and_then(|e| e.address),
            Some(sub)
        );
        assert!(tree.remove("foo", EntryType::Object));
        assert!(!tree.remove("foo", EntryType::Object));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn upsert_replaces_same_key() {
        let mut tree = Tree::new(vec![Entry::object("f")]);
        tree.upsert(Entry::object("f").with_size(42));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("f", EntryType::Object).map(|e| e.size), Some(42));
    }

    #[test]
    fn commit_address_is_deterministic_and_verifiable() {
        let h = Blake3Hasher::new();
        let tree = Address::from_hash([1; 32]);
        let c1 = Commit::new(&h, tree, None, "me", "msg", Metadata::new(), ts()).unwrap();
        let c2 = Commit::new(&h, tree, None, "me", "msg", Metadata::new(), ts()).unwrap();
        assert_eq!(c1.address, c2.address);
        assert!(c1.verify(&h).unwrap());

        let mut tampered = c1.clone();
        tampered.message = "other".into();
        assert!(!tampered.verify(&h).unwrap());
    }

    #[test]
    fn commit_address_covers_parent() {
        let h = Blake3Hasher::new();
        let tree = Address::from_hash([1; 32]);
        let root = Commit::new(&h, tree, None, "me", "m", Metadata::new(), ts()).unwrap();
        let child =
            Commit::new(&h, tree, Some(root.address), "me", "m", Metadata::new(), ts()).unwrap();
        assert_ne!(root.address, child.address);
    }

    #[test]
    fn entry_serializes_type_field() {
        let json = serde_json::to_string(&Entry::object("a")).unwrap();
        assert!(json.contains("\"type\":\"object\""));
        assert!(!json.contains("address"));
    }

    proptest::proptest! {
        #[test]
        fn tree_address_ignores_insertion_order(names in proptest::collection::btree_set("[a-z]{1,6}", 1..12)) {
            let h = Blake3Hasher::new();
            let forward: Vec<Entry> = names.iter().map(Entry::object).collect();
            let backward: Vec<Entry> = names.iter().rev().map(Entry::object).collect();
            proptest::prop_assert_eq!(
                Tree::new(forward).address(&h).unwrap(),
                Tree::new(backward).address(&h).unwrap()
            );
        }
    }
}
