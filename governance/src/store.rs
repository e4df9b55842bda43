//! Local replicas of the two peer-to-peer data stores.
//!
//! Entries are keyed by a locally computed content hash, so a payload
//! delivered twice is stored once and a key can never point at different
//! content.

use dao_types::Digest;
use std::collections::BTreeMap;

pub trait ContentHash {
    fn content_hash(&self) -> Result<Digest, bincode::Error>;
}

/// Mutable store: entries may be removed by their owner.
#[derive(Clone, Debug)]
pub struct HashMapStore<T> {
    entries: BTreeMap<Digest, T>,
}

impl<T> Default for HashMapStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: ContentHash> HashMapStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry's hash and whether it was new.
    pub fn add(&mut self, item: T) -> Result<(Digest, bool), bincode::Error> {
        let hash = item.content_hash()?;
        let is_new = !self.entries.contains_key(&hash);
        if is_new {
            self.entries.insert(hash, item);
        }
        Ok((hash, is_new))
    }

    pub fn remove(&mut self, hash: &Digest) -> Option<T> {
        self.entries.remove(hash)
    }

    pub fn get(&self, hash: &Digest) -> Option<&T> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Digest, &T)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn retain(&mut self, f: impl FnMut(&Digest, &mut T) -> bool) {
        self.entries.retain(f);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Grow-only store. There is no removal.
#[derive(Clone, Debug)]
pub struct AppendOnlyStore<T> {
    entries: BTreeMap<Digest, T>,
}

impl<T> Default for AppendOnlyStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: ContentHash> AppendOnlyStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry's hash and whether it was new.
    pub fn add(&mut self, item: T) -> Result<(Digest, bool), bincode::Error> {
        let hash = item.content_hash()?;
        if self.entries.contains_key(&hash) {
            return Ok((hash, false));
        }
        self.entries.insert(hash, item);
        Ok((hash, true))
    }

    pub fn get(&self, hash: &Digest) -> Option<&T> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
