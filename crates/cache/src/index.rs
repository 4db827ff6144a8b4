//! Name-keyed index of cache entries.
//!
//! Each name has at most one original entry plus any number of sized
//! copies, one per requested size.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entry::EntryId;
use crate::pixels::Dimensions;

#[derive(Debug, Default)]
struct Variants {
    original: Option<EntryId>,
    sized: BTreeMap<Dimensions, EntryId>,
}

impl Variants {
    fn is_empty(&self) -> bool {
        self.original.is_none() && self.sized.is_empty()
    }
}

/// Maps each `(name, size)` key to exactly one entry, ordered by name.
///
/// A size of `None` is the original image.
#[derive(Debug, Default)]
pub(crate) struct CacheIndex {
    nodes: BTreeMap<Arc<str>, Variants>,
    len: usize,
}

impl CacheIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The original entry for `name`.
    pub(crate) fn find(&self, name: &str) -> Option<EntryId> {
        self.nodes.get(name)?.original
    }

    /// The copy of `name` sized exactly `size`.
    pub(crate) fn find_sized(&self, name: &str, size: Dimensions) -> Option<EntryId> {
        self.nodes.get(name)?.sized.get(&size).copied()
    }

    fn find_key(&self, name: &str, size: Option<Dimensions>) -> Option<EntryId> {
        match size {
            Some(size) => self.find_sized(name, size),
            None => self.find(name),
        }
    }

    /// Inserts the key. Returns false and leaves the index untouched if it is
    /// already present.
    pub(crate) fn insert(&mut self, name: Arc<str>, size: Option<Dimensions>, id: EntryId) -> bool {
        if self.find_key(&name, size).is_some() {
            return false;
        }
        let variants = self.nodes.entry(name).or_default();
        match size {
            Some(size) => {
                variants.sized.insert(size, id);
            }
            None => variants.original = Some(id),
        }
        self.len += 1;
        true
    }

    /// Removes the key if it maps to `id`.
    pub(crate) fn remove(&mut self, name: &str, size: Option<Dimensions>, id: EntryId) -> bool {
        if self.find_key(name, size) != Some(id) {
            return false;
        }
        let Some(variants) = self.nodes.get_mut(name) else {
            return false;
        };
        match size {
            Some(size) => {
                variants.sized.remove(&size);
            }
            None => variants.original = None,
        }
        if variants.is_empty() {
            self.nodes.remove(name);
        }
        self.len -= 1;
        true
    }

    /// Number of entries, sized copies included.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct names in order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.keys().map(|name| &**name)
    }

    /// Entries in name order, each original before its sized copies.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, Option<Dimensions>, EntryId)> + '_ {
        self.nodes.iter().flat_map(|(name, variants)| {
            let name: &str = name;
            let original = variants.original.map(|id| (name, None, id));
            let sized = variants.sized.iter().map(move |(size, id)| (name, Some(*size), *id));
            original.into_iter().chain(sized)
        })
    }
}
