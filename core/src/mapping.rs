//! Read-only lookup over a loaded dictionary.
//!
//! A `Mapping` owns one sorted array and never mutates it, so it can be
//! shared between threads (e.g. behind an `Arc`) without locking. Asking
//! for a key that was never built is answered with `None`; that is not an
//! error.

use std::borrow::Borrow;
use std::path::Path;

use serde::Serialize;

use crate::codec::{load_dictionary, save_dictionary};
use crate::error::Result;
use crate::record::{Association, Record};
use crate::sorted_array::{DictKey, SortedArray};
use crate::{Term, Vertex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping<K, C> {
    array: SortedArray<K, C>,
}

/// Term -> vertices, loaded from a `.wic` file.
pub type TermMapping = Mapping<Term, Vertex>;

/// Vertex -> terms, loaded from an `.iwc` file.
pub type VertexMapping = Mapping<Vertex, Term>;

/// One flattened (term, vertex, count) association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TermVertexCount {
    pub term: Term,
    pub vertex: Vertex,
    pub count: u32,
}

impl<K: DictKey, C: DictKey> Mapping<K, C> {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            array: load_dictionary(path)?,
        })
    }

    pub fn from_array(array: SortedArray<K, C>) -> Self {
        Self { array }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_dictionary(&self.array, path)
    }

    /// Associations for `key`, `None` if the key was never observed.
    pub fn lookup<Q>(&self, key: &Q) -> Option<&[Association<C>]>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.array.entries(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.array.find(key).is_some()
    }

    /// How often `counterpart` was seen with `key`.
    pub fn count<Q>(&self, key: &Q, counterpart: &C) -> u32
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.array
            .get(key)
            .map(|r| r.count_of(counterpart))
            .unwrap_or(0)
    }

    pub fn total_occurrences<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.array.get(key).map(Record::total_count).unwrap_or(0)
    }

    /// Associations for `key`, most frequent first; ties by counterpart.
    pub fn ranked<Q>(&self, key: &Q) -> Option<Vec<Association<C>>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut entries = self.lookup(key)?.to_vec();
        entries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.counterpart.cmp(&b.counterpart))
        });
        Some(entries)
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.array.keys()
    }

    pub fn records(&self) -> &[Record<K, C>] {
        self.array.records()
    }

    pub fn array(&self) -> &SortedArray<K, C> {
        &self.array
    }

    pub fn into_array(self) -> SortedArray<K, C> {
        self.array
    }
}

impl TermMapping {
    pub fn vertices_for(&self, term: &str) -> Option<&[Association<Vertex>]> {
        self.lookup(term)
    }

    pub fn triples(&self) -> impl Iterator<Item = TermVertexCount> + '_ {
        self.array.iter().flat_map(|r| {
            r.entries().iter().map(move |e| TermVertexCount {
                term: r.key().clone(),
                vertex: e.counterpart,
                count: e.count,
            })
        })
    }
}

impl VertexMapping {
    pub fn terms_for(&self, vertex: Vertex) -> Option<&[Association<Term>]> {
        self.lookup(&vertex)
    }

    pub fn triples(&self) -> impl Iterator<Item = TermVertexCount> + '_ {
        self.array.iter().flat_map(|r| {
            r.entries().iter().map(move |e| TermVertexCount {
                term: e.counterpart.clone(),
                vertex: *r.key(),
                count: e.count,
            })
        })
    }
}
