//! Sorted keyed collection.
//!
//! `SortedArray<K, C>` holds one [`Record`] per distinct key, strictly
//! increasing under `K`'s `Ord`. Both sorting and searching go through that
//! one ordering, so the array can never be searched with a comparator other
//! than the one it was sorted with.
//!
//! After [`SortedArray::allocate`] the key set is frozen: records can gain
//! associations but no key is ever added, removed or changed.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DictError, Result};
use crate::record::{Association, Record};

/// Bounds every dictionary key and counterpart type satisfies.
pub trait DictKey:
    Ord + Hash + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> DictKey for T where
    T: Ord + Hash + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedArray<K, C> {
    records: Vec<Record<K, C>>,
}

impl<K: Ord, C> SortedArray<K, C> {
    /// One empty record per distinct key, sorted ascending.
    ///
    /// Duplicate keys collapse into one record. Fails when `keys` is empty.
    pub fn allocate<I: IntoIterator<Item = K>>(keys: I) -> Result<Self> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(DictError::EmptyDictionary);
        }
        keys.sort_unstable();
        keys.dedup();
        Ok(Self {
            records: keys.into_iter().map(Record::new).collect(),
        })
    }

    /// Adopt records that are already in key order.
    pub fn from_sorted(records: Vec<Record<K, C>>) -> Result<Self> {
        if records.is_empty() {
            return Err(DictError::EmptyDictionary);
        }
        if let Some(pos) = records.windows(2).position(|w| w[0].key() >= w[1].key()) {
            return Err(DictError::Unsorted { index: pos + 1 });
        }
        Ok(Self { records })
    }

    /// Binary search for `key`; `None` when absent.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.records
            .binary_search_by(|r| r.key().borrow().cmp(key))
            .ok()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&Record<K, C>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|i| &self.records[i])
    }

    pub fn record(&self, index: usize) -> Option<&Record<K, C>> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<K, C>] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record<K, C>> {
        self.records.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.records.iter().map(Record::key)
    }

    /// Smallest and largest key.
    pub fn key_range(&self) -> Option<(&K, &K)> {
        Some((self.records.first()?.key(), self.records.last()?.key()))
    }
}

impl<K: Ord, C: PartialEq> SortedArray<K, C> {
    /// Record `counterpart` on the record for `key`.
    ///
    /// Returns false, leaving the array untouched, when `key` was never
    /// allocated.
    pub fn record_occurrence<Q>(&mut self, key: &Q, counterpart: C) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            Some(i) => {
                self.records[i].record_occurrence(counterpart);
                true
            }
            None => false,
        }
    }

    /// Associations for `key`.
    pub fn entries<Q>(&self, key: &Q) -> Option<&[Association<C>]>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).map(Record::entries)
    }
}

impl<'a, K, C> IntoIterator for &'a SortedArray<K, C> {
    type Item = &'a Record<K, C>;
    type IntoIter = std::slice::Iter<'a, Record<K, C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::cmp::Ordering;

    #[test]
    fn allocate_sorts_and_dedups() {
        let arr: SortedArray<String, u32> =
            SortedArray::allocate(["dog", "cat", "eel", "cat"].map(String::from)).unwrap();
        let keys: Vec<&str> = arr.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["cat", "dog", "eel"]);
        assert!(arr.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn allocate_rejects_empty_key_set() {
        let err = SortedArray::<u32, String>::allocate(Vec::new()).unwrap_err();
        assert!(matches!(err, DictError::EmptyDictionary));
    }

    #[test]
    fn vertex_keys_sort_numerically() {
        let arr: SortedArray<u32, String> = SortedArray::allocate([100, 9, 20]).unwrap();
        assert_eq!(arr.keys().copied().collect::<Vec<_>>(), vec![9, 20, 100]);
        assert_eq!(arr.key_range(), Some((&9, &100)));
    }

    #[test]
    fn find_present_and_absent() {
        let arr: SortedArray<String, u32> =
            SortedArray::allocate(["b", "d", "f"].map(String::from)).unwrap();
        assert_eq!(arr.find("b"), Some(0));
        assert_eq!(arr.find("f"), Some(2));
        // below, between, above the key range
        assert_eq!(arr.find("a"), None);
        assert_eq!(arr.find("c"), None);
        assert_eq!(arr.find("z"), None);
    }

    #[test]
    fn record_occurrence_only_touches_known_keys() {
        let mut arr: SortedArray<u32, String> = SortedArray::allocate([1, 2]).unwrap();
        assert!(arr.record_occurrence(&1, "cat".to_string()));
        assert!(arr.record_occurrence(&1, "cat".to_string()));
        assert!(!arr.record_occurrence(&3, "eel".to_string()));
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.entries(&1).unwrap()[0].count, 2);
        assert!(arr.entries(&2).unwrap().is_empty());
    }

    #[test]
    fn from_sorted_rejects_out_of_order_and_duplicates() {
        let recs = vec![Record::<u32, u32>::new(2), Record::new(1)];
        assert!(matches!(
            SortedArray::from_sorted(recs),
            Err(DictError::Unsorted { index: 1 })
        ));
        let recs = vec![Record::<u32, u32>::new(1), Record::new(4), Record::new(4)];
        assert!(matches!(
            SortedArray::from_sorted(recs),
            Err(DictError::Unsorted { index: 2 })
        ));
    }

    thread_local! {
        static COMPARISONS: Cell<u32> = const { Cell::new(0) };
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Counted(u32);

    impl PartialOrd for Counted {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Counted {
        fn cmp(&self, other: &Self) -> Ordering {
            COMPARISONS.with(|c| c.set(c.get() + 1));
            self.0.cmp(&other.0)
        }
    }

    #[test]
    fn search_uses_logarithmic_comparisons() {
        let n = 1u32 << 12;
        let arr: SortedArray<Counted, u32> =
            SortedArray::allocate((0..n).map(|i| Counted(i * 2))).unwrap();
        // ceil(log2(4096)) + 1
        let bound = 13;
        for target in [0, 2, n, 2 * n - 2, 1, 2 * n + 10] {
            COMPARISONS.with(|c| c.set(0));
            let found = arr.find(&Counted(target));
            let used = COMPARISONS.with(|c| c.get());
            assert!(used <= bound, "{} comparisons for {}", used, target);
            assert_eq!(found.is_some(), target % 2 == 0 && target < 2 * n);
        }
    }
}
