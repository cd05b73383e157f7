/*!
Record: one dictionary key and the counterparts observed with it.

A record is created with an empty association list when the sorted array is
allocated, and only ever grows afterwards:

- `record_occurrence` bumps the count of a counterpart already present, or
  appends it with count 1
- there is no removal; counts only increase (saturating at `u32::MAX`)

The scan is linear in the fan-out of one key, which stays small for the
corpora this is built for.
*/

use serde::{Deserialize, Serialize};

/// A counterpart together with how many times it was seen next to the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association<C> {
    pub counterpart: C,
    pub count: u32,
}

impl<C> Association<C> {
    pub fn new(counterpart: C, count: u32) -> Self {
        Self { counterpart, count }
    }
}

/// Key plus association list. The key is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<K, C> {
    key: K,
    entries: Vec<Association<C>>,
}

impl<K, C> Record<K, C> {
    /// Create a record with no associations.
    pub fn new(key: K) -> Self {
        Self {
            key,
            entries: Vec::new(),
        }
    }

    /// Rebuild a record from persisted parts.
    pub(crate) fn from_parts(key: K, entries: Vec<Association<C>>) -> Self {
        Self { key, entries }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn entries(&self) -> &[Association<C>] {
        &self.entries
    }

    /// Number of distinct counterparts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts on this record.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count as u64).sum()
    }
}

impl<K, C: PartialEq> Record<K, C> {
    /// Count one more sighting of `counterpart`.
    pub fn record_occurrence(&mut self, counterpart: C) {
        if let Some(e) = self.entries.iter_mut().find(|e| e.counterpart == counterpart) {
            e.count = e.count.saturating_add(1);
        } else {
            self.entries.push(Association::new(counterpart, 1));
        }
    }

    /// Count stored for `counterpart`, 0 when never seen.
    pub fn count_of(&self, counterpart: &C) -> u32 {
        self.entries
            .iter()
            .find(|e| &e.counterpart == counterpart)
            .map(|e| e.count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_appends_with_count_one() {
        let mut r: Record<String, u32> = Record::new("cat".to_string());
        assert!(r.is_empty());
        r.record_occurrence(7);
        assert_eq!(r.entries(), &[Association::new(7, 1)]);
    }

    #[test]
    fn repeat_increments_in_place() {
        let mut r: Record<u32, String> = Record::new(1);
        r.record_occurrence("cat".to_string());
        r.record_occurrence("dog".to_string());
        r.record_occurrence("cat".to_string());
        assert_eq!(r.len(), 2);
        assert_eq!(r.count_of(&"cat".to_string()), 2);
        assert_eq!(r.count_of(&"dog".to_string()), 1);
        assert_eq!(r.count_of(&"eel".to_string()), 0);
        assert_eq!(r.total_count(), 3);
        // first-seen order is kept
        assert_eq!(r.entries()[0].counterpart, "cat");
    }

    #[test]
    fn count_saturates() {
        let mut r: Record<u32, u32> = Record::from_parts(1, vec![Association::new(2, u32::MAX)]);
        r.record_occurrence(2);
        assert_eq!(r.count_of(&2), u32::MAX);
    }
}
