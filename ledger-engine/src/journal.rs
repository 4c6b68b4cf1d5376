//! Append-only sequence
//!
//! `Journal<T>` is the storage for both the global transaction log and each
//! account's history. Its public contract is append plus reads: there is no
//! remove, insert-at-index, pop, truncate or mutable access, so history can
//! only grow.
//!
//! A journal is not synchronised on its own; it lives behind the lock of
//! whoever owns it (an account's mutex, the ledger's log mutex).

use serde::{Serialize, Serializer};
use std::ops::Index;
use std::slice;

/// Append-only ordered sequence
#[derive(Debug, Clone)]
pub struct Journal<T> {
    entries: Vec<T>,
}

impl<T> Journal<T> {
    /// Create empty journal
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry at the end, returning its position
    pub fn append(&mut self, entry: T) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    /// Iterate in append order
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Read-only view of all entries
    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }
}

impl<T: Clone> Journal<T> {
    /// Copy of all entries, for handing out beyond a lock
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.clone()
    }
}

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for Journal<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.entries[index]
    }
}

impl<'a, T> IntoIterator for &'a Journal<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize> Serialize for Journal<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut journal = Journal::new();
        assert!(journal.is_empty());

        assert_eq!(journal.append("a"), 0);
        assert_eq!(journal.append("b"), 1);
        assert_eq!(journal.append("c"), 2);

        assert_eq!(journal.len(), 3);
        assert_eq!(journal[0], "a");
        assert_eq!(journal.last(), Some(&"c"));
        assert_eq!(journal.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_copies_do_not_alias() {
        let mut journal = Journal::new();
        journal.append(1);
        journal.append(2);

        let mut copy = journal.to_vec();
        copy.pop();
        copy.insert(0, 99);
        copy.remove(1);

        assert_eq!(journal.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_get_out_of_range() {
        let journal: Journal<u8> = Journal::default();
        assert_eq!(journal.get(0), None);
        assert_eq!(journal.last(), None);
    }

    #[test]
    fn test_serializes_as_sequence() {
        let mut journal = Journal::new();
        journal.append(1u32);
        journal.append(2u32);
        assert_eq!(serde_json::to_string(&journal).unwrap(), "[1,2]");
    }
}
