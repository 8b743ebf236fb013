//! Key/value storage for the router and its transactional overlay

use std::collections::BTreeMap;

/// A byte key/value store
pub trait Store {
    /// The value under `key`
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Writes `value` under `key`
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Removes `key`
    fn delete(&mut self, key: &[u8]);

    /// Whether a value is stored under `key`
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Applies the writes of a committed [`Transaction`]
    fn apply(&mut self, writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>) {
        for (key, value) in writes {
            match value {
                Some(value) => self.set(key, value),
                None => self.delete(&key),
            }
        }
    }
}

/// An in-memory store ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// All entries, ordered by key
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.entries
    }
}

impl Store for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// Buffered writes over a read-only base store.
///
/// Reads see the transaction's own writes first. Dropping the transaction discards them;
/// [`Transaction::into_writes`] hands them to [`Store::apply`].
#[derive(Debug)]
pub struct Transaction<'a, S: Store + ?Sized> {
    base: &'a S,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: Store + ?Sized> Transaction<'a, S> {
    /// Starts an empty transaction over `base`
    pub const fn new(base: &'a S) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// The buffered writes in key order; `None` marks a deletion
    #[must_use]
    pub fn into_writes(self) -> BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        self.writes
    }
}

impl<S: Store + ?Sized> Store for Transaction<'_, S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_overlays_base() {
        let mut base = MemStore::default();
        base.set(b"a".to_vec(), b"1".to_vec());
        base.set(b"b".to_vec(), b"2".to_vec());

        let mut tx = Transaction::new(&base);
        tx.set(b"a".to_vec(), b"10".to_vec());
        tx.delete(b"b");
        tx.set(b"c".to_vec(), b"3".to_vec());

        assert_eq!(tx.get(b"a"), Some(b"10".to_vec()));
        assert!(!tx.has(b"b"));
        assert_eq!(tx.get(b"c"), Some(b"3".to_vec()));
        // base is untouched until applied
        assert_eq!(base.get(b"b"), Some(b"2".to_vec()));

        let writes = tx.into_writes();
        base.apply(writes);
        assert_eq!(
            base.entries(),
            &BTreeMap::from([
                (b"a".to_vec(), b"10".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
            ])
        );
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let base = MemStore::default();
        {
            let mut tx = Transaction::new(&base);
            tx.set(b"k".to_vec(), b"v".to_vec());
        }
        assert!(base.entries().is_empty());
    }
}
