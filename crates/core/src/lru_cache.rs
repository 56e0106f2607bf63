/// An entry in the cache.
struct Entry<T> {
    epoch: u64,
    key: String,
    data: T,
}

/// A least-recently-used cache keyed by resolved resource keys.
///
/// Lookups scan the entries linearly, which stays cheap for the few hundred
/// external graphics a style set references.
pub(crate) struct LruCache<T> {
    entries: Vec<Entry<T>>,
    epoch: u64,
    max_entries: usize,
}

impl<T: Clone> LruCache<T> {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            epoch: 0,
            max_entries,
        }
    }

    /// Returns the entry for `key` and marks it as most recently used.
    pub(crate) fn get(&mut self, key: &str) -> Option<T> {
        self.epoch += 1;
        let epoch = self.epoch;
        let entry = self.entries.iter_mut().find(|e| e.key == key)?;
        entry.epoch = epoch;
        Some(entry.data.clone())
    }

    /// Inserts `data` under `key`, evicting the least recently used entry
    /// when the cache is full.
    pub(crate) fn insert(&mut self, key: &str, data: T) {
        if self.max_entries == 0 {
            return;
        }
        self.epoch += 1;
        let epoch = self.epoch;

        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.epoch = epoch;
            entry.data = data;
            return;
        }

        if self.entries.len() < self.max_entries {
            self.entries.push(Entry { epoch, key: key.to_string(), data });
            return;
        }

        let mut lowest_epoch = u64::MAX;
        let mut lowest_index = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.epoch < lowest_epoch {
                lowest_epoch = entry.epoch;
                lowest_index = i;
            }
        }
        let entry = &mut self.entries[lowest_index];
        entry.epoch = epoch;
        entry.key = key.to_string();
        entry.data = data;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
