// store.rs - Chained hash table keyed by document id

use crate::document::Document;
use crate::scan;

const DEFAULT_CAPACITY: usize = 16;
const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

/// One slot in a bucket chain. The entry owns its document; ownership moves
/// with the entry on rehash and returns to the caller on [`DocumentStore::remove`].
#[derive(Debug)]
pub struct StoreEntry {
    pub key: String,
    pub doc: Document,
}

/// Separate-chaining hash table mapping document id to [`Document`].
///
/// Keys are ASCII-trimmed before hashing and comparison. The load factor is
/// kept strictly below 0.75: crossing the threshold doubles the bucket array
/// and rehashes every entry. The hash is the 31-polynomial over the raw bytes
/// of the trimmed key, wrapping in 64 bits.
#[derive(Debug)]
pub struct DocumentStore {
    buckets: Vec<Vec<StoreEntry>>,
    size: usize,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = if initial_capacity > 0 {
            initial_capacity
        } else {
            DEFAULT_CAPACITY
        };
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, Vec::new);
        Self { buckets, size: 0 }
    }

    fn bucket_index(&self, cleaned_key: &str) -> usize {
        let mut hash: u64 = 0;
        for b in cleaned_key.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(u64::from(b));
        }
        (hash % self.buckets.len() as u64) as usize
    }

    /// Inserts or replaces. Replacing drops the previous document; inserting
    /// prepends a new entry at the head of its chain. The load-factor check
    /// runs before either path.
    pub fn put(&mut self, key: &str, doc: Document) {
        if self.size as f64 / self.buckets.len() as f64 >= LOAD_FACTOR_THRESHOLD {
            self.rehash();
        }

        let cleaned = scan::trim(key);
        let index = self.bucket_index(cleaned);
        if let Some(entry) = self.buckets[index].iter_mut().find(|e| e.key == cleaned) {
            entry.doc = doc;
        } else {
            self.buckets[index].insert(
                0,
                StoreEntry {
                    key: cleaned.to_string(),
                    doc,
                },
            );
            self.size += 1;
        }
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        let cleaned = scan::trim(key);
        let index = self.bucket_index(cleaned);
        self.buckets[index]
            .iter()
            .find(|e| e.key == cleaned)
            .map(|e| &e.doc)
    }

    /// Unlinks the entry and hands the document back to the caller.
    pub fn remove(&mut self, key: &str) -> Option<Document> {
        let cleaned = scan::trim(key);
        let index = self.bucket_index(cleaned);
        let position = self.buckets[index].iter().position(|e| e.key == cleaned)?;
        self.size -= 1;
        Some(self.buckets[index].remove(position).doc)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// The chain stored in bucket `index`. Walking every bucket visits each
    /// document exactly once; order is not stable across rehashes.
    pub fn bucket(&self, index: usize) -> &[StoreEntry] {
        &self.buckets[index]
    }

    /// Full scan over all bucket chains.
    pub fn iter(&self) -> impl Iterator<Item = &StoreEntry> {
        self.buckets.iter().flatten()
    }

    fn rehash(&mut self) {
        let new_capacity = self.buckets.len() * 2;
        let mut fresh = Vec::with_capacity(new_capacity);
        fresh.resize_with(new_capacity, Vec::new);
        let old_buckets = std::mem::replace(&mut self.buckets, fresh);

        log::debug!("Expanding document store, new capacity: {}", new_capacity);

        for bucket in old_buckets {
            for entry in bucket {
                let index = self.bucket_index(&entry.key);
                self.buckets[index].insert(0, entry);
            }
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
