//! Content-addressed memoization: SHA-256 of inputs and parameters → result.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::table::{Table, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Incremental digest over tagged, length-prefixed fields.
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new(domain: &str) -> Self {
        let mut fingerprint = Fingerprint {
            hasher: Sha256::new(),
        };
        fingerprint.str(domain);
        fingerprint
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    pub fn str(&mut self, text: &str) -> &mut Self {
        self.bytes(text.as_bytes())
    }

    pub fn opt_str(&mut self, text: Option<&str>) -> &mut Self {
        match text {
            Some(text) => {
                self.hasher.update([1u8]);
                self.str(text)
            }
            None => {
                self.hasher.update([0u8]);
                self
            }
        }
    }

    pub fn value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Null => self.hasher.update([0u8]),
            Value::Int(int) => {
                self.hasher.update([1u8]);
                self.hasher.update(int.to_le_bytes());
            }
            Value::Float(float) => {
                self.hasher.update([2u8]);
                self.hasher.update(float.to_bits().to_le_bytes());
            }
            Value::Bool(flag) => self.hasher.update([3u8, *flag as u8]),
            Value::Text(text) => {
                self.hasher.update([4u8]);
                return self.str(text);
            }
        }
        self
    }

    pub fn table(&mut self, table: &Table) -> &mut Self {
        self.hasher.update((table.row_count() as u64).to_le_bytes());
        self.hasher.update((table.width() as u64).to_le_bytes());
        for (name, values) in table.columns() {
            self.str(name);
            for value in values {
                self.value(value);
            }
        }
        self
    }

    pub fn finish(self) -> CacheKey {
        CacheKey(hex::encode(self.hasher.finalize()))
    }
}

/// A keyed store of previously computed results.
#[derive(Debug)]
pub struct ContentCache<V> {
    name: &'static str,
    entries: HashMap<CacheKey, V>,
    hits: usize,
    misses: usize,
}

impl<V: Clone> ContentCache<V> {
    pub fn new(name: &'static str) -> Self {
        ContentCache {
            name,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                debug!(cache = self.name, key = key.as_str(), "cache hit");
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.entries.insert(key, value);
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    /// Failures are not cached.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: CacheKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
