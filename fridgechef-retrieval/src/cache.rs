//! TTL result cache
//!
//! A small in-process cache for retrieval results. Entries expire
//! lazily: an expired entry is dropped the first time a reader finds
//! it. There is no size bound and no background sweeper.

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::Result;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Cache keyed by operation strings, holding cloneable values
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch a live entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }
        entries.remove(key);
        None
    }

    /// Insert or overwrite, resetting the entry's lifetime
    pub fn set(&self, key: String, value: V) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Number of entries, including any not yet swept
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Derive a cache key from an operation kind and its parameters
///
/// The parameters are serialized to JSON and hashed, so any
/// serializable struct works. Equal parameters always produce equal
/// keys; the kind prefix keeps different operations from colliding.
pub fn key_for<P: Serialize>(kind: &str, params: &P) -> Result<String> {
    let bytes = serde_json::to_vec(params)?;
    Ok(format!("{}:{}", kind, hex::encode(Sha256::digest(&bytes))))
}
