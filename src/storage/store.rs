use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::core::error::Result;

/// Backing-store contract the engine is layered on.
///
/// The store keeps three shapes of value: append-friendly byte blobs
/// (posting lists and the auxiliary indexes), sorted sets with a score-range
/// scan (numeric indexes) and hashes (doc tables and key maps). All calls are
/// synchronous; failures surface as `ErrorKind::Store` and propagate
/// unchanged.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Bytes>>;
    fn set(&self, key: &str, data: &[u8]) -> Result<()>;
    /// Append to a blob, creating it if absent. Returns the new length.
    fn append(&self, key: &str, data: &[u8]) -> Result<usize>;
    fn truncate(&self, key: &str, len: usize) -> Result<()>;
    fn delete(&self, key: &str) -> Result<bool>;

    fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;
    /// Members with `min <= score <= max`, ascending by (score, member).
    fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<(String, f64)>>;

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()>;
    fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>>;
    fn hkeys(&self, key: &str) -> Result<Vec<String>>;

    /// Atomically increment a counter key, returning the new value.
    fn incr(&self, key: &str) -> Result<u64>;

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

enum Value {
    Blob(Vec<u8>),
    ZSet(HashMap<String, f64>),
    Hash(HashMap<String, Vec<u8>>),
}

/// In-process store. A key holding a value of the wrong shape is treated as
/// absent by reads; writes replace it.
pub struct MemoryStore {
    map: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let map = self.map.read();
        match map.get(key) {
            Some(Value::Blob(data)) => Ok(Some(Bytes::copy_from_slice(data))),
            _ => Ok(None),
        }
    }

    fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        self.map
            .write()
            .insert(key.to_string(), Value::Blob(data.to_vec()));
        Ok(())
    }

    fn append(&self, key: &str, data: &[u8]) -> Result<usize> {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(Value::Blob(blob)) => {
                blob.extend_from_slice(data);
                Ok(blob.len())
            }
            _ => {
                map.insert(key.to_string(), Value::Blob(data.to_vec()));
                Ok(data.len())
            }
        }
    }

    fn truncate(&self, key: &str, len: usize) -> Result<()> {
        if let Some(Value::Blob(blob)) = self.map.write().get_mut(key) {
            blob.truncate(len);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.map.write().remove(key).is_some())
    }

    fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(Value::ZSet(set)) => {
                set.insert(member.to_string(), score);
            }
            _ => {
                let mut set = HashMap::new();
                set.insert(member.to_string(), score);
                map.insert(key.to_string(), Value::ZSet(set));
            }
        }
        Ok(())
    }

    fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<(String, f64)>> {
        let map = self.map.read();
        let mut entries: Vec<(String, f64)> = match map.get(key) {
            Some(Value::ZSet(set)) => set
                .iter()
                .filter(|&(_, &score)| score >= min && score <= max)
                .map(|(member, &score)| (member.clone(), score))
                .collect(),
            _ => Vec::new(),
        };
        entries.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(entries)
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut map = self.map.write();
        match map.get_mut(key) {
            Some(Value::Hash(hash)) => {
                hash.insert(field.to_string(), value.to_vec());
            }
            _ => {
                let mut hash = HashMap::new();
                hash.insert(field.to_string(), value.to_vec());
                map.insert(key.to_string(), Value::Hash(hash));
            }
        }
        Ok(())
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        let map = self.map.read();
        match map.get(key) {
            Some(Value::Hash(hash)) => Ok(hash.get(field).map(|v| Bytes::copy_from_slice(v))),
            _ => Ok(None),
        }
    }

    fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let map = self.map.read();
        match map.get(key) {
            Some(Value::Hash(hash)) => {
                let mut keys: Vec<String> = hash.keys().cloned().collect();
                keys.sort();
                Ok(keys)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn incr(&self, key: &str) -> Result<u64> {
        let mut map = self.map.write();
        let current = match map.get(key) {
            Some(Value::Blob(blob)) => std::str::from_utf8(blob)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        map.insert(key.to_string(), Value::Blob(next.to_string().into_bytes()));
        Ok(next)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let map = self.map.read();
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
