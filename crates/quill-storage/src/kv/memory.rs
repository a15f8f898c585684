//! In-memory key-value engine.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KvEngine, KvError, KvResult};

/// A key-value engine over a reader-writer-locked hash map.
#[derive(Debug, Default)]
pub struct InMemoryKv {
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKv {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvEngine for InMemoryKv {
    fn set(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>> {
        self.map.read().get(key).cloned().ok_or(KvError::KeyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let kv = InMemoryKv::new();
        kv.set(b"key", b"value").unwrap();
        assert_eq!(kv.get(b"key").unwrap(), b"value");
    }

    #[test]
    fn test_update_overwrites() {
        let kv = InMemoryKv::new();
        kv.set(b"key", b"value").unwrap();
        kv.set(b"key", b"newvalue").unwrap();
        assert_eq!(kv.get(b"key").unwrap(), b"newvalue");
    }

    #[test]
    fn test_get_missing_key() {
        let kv = InMemoryKv::new();
        assert_eq!(kv.get(b"nonexistent").unwrap_err(), KvError::KeyNotFound);
    }

    #[test]
    fn test_concurrent_set_get() {
        let kv = Arc::new(InMemoryKv::new());
        let n = 100;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let kv = Arc::clone(&kv);
                std::thread::spawn(move || {
                    let key = format!("key_{i}");
                    let value = format!("value_{i}");
                    kv.set(key.as_bytes(), value.as_bytes()).unwrap();

                    // Read a neighbor; it may or may not exist yet.
                    let neighbor = format!("key_{}", (i + 1) % n);
                    let _ = kv.get(neighbor.as_bytes());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..n {
            let key = format!("key_{i}");
            let expected = format!("value_{i}");
            assert_eq!(kv.get(key.as_bytes()).unwrap(), expected.as_bytes());
        }
    }
}
