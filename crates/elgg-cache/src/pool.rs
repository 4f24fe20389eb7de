//! Cache pool contract and in-process implementations

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::key::CacheKey;

/// A key-value cache that regenerates missing values on demand.
pub trait Pool: Send + Sync {
    /// Return the cached value for `key`, calling `regenerate` and storing
    /// its result on a miss. A hit never calls `regenerate`.
    fn get(&self, key: CacheKey, regenerate: &dyn Fn() -> Value) -> Result<Value>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: CacheKey, value: Value) -> Result<()>;

    /// Forget `key`; the next `get` regenerates it.
    fn invalidate(&self, key: CacheKey) -> Result<()>;
}

/// Ephemeral pool kept in process memory.
///
/// Misses are regenerated under a lock held for that key only, followed by a
/// second lookup, so concurrent misses on the same key run the callback once.
/// A callback may read other keys of the same pool.
#[derive(Default)]
pub struct InMemoryPool {
    entries: RwLock<HashMap<String, Value>>,
    regenerating: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Pool for InMemoryPool {
    fn get(&self, key: CacheKey, regenerate: &dyn Fn() -> Value) -> Result<Value> {
        let key = key.normalized()?;
        if let Some(value) = self.entries.read().get(&key) {
            return Ok(value.clone());
        }

        let slot = Arc::clone(self.regenerating.lock().entry(key.clone()).or_default());
        let _regenerating = slot.lock();
        if let Some(value) = self.entries.read().get(&key) {
            return Ok(value.clone());
        }

        trace!("Cache miss for '{}', regenerating", key);
        let value = regenerate();
        self.entries.write().insert(key.clone(), value.clone());
        self.regenerating.lock().remove(&key);
        Ok(value)
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        let key = key.normalized()?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn invalidate(&self, key: CacheKey) -> Result<()> {
        let key = key.normalized()?;
        self.entries.write().remove(&key);
        Ok(())
    }
}

/// Pool that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPool;

impl Pool for NullPool {
    fn get(&self, key: CacheKey, regenerate: &dyn Fn() -> Value) -> Result<Value> {
        key.normalized()?;
        Ok(regenerate())
    }

    fn put(&self, key: CacheKey, _value: Value) -> Result<()> {
        key.normalized().map(|_| ())
    }

    fn invalidate(&self, key: CacheKey) -> Result<()> {
        key.normalized().map(|_| ())
    }
}

/// Pool bound to a list of `host:port` cache servers.
///
/// Entries are namespaced so several logical caches can share the servers.
/// Storage is local to the process; the server list is kept for diagnostics
/// and for the driver that replaces it.
pub struct ServerPool {
    servers: Vec<String>,
    namespace: String,
    local: InMemoryPool,
}

impl ServerPool {
    pub fn new(servers: Vec<String>, namespace: impl Into<String>) -> Self {
        Self {
            servers,
            namespace: namespace.into(),
            local: InMemoryPool::new(),
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: CacheKey) -> Result<CacheKey> {
        Ok(CacheKey::Str(format!("{}:{}", self.namespace, key.normalized()?)))
    }
}

impl Pool for ServerPool {
    fn get(&self, key: CacheKey, regenerate: &dyn Fn() -> Value) -> Result<Value> {
        self.local.get(self.scoped(key)?, regenerate)
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.local.put(self.scoped(key)?, value)
    }

    fn invalidate(&self, key: CacheKey) -> Result<()> {
        self.local.invalidate(self.scoped(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_null_pool_always_regenerates() {
        let pool = NullPool;
        pool.put("foo".into(), json!(1)).unwrap();
        assert_eq!(pool.get("foo".into(), &|| json!(2)).unwrap(), json!(2));
    }

    #[test]
    fn test_server_pool_namespaces_entries() {
        let pool = ServerPool::new(vec!["127.0.0.1:11211".to_string()], "metadata");
        pool.put("foo".into(), json!("bar")).unwrap();

        assert_eq!(pool.get("foo".into(), &|| json!("other")).unwrap(), json!("bar"));
        assert_eq!(pool.servers(), ["127.0.0.1:11211".to_string()]);
        assert_eq!(pool.namespace(), "metadata");
        assert!(pool.local.get("metadata:foo".into(), &|| json!(null)).unwrap() == json!("bar"));
    }

    #[test]
    fn test_concurrent_misses_regenerate_once() {
        let pool = Arc::new(InMemoryPool::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    pool.get("expensive".into(), &|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        json!(42)
                    })
                    .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), json!(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_regenerate_can_read_other_keys() {
        let pool = Arc::new(InMemoryPool::new());
        let (sender, receiver) = std::sync::mpsc::channel();

        let nested = Arc::clone(&pool);
        std::thread::spawn(move || {
            let value = nested.get("outer".into(), &|| {
                let inner = nested.get("inner".into(), &|| json!(1)).unwrap();
                json!([inner, 2])
            });
            let _ = sender.send(value.unwrap());
        });

        let value = receiver
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("nested regenerate finished");
        assert_eq!(value, json!([1, 2]));
        assert_eq!(pool.len(), 2);
        assert!(pool.regenerating.lock().is_empty());
    }
}
