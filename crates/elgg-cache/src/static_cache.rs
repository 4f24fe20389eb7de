//! Namespaced in-memory cache for request-local values

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

pub struct StaticVariableCache {
    namespace: String,
    entries: RwLock<HashMap<String, Value>>,
}

impl StaticVariableCache {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn save(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    pub fn load(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_load_delete_clear() {
        let cache = StaticVariableCache::new("access");
        assert_eq!(cache.namespace(), "access");

        cache.save("access_list:1", json!([0, 1, 2]));
        cache.save("access_list:2", json!([0]));
        assert_eq!(cache.load("access_list:1"), Some(json!([0, 1, 2])));
        assert_eq!(cache.len(), 2);

        assert!(cache.delete("access_list:1"));
        assert!(!cache.delete("access_list:1"));

        cache.clear();
        assert!(cache.is_empty());
    }
}
