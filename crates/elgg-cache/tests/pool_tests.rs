//! Behavioural tests shared by every storing pool implementation

use std::cell::Cell;

use elgg_cache::{CacheError, FileCache, InMemoryPool, Pool};
use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn pools() -> Vec<(Box<dyn Pool>, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let file_cache = FileCache::new(dir.path().join("system_cache"));
    vec![
        (Box::new(InMemoryPool::new()), None),
        (Box::new(file_cache), Some(dir)),
    ]
}

#[test]
fn test_get_does_not_regenerate_value_from_callback_on_hit() {
    for (pool, _dir) in pools() {
        pool.get("foo".into(), &|| json!(1)).unwrap();
        let result = pool.get("foo".into(), &|| json!(2)).unwrap();
        assert_eq!(result, json!(1));
    }
}

#[test]
fn test_get_regenerates_value_from_callback_on_miss() {
    for (pool, _dir) in pools() {
        let calls = Cell::new(0);
        let result = pool
            .get("foo".into(), &|| {
                calls.set(calls.get() + 1);
                json!(1)
            })
            .unwrap();
        assert_eq!(result, json!(1));
        assert_eq!(calls.get(), 1);
    }
}

#[test]
fn test_invalidate_forces_the_specified_value_to_be_regenerated() {
    for (pool, _dir) in pools() {
        assert_eq!(pool.get("foo".into(), &|| json!(1)).unwrap(), json!(1));
        pool.invalidate("foo".into()).unwrap();
        assert_eq!(pool.get("foo".into(), &|| json!(2)).unwrap(), json!(2));
    }
}

#[test]
fn test_put_overrides_cached_value() {
    for (pool, _dir) in pools() {
        pool.get("foo".into(), &|| json!(1)).unwrap();
        pool.put("foo".into(), json!("bar")).unwrap();
        assert_eq!(pool.get("foo".into(), &|| json!(2)).unwrap(), json!("bar"));
    }
}

#[test]
fn test_accepts_string_and_int_keys() {
    for (pool, _dir) in pools() {
        pool.put("123".into(), json!("foo")).unwrap();
        assert_eq!(pool.get(123i64.into(), &|| json!("other")).unwrap(), json!("foo"));
        pool.invalidate(123i64.into()).unwrap();
        assert_eq!(pool.get("123".into(), &|| json!("new")).unwrap(), json!("new"));
    }
}

#[test]
fn test_complains_about_empty_keys() {
    for (pool, _dir) in pools() {
        assert!(matches!(
            pool.put("".into(), json!("foo")),
            Err(CacheError::InvalidKey { .. })
        ));
        assert!(matches!(
            pool.get("".into(), &|| json!("foo")),
            Err(CacheError::InvalidKey { .. })
        ));
        assert!(matches!(
            pool.invalidate("".into()),
            Err(CacheError::InvalidKey { .. })
        ));
    }
}

proptest! {
    #[test]
    fn test_last_put_wins(key in "[a-z_]{1,16}", values in prop::collection::vec(any::<i64>(), 1..10)) {
        let pool = InMemoryPool::new();
        for value in &values {
            pool.put(key.as_str().into(), json!(value)).unwrap();
        }
        let last: Value = json!(values[values.len() - 1]);
        prop_assert_eq!(pool.get(key.as_str().into(), &|| json!(null)).unwrap(), last);
    }
}
