//! Property-based tests for service identity across a booted provider
//!
//! For any order in which services are first requested, every singleton is
//! built once and handed out as the same instance afterwards, and the query
//! counter is the only service built anew on each lookup.

use std::collections::HashMap;
use std::sync::Arc;

use elgg_config::Config;
use elgg_kernel::{names, Runtime, ServiceProvider};
use proptest::prelude::*;
use tempfile::TempDir;

fn boot(dir: &TempDir, web: bool) -> ServiceProvider {
    let mut config = Config::new();
    config.dataroot = dir.path().to_string_lossy().into_owned();
    let runtime = if web { Runtime::web() } else { Runtime::cli() };
    ServiceProvider::with_runtime(config, runtime).unwrap()
}

/// Strategy for a sequence of lookups, repeats included
fn lookup_order() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(names::ALL.to_vec()), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_singletons_stable_in_any_order(order in lookup_order(), web in any::<bool>()) {
        let dir = TempDir::new().unwrap();
        let provider = boot(&dir, web);
        let mut seen: HashMap<&str, Arc<dyn std::any::Any + Send + Sync>> = HashMap::new();

        for name in order {
            let service = provider.container().resolve_any(name).unwrap();
            if name == names::QUERY_COUNTER {
                if let Some(previous) = seen.get(name) {
                    prop_assert!(!Arc::ptr_eq(previous, &service));
                }
            } else if let Some(previous) = seen.get(name) {
                prop_assert!(Arc::ptr_eq(previous, &service), "{} rebuilt", name);
            }
            seen.insert(name, service);
        }
    }

    #[test]
    fn prop_unknown_names_fail(name in "[a-z]{1,12}Missing") {
        let dir = TempDir::new().unwrap();
        let provider = boot(&dir, false);
        let is_unknown = matches!(
            provider.container().resolve_any(&name),
            Err(elgg_di::DIError::UnknownService { .. })
        );
        prop_assert!(is_unknown);
    }
}
