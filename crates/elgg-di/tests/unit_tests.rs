//! Unit tests for the DI container core functionality
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use elgg_di::*;

#[derive(Debug, PartialEq)]
struct TestService {
    value: i32,
}

#[derive(Debug, Default)]
struct Crypto {
    rounds: u32,
}

#[test]
fn test_define_and_resolve_singleton() {
    let container = DIContainer::new();

    container
        .define("db", |_| Ok(Arc::new(TestService { value: 42 })))
        .unwrap();

    let service1 = container.resolve::<TestService>("db").unwrap();
    let service2 = container.resolve::<TestService>("db").unwrap();

    assert_eq!(service1.value, 42);
    assert!(Arc::ptr_eq(&service1, &service2));
}

#[test]
fn test_singleton_factory_runs_once() {
    let container = DIContainer::new();
    let constructed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&constructed);
    container
        .define("db", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(TestService { value: 1 }))
        })
        .unwrap();

    assert_eq!(constructed.load(Ordering::SeqCst), 0);

    let first = container.resolve::<TestService>("db").unwrap();
    let second = container.resolve::<TestService>("db").unwrap();
    let third = container.resolve::<TestService>("db").unwrap();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
}

#[test]
fn test_define_transient() {
    let container = DIContainer::new();
    let constructed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&constructed);
    container
        .define_transient("queryCounter", move |_| {
            let value = counter.fetch_add(1, Ordering::SeqCst) as i32;
            Ok(Arc::new(TestService { value }))
        })
        .unwrap();

    let service1 = container.resolve::<TestService>("queryCounter").unwrap();
    let service2 = container.resolve::<TestService>("queryCounter").unwrap();

    assert_eq!(constructed.load(Ordering::SeqCst), 2);
    assert_eq!(service1.value, 0);
    assert_eq!(service2.value, 1);
    assert!(!Arc::ptr_eq(&service1, &service2));
    assert!(!container.is_resolved("queryCounter"));
}

#[test]
fn test_service_not_registered() {
    let container = DIContainer::new();
    let constructed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&constructed);
    container
        .define("db", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(TestService { value: 1 }))
        })
        .unwrap();

    let result = container.resolve::<TestService>("doesNotExist");
    assert!(matches!(
        result,
        Err(DIError::UnknownService { ref name }) if name == "doesNotExist"
    ));
    assert_eq!(constructed.load(Ordering::SeqCst), 0);
}

#[test]
fn test_service_already_registered() {
    let container = DIContainer::new();

    container
        .define("db", |_| Ok(Arc::new(TestService { value: 42 })))
        .unwrap();

    let result = container.define("db", |_| Ok(Arc::new(TestService { value: 24 })));
    assert!(matches!(
        result,
        Err(DIError::DuplicateDefinition { ref name }) if name == "db"
    ));

    // first definition survives
    assert_eq!(container.resolve::<TestService>("db").unwrap().value, 42);

    let value = container.define_value("db", Arc::new(TestService { value: 7 }));
    assert!(matches!(value, Err(DIError::DuplicateDefinition { .. })));
}

#[test]
fn test_seeded_value_passthrough() {
    let container = DIContainer::new();
    let config = Arc::new(TestService { value: 99 });

    container.define_value("config", Arc::clone(&config)).unwrap();

    for _ in 0..3 {
        let resolved = container.resolve::<TestService>("config").unwrap();
        assert!(Arc::ptr_eq(&resolved, &config));
    }
}

#[test]
fn test_define_type_uses_default() {
    let container = DIContainer::new();
    container.define_type::<Crypto>("crypto").unwrap();

    let crypto = container.resolve::<Crypto>("crypto").unwrap();
    assert_eq!(crypto.rounds, 0);
    assert!(Arc::ptr_eq(
        &crypto,
        &container.resolve::<Crypto>("crypto").unwrap()
    ));
}

#[test]
fn test_type_mismatch() {
    let container = DIContainer::new();
    container.define_type::<Crypto>("crypto").unwrap();

    let result = container.resolve::<TestService>("crypto");
    assert!(matches!(result, Err(DIError::TypeMismatch { .. })));
}

#[test]
fn test_factory_resolves_dependencies() {
    struct Database {
        config: Arc<TestService>,
    }

    let container = DIContainer::new();
    container
        .define("db", |c| {
            Ok(Arc::new(Database {
                config: c.resolve::<TestService>("config")?,
            }))
        })
        .unwrap();
    container
        .define_value("config", Arc::new(TestService { value: 3 }))
        .unwrap();

    let db = container.resolve::<Database>("db").unwrap();
    assert_eq!(db.config.value, 3);
}

#[test]
fn test_builder_pattern() {
    let container = DIContainerBuilder::new()
        .define_value("config", Arc::new(TestService { value: 1 }))
        .unwrap()
        .define("db", |_| Ok(Arc::new(TestService { value: 42 })))
        .unwrap()
        .define_transient("queryCounter", |_| Ok(Arc::new(TestService { value: 0 })))
        .unwrap()
        .define_type::<Crypto>("crypto")
        .unwrap()
        .build();

    assert_eq!(container.service_count(), 4);
    let service = container.resolve::<TestService>("db").unwrap();
    assert_eq!(service.value, 42);
}

#[test]
fn test_macros() {
    let container = DIContainer::new();
    define_service!(container, "db", TestService, |_| Ok(Arc::new(TestService {
        value: 5
    })))
    .unwrap();

    let db = resolve_service!(container, "db", TestService).unwrap();
    assert_eq!(db.value, 5);
}
