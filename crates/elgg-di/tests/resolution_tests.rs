//! Tests for resolution edge cases: cycles, failing factories, concurrency

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;

use elgg_di::*;

struct Logger;
struct Database;

#[test]
fn test_self_dependency_is_reported() {
    let container = DIContainer::new();
    container
        .define("db", |c| {
            c.resolve::<Database>("db")?;
            Ok(Arc::new(Database))
        })
        .unwrap();

    match container.resolve::<Database>("db") {
        Err(DIError::CyclicDependency { chain }) => assert_eq!(chain, "db -> db"),
        other => panic!("expected cycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_transitive_cycle_is_reported() {
    let container = DIContainer::new();
    container
        .define("db", |c| {
            c.resolve::<Logger>("logger")?;
            Ok(Arc::new(Database))
        })
        .unwrap();
    container
        .define("logger", |c| {
            c.resolve::<Database>("db")?;
            Ok(Arc::new(Logger))
        })
        .unwrap();

    match container.resolve::<Database>("db") {
        Err(DIError::CyclicDependency { chain }) => assert_eq!(chain, "db -> logger -> db"),
        other => panic!("expected cycle, got {:?}", other.map(|_| ())),
    }

    // nothing half-built is cached
    assert!(!container.is_resolved("db"));
    assert!(!container.is_resolved("logger"));
}

#[test]
fn test_cycle_through_transient_is_reported() {
    let container = DIContainer::new();
    container
        .define_transient("queryCounter", |c| {
            c.resolve::<Database>("db")?;
            Ok(Arc::new(0usize))
        })
        .unwrap();
    container
        .define("db", |c| {
            c.resolve::<usize>("queryCounter")?;
            Ok(Arc::new(Database))
        })
        .unwrap();

    assert!(matches!(
        container.resolve::<usize>("queryCounter"),
        Err(DIError::CyclicDependency { .. })
    ));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let container = DIContainer::new();
    container.define_value("config", Arc::new(1u8)).unwrap();
    container
        .define("db", |c| {
            c.resolve::<u8>("config")?;
            Ok(Arc::new(Database))
        })
        .unwrap();
    container
        .define("logger", |c| {
            c.resolve::<u8>("config")?;
            Ok(Arc::new(Logger))
        })
        .unwrap();
    container
        .define("entityTable", |c| {
            c.resolve::<Database>("db")?;
            c.resolve::<Logger>("logger")?;
            Ok(Arc::new(String::from("entities")))
        })
        .unwrap();

    assert!(container.resolve::<String>("entityTable").is_ok());
}

#[test]
fn test_failed_factory_is_retried() {
    let container = DIContainer::new();
    let attempts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&attempts);
    container
        .define("db", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DIError::construction_msg("db", "server has gone away"));
            }
            Ok(Arc::new(Database))
        })
        .unwrap();

    let first = container.resolve::<Database>("db");
    assert!(matches!(first, Err(DIError::Construction { ref service, .. }) if service == "db"));
    assert!(!container.is_resolved("db"));

    let second = container.resolve::<Database>("db").unwrap();
    let third = container.resolve::<Database>("db").unwrap();
    assert!(Arc::ptr_eq(&second, &third));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dependency_error_propagates_unchanged() {
    let container = DIContainer::new();
    container
        .define("entityTable", |c| {
            c.resolve::<Database>("db")?;
            Ok(Arc::new(String::new()))
        })
        .unwrap();

    // missing dependency surfaces as the dependency's own error
    assert!(matches!(
        container.resolve::<String>("entityTable"),
        Err(DIError::UnknownService { ref name }) if name == "db"
    ));
}

#[test]
fn test_concurrent_first_access_constructs_once() {
    let container = Arc::new(DIContainer::new());
    let constructed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&constructed);
    container
        .define("db", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(Database))
        })
        .unwrap();

    let thread_count = 8;
    let barrier = Arc::new(Barrier::new(thread_count));
    let (tx, rx) = mpsc::channel();

    for _ in 0..thread_count {
        let container = Arc::clone(&container);
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        thread::spawn(move || {
            barrier.wait();
            let resolved = container.resolve::<Database>("db").unwrap();
            tx.send(resolved).unwrap();
        });
    }

    let results: Vec<Arc<Database>> = (0..thread_count).map(|_| rx.recv().unwrap()).collect();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
}

#[test]
fn test_module_via_builder() {
    struct DatabaseModule;

    impl ServiceModule for DatabaseModule {
        fn name(&self) -> &'static str {
            "database"
        }

        fn register(&self, container: &DIContainer) -> DIResult<()> {
            container.define("db", |_| Ok(Arc::new(Database)))?;
            container.define_transient("queryCounter", |_| Ok(Arc::new(0usize)))
        }
    }

    let container = DIContainerBuilder::new()
        .module(DatabaseModule)
        .unwrap()
        .build();

    assert!(container.is_registered("db"));
    assert_eq!(
        container.definition("queryCounter").unwrap().lifetime,
        ServiceLifetime::Transient
    );
}
