//! Dependency Injection Container for the Elgg kernel
//!
//! This crate provides a name-keyed service container. Every service is
//! declared under a unique name, either as a pre-built value, as a type that
//! is default-constructed, or as a factory closure that receives the
//! container and pulls its own dependencies from it. Nothing is constructed
//! at definition time: each service is built on first demand and, unless it
//! was declared transient, cached for the lifetime of the container.
//!
//! ## Quick Start
//!
//! ```rust
//! use elgg_di::DIContainer;
//! use std::sync::Arc;
//!
//! struct DbConfig { host: String }
//! struct Database { config: Arc<DbConfig> }
//!
//! let container = DIContainer::new();
//! container.define_value("dbConfig", Arc::new(DbConfig { host: "localhost".into() })).unwrap();
//! container.define("db", |c| {
//!     Ok(Arc::new(Database { config: c.resolve::<DbConfig>("dbConfig")? }))
//! }).unwrap();
//!
//! let db = container.resolve::<Database>("db").unwrap();
//! assert_eq!(db.config.host, "localhost");
//! ```
//!
//! Resolution re-entering a name that is already being constructed on the
//! calling thread fails with [`DIError::CyclicDependency`] instead of
//! recursing until the stack is exhausted.

pub mod provider;
mod resolution;

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::resolution::ResolutionTracker;

pub use provider::{ServiceModule, ServiceModuleRegistry};

/// Errors that can occur during dependency injection operations
#[derive(Debug, thiserror::Error)]
pub enum DIError {
    #[error("Service not registered: {name}")]
    UnknownService { name: String },

    #[error("Service already registered: {name}")]
    DuplicateDefinition { name: String },

    #[error("Failed to construct service '{service}': {source}")]
    Construction {
        service: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Cyclic dependency detected: {chain}")]
    CyclicDependency { chain: String },

    #[error("Service '{service}' is not a {expected}")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },
}

impl DIError {
    /// Wrap a failure raised inside the factory of `service`.
    pub fn construction<E>(service: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DIError::Construction {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Shorthand for a construction failure described by a message.
    pub fn construction_msg(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::construction(service, anyhow::anyhow!("{}", message))
    }
}

pub type DIResult<T> = Result<T, DIError>;

/// Service lifetime management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// Service is created once and reused for the lifetime of the container
    Singleton,
    /// Service is created each time it's requested
    Transient,
}

impl Default for ServiceLifetime {
    fn default() -> Self {
        ServiceLifetime::Singleton
    }
}

/// How a service was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// A pre-built instance handed to the container
    Value,
    /// A type constructed through its `Default` implementation
    Type,
    /// A closure receiving the container
    Factory,
}

/// Public view of a registered service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub kind: ServiceKind,
    pub lifetime: ServiceLifetime,
}

type SharedService = Arc<dyn Any + Send + Sync>;
type SharedFactory = Arc<dyn Fn(&DIContainer) -> DIResult<SharedService> + Send + Sync>;

/// Service descriptor containing registration information
struct ServiceDescriptor {
    kind: ServiceKind,
    lifetime: ServiceLifetime,
    factory: SharedFactory,
    instance: Arc<OnceCell<SharedService>>,
}

/// The dependency injection container
pub struct DIContainer {
    services: RwLock<HashMap<String, ServiceDescriptor>>,
    resolving: ResolutionTracker,
}

impl DIContainer {
    /// Create a new empty DI container
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            resolving: ResolutionTracker::default(),
        }
    }

    /// Register a singleton service with a factory function
    pub fn define<F, T>(&self, name: impl Into<String>, factory: F) -> DIResult<()>
    where
        F: Fn(&DIContainer) -> DIResult<Arc<T>> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.define_with_lifetime(name, ServiceLifetime::Singleton, factory)
    }

    /// Register a transient service; the factory runs on every lookup
    pub fn define_transient<F, T>(&self, name: impl Into<String>, factory: F) -> DIResult<()>
    where
        F: Fn(&DIContainer) -> DIResult<Arc<T>> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.define_with_lifetime(name, ServiceLifetime::Transient, factory)
    }

    /// Register a factory with an explicit lifetime
    pub fn define_with_lifetime<F, T>(
        &self,
        name: impl Into<String>,
        lifetime: ServiceLifetime,
        factory: F,
    ) -> DIResult<()>
    where
        F: Fn(&DIContainer) -> DIResult<Arc<T>> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let factory: SharedFactory = Arc::new(move |container: &DIContainer| {
            let service = factory(container)?;
            Ok(service as SharedService)
        });
        self.insert(
            name.into(),
            ServiceDescriptor {
                kind: ServiceKind::Factory,
                lifetime,
                factory,
                instance: Arc::new(OnceCell::new()),
            },
        )
    }

    /// Register a pre-built instance. No factory is ever invoked for it.
    pub fn define_value<T>(&self, name: impl Into<String>, value: Arc<T>) -> DIResult<()>
    where
        T: Send + Sync + 'static,
    {
        let value = value as SharedService;
        let instance = Arc::new(OnceCell::with_value(Arc::clone(&value)));
        let factory: SharedFactory = Arc::new(move |_: &DIContainer| Ok(Arc::clone(&value)));
        self.insert(
            name.into(),
            ServiceDescriptor {
                kind: ServiceKind::Value,
                lifetime: ServiceLifetime::Singleton,
                factory,
                instance,
            },
        )
    }

    /// Register a service that is built with `T::default()`
    pub fn define_type<T>(&self, name: impl Into<String>) -> DIResult<()>
    where
        T: Default + Send + Sync + 'static,
    {
        let factory: SharedFactory =
            Arc::new(|_: &DIContainer| Ok(Arc::new(T::default()) as SharedService));
        self.insert(
            name.into(),
            ServiceDescriptor {
                kind: ServiceKind::Type,
                lifetime: ServiceLifetime::Singleton,
                factory,
                instance: Arc::new(OnceCell::new()),
            },
        )
    }

    fn insert(&self, name: String, descriptor: ServiceDescriptor) -> DIResult<()> {
        let mut services = self.services.write();

        if services.contains_key(&name) {
            return Err(DIError::DuplicateDefinition { name });
        }

        debug!(
            "Registered {:?} service '{}' ({:?})",
            descriptor.lifetime, name, descriptor.kind
        );
        services.insert(name, descriptor);
        Ok(())
    }

    /// Resolve a service instance by name
    pub fn resolve<T>(&self, name: &str) -> DIResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve_any(name)?
            .downcast::<T>()
            .map_err(|_| DIError::TypeMismatch {
                service: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Resolve a service without naming its concrete type
    pub fn resolve_any(&self, name: &str) -> DIResult<Arc<dyn Any + Send + Sync>> {
        let (lifetime, factory, slot) = {
            let services = self.services.read();
            let descriptor = services
                .get(name)
                .ok_or_else(|| DIError::UnknownService {
                    name: name.to_string(),
                })?;

            if let Some(instance) = descriptor.instance.get() {
                trace!("Service '{}' served from cache", name);
                return Ok(Arc::clone(instance));
            }

            (
                descriptor.lifetime,
                Arc::clone(&descriptor.factory),
                Arc::clone(&descriptor.instance),
            )
        };

        // The registry lock is released here so factories can resolve their
        // own dependencies.
        let _guard = self.resolving.enter(name)?;

        match lifetime {
            ServiceLifetime::Transient => {
                trace!("Constructing transient service '{}'", name);
                factory(self)
            }
            ServiceLifetime::Singleton => slot
                .get_or_try_init(|| {
                    debug!("Constructing service '{}'", name);
                    factory(self)
                })
                .map(Arc::clone),
        }
    }

    /// Check if a service is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    /// Check whether a singleton has already been constructed
    pub fn is_resolved(&self, name: &str) -> bool {
        self.services
            .read()
            .get(name)
            .map(|descriptor| descriptor.instance.get().is_some())
            .unwrap_or(false)
    }

    /// Describe a registered service
    pub fn definition(&self, name: &str) -> Option<ServiceDefinition> {
        self.services
            .read()
            .get(name)
            .map(|descriptor| ServiceDefinition {
                name: name.to_string(),
                kind: descriptor.kind,
                lifetime: descriptor.lifetime,
            })
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }

    /// Names of all registered services, sorted. Intended for tooling.
    #[doc(hidden)]
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DIContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DIContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DIContainer")
            .field("services", &self.service_count())
            .finish()
    }
}

/// Builder pattern for configuring the DI container
pub struct DIContainerBuilder {
    container: DIContainer,
}

impl DIContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: DIContainer::new(),
        }
    }

    /// Register a singleton factory
    pub fn define<F, T>(self, name: impl Into<String>, factory: F) -> DIResult<Self>
    where
        F: Fn(&DIContainer) -> DIResult<Arc<T>> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.container.define(name, factory)?;
        Ok(self)
    }

    /// Register a transient factory
    pub fn define_transient<F, T>(self, name: impl Into<String>, factory: F) -> DIResult<Self>
    where
        F: Fn(&DIContainer) -> DIResult<Arc<T>> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.container.define_transient(name, factory)?;
        Ok(self)
    }

    /// Register a pre-built value
    pub fn define_value<T>(self, name: impl Into<String>, value: Arc<T>) -> DIResult<Self>
    where
        T: Send + Sync + 'static,
    {
        self.container.define_value(name, value)?;
        Ok(self)
    }

    /// Register a default-constructed type
    pub fn define_type<T>(self, name: impl Into<String>) -> DIResult<Self>
    where
        T: Default + Send + Sync + 'static,
    {
        self.container.define_type::<T>(name)?;
        Ok(self)
    }

    /// Register every service of a module
    pub fn module<M: ServiceModule>(self, module: M) -> DIResult<Self> {
        module.register(&self.container)?;
        Ok(self)
    }

    /// Build the container
    pub fn build(self) -> DIContainer {
        self.container
    }
}

impl Default for DIContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience macro for defining services
#[macro_export]
macro_rules! define_service {
    ($container:expr, $name:expr, $service_type:ty, $factory:expr) => {
        $container.define::<_, $service_type>($name, $factory)
    };
}

/// Convenience macro for resolving services
#[macro_export]
macro_rules! resolve_service {
    ($container:expr, $name:expr, $service_type:ty) => {
        $container.resolve::<$service_type>($name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_describes_kind_and_lifetime() {
        let container = DIContainer::new();
        container.define_value("config", Arc::new(1u8)).unwrap();
        container.define_type::<String>("name").unwrap();
        container
            .define_transient("counter", |_| Ok(Arc::new(0u32)))
            .unwrap();

        let config = container.definition("config").unwrap();
        assert_eq!(config.kind, ServiceKind::Value);
        assert_eq!(config.lifetime, ServiceLifetime::Singleton);

        assert_eq!(container.definition("name").unwrap().kind, ServiceKind::Type);

        let counter = container.definition("counter").unwrap();
        assert_eq!(counter.kind, ServiceKind::Factory);
        assert_eq!(counter.lifetime, ServiceLifetime::Transient);

        assert!(container.definition("missing").is_none());
    }

    #[test]
    fn test_value_is_resolved_from_the_start() {
        let container = DIContainer::new();
        container.define_value("config", Arc::new(1u8)).unwrap();
        container.define("db", |_| Ok(Arc::new(2u8))).unwrap();

        assert!(container.is_resolved("config"));
        assert!(!container.is_resolved("db"));
        container.resolve::<u8>("db").unwrap();
        assert!(container.is_resolved("db"));
    }

    #[test]
    fn test_registered_names_are_sorted() {
        let container = DIContainer::new();
        container.define_type::<String>("views").unwrap();
        container.define_type::<String>("db").unwrap();
        container.define_type::<String>("hooks").unwrap();

        assert_eq!(container.registered_names(), vec!["db", "hooks", "views"]);
    }

    #[test]
    fn test_construction_error_keeps_source() {
        let err = DIError::construction_msg("db", "connection refused");
        assert!(err.to_string().contains("db"));
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .contains("connection refused"));
    }
}
