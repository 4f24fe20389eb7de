//! Service modules for grouping definitions
//!
//! A [`ServiceModule`] declares a related group of services (all database
//! tables, all caches, ...). Modules are collected in a
//! [`ServiceModuleRegistry`] and registered in priority order.
//!
//! ## Usage
//!
//! ```rust
//! use elgg_di::{DIContainer, DIResult, ServiceModule, ServiceModuleRegistry};
//! use std::sync::Arc;
//!
//! struct CacheModule;
//!
//! impl ServiceModule for CacheModule {
//!     fn name(&self) -> &'static str {
//!         "cache"
//!     }
//!
//!     fn register(&self, container: &DIContainer) -> DIResult<()> {
//!         container.define_type::<Vec<String>>("nullCache")?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ServiceModuleRegistry::new();
//! registry.add(CacheModule);
//!
//! let container = DIContainer::new();
//! registry.register_all(&container).unwrap();
//! assert!(container.is_registered("nullCache"));
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::{DIContainer, DIError, DIResult};

/// A named group of service definitions.
pub trait ServiceModule: Send + Sync {
    /// Returns the name of this module.
    ///
    /// Used for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Lower values are registered first. Default is 100.
    fn priority(&self) -> u32 {
        100
    }

    /// Names of services this module's factories expect other modules to
    /// provide. Checked by the default [`ServiceModule::validate`].
    fn requires(&self) -> &[&'static str] {
        &[]
    }

    /// Define the services of this module.
    fn register(&self, container: &DIContainer) -> DIResult<()>;

    /// Called after every module has registered.
    fn validate(&self, container: &DIContainer) -> DIResult<()> {
        for name in self.requires() {
            if !container.is_registered(name) {
                return Err(DIError::UnknownService {
                    name: (*name).to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Registry for managing service modules.
pub struct ServiceModuleRegistry {
    modules: Vec<Arc<dyn ServiceModule>>,
}

impl ServiceModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Add a module to the registry.
    pub fn add<M: ServiceModule + 'static>(&mut self, module: M) -> &mut Self {
        self.modules.push(Arc::new(module));
        self
    }

    /// Add a shared module to the registry.
    pub fn add_shared(&mut self, module: Arc<dyn ServiceModule>) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in registration order.
    pub fn module_names(&self) -> Vec<&'static str> {
        self.sorted().iter().map(|m| m.name()).collect()
    }

    fn sorted(&self) -> Vec<&Arc<dyn ServiceModule>> {
        let mut sorted: Vec<_> = self.modules.iter().collect();
        // stable: equal priorities keep insertion order
        sorted.sort_by_key(|m| m.priority());
        sorted
    }

    /// Register all modules with the container, then validate each one.
    pub fn register_all(&self, container: &DIContainer) -> DIResult<()> {
        let sorted = self.sorted();

        info!("Registering {} service modules", sorted.len());

        for module in &sorted {
            let before = container.service_count();
            module.register(container)?;
            debug!(
                "Module '{}' (priority: {}) defined {} services",
                module.name(),
                module.priority(),
                container.service_count() - before
            );
        }

        for module in &sorted {
            module.validate(container)?;
        }

        info!(
            "All service modules registered ({} services)",
            container.service_count()
        );
        Ok(())
    }
}

impl Default for ServiceModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
