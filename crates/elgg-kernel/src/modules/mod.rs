//! Service definitions, grouped by area
//!
//! Every module only declares factories. Nothing is constructed until the
//! provider is asked for a service.

mod application;
mod cache;
mod database;
mod foundation;
mod http;
mod media;
mod security;
mod views;

use std::sync::Arc;

use elgg_config::Config;
use elgg_di::{DIContainer, DIError, DIResult, ServiceModuleRegistry};

use crate::names;
use crate::runtime::Runtime;

pub use self::application::ApplicationModule;
pub use self::cache::CacheModule;
pub use self::database::DatabaseModule;
pub use self::foundation::CoreModule;
pub use self::http::HttpModule;
pub use self::media::MediaModule;
pub use self::security::SecurityModule;
pub use self::views::ViewsModule;

/// Registry holding every module of the kernel
pub fn default_registry() -> ServiceModuleRegistry {
    let mut registry = ServiceModuleRegistry::new();
    registry
        .add(CoreModule)
        .add(DatabaseModule)
        .add(CacheModule)
        .add(SecurityModule)
        .add(HttpModule)
        .add(MediaModule)
        .add(ViewsModule)
        .add(ApplicationModule);
    registry
}

/// Seeded values every module reads
const SEEDED: &[&str] = &[names::CONFIG, names::RUNTIME];

fn config(c: &DIContainer) -> DIResult<Arc<Config>> {
    c.resolve::<Config>(names::CONFIG)
}

fn runtime(c: &DIContainer) -> DIResult<Arc<Runtime>> {
    c.resolve::<Runtime>(names::RUNTIME)
}

/// Wrap a fallible constructor of `service`
fn built<T>(service: &str, result: elgg_services::Result<T>) -> DIResult<Arc<T>> {
    result
        .map(Arc::new)
        .map_err(|e| DIError::construction(service, e))
}
