use std::sync::Arc;

use elgg_cache::{FileCache, InMemoryPool, NullPool, Pool, ServerPool};
use elgg_config::Config;
use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::app::EntityPreloader;
use elgg_services::caches::{
    AutoloadManager, ClassLoader, ClassMap, EntityCache, MetadataCache, PluginSettingsCache,
    SimpleCache, SystemCache,
};
use tracing::debug;

use super::{built, config, SEEDED};
use crate::names;

fn memcache_enabled(config: &Config) -> bool {
    config.memcache && !config.memcache_servers.is_empty()
}

/// Cache pools and the caches layered over them
pub struct CacheModule;

impl ServiceModule for CacheModule {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::FILE_CACHE, |c| {
            Ok(Arc::new(FileCache::new(config(c)?.system_cache_path())))
        })?;

        container.define_type::<NullPool>(names::NULL_CACHE)?;

        // Absent unless memcache is switched on and has servers to talk to
        container.define(names::MEMCACHE_STASH_POOL, |c| {
            let config = config(c)?;
            if !memcache_enabled(&config) {
                return Ok(Arc::new(None::<ServerPool>));
            }
            debug!("Using {} memcache servers", config.memcache_servers.len());
            Ok(Arc::new(Some(ServerPool::new(
                config.memcache_servers.clone(),
                "stash",
            ))))
        })?;

        container.define(names::METADATA_CACHE, |c| {
            let config = config(c)?;
            let pool: Arc<dyn Pool> = if memcache_enabled(&config) {
                Arc::new(ServerPool::new(config.memcache_servers.clone(), "metadata"))
            } else {
                Arc::new(InMemoryPool::new())
            };
            Ok(Arc::new(MetadataCache::new(pool)))
        })?;

        container.define(names::ENTITY_CACHE, |c| {
            Ok(Arc::new(EntityCache::new(
                c.resolve(names::SESSION)?,
                c.resolve(names::METADATA_CACHE)?,
            )))
        })?;

        container.define_type::<PluginSettingsCache>(names::PLUGIN_SETTINGS_CACHE)?;

        container.define(names::SIMPLE_CACHE, |c| Ok(Arc::new(SimpleCache::new(config(c)?))))?;

        container.define(names::SYSTEM_CACHE, |c| {
            let config = config(c)?;
            let profiling = config.enable_profiling;
            let cache = SystemCache::new(c.resolve(names::FILE_CACHE)?, config);
            if profiling {
                return Ok(Arc::new(cache.with_timer(c.resolve(names::TIMER)?)));
            }
            Ok(Arc::new(cache))
        })?;

        container.define(names::CLASS_LOADER, |_| {
            let loader = ClassLoader::new(ClassMap::default());
            loader.register();
            Ok(Arc::new(loader))
        })?;

        container.define(names::AUTOLOAD_MANAGER, |c| {
            let manager = AutoloadManager::new(c.resolve(names::CLASS_LOADER)?);
            if config(c)?.autoloader_skip_storage {
                return Ok(Arc::new(manager));
            }
            let manager = manager.with_storage(c.resolve(names::FILE_CACHE)?);
            built(names::AUTOLOAD_MANAGER, manager.load_cache().map(|_| manager))
        })?;

        container.define(names::ENTITY_PRELOADER, |c| {
            Ok(Arc::new(EntityPreloader::new(
                c.resolve(names::ENTITY_CACHE)?,
                c.resolve(names::ENTITY_TABLE)?,
            )))
        })?;

        Ok(())
    }
}
