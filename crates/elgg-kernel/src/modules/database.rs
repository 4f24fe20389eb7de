use std::sync::Arc;

use elgg_cache::StaticVariableCache;
use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::database::{
    AdminNotices, ConfigTable, Database, DatabaseMutex, DbConfig, PublicDatabase, QueryCounter,
    Seeder,
};
use elgg_services::session::UserCapabilities;
use elgg_services::tables::{
    AccessCollections, AnnotationsTable, EntityTable, MetadataTable, PrivateSettingsTable,
    RelationshipsTable, UsersTable,
};
use elgg_services::{EventsService, PluginHooksService};

use super::{config, SEEDED};
use crate::names;

fn events(c: &DIContainer) -> DIResult<Arc<EventsService>> {
    let hooks = c.resolve::<PluginHooksService>(names::HOOKS)?;
    Ok(Arc::clone(hooks.events()))
}

/// Database handle and the tables built on it
pub struct DatabaseModule;

impl ServiceModule for DatabaseModule {
    fn name(&self) -> &'static str {
        "database"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::DB_CONFIG, |c| {
            let config = config(c)?;
            Ok(Arc::new(DbConfig::from_config(&config)))
        })?;

        container.define(names::DB, |c| {
            let mut db = Database::new(c.resolve(names::DB_CONFIG)?).with_logger(c.resolve(names::LOGGER)?);
            if config(c)?.profiling_sql {
                db = db.with_timer(c.resolve(names::TIMER)?);
            }
            Ok(Arc::new(db))
        })?;

        container.define(names::PUBLIC_DB, |c| {
            Ok(Arc::new(PublicDatabase::new(c.resolve(names::DB)?)))
        })?;

        // the only service built on every lookup
        container.define_transient(names::QUERY_COUNTER, |c| {
            Ok(Arc::new(QueryCounter::new(c.resolve(names::DB)?)))
        })?;

        container.define(names::CONFIG_TABLE, |c| {
            Ok(Arc::new(ConfigTable::new(
                c.resolve(names::DB)?,
                c.resolve(names::BOOT)?,
                c.resolve(names::LOGGER)?,
            )))
        })?;

        container.define(names::MUTEX, |c| {
            Ok(Arc::new(DatabaseMutex::new(
                c.resolve(names::DB)?,
                c.resolve(names::LOGGER)?,
            )))
        })?;

        container.define(names::SEEDER, |c| Ok(Arc::new(Seeder::new(c.resolve(names::HOOKS)?))))?;
        container.define_type::<AdminNotices>(names::ADMIN_NOTICES)?;
        container.define(names::ACCESS_CACHE, |_| {
            Ok(Arc::new(StaticVariableCache::new("access")))
        })?;

        container.define(names::ENTITY_TABLE, |c| {
            Ok(Arc::new(EntityTable {
                config: config(c)?,
                db: c.resolve(names::DB)?,
                entity_cache: c.resolve(names::ENTITY_CACHE)?,
                metadata_cache: c.resolve(names::METADATA_CACHE)?,
                events: events(c)?,
                session: c.resolve(names::SESSION)?,
                translator: c.resolve(names::TRANSLATOR)?,
                logger: c.resolve(names::LOGGER)?,
            }))
        })?;

        container.define(names::ANNOTATIONS_TABLE, |c| {
            Ok(Arc::new(AnnotationsTable {
                db: c.resolve(names::DB)?,
                events: events(c)?,
            }))
        })?;

        container.define(names::METADATA_TABLE, |c| {
            Ok(Arc::new(MetadataTable {
                metadata_cache: c.resolve(names::METADATA_CACHE)?,
                db: c.resolve(names::DB)?,
                events: events(c)?,
            }))
        })?;

        container.define(names::RELATIONSHIPS_TABLE, |c| {
            Ok(Arc::new(RelationshipsTable {
                db: c.resolve(names::DB)?,
                entities: c.resolve(names::ENTITY_TABLE)?,
                metadata: c.resolve(names::METADATA_TABLE)?,
                events: events(c)?,
            }))
        })?;

        container.define(names::PRIVATE_SETTINGS, |c| {
            Ok(Arc::new(PrivateSettingsTable {
                db: c.resolve(names::DB)?,
                entities: c.resolve(names::ENTITY_TABLE)?,
                plugin_settings_cache: c.resolve(names::PLUGIN_SETTINGS_CACHE)?,
            }))
        })?;

        container.define(names::USERS_TABLE, |c| {
            Ok(Arc::new(UsersTable {
                config: config(c)?,
                db: c.resolve(names::DB)?,
                metadata: c.resolve(names::METADATA_TABLE)?,
                entity_cache: c.resolve(names::ENTITY_CACHE)?,
            }))
        })?;

        container.define(names::USER_CAPABILITIES, |c| {
            Ok(Arc::new(UserCapabilities {
                hooks: c.resolve(names::HOOKS)?,
                entities: c.resolve(names::ENTITY_TABLE)?,
                session: c.resolve(names::SESSION)?,
            }))
        })?;

        container.define(names::ACCESS_COLLECTIONS, |c| {
            Ok(Arc::new(AccessCollections {
                config: config(c)?,
                db: c.resolve(names::DB)?,
                entities: c.resolve(names::ENTITY_TABLE)?,
                capabilities: c.resolve(names::USER_CAPABILITIES)?,
                access_cache: c.resolve(names::ACCESS_CACHE)?,
                hooks: c.resolve(names::HOOKS)?,
                session: c.resolve(names::SESSION)?,
                translator: c.resolve(names::TRANSLATOR)?,
            }))
        })?;

        Ok(())
    }
}
