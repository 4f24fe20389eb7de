//! Entity storage tables
//!
//! Each table records the collaborators it was wired with. Consumers that
//! need behaviour reach it through the database handle they share.

use std::sync::Arc;

use elgg_cache::StaticVariableCache;
use elgg_config::Config;

use crate::caches::{EntityCache, MetadataCache, PluginSettingsCache};
use crate::database::Database;
use crate::events::{EventsService, PluginHooksService};
use crate::i18n::Translator;
use crate::output::Logger;
use crate::session::{Session, UserCapabilities};

pub struct EntityTable {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub entity_cache: Arc<EntityCache>,
    pub metadata_cache: Arc<MetadataCache>,
    pub events: Arc<EventsService>,
    pub session: Arc<Session>,
    pub translator: Arc<Translator>,
    pub logger: Arc<Logger>,
}

impl EntityTable {
    pub fn table_name(&self) -> String {
        format!("{}entities", self.db.prefix())
    }
}

pub struct AnnotationsTable {
    pub db: Arc<Database>,
    pub events: Arc<EventsService>,
}

pub struct MetadataTable {
    pub metadata_cache: Arc<MetadataCache>,
    pub db: Arc<Database>,
    pub events: Arc<EventsService>,
}

pub struct RelationshipsTable {
    pub db: Arc<Database>,
    pub entities: Arc<EntityTable>,
    pub metadata: Arc<MetadataTable>,
    pub events: Arc<EventsService>,
}

pub struct PrivateSettingsTable {
    pub db: Arc<Database>,
    pub entities: Arc<EntityTable>,
    pub plugin_settings_cache: Arc<PluginSettingsCache>,
}

pub struct UsersTable {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub metadata: Arc<MetadataTable>,
    pub entity_cache: Arc<EntityCache>,
}

/// Access collections and the per-request access cache
pub struct AccessCollections {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub entities: Arc<EntityTable>,
    pub capabilities: Arc<UserCapabilities>,
    pub access_cache: Arc<StaticVariableCache>,
    pub hooks: Arc<PluginHooksService>,
    pub session: Arc<Session>,
    pub translator: Arc<Translator>,
}

impl AccessCollections {
    pub const ACCESS_PRIVATE: i64 = 0;
    pub const ACCESS_LOGGED_IN: i64 = 1;
    pub const ACCESS_PUBLIC: i64 = 2;
    pub const ACCESS_FRIENDS: i64 = -2;

    /// Readable name of a built-in access level
    pub fn access_label(&self, access_id: i64) -> String {
        let key = match access_id {
            Self::ACCESS_PRIVATE => "access:label:private",
            Self::ACCESS_LOGGED_IN => "access:label:logged_in",
            Self::ACCESS_PUBLIC => "access:label:public",
            Self::ACCESS_FRIENDS => "access:label:friends",
            _ => "access:limited:label",
        };
        self.translator.translate(key, &[], None)
    }
}
