//! Framework caches and the autoloader that persists into them

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use elgg_cache::{CacheKey, FileCache, Pool};
use elgg_config::Config;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::Session;
use crate::timer::Timer;

/// Loaded entities, keyed by GUID
pub struct EntityCache {
    pub session: Arc<Session>,
    pub metadata_cache: Arc<MetadataCache>,
    entities: RwLock<HashMap<i64, Value>>,
}

impl EntityCache {
    pub const MAX_SIZE: usize = 256;

    pub fn new(session: Arc<Session>, metadata_cache: Arc<MetadataCache>) -> Self {
        Self {
            session,
            metadata_cache,
            entities: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, guid: i64) -> Option<Value> {
        self.entities.read().get(&guid).cloned()
    }

    /// Cache `entity`. Refused once the cache is full, except for the
    /// logged in user.
    pub fn set(&self, guid: i64, entity: Value) -> bool {
        let mut entities = self.entities.write();
        let is_current_user = self.session.logged_in_user_guid() == Some(guid);
        if entities.len() >= Self::MAX_SIZE && !entities.contains_key(&guid) && !is_current_user {
            return false;
        }
        entities.insert(guid, entity);
        true
    }

    pub fn remove(&self, guid: i64) -> Result<bool> {
        self.metadata_cache.invalidate(guid)?;
        Ok(self.entities.write().remove(&guid).is_some())
    }

    pub fn clear(&self) {
        self.entities.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

/// Metadata values per entity, stored in a cache pool
pub struct MetadataCache {
    pub pool: Arc<dyn Pool>,
}

impl MetadataCache {
    pub fn new(pool: Arc<dyn Pool>) -> Self {
        Self { pool }
    }

    pub fn get_or_load(&self, guid: i64, load: &dyn Fn() -> Value) -> Result<Value> {
        Ok(self.pool.get(CacheKey::from(guid), load)?)
    }

    pub fn set(&self, guid: i64, values: Value) -> Result<()> {
        Ok(self.pool.put(CacheKey::from(guid), values)?)
    }

    pub fn invalidate(&self, guid: i64) -> Result<()> {
        Ok(self.pool.invalidate(CacheKey::from(guid))?)
    }
}

/// Private settings of plugins, keyed by plugin GUID
#[derive(Default)]
pub struct PluginSettingsCache {
    settings: RwLock<HashMap<i64, BTreeMap<String, String>>>,
}

impl PluginSettingsCache {
    pub fn set_all(&self, plugin_guid: i64, settings: BTreeMap<String, String>) {
        self.settings.write().insert(plugin_guid, settings);
    }

    pub fn get_all(&self, plugin_guid: i64) -> Option<BTreeMap<String, String>> {
        self.settings.read().get(&plugin_guid).cloned()
    }

    pub fn clear(&self) {
        self.settings.write().clear();
    }
}

/// URLs of views served from the simplecache
pub struct SimpleCache {
    pub config: Arc<Config>,
}

impl SimpleCache {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn root(&self) -> String {
        format!("{}cache/", self.config.wwwroot)
    }

    pub fn url(&self, view: &str, viewtype: &str, lastcache: u64) -> String {
        format!(
            "{}{}/{}/{}",
            self.root(),
            lastcache,
            viewtype,
            view.trim_start_matches('/')
        )
    }
}

/// Boot-time data persisted in the file cache
pub struct SystemCache {
    pub file_cache: Arc<FileCache>,
    pub config: Arc<Config>,
    timer: Option<Arc<Timer>>,
    enabled: AtomicBool,
}

impl SystemCache {
    pub fn new(file_cache: Arc<FileCache>, config: Arc<Config>) -> Self {
        Self {
            file_cache,
            config,
            timer: None,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn with_timer(mut self, timer: Arc<Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn timer(&self) -> Option<&Arc<Timer>> {
        self.timer.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn save(&self, kind: &str, data: &Value) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        self.file_cache.save(kind, data)?;
        Ok(true)
    }

    pub fn load(&self, kind: &str) -> Result<Option<Value>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let timer_key = format!("systemcache:{}", kind);
        if let Some(timer) = &self.timer {
            timer.begin(&timer_key);
        }
        let loaded = self.file_cache.load(kind);
        if let Some(timer) = &self.timer {
            timer.end(&timer_key);
        }
        Ok(loaded?)
    }

    pub fn reset(&self) -> Result<()> {
        Ok(self.file_cache.clear()?)
    }
}

/// Class name to file path mapping
#[derive(Debug, Default, Clone)]
pub struct ClassMap {
    paths: BTreeMap<String, String>,
}

impl ClassMap {
    pub fn set_path(&mut self, class: &str, path: &str) {
        self.paths.insert(class.to_string(), path.to_string());
    }

    pub fn path(&self, class: &str) -> Option<&str> {
        self.paths.get(class).map(String::as_str)
    }

    pub fn merge(&mut self, other: BTreeMap<String, String>) {
        self.paths.extend(other);
    }

    pub fn paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }
}

/// Resolves classes through the class map
pub struct ClassLoader {
    map: RwLock<ClassMap>,
    registered: AtomicBool,
}

impl ClassLoader {
    pub fn new(map: ClassMap) -> Self {
        Self {
            map: RwLock::new(map),
            registered: AtomicBool::new(false),
        }
    }

    /// Install the loader; repeated calls are no-ops
    pub fn register(&self) {
        if !self.registered.swap(true, Ordering::SeqCst) {
            debug!("Class loader registered");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn find_file(&self, class: &str) -> Option<String> {
        self.map.read().path(class).map(str::to_string)
    }

    pub fn map(&self) -> ClassMap {
        self.map.read().clone()
    }

    pub fn set_path(&self, class: &str, path: &str) {
        self.map.write().set_path(class, path);
    }

    pub fn merge(&self, paths: BTreeMap<String, String>) {
        self.map.write().merge(paths);
    }
}

/// Persists the class map between runs
pub struct AutoloadManager {
    pub loader: Arc<ClassLoader>,
    storage: Option<Arc<FileCache>>,
}

impl AutoloadManager {
    pub const CACHE_KEY: &'static str = "autoload_manager";

    pub fn new(loader: Arc<ClassLoader>) -> Self {
        Self {
            loader,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<FileCache>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn storage(&self) -> Option<&Arc<FileCache>> {
        self.storage.as_ref()
    }

    /// Merge a stored class map into the loader. Returns whether one was found.
    pub fn load_cache(&self) -> Result<bool> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let Some(stored) = storage.load(Self::CACHE_KEY)? else {
            return Ok(false);
        };
        match serde_json::from_value::<BTreeMap<String, String>>(stored["classes"].clone()) {
            Ok(classes) => {
                debug!("Loaded {} classes from autoload cache", classes.len());
                self.loader.merge(classes);
                Ok(true)
            }
            Err(e) => {
                warn!("Ignoring malformed autoload cache: {}", e);
                Ok(false)
            }
        }
    }

    pub fn save_cache(&self) -> Result<bool> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let map = self.loader.map();
        storage.save(Self::CACHE_KEY, &json!({ "classes": map.paths() }))?;
        Ok(true)
    }
}
