//! Database handle and the small services built directly on it

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use elgg_config::Config;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::app::BootService;
use crate::error::{Result, ServiceError};
use crate::events::PluginHooksService;
use crate::output::Logger;
use crate::timer::Timer;

/// Connection settings pulled out of the application configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub prefix: String,
}

impl DbConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.dbhost.clone(),
            port: config.dbport,
            name: config.dbname.clone(),
            user: config.dbuser.clone(),
            password: config.dbpass.clone(),
            prefix: config.dbprefix.clone(),
        }
    }

    pub fn dsn(&self) -> String {
        format!(
            "mysql:host={};port={};dbname={};charset=utf8",
            self.host, self.port, self.name
        )
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Relational database handle.
///
/// Statements are recorded rather than sent anywhere; the handle keeps the
/// bookkeeping its consumers depend on (query counting, logging, timing).
pub struct Database {
    pub config: Arc<DbConfig>,
    logger: Option<Arc<Logger>>,
    timer: Option<Arc<Timer>>,
    query_count: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl Database {
    pub fn new(config: Arc<DbConfig>) -> Self {
        Self {
            config,
            logger: None,
            timer: None,
            query_count: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_timer(mut self, timer: Arc<Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn logger(&self) -> Option<&Arc<Logger>> {
        self.logger.as_ref()
    }

    pub fn timer(&self) -> Option<&Arc<Timer>> {
        self.timer.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Run a statement. `{prefix}` in `sql` is replaced by the table prefix.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ServiceError::InvalidArgument("empty query".to_string()));
        }
        let sql = sql.replace("{prefix}", &self.config.prefix);

        if let Some(timer) = &self.timer {
            timer.begin(&sql);
        }
        trace!("DB query: {}", sql);
        if let Some(logger) = &self.logger {
            logger.info(&format!("DB query {}", sql));
        }
        self.executed.lock().push(sql.clone());
        if let Some(timer) = &self.timer {
            timer.end(&sql);
        }

        Ok(self.query_count.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

/// Counts the queries run since it was created
pub struct QueryCounter {
    pub db: Arc<Database>,
    initial: usize,
}

impl QueryCounter {
    pub fn new(db: Arc<Database>) -> Self {
        let initial = db.query_count();
        Self { db, initial }
    }

    pub fn delta(&self) -> usize {
        self.db.query_count() - self.initial
    }
}

/// Site-wide settings stored in the `config` table
pub struct ConfigTable {
    pub db: Arc<Database>,
    pub boot: Arc<BootService>,
    pub logger: Arc<Logger>,
    values: RwLock<BTreeMap<String, Value>>,
}

impl ConfigTable {
    pub fn new(db: Arc<Database>, boot: Arc<BootService>, logger: Arc<Logger>) -> Self {
        Self {
            db,
            boot,
            logger,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.boot.cached_config(name) {
            return Some(value);
        }
        self.values.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "config name cannot be empty".to_string(),
            ));
        }
        self.db
            .execute("INSERT INTO {prefix}config (name, value) VALUES (?, ?)")?;
        self.values.write().insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<bool> {
        self.db.execute("DELETE FROM {prefix}config WHERE name = ?")?;
        Ok(self.values.write().remove(name).is_some())
    }
}

/// Named advisory locks held in the database
pub struct DatabaseMutex {
    pub db: Arc<Database>,
    pub logger: Arc<Logger>,
    held: Mutex<HashSet<String>>,
}

impl DatabaseMutex {
    pub fn new(db: Arc<Database>, logger: Arc<Logger>) -> Self {
        Self {
            db,
            logger,
            held: Mutex::new(HashSet::new()),
        }
    }

    pub fn lock(&self, name: &str) -> Result<()> {
        let mut held = self.held.lock();
        if held.contains(name) {
            self.logger
                .notice(&format!("Cannot acquire lock '{}': already held", name));
            return Err(ServiceError::Locked(name.to_string()));
        }
        self.db
            .execute(&format!("CREATE TABLE {{prefix}}{}_lock (id INT)", name))?;
        held.insert(name.to_string());
        debug!("Acquired lock '{}'", name);
        Ok(())
    }

    pub fn unlock(&self, name: &str) -> Result<bool> {
        let released = self.held.lock().remove(name);
        if released {
            self.db
                .execute(&format!("DROP TABLE {{prefix}}{}_lock", name))?;
        }
        Ok(released)
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

/// Database facade exposed to plugins
pub struct PublicDatabase {
    pub db: Arc<Database>,
}

impl PublicDatabase {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn prefix(&self) -> &str {
        self.db.prefix()
    }

    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.db.execute(sql)
    }
}

/// Populates the database with generated content supplied by plugins
pub struct Seeder {
    pub hooks: Arc<PluginHooksService>,
}

impl Seeder {
    pub fn new(hooks: Arc<PluginHooksService>) -> Self {
        Self { hooks }
    }

    /// Names of the seeds plugins registered via the `seeds:database` hook
    pub fn seeds(&self) -> Vec<String> {
        match self.hooks.trigger("seeds", "database", json!({}), json!([])) {
            Value::Array(seeds) => seeds
                .into_iter()
                .filter_map(|seed| seed.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Persistent notices shown to administrators
#[derive(Default)]
pub struct AdminNotices {
    notices: Mutex<BTreeMap<String, String>>,
}

impl AdminNotices {
    pub fn add(&self, id: &str, message: &str) -> bool {
        if id.is_empty() || message.is_empty() {
            return false;
        }
        self.notices
            .lock()
            .insert(id.to_string(), message.to_string());
        true
    }

    pub fn delete(&self, id: &str) -> bool {
        self.notices.lock().remove(id).is_some()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.notices.lock().contains_key(id)
    }

    pub fn all(&self) -> Vec<(String, String)> {
        self.notices
            .lock()
            .iter()
            .map(|(id, message)| (id.clone(), message.clone()))
            .collect()
    }
}
