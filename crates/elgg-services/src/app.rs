//! Application level services: boot, plugins, upgrades, mail, notifications

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use elgg_cache::{CacheKey, InMemoryPool, Pool};
use elgg_config::Config;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::caches::{EntityCache, PluginSettingsCache};
use crate::database::{Database, DatabaseMutex};
use crate::error::{Result, ServiceError};
use crate::events::PluginHooksService;
use crate::i18n::Translator;
use crate::output::Logger;
use crate::session::Session;
use crate::tables::{EntityTable, PrivateSettingsTable};
use crate::timer::Timer;

/// Holds the data loaded at boot
#[derive(Default)]
pub struct BootService {
    timer: Option<Arc<Timer>>,
    config_values: RwLock<BTreeMap<String, Value>>,
}

impl BootService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timer(mut self, timer: Arc<Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn timer(&self) -> Option<&Arc<Timer>> {
        self.timer.as_ref()
    }

    /// Install the config values fetched while booting
    pub fn load(&self, values: BTreeMap<String, Value>) {
        if let Some(timer) = &self.timer {
            timer.begin("boot:load");
        }
        debug!("Boot data holds {} config values", values.len());
        *self.config_values.write() = values;
        if let Some(timer) = &self.timer {
            timer.end("boot:load");
        }
    }

    pub fn cached_config(&self, name: &str) -> Option<Value> {
        self.config_values.read().get(name).cloned()
    }
}

/// Runs long upgrades in batches
pub struct BatchUpgrader {
    pub config: Arc<Config>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub processed: usize,
    pub failed: usize,
    pub batches: usize,
}

impl BatchUpgrader {
    pub const BATCH_SIZE: usize = 25;

    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Feed `total` items to `process` in batches. `process` receives
    /// `(offset, limit)` and returns how many items of the batch succeeded.
    pub fn run(
        &self,
        total: usize,
        process: &mut dyn FnMut(usize, usize) -> Result<usize>,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        let mut offset = 0;
        while offset < total {
            let limit = Self::BATCH_SIZE.min(total - offset);
            match process(offset, limit) {
                Ok(done) => {
                    let done = done.min(limit);
                    result.processed += done;
                    result.failed += limit - done;
                }
                Err(e) => {
                    warn!("Upgrade batch at offset {} failed: {}", offset, e);
                    result.failed += limit;
                }
            }
            result.batches += 1;
            offset += limit;
        }
        result
    }
}

pub struct DeprecationService {
    pub logger: Arc<Logger>,
}

impl DeprecationService {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn send_notice(&self, message: &str, version: &str) -> bool {
        self.logger
            .warn(&format!("Deprecated in {}: {}", version, message))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport handing messages to the local sendmail
#[derive(Default)]
pub struct Sendmail {
    sent: Mutex<Vec<EmailMessage>>,
}

impl Sendmail {
    pub fn send(&self, message: &EmailMessage) -> Result<()> {
        info!("Sending mail to {}", message.to);
        self.sent.lock().push(message.clone());
        Ok(())
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }
}

pub struct EmailService {
    pub config: Arc<Config>,
    pub hooks: Arc<PluginHooksService>,
    pub mailer: Arc<Sendmail>,
    pub logger: Arc<Logger>,
}

impl EmailService {
    pub fn new(
        config: Arc<Config>,
        hooks: Arc<PluginHooksService>,
        mailer: Arc<Sendmail>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            config,
            hooks,
            mailer,
            logger,
        }
    }

    /// Send a message. A handler of `email:system` answering `true` takes
    /// over delivery.
    pub fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<bool> {
        for address in [from, to] {
            if !address.contains('@') {
                return Err(ServiceError::InvalidArgument(format!(
                    "invalid email address: {}",
                    address
                )));
            }
        }

        let message = EmailMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.trim().to_string(),
            body: body.to_string(),
        };
        let params = serde_json::to_value(&message).unwrap_or(Value::Null);
        if self.hooks.trigger("email", "system", params, Value::Null) == json!(true) {
            self.logger.info(&format!("Email to {} handled by a plugin", to));
            return Ok(true);
        }

        self.mailer.send(&message)?;
        Ok(true)
    }
}

/// Warms the entity cache for a batch of GUIDs
pub struct EntityPreloader {
    pub entity_cache: Arc<EntityCache>,
    pub entities: Arc<EntityTable>,
}

impl EntityPreloader {
    pub fn new(entity_cache: Arc<EntityCache>, entities: Arc<EntityTable>) -> Self {
        Self {
            entity_cache,
            entities,
        }
    }

    /// Load the uncached GUIDs in one query. Returns the GUIDs fetched.
    pub fn preload(&self, guids: &[i64]) -> Result<Vec<i64>> {
        let missing: Vec<i64> = guids
            .iter()
            .copied()
            .filter(|guid| self.entity_cache.get(*guid).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if missing.len() < 2 {
            return Ok(missing);
        }

        let list = missing
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.entities.db.execute(&format!(
            "SELECT * FROM {{prefix}}entities WHERE guid IN ({})",
            list
        ))?;
        for guid in &missing {
            self.entity_cache.set(*guid, json!({ "guid": guid }));
        }
        Ok(missing)
    }
}

/// Who is subscribed to which targets, and by what methods
pub struct SubscriptionsService {
    pub db: Arc<Database>,
    subscriptions: RwLock<HashMap<i64, BTreeMap<i64, BTreeSet<String>>>>,
}

impl SubscriptionsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, user_guid: i64, target_guid: i64, method: &str) -> Result<()> {
        self.db
            .execute("INSERT INTO {prefix}entity_relationships VALUES (?, ?, ?)")?;
        self.subscriptions
            .write()
            .entry(target_guid)
            .or_default()
            .entry(user_guid)
            .or_default()
            .insert(method.to_string());
        Ok(())
    }

    pub fn unsubscribe(&self, user_guid: i64, target_guid: i64) -> Result<bool> {
        self.db
            .execute("DELETE FROM {prefix}entity_relationships WHERE guid_one = ?")?;
        Ok(self
            .subscriptions
            .write()
            .get_mut(&target_guid)
            .map(|users| users.remove(&user_guid).is_some())
            .unwrap_or(false))
    }

    pub fn subscriptions(&self, target_guid: i64) -> BTreeMap<i64, Vec<String>> {
        self.subscriptions
            .read()
            .get(&target_guid)
            .map(|users| {
                users
                    .iter()
                    .map(|(user, methods)| (*user, methods.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// FIFO queue persisted in the database
pub struct DatabaseQueue {
    pub name: String,
    pub db: Arc<Database>,
    items: Mutex<VecDeque<Value>>,
}

impl DatabaseQueue {
    pub fn new(name: impl Into<String>, db: Arc<Database>) -> Self {
        Self {
            name: name.into(),
            db,
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn enqueue(&self, item: Value) -> Result<()> {
        self.db.execute("INSERT INTO {prefix}queue (name, data) VALUES (?, ?)")?;
        self.items.lock().push_back(item);
        Ok(())
    }

    pub fn dequeue(&self) -> Result<Option<Value>> {
        self.db.execute("DELETE FROM {prefix}queue WHERE name = ? LIMIT 1")?;
        Ok(self.items.lock().pop_front())
    }

    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

pub struct NotificationsService {
    pub subscriptions: Arc<SubscriptionsService>,
    pub queue: Arc<DatabaseQueue>,
    pub hooks: Arc<PluginHooksService>,
    pub session: Arc<Session>,
    pub translator: Arc<Translator>,
    pub entities: Arc<EntityTable>,
    pub logger: Arc<Logger>,
    events: RwLock<BTreeMap<(String, String), BTreeSet<String>>>,
}

impl NotificationsService {
    pub const QUEUE_NAME: &'static str = "notifications";

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscriptions: Arc<SubscriptionsService>,
        queue: Arc<DatabaseQueue>,
        hooks: Arc<PluginHooksService>,
        session: Arc<Session>,
        translator: Arc<Translator>,
        entities: Arc<EntityTable>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            subscriptions,
            queue,
            hooks,
            session,
            translator,
            entities,
            logger,
            events: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn register_event(&self, kind: &str, subtype: &str, actions: &[&str]) {
        let mut events = self.events.write();
        let registered = events
            .entry((kind.to_string(), subtype.to_string()))
            .or_default();
        if actions.is_empty() {
            registered.insert("create".to_string());
        }
        registered.extend(actions.iter().map(|a| a.to_string()));
    }

    fn is_registered(&self, action: &str, kind: &str, subtype: &str) -> bool {
        self.events
            .read()
            .get(&(kind.to_string(), subtype.to_string()))
            .map(|actions| actions.contains(action))
            .unwrap_or(false)
    }

    /// Queue a notification event. Returns `false` for unregistered events.
    pub fn enqueue_event(&self, action: &str, kind: &str, object: Value) -> Result<bool> {
        let subtype = object
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !self.is_registered(action, kind, &subtype) {
            return Ok(false);
        }
        self.queue.enqueue(json!({
            "action": action,
            "type": kind,
            "object": object,
            "actor": self.session.logged_in_user_guid(),
        }))?;
        Ok(true)
    }

    /// Deliver everything queued. Returns the number of notifications sent.
    pub fn process_queue(&self) -> Result<usize> {
        let mut sent = 0;
        while let Some(event) = self.queue.dequeue()? {
            let target = event["object"]["container_guid"]
                .as_i64()
                .or_else(|| event["object"]["guid"].as_i64())
                .unwrap_or_default();
            for (user, methods) in self.subscriptions.subscriptions(target) {
                if Some(user) == event["actor"].as_i64() {
                    continue;
                }
                for method in methods {
                    let params = json!({ "event": event, "recipient": user, "method": method });
                    let delivered = self
                        .hooks
                        .trigger("send", &format!("notification:{}", method), params, json!(true));
                    if delivered != json!(false) {
                        sent += 1;
                    }
                }
            }
        }
        if sent > 0 {
            debug!("Sent {} notifications", sent);
        }
        Ok(sent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub id: String,
    pub priority: u32,
    pub active: bool,
    #[serde(default)]
    pub upgrades: Vec<String>,
}

/// Installed plugins and their activation state.
///
/// The sorted list of active plugins is memoised in a pool and invalidated
/// whenever a plugin changes.
pub struct Plugins {
    pub pool: Arc<InMemoryPool>,
    pub settings_cache: Arc<PluginSettingsCache>,
    records: RwLock<BTreeMap<String, PluginRecord>>,
    timer: Option<Arc<Timer>>,
}

impl Plugins {
    const ACTIVE_KEY: &'static str = "active_plugins";

    pub fn new(pool: Arc<InMemoryPool>, settings_cache: Arc<PluginSettingsCache>) -> Self {
        Self {
            pool,
            settings_cache,
            records: RwLock::new(BTreeMap::new()),
            timer: None,
        }
    }

    pub fn with_timer(mut self, timer: Arc<Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn timer(&self) -> Option<&Arc<Timer>> {
        self.timer.as_ref()
    }

    pub fn add(&self, record: PluginRecord) -> Result<()> {
        self.records.write().insert(record.id.clone(), record);
        Ok(self.pool.invalidate(CacheKey::from(Self::ACTIVE_KEY))?)
    }

    pub fn set_active(&self, id: &str, active: bool) -> Result<bool> {
        let changed = match self.records.write().get_mut(id) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        };
        if changed {
            self.pool.invalidate(CacheKey::from(Self::ACTIVE_KEY))?;
        }
        Ok(changed)
    }

    pub fn get(&self, id: &str) -> Option<PluginRecord> {
        self.records.read().get(id).cloned()
    }

    /// Active plugins in boot order
    pub fn active(&self) -> Result<Vec<PluginRecord>> {
        let value = self.pool.get(CacheKey::from(Self::ACTIVE_KEY), &|| {
            let mut active: Vec<PluginRecord> = self
                .records
                .read()
                .values()
                .filter(|record| record.active)
                .cloned()
                .collect();
            active.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
            serde_json::to_value(active).unwrap_or_else(|_| json!([]))
        })?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Boot the active plugins, returning their ids in order
    pub fn boot(&self) -> Result<Vec<String>> {
        if let Some(timer) = &self.timer {
            timer.begin("plugins:boot");
        }
        let active = self.active();
        if let Some(timer) = &self.timer {
            timer.end("plugins:boot");
        }
        Ok(active?.into_iter().map(|record| record.id).collect())
    }
}

pub struct UpgradeService {
    pub translator: Arc<Translator>,
    pub hooks: Arc<PluginHooksService>,
    pub config: Arc<Config>,
    pub logger: Arc<Logger>,
    pub mutex: Arc<DatabaseMutex>,
}

impl UpgradeService {
    pub const LOCK_NAME: &'static str = "upgrade";

    pub fn new(
        translator: Arc<Translator>,
        hooks: Arc<PluginHooksService>,
        config: Arc<Config>,
        logger: Arc<Logger>,
        mutex: Arc<DatabaseMutex>,
    ) -> Self {
        Self {
            translator,
            hooks,
            config,
            logger,
            mutex,
        }
    }

    /// Run `upgrades` while holding the upgrade lock. Returns the number of
    /// upgrades that ran.
    pub fn run(&self, upgrades: &[String]) -> Result<usize> {
        self.mutex.lock(Self::LOCK_NAME)?;

        let mut ran = 0;
        for upgrade in upgrades {
            let params = json!({ "upgrade": upgrade });
            if self.hooks.trigger("upgrade", "system", params, json!(true)) != json!(false) {
                ran += 1;
            } else {
                let message = self
                    .translator
                    .translate("upgrade:error", &[upgrade.as_str()], None);
                self.logger.error(&message);
            }
        }

        self.mutex.unlock(Self::LOCK_NAME)?;
        info!("Ran {} of {} upgrades", ran, upgrades.len());
        Ok(ran)
    }
}

/// Finds upgrades declared by active plugins
pub struct UpgradeLocator {
    pub plugins: Arc<Plugins>,
    pub logger: Arc<Logger>,
    pub private_settings: Arc<PrivateSettingsTable>,
}

impl UpgradeLocator {
    pub fn new(
        plugins: Arc<Plugins>,
        logger: Arc<Logger>,
        private_settings: Arc<PrivateSettingsTable>,
    ) -> Self {
        Self {
            plugins,
            logger,
            private_settings,
        }
    }

    /// `plugin:upgrade` identifiers, in plugin boot order
    pub fn locate(&self) -> Result<Vec<String>> {
        Ok(self
            .plugins
            .active()?
            .into_iter()
            .flat_map(|record| {
                record
                    .upgrades
                    .iter()
                    .map(|upgrade| format!("{}:{}", record.id, upgrade))
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(id: &str, priority: u32, active: bool) -> PluginRecord {
        PluginRecord {
            id: id.to_string(),
            priority,
            active,
            upgrades: vec!["2017010100".to_string()],
        }
    }

    #[test]
    fn test_boot_service_config_values() {
        let timer = Arc::new(Timer::new());
        let boot = BootService::new().with_timer(Arc::clone(&timer));
        boot.load(BTreeMap::from([("simplecache_enabled".to_string(), json!(true))]));
        assert_eq!(boot.cached_config("simplecache_enabled"), Some(json!(true)));
        assert!(boot.cached_config("missing").is_none());
        assert_eq!(timer.times()[0].0, "boot:load");
    }

    #[test]
    fn test_batch_upgrader() {
        let upgrader = BatchUpgrader::new(Arc::new(Config::new()));
        let mut calls = Vec::new();
        let result = upgrader.run(60, &mut |offset, limit| {
            calls.push((offset, limit));
            if offset == 25 {
                Err(ServiceError::InvalidArgument("bad row".to_string()))
            } else {
                Ok(limit)
            }
        });
        assert_eq!(calls, vec![(0, 25), (25, 25), (50, 10)]);
        assert_eq!(
            result,
            BatchResult {
                processed: 35,
                failed: 25,
                batches: 3
            }
        );
    }

    #[test]
    fn test_plugins_active_order_and_invalidation() {
        let plugins = Plugins::new(
            Arc::new(InMemoryPool::new()),
            Arc::new(PluginSettingsCache::default()),
        );
        plugins.add(plugin("groups", 20, true)).unwrap();
        plugins.add(plugin("blog", 10, true)).unwrap();
        plugins.add(plugin("pages", 5, false)).unwrap();

        assert_eq!(plugins.boot().unwrap(), vec!["blog", "groups"]);

        assert!(plugins.set_active("pages", true).unwrap());
        assert!(!plugins.set_active("unknown", true).unwrap());
        assert_eq!(plugins.boot().unwrap(), vec!["pages", "blog", "groups"]);
    }

    #[test]
    fn test_sendmail_records_messages() {
        let mailer = Sendmail::default();
        let message = EmailMessage {
            from: "site@example.org".to_string(),
            to: "user@example.org".to_string(),
            subject: "Welcome".to_string(),
            body: "Hello".to_string(),
        };
        mailer.send(&message).unwrap();
        assert_eq!(mailer.sent(), vec![message]);
    }
}
