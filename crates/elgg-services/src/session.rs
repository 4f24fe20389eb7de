//! Session and the services keeping per-user state

use std::collections::HashMap;
use std::sync::Arc;

use elgg_config::{Config, CookieSettings};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::events::PluginHooksService;
use crate::security::Crypto;
use crate::tables::EntityTable;

/// Attribute store for the current visitor
pub struct Session {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    id: Uuid,
    attributes: RwLock<HashMap<String, Value>>,
}

impl Session {
    /// Session whose handler persists through `db`
    pub fn from_database(config: Arc<Config>, db: Arc<Database>) -> Self {
        let id = Uuid::new_v4();
        debug!("Started session {}", id);
        Self {
            config,
            db,
            id,
            attributes: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cookie name the session id travels in
    pub fn name(&self) -> &str {
        &self.config.cookie_config().session.name
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.attributes.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.attributes.write().remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.read().contains_key(key)
    }

    pub fn logged_in_user_guid(&self) -> Option<i64> {
        self.get("guid").and_then(|guid| guid.as_i64())
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in_user_guid().is_some()
    }

    pub fn invalidate(&self) {
        self.attributes.write().clear();
    }
}

/// Remember-me logins backed by a hashed token
pub struct PersistentLoginService {
    pub db: Arc<Database>,
    pub session: Arc<Session>,
    pub crypto: Arc<Crypto>,
    pub cookie_config: CookieSettings,
    /// Token sent by the browser with this request, empty if none
    pub cookie_token: String,
    tokens: Mutex<HashMap<String, i64>>,
}

impl PersistentLoginService {
    pub fn new(
        db: Arc<Database>,
        session: Arc<Session>,
        crypto: Arc<Crypto>,
        cookie_config: CookieSettings,
        cookie_token: String,
    ) -> Self {
        Self {
            db,
            session,
            crypto,
            cookie_config,
            cookie_token,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Issue a new token for `guid`; only its hash is stored.
    pub fn make_login_persistent(&self, guid: i64) -> String {
        let token = format!("z{}", self.crypto.random_string(31));
        self.tokens.lock().insert(Self::hash_token(&token), guid);
        self.session.set("code", json!(token));
        token
    }

    pub fn user_for_token(&self, token: &str) -> Option<i64> {
        if token.is_empty() {
            return None;
        }
        self.tokens.lock().get(&Self::hash_token(token)).copied()
    }

    /// The user the request's remember-me cookie belongs to
    pub fn boot_session_user(&self) -> Option<i64> {
        self.user_for_token(&self.cookie_token)
    }

    pub fn remove_persistent_login(&self, token: &str) -> bool {
        self.session.remove("code");
        self.tokens.lock().remove(&Self::hash_token(token)).is_some()
    }
}

/// Success and error messages queued for the next page
pub struct SystemMessagesService {
    pub session: Arc<Session>,
}

impl SystemMessagesService {
    const SESSION_KEY: &'static str = "msg";

    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn add(&self, register: &str, message: &str) {
        let mut registers = self
            .session
            .get(Self::SESSION_KEY)
            .unwrap_or_else(|| json!({}));
        if let Some(registers) = registers.as_object_mut() {
            let queue = registers
                .entry(register.to_string())
                .or_insert_with(|| json!([]));
            if let Some(queue) = queue.as_array_mut() {
                queue.push(json!(message));
            }
        }
        self.session.set(Self::SESSION_KEY, registers);
    }

    pub fn add_success(&self, message: &str) {
        self.add("success", message)
    }

    pub fn add_error(&self, message: &str) {
        self.add("error", message)
    }

    pub fn count(&self, register: &str) -> usize {
        self.session
            .get(Self::SESSION_KEY)
            .and_then(|registers| registers.get(register).and_then(Value::as_array).map(Vec::len))
            .unwrap_or(0)
    }

    /// Remove and return the messages of `register`
    pub fn dump_register(&self, register: &str) -> Vec<String> {
        let Some(mut registers) = self.session.get(Self::SESSION_KEY) else {
            return Vec::new();
        };
        let messages = registers
            .as_object_mut()
            .and_then(|registers| registers.remove(register))
            .and_then(|queue| match queue {
                Value::Array(queue) => Some(
                    queue
                        .into_iter()
                        .filter_map(|message| message.as_str().map(str::to_string))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        self.session.set(Self::SESSION_KEY, registers);
        messages
    }
}

/// Permission checks delegated to the `permissions_check` hooks
pub struct UserCapabilities {
    pub hooks: Arc<PluginHooksService>,
    pub entities: Arc<EntityTable>,
    pub session: Arc<Session>,
}

impl UserCapabilities {
    pub fn can_edit(&self, owner_guid: i64) -> bool {
        let default = self.session.logged_in_user_guid() == Some(owner_guid);
        let params = json!({
            "owner_guid": owner_guid,
            "user_guid": self.session.logged_in_user_guid(),
        });
        self.hooks
            .trigger("permissions_check", "entity", params, json!(default))
            .as_bool()
            .unwrap_or(default)
    }
}

/// Form values kept across a failed submission
#[derive(Default)]
pub struct StickyForms {
    forms: Mutex<HashMap<String, Value>>,
}

impl StickyForms {
    pub fn make_sticky(&self, form: &str, values: Value) {
        self.forms.lock().insert(form.to_string(), values);
    }

    pub fn is_sticky(&self, form: &str) -> bool {
        self.forms.lock().contains_key(form)
    }

    pub fn value(&self, form: &str, field: &str) -> Option<Value> {
        self.forms
            .lock()
            .get(form)
            .and_then(|values| values.get(field).cloned())
    }

    pub fn clear(&self, form: &str) {
        self.forms.lock().remove(form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbConfig;

    fn session() -> Arc<Session> {
        let config = Arc::new(Config::new());
        let db = Arc::new(Database::new(Arc::new(DbConfig::from_config(&config))));
        Arc::new(Session::from_database(config, db))
    }

    #[test]
    fn test_session_attributes() {
        let session = session();
        assert_eq!(session.name(), "Elgg");
        assert!(!session.is_logged_in());

        session.set("guid", json!(42));
        assert!(session.has("guid"));
        assert_eq!(session.logged_in_user_guid(), Some(42));

        session.invalidate();
        assert!(session.get("guid").is_none());
    }

    #[test]
    fn test_persistent_login_round() {
        let session = session();
        let crypto = Arc::new(Crypto::default());
        let cookie = Config::new().cookie_config().remember_me.clone();
        let logins = PersistentLoginService::new(
            Arc::clone(&session.db),
            Arc::clone(&session),
            crypto,
            cookie,
            String::new(),
        );

        assert_eq!(logins.cookie_config.name, "elggperm");
        assert!(logins.boot_session_user().is_none());

        let token = logins.make_login_persistent(7);
        assert!(token.starts_with('z'));
        assert_eq!(token.len(), 32);
        assert_eq!(logins.user_for_token(&token), Some(7));
        assert!(logins.remove_persistent_login(&token));
        assert_eq!(logins.user_for_token(&token), None);
    }

    #[test]
    fn test_system_messages_queue() {
        let messages = SystemMessagesService::new(session());
        messages.add_success("Saved");
        messages.add_success("Published");
        messages.add_error("Oops");

        assert_eq!(messages.count("success"), 2);
        assert_eq!(messages.dump_register("success"), vec!["Saved", "Published"]);
        assert_eq!(messages.count("success"), 0);
        assert_eq!(messages.count("error"), 1);
    }

    #[test]
    fn test_sticky_forms() {
        let forms = StickyForms::default();
        forms.make_sticky("blog/save", json!({"title": "Draft"}));
        assert!(forms.is_sticky("blog/save"));
        assert_eq!(forms.value("blog/save", "title"), Some(json!("Draft")));
        forms.clear("blog/save");
        assert!(forms.value("blog/save", "title").is_none());
    }
}
