//! Views, forms, menus and front-end assets

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use elgg_config::Config;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

use crate::events::PluginHooksService;
use crate::http::Input;
use crate::output::Logger;

pub const DEFAULT_VIEWTYPE: &str = "default";

/// Registry and renderer of view templates.
///
/// Templates substitute `{{name}}` with the matching entry of `vars`. The
/// rendered output is passed through the `view:{name}` hook.
pub struct ViewsService {
    pub hooks: Arc<PluginHooksService>,
    pub logger: Arc<Logger>,
    pub input: Arc<Input>,
    templates: RwLock<HashMap<(String, String), String>>,
}

impl ViewsService {
    pub fn new(hooks: Arc<PluginHooksService>, logger: Arc<Logger>, input: Arc<Input>) -> Self {
        Self {
            hooks,
            logger,
            input,
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_view(&self, view: &str, viewtype: &str, template: impl Into<String>) {
        self.templates
            .write()
            .insert((viewtype.to_string(), view.to_string()), template.into());
    }

    pub fn view_exists(&self, view: &str, viewtype: &str) -> bool {
        self.templates
            .read()
            .contains_key(&(viewtype.to_string(), view.to_string()))
    }

    pub fn render(&self, view: &str, vars: &Value) -> Option<String> {
        let template = self
            .templates
            .read()
            .get(&(DEFAULT_VIEWTYPE.to_string(), view.to_string()))
            .cloned();
        let Some(mut output) = template else {
            self.logger.notice(&format!("View {} does not exist", view));
            return None;
        };

        if let Some(vars) = vars.as_object() {
            for (name, value) in vars {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                output = output.replace(&format!("{{{{{}}}}}", name), &text);
            }
        }

        let filtered = self
            .hooks
            .trigger("view", view, json!({ "vars": vars }), json!(output));
        Some(filtered.as_str().map(str::to_string).unwrap_or(output))
    }
}

pub struct FormsService {
    pub views: Arc<ViewsService>,
    pub logger: Arc<Logger>,
}

impl FormsService {
    pub fn new(views: Arc<ViewsService>, logger: Arc<Logger>) -> Self {
        Self { views, logger }
    }

    /// Render the `forms/{action}` view inside a form tag
    pub fn render(&self, action: &str, vars: &Value) -> Option<String> {
        let body = self.views.render(&format!("forms/{}", action), vars)?;
        Some(format!(
            "<form method=\"post\" action=\"action/{}\">{}</form>",
            action, body
        ))
    }
}

/// Tracks which views are served through the simplecache
pub struct ViewCacher {
    pub views: Arc<ViewsService>,
    pub config: Arc<Config>,
    cacheable: RwLock<BTreeSet<String>>,
}

impl ViewCacher {
    pub fn new(views: Arc<ViewsService>, config: Arc<Config>) -> Self {
        Self {
            views,
            config,
            cacheable: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn register_cacheable(&self, view: &str) {
        self.cacheable.write().insert(view.to_string());
    }

    pub fn is_cacheable(&self, view: &str) -> bool {
        self.cacheable.read().contains(view)
    }

    pub fn cacheable_views(&self) -> Vec<String> {
        self.cacheable.read().iter().cloned().collect()
    }
}

/// Menu items collected from the `register:menu:{name}` hook
pub struct MenuService {
    pub hooks: Arc<PluginHooksService>,
    pub config: Arc<Config>,
}

impl MenuService {
    pub fn new(hooks: Arc<PluginHooksService>, config: Arc<Config>) -> Self {
        Self { hooks, config }
    }

    pub fn items(&self, menu: &str) -> Vec<Value> {
        let hook = format!("menu:{}", menu);
        match self.hooks.trigger("register", &hook, json!({}), json!([])) {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }
}

/// Module loader configuration handed to the browser
pub struct AmdConfig {
    pub hooks: Arc<PluginHooksService>,
    base_url: RwLock<String>,
    paths: RwLock<BTreeMap<String, String>>,
    dependencies: RwLock<BTreeSet<String>>,
}

impl AmdConfig {
    pub fn new(hooks: Arc<PluginHooksService>) -> Self {
        Self {
            hooks,
            base_url: RwLock::new(String::new()),
            paths: RwLock::new(BTreeMap::new()),
            dependencies: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn set_base_url(&self, url: impl Into<String>) {
        *self.base_url.write() = url.into();
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    pub fn add_path(&self, module: &str, path: &str) {
        self.paths
            .write()
            .insert(module.to_string(), path.trim_end_matches(".js").to_string());
    }

    pub fn add_dependency(&self, module: &str) {
        self.dependencies.write().insert(module.to_string());
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.dependencies.read().iter().cloned().collect()
    }

    /// The configuration object, filtered by the `config:amd` hook
    pub fn config(&self) -> Value {
        let config = json!({
            "baseUrl": self.base_url(),
            "paths": &*self.paths.read(),
            "deps": self.dependencies(),
        });
        self.hooks.trigger("config", "amd", json!({}), config)
    }
}

/// Turns plain text blocks into paragraphs
#[derive(Debug, Default)]
pub struct AutoP;

impl AutoP {
    pub fn process(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        text.split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(|block| format!("<p>{}</p>", block.replace('\n', "<br />\n")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub label: String,
}

/// Builds columns for entity tables
#[derive(Debug, Default)]
pub struct ColumnFactory;

impl ColumnFactory {
    pub fn make(&self, name: &str, label: Option<&str>) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            label: label.unwrap_or(name).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFile {
    pub name: String,
    pub url: String,
    pub location: String,
    pub loaded: bool,
}

/// Scripts and stylesheets registered for the page
#[derive(Default)]
pub struct ExternalFiles {
    files: RwLock<BTreeMap<(String, String), ExternalFile>>,
}

impl ExternalFiles {
    pub fn register(&self, kind: &str, name: &str, url: &str, location: &str) {
        let key = (kind.to_string(), name.to_string());
        let mut files = self.files.write();
        let loaded = files.get(&key).map(|file| file.loaded).unwrap_or(false);
        files.insert(
            key,
            ExternalFile {
                name: name.to_string(),
                url: url.to_string(),
                location: location.to_string(),
                loaded,
            },
        );
    }

    pub fn load(&self, kind: &str, name: &str) -> bool {
        match self.files.write().get_mut(&(kind.to_string(), name.to_string())) {
            Some(file) => {
                file.loaded = true;
                true
            }
            None => false,
        }
    }

    pub fn loaded_urls(&self, kind: &str, location: &str) -> Vec<String> {
        self.files
            .read()
            .iter()
            .filter(|((k, _), file)| k == kind && file.loaded && file.location == location)
            .map(|(_, file)| file.url.clone())
            .collect()
    }
}

/// Known widget types
#[derive(Default)]
pub struct WidgetsService {
    types: RwLock<BTreeMap<String, String>>,
}

impl WidgetsService {
    pub fn register_type(&self, handler: &str, name: &str) -> bool {
        if handler.is_empty() {
            return false;
        }
        debug!("Registered widget type '{}'", handler);
        self.types
            .write()
            .insert(handler.to_string(), name.to_string());
        true
    }

    pub fn types(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    pub fn unregister_type(&self, handler: &str) -> bool {
        self.types.write().remove(handler).is_some()
    }
}
