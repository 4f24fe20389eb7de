//! Request handling services

use std::collections::HashMap;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use elgg_config::Config;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::events::PluginHooksService;
use crate::security::{HmacFactory, UrlSigner};
use crate::session::{Session, SystemMessagesService};
use crate::timer::Timer;
use crate::views::AmdConfig;

/// The incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub query: String,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
}

impl Request {
    pub fn new(method: &str, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path: if path.is_empty() { "/" } else { path }.to_string(),
            query: query.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
        }
    }

    /// Build the request from CGI-style environment variables. Outside a
    /// web server this yields `GET /`.
    pub fn from_environment() -> Self {
        let method = env::var("REQUEST_METHOD").unwrap_or_else(|_| "GET".to_string());
        let uri = env::var("REQUEST_URI").unwrap_or_else(|_| "/".to_string());
        let mut request = Self::new(&method, &uri);

        for (name, value) in env::vars() {
            if let Some(header) = name.strip_prefix("HTTP_") {
                if header == "COOKIE" {
                    continue;
                }
                request
                    .headers
                    .insert(header.replace('_', "-").to_ascii_lowercase(), value);
            }
        }

        if let Ok(cookies) = env::var("HTTP_COOKIE") {
            for pair in cookies.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    request.cookies.insert(name.to_string(), value.to_string());
                }
            }
        }

        request
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_xml_http_request(&self) -> bool {
        self.header("X-Requested-With") == Some("XMLHttpRequest")
    }

    /// Path segments without empty parts
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new("GET", "/")
    }
}

/// Filtered request input
#[derive(Default)]
pub struct Input {
    values: RwLock<HashMap<String, Value>>,
}

impl Input {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.write().insert(name.into(), value);
    }

    pub fn all(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }
}

/// Stack of page contexts, seeded from the first path segment
#[derive(Default)]
pub struct Context {
    stack: Mutex<Vec<String>>,
}

impl Context {
    pub fn from_request(request: &Request) -> Self {
        let context = Self::default();
        if let Some(first) = request.segments().first() {
            context.push(first);
        }
        context
    }

    pub fn current(&self) -> Option<String> {
        self.stack.lock().last().cloned()
    }

    pub fn set(&self, context: &str) {
        let mut stack = self.stack.lock();
        stack.pop();
        stack.push(context.to_string());
    }

    pub fn push(&self, context: &str) {
        self.stack.lock().push(context.to_string());
    }

    pub fn pop(&self) -> Option<String> {
        self.stack.lock().pop()
    }

    pub fn contains(&self, context: &str) -> bool {
        self.stack.lock().iter().any(|c| c == context)
    }
}

/// A response ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content: String,
}

impl Response {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            content: content.into(),
        }
    }

    pub fn redirect(location: &str, status: u16) -> Self {
        Self {
            status,
            headers: vec![("Location".to_string(), location.to_string())],
            content: String::new(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            _ => "Unknown",
        }
    }
}

/// Delivers a response to the client.
pub trait ResponseTransport: Send + Sync {
    fn name(&self) -> &'static str;

    fn send(&self, response: &Response) -> Result<()>;

    /// Everything sent so far
    fn sent(&self) -> Vec<u8>;
}

/// Writes only the body, for command line runs
#[derive(Default)]
pub struct OutputBufferTransport {
    buffer: Mutex<Vec<u8>>,
}

impl ResponseTransport for OutputBufferTransport {
    fn name(&self) -> &'static str {
        "output_buffer"
    }

    fn send(&self, response: &Response) -> Result<()> {
        self.buffer.lock().write_all(response.content.as_bytes())?;
        Ok(())
    }

    fn sent(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }
}

/// Writes status line, headers and body
#[derive(Default)]
pub struct HttpProtocolTransport {
    buffer: Mutex<Vec<u8>>,
}

impl ResponseTransport for HttpProtocolTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn send(&self, response: &Response) -> Result<()> {
        let mut buffer = self.buffer.lock();
        write!(buffer, "HTTP/1.1 {} {}\r\n", response.status, response.reason())?;
        for (name, value) in &response.headers {
            write!(buffer, "{}: {}\r\n", name, value)?;
        }
        write!(buffer, "\r\n{}", response.content)?;
        Ok(())
    }

    fn sent(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }
}

/// Sends at most one response per request
pub struct ResponseFactory {
    pub request: Arc<Request>,
    pub hooks: Arc<PluginHooksService>,
    pub ajax: Arc<AjaxService>,
    pub transport: Box<dyn ResponseTransport>,
    sent: AtomicBool,
}

impl ResponseFactory {
    pub fn new(
        request: Arc<Request>,
        hooks: Arc<PluginHooksService>,
        ajax: Arc<AjaxService>,
        transport: Box<dyn ResponseTransport>,
    ) -> Self {
        Self {
            request,
            hooks,
            ajax,
            transport,
            sent: AtomicBool::new(false),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }

    /// Send `response`. Returns `false` if a response already went out.
    pub fn respond(&self, response: Response) -> Result<bool> {
        if self.sent.swap(true, Ordering::SeqCst) {
            warn!("Response already sent, ignoring another one");
            return Ok(false);
        }
        let mut response = response;
        if self.ajax.is_ajax2_request(&self.request) {
            let wrapped = self.ajax.respond_with_data(json!(response.content));
            response.content = wrapped.to_string();
            response
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        self.transport.send(&response)?;
        Ok(true)
    }

    pub fn redirect(&self, location: &str) -> Result<bool> {
        self.respond(Response::redirect(location, 302))
    }
}

/// Builds forward URLs relative to the site
pub struct RedirectService {
    pub session: Arc<Session>,
    pub is_xhr: bool,
    pub site_url: String,
    pub current_url: String,
}

impl RedirectService {
    const LAST_FORWARD_FROM: &'static str = "last_forward_from";

    pub fn new(session: Arc<Session>, is_xhr: bool, site_url: String, current_url: String) -> Self {
        Self {
            session,
            is_xhr,
            site_url,
            current_url,
        }
    }

    /// Remember the current page so a login can return to it
    pub fn set_last_forward_from(&self) {
        if self.is_xhr {
            return;
        }
        self.session
            .set(Self::LAST_FORWARD_FROM, json!(self.current_url));
    }

    pub fn last_forward_from(&self) -> Option<String> {
        self.session
            .get(Self::LAST_FORWARD_FROM)
            .and_then(|url| url.as_str().map(str::to_string))
    }

    pub fn normalize_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.site_url, url.trim_start_matches('/'))
        }
    }
}

pub type PageHandler = Arc<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Dispatches paths to page handlers by their first segment
pub struct Router {
    pub hooks: Arc<PluginHooksService>,
    handlers: RwLock<HashMap<String, PageHandler>>,
    timer: Option<Arc<Timer>>,
}

impl Router {
    pub fn new(hooks: Arc<PluginHooksService>) -> Self {
        Self {
            hooks,
            handlers: RwLock::new(HashMap::new()),
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

    pub fn register_page_handler<F>(&self, identifier: &str, handler: F)
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert(identifier.to_string(), Arc::new(handler));
    }

    pub fn unregister_page_handler(&self, identifier: &str) -> bool {
        self.handlers.write().remove(identifier).is_some()
    }

    /// Route `request`. Returns `false` when no handler accepted it.
    pub fn route(&self, request: &Request) -> bool {
        let segments: Vec<String> = request.segments().iter().map(|s| s.to_string()).collect();
        let Some((identifier, rest)) = segments.split_first() else {
            return false;
        };

        let params = json!({ "identifier": identifier, "segments": rest });
        let params = self.hooks.trigger("route", identifier, json!({}), params);
        if params == json!(false) {
            return true;
        }

        let handler = self.handlers.read().get(identifier.as_str()).cloned();
        let Some(handler) = handler else {
            debug!("No page handler for '{}'", identifier);
            return false;
        };

        let timer_key = format!("route:{}", identifier);
        if let Some(timer) = &self.timer {
            timer.begin(&timer_key);
        }
        let handled = handler(rest);
        if let Some(timer) = &self.timer {
            timer.end(&timer_key);
        }
        handled
    }
}

/// A parsed simplecache URL path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePath {
    pub timestamp: u64,
    pub viewtype: String,
    pub view: String,
}

/// Serves `/cache/{ts}/{viewtype}/{view}` requests
pub struct CacheHandler {
    pub config: Arc<Config>,
    pub request: Arc<Request>,
    pub simplecache_enabled: bool,
}

impl CacheHandler {
    pub fn new(config: Arc<Config>, request: Arc<Request>, simplecache_enabled: bool) -> Self {
        Self {
            config,
            request,
            simplecache_enabled,
        }
    }

    pub fn parse_path(&self, path: &str) -> Option<CachePath> {
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix("cache/").unwrap_or(path);
        let mut parts = path.splitn(3, '/');
        let timestamp = parts.next()?.parse().ok()?;
        let viewtype = parts.next()?;
        let view = parts.next()?;
        if viewtype.is_empty() || view.is_empty() || view.contains("..") {
            return None;
        }
        Some(CachePath {
            timestamp,
            viewtype: viewtype.to_string(),
            view: view.to_string(),
        })
    }
}

/// Serves files from the data directory through signed URLs
pub struct ServeFileHandler {
    pub hmac: Arc<HmacFactory>,
    pub config: Arc<Config>,
}

impl ServeFileHandler {
    pub fn new(hmac: Arc<HmacFactory>, config: Arc<Config>) -> Self {
        Self { hmac, config }
    }

    pub fn file_url(&self, path: &str, expires: Option<u64>) -> Result<String> {
        if path.is_empty() || path.contains("..") {
            return Err(ServiceError::InvalidArgument(format!(
                "invalid file path: {}",
                path
            )));
        }
        let url = format!("{}serve-file/{}", self.config.wwwroot, path.trim_start_matches('/'));
        UrlSigner.sign(&url, &self.hmac, expires)
    }

    pub fn is_valid_url(&self, url: &str, now: u64) -> bool {
        UrlSigner.is_valid(url, &self.hmac, now)
    }
}

/// Ajax API responses
pub struct AjaxService {
    pub hooks: Arc<PluginHooksService>,
    pub system_messages: Arc<SystemMessagesService>,
    pub input: Arc<Input>,
    pub amd_config: Arc<AmdConfig>,
}

impl AjaxService {
    pub const API_HEADER: &'static str = "X-Elgg-Ajax-API";

    pub fn is_ajax2_request(&self, request: &Request) -> bool {
        request.header(Self::API_HEADER) == Some("2")
    }

    /// Wrap `value` with queued system messages, filtered by the
    /// `ajax_response:all` hook.
    pub fn respond_with_data(&self, value: Value) -> Value {
        let messages = json!({
            "success": self.system_messages.dump_register("success"),
            "error": self.system_messages.dump_register("error"),
        });
        let data = json!({
            "value": value,
            "_elgg_msgs": messages,
            "_elgg_deps": self.amd_config.dependencies(),
        });
        self.hooks.trigger("ajax_response", "all", json!({}), data)
    }
}

/// Command line application
pub struct Cli {
    pub name: String,
    pub version: String,
    pub hooks: Arc<PluginHooksService>,
}

impl Cli {
    pub fn new(hooks: Arc<PluginHooksService>) -> Self {
        Self {
            name: "Elgg".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hooks,
        }
    }

    /// Commands registered through the `commands:cli` hook
    pub fn commands(&self) -> Vec<String> {
        match self.hooks.trigger("commands", "cli", json!({}), json!([])) {
            Value::Array(commands) => commands
                .into_iter()
                .filter_map(|command| command.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
