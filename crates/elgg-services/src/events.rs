//! Events and plugin hooks
//!
//! Events are notifications that a handler may veto by returning `false`.
//! Plugin hooks thread a value through their handlers, each of which may
//! replace it. Handlers registered for the type `all` receive every type of
//! the same name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::timer::Timer;

pub const DEFAULT_PRIORITY: i32 = 500;

/// An event being triggered
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub kind: String,
    pub object: Value,
}

pub type EventHandler = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// A plugin hook invocation as seen by one handler
#[derive(Debug, Clone)]
pub struct HookCall {
    pub hook: String,
    pub kind: String,
    pub params: Value,
    /// Value returned by the previous handler, or the initial value
    pub value: Value,
}

pub type HookHandler = Arc<dyn Fn(&HookCall) -> Option<Value> + Send + Sync>;

/// Invokes handlers and counts the calls
#[derive(Default)]
pub struct HandlersService {
    calls: AtomicUsize,
}

impl HandlersService {
    pub fn call(&self, handler: &EventHandler, event: &Event) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        handler(event)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

type Registrations<H> = RwLock<HashMap<(String, String), Vec<(i32, H)>>>;

fn register<H>(registrations: &Registrations<H>, name: &str, kind: &str, priority: i32, handler: H) {
    registrations
        .write()
        .entry((name.to_string(), kind.to_string()))
        .or_default()
        .push((priority, handler));
}

fn matching<H: Clone>(registrations: &Registrations<H>, name: &str, kind: &str) -> Vec<H> {
    let registrations = registrations.read();
    let mut found: Vec<(i32, H)> = Vec::new();
    let mut keys: Vec<(&str, &str)> = Vec::with_capacity(3);
    for key in [(name, kind), (name, "all"), ("all", kind)] {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    for key in keys {
        if let Some(handlers) = registrations.get(&(key.0.to_string(), key.1.to_string())) {
            found.extend(handlers.iter().cloned());
        }
    }
    // stable: same priority keeps registration order
    found.sort_by_key(|(priority, _)| *priority);
    found.into_iter().map(|(_, handler)| handler).collect()
}

pub struct EventsService {
    handlers: Arc<HandlersService>,
    registrations: Registrations<EventHandler>,
    timer: Option<Arc<Timer>>,
}

impl EventsService {
    pub fn new(handlers: Arc<HandlersService>) -> Self {
        Self {
            handlers,
            registrations: RwLock::new(HashMap::new()),
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

    pub fn handlers(&self) -> &Arc<HandlersService> {
        &self.handlers
    }

    pub fn register_handler<F>(&self, name: &str, kind: &str, priority: i32, handler: F)
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        register(&self.registrations, name, kind, priority, Arc::new(handler) as EventHandler);
    }

    pub fn has_handler(&self, name: &str, kind: &str) -> bool {
        !matching(&self.registrations, name, kind).is_empty()
    }

    /// Trigger an event. Returns `false` as soon as a handler vetoes it.
    pub fn trigger(&self, name: &str, kind: &str, object: Value) -> bool {
        let handlers = matching(&self.registrations, name, kind);
        if handlers.is_empty() {
            return true;
        }

        let timer_key = format!("[{},{}]", name, kind);
        if let Some(timer) = &self.timer {
            timer.begin(&timer_key);
        }

        let event = Event {
            name: name.to_string(),
            kind: kind.to_string(),
            object,
        };
        trace!("Triggering event {}:{} ({} handlers)", name, kind, handlers.len());
        let result = handlers
            .iter()
            .all(|handler| self.handlers.call(handler, &event));

        if let Some(timer) = &self.timer {
            timer.end(&timer_key);
        }
        result
    }
}

pub struct PluginHooksService {
    events: Arc<EventsService>,
    registrations: Registrations<HookHandler>,
}

impl PluginHooksService {
    pub fn new(events: Arc<EventsService>) -> Self {
        Self {
            events,
            registrations: RwLock::new(HashMap::new()),
        }
    }

    /// The events service sharing this hook service's handlers
    pub fn events(&self) -> &Arc<EventsService> {
        &self.events
    }

    pub fn register_handler<F>(&self, hook: &str, kind: &str, priority: i32, handler: F)
    where
        F: Fn(&HookCall) -> Option<Value> + Send + Sync + 'static,
    {
        register(&self.registrations, hook, kind, priority, Arc::new(handler) as HookHandler);
    }

    pub fn has_handler(&self, hook: &str, kind: &str) -> bool {
        !matching(&self.registrations, hook, kind).is_empty()
    }

    /// Run `value` through every matching handler. A handler returning
    /// `None` leaves the value unchanged.
    pub fn trigger(&self, hook: &str, kind: &str, params: Value, value: Value) -> Value {
        let handlers = matching(&self.registrations, hook, kind);
        let mut call = HookCall {
            hook: hook.to_string(),
            kind: kind.to_string(),
            params,
            value,
        };
        for handler in handlers {
            if let Some(value) = handler(&call) {
                call.value = value;
            }
        }
        call.value
    }
}
