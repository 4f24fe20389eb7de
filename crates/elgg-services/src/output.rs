//! Log output: printers and the application logger

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use elgg_config::Config;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::events::PluginHooksService;
use crate::http::Context;

/// Severity of a log record, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "notice" => Some(LogLevel::Notice),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats log records for one kind of output.
pub trait Printer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, message: &str, level: LogLevel) -> String;

    fn write(&self, out: &mut dyn Write, message: &str, level: LogLevel) -> io::Result<()> {
        out.write_all(self.render(message, level).as_bytes())
    }
}

/// Printer selected at construction; the variant never changes afterwards
pub type SharedPrinter = Box<dyn Printer>;

/// Plain text for terminals
#[derive(Debug, Default)]
pub struct CliPrinter;

impl Printer for CliPrinter {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn render(&self, message: &str, level: LogLevel) -> String {
        format!("{}: {}\n", level, message)
    }
}

/// Escaped `<pre>` blocks for web pages
#[derive(Debug, Default)]
pub struct HtmlPrinter;

impl HtmlPrinter {
    fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#039;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

impl Printer for HtmlPrinter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn render(&self, message: &str, level: LogLevel) -> String {
        format!(
            "<pre class=\"elgg-logger-data\">{}: {}</pre>",
            level,
            Self::escape(message)
        )
    }
}

/// Application logger.
///
/// Records below the configured level are dropped. Every other record is
/// offered to the `debug:log` plugin hook first; a handler answering `false`
/// swallows it.
pub struct Logger {
    pub level: Option<LogLevel>,
    pub hooks: Arc<PluginHooksService>,
    pub context: Arc<Context>,
    pub config: Arc<Config>,
    pub printer: Arc<SharedPrinter>,
}

impl Logger {
    pub fn new(
        hooks: Arc<PluginHooksService>,
        context: Arc<Context>,
        config: Arc<Config>,
        printer: Arc<SharedPrinter>,
    ) -> Self {
        let level = config.debug.as_deref().and_then(LogLevel::parse);
        Self {
            level,
            hooks,
            context,
            config,
            printer,
        }
    }

    pub fn is_loggable(&self, level: LogLevel) -> bool {
        matches!(self.level, Some(threshold) if level >= threshold)
    }

    /// Log `message`. Returns whether the record was emitted.
    pub fn log(&self, level: LogLevel, message: &str) -> bool {
        if !self.is_loggable(level) {
            return false;
        }

        let params = json!({
            "level": level.as_str(),
            "msg": message,
            "context": self.context.current(),
        });
        let verdict = self.hooks.trigger("debug", "log", params, json!(true));
        if verdict == json!(false) {
            return false;
        }

        match level {
            LogLevel::Debug => debug!(target: "elgg", "{}", message),
            LogLevel::Info | LogLevel::Notice => info!(target: "elgg", "{}", message),
            LogLevel::Warning => warn!(target: "elgg", "{}", message),
            LogLevel::Error => error!(target: "elgg", "{}", message),
        }
        true
    }

    pub fn error(&self, message: &str) -> bool {
        self.log(LogLevel::Error, message)
    }

    pub fn warn(&self, message: &str) -> bool {
        self.log(LogLevel::Warning, message)
    }

    pub fn notice(&self, message: &str) -> bool {
        self.log(LogLevel::Notice, message)
    }

    pub fn info(&self, message: &str) -> bool {
        self.log(LogLevel::Info, message)
    }

    /// Write `message` through the printer regardless of level
    pub fn dump(&self, out: &mut dyn Write, message: &str, level: LogLevel) -> io::Result<()> {
        self.printer.write(out, message, level)
    }
}
