//! Framework services wired by the Elgg kernel
//!
//! These are the collaborators the service provider constructs and hands to
//! each other. Most of them are thin: they record what they were built from
//! and expose the capability their consumers rely on. The contracts other
//! code leans on directly (database handle, events and hooks, session,
//! translator, timer, printer, caches, security helpers) carry working
//! behaviour.

pub mod app;
pub mod caches;
pub mod database;
pub mod error;
pub mod events;
pub mod http;
pub mod i18n;
pub mod media;
pub mod output;
pub mod security;
pub mod session;
pub mod tables;
pub mod timer;
pub mod views;

pub use database::{Database, DbConfig, QueryCounter};
pub use error::{Result, ServiceError};
pub use events::{Event, EventsService, HandlersService, HookCall, PluginHooksService};
pub use http::{
    HttpProtocolTransport, OutputBufferTransport, Request, ResponseFactory, ResponseTransport,
};
pub use i18n::Translator;
pub use media::{ImageBackend, ImageService};
pub use output::{CliPrinter, HtmlPrinter, LogLevel, Logger, Printer, SharedPrinter};
pub use security::{Crypto, HmacFactory, PasswordService, SiteSecret};
pub use session::Session;
pub use timer::Timer;
