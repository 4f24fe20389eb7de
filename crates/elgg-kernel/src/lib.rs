//! Service provider of the Elgg kernel
//!
//! Boot the framework by handing a [`elgg_config::Config`] to
//! [`ServiceProvider::new`]. The provider declares every framework service
//! under its well-known name (see [`names`]) and builds each one the first
//! time it is asked for, choosing command line or web implementations from
//! the detected [`Runtime`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use elgg_config::ConfigLoader;
//! use elgg_kernel::ServiceProvider;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! elgg_kernel::logging::init(&config);
//!
//! let provider = ServiceProvider::new(config).unwrap();
//! let printer = provider.printer().unwrap();
//! println!("{}", printer.name());
//! ```

pub mod logging;
pub mod modules;
pub mod names;
pub mod provider;
pub mod runtime;

pub use modules::default_registry;
pub use provider::ServiceProvider;
pub use runtime::{ExecutionMode, Runtime};
