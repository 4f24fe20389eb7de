//! Application configuration for the Elgg kernel
//!
//! [`Config`] is the single value a service provider is seeded with. It is
//! loaded once at boot by [`ConfigLoader`] and never mutated afterwards.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{Config, CookieConfig, CookieSettings, ImageProcessor};
