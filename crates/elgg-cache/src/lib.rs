//! Key-value cache pools for the Elgg kernel
//!
//! A [`Pool`] answers `get` from storage when it can and regenerates the
//! value through a callback when it cannot. Several storage flavours are
//! provided:
//!
//! - [`InMemoryPool`]: ephemeral, lives as long as the pool
//! - [`NullPool`]: stores nothing, always regenerates
//! - [`FileCache`]: one JSON file per key, backs the autoloader and system cache
//! - [`ServerPool`]: pool bound to a list of cache servers
//! - [`StaticVariableCache`]: namespaced in-memory map for request-local data

pub mod error;
pub mod file;
pub mod key;
pub mod pool;
pub mod static_cache;

pub use error::{CacheError, Result};
pub use file::FileCache;
pub use key::CacheKey;
pub use pool::{InMemoryPool, NullPool, Pool, ServerPool};
pub use static_cache::StaticVariableCache;
