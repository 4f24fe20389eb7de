//! Service error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Lock already held: {0}")]
    Locked(String),

    #[error("Password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Cache error: {0}")]
    Cache(#[from] elgg_cache::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
