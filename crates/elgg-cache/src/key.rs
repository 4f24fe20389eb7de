//! Cache keys
//!
//! Only strings and integers can be keys. Anything else (floats, booleans,
//! collections) has no `From` conversion and is rejected by the compiler.

use std::fmt;

use crate::error::{CacheError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Str(String),
    Int(i64),
}

impl CacheKey {
    /// Canonical storage form. `"123"` and `123` address the same entry.
    pub fn normalized(&self) -> Result<String> {
        match self {
            CacheKey::Str(s) if s.is_empty() => Err(CacheError::InvalidKey { key: s.clone() }),
            CacheKey::Str(s) => Ok(s.clone()),
            CacheKey::Int(i) => Ok(i.to_string()),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Str(s) => f.write_str(s),
            CacheKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::Str(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey::Str(key)
    }
}

impl From<&String> for CacheKey {
    fn from(key: &String) -> Self {
        CacheKey::Str(key.clone())
    }
}

impl From<i64> for CacheKey {
    fn from(key: i64) -> Self {
        CacheKey::Int(key)
    }
}

impl From<i32> for CacheKey {
    fn from(key: i32) -> Self {
        CacheKey::Int(i64::from(key))
    }
}

impl From<u32> for CacheKey {
    fn from(key: u32) -> Self {
        CacheKey::Int(i64::from(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_int_keys_share_storage_form() {
        assert_eq!(CacheKey::from("123").normalized().unwrap(), "123");
        assert_eq!(CacheKey::from(123i64).normalized().unwrap(), "123");
        assert_eq!(CacheKey::from(-5i64).to_string(), "-5");
    }

    #[test]
    fn test_empty_key_is_invalid() {
        assert!(matches!(
            CacheKey::from("").normalized(),
            Err(CacheError::InvalidKey { .. })
        ));
    }
}
