//! Execution environment the provider chooses implementations for

use std::collections::BTreeSet;
use std::env;
use std::fmt;

/// How the process was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Command line script
    Cli,
    /// Web request behind a server gateway
    Web,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Cli => f.write_str("cli"),
            ExecutionMode::Web => f.write_str("web"),
        }
    }
}

/// Ambient facts read once at boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub mode: ExecutionMode,
    /// Names of the optional native libraries available
    pub extensions: BTreeSet<String>,
}

impl Runtime {
    pub const MODE_VAR: &'static str = "ELGG_EXECUTION_MODE";
    pub const EXTENSIONS_VAR: &'static str = "ELGG_EXTENSIONS";

    pub fn cli() -> Self {
        Self {
            mode: ExecutionMode::Cli,
            extensions: BTreeSet::new(),
        }
    }

    pub fn web() -> Self {
        Self {
            mode: ExecutionMode::Web,
            extensions: BTreeSet::new(),
        }
    }

    /// Read the environment.
    ///
    /// `ELGG_EXECUTION_MODE` (`cli` or `web`) wins; otherwise a set
    /// `GATEWAY_INTERFACE` means a web request. `ELGG_EXTENSIONS` is a comma
    /// separated list of extension names.
    pub fn detect() -> Self {
        let mode = match env::var(Self::MODE_VAR).ok().as_deref().map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("web") => ExecutionMode::Web,
            Some(mode) if mode.eq_ignore_ascii_case("cli") => ExecutionMode::Cli,
            _ if env::var_os("GATEWAY_INTERFACE").is_some() => ExecutionMode::Web,
            _ => ExecutionMode::Cli,
        };

        let extensions = env::var(Self::EXTENSIONS_VAR)
            .map(|list| {
                list.split(',')
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self { mode, extensions }
    }

    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.insert(name.to_ascii_lowercase());
        self
    }

    pub fn is_cli(&self) -> bool {
        self.mode == ExecutionMode::Cli
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(&name.to_ascii_lowercase())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::detect()
    }
}
