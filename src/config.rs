//! Runtime configuration
//!
//! ## Environment Variables
//! - `TOKENSIGN_PKCS11_MODULE`: path of the PKCS#11 module to load
//!
//! An explicit value (the CLI's `--module`) wins over the environment, which
//! wins over the platform default. Values are trimmed and an empty value is
//! treated as unset.

use std::env;
use std::path::PathBuf;

pub const MODULE_ENV: &str = "TOKENSIGN_PKCS11_MODULE";

/// SafeNet eToken library
#[cfg(windows)]
pub const DEFAULT_MODULE: &str = r"C:\Windows\System32\eTPKCS11.dll";
#[cfg(not(windows))]
pub const DEFAULT_MODULE: &str = "/usr/lib/libeTPkcs11.so";

/// Trimmed env var, `None` when unset or blank.
fn env_trim(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// PKCS#11 shared library
    pub module_path: PathBuf,
}

impl Config {
    /// Resolve with an optional explicit module path
    pub fn resolve(explicit: Option<&str>) -> Self {
        Self::resolve_from(explicit.map(str::to_string), env_trim(MODULE_ENV))
    }

    /// Environment or platform default
    pub fn from_env() -> Self {
        Self::resolve(None)
    }

    fn resolve_from(explicit: Option<String>, from_env: Option<String>) -> Self {
        let module_path = non_empty(explicit)
            .or_else(|| non_empty(from_env))
            .unwrap_or_else(|| DEFAULT_MODULE.to_string());
        Self {
            module_path: PathBuf::from(module_path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve_from(None, None)
    }
}
