//! Sign and verify files with keys that never leave a PKCS#11 token

pub mod adapters;
pub mod api;
pub mod config;
pub mod error;
mod logic;
pub mod model;
pub mod ports;
pub mod use_cases;
mod worker;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorKind, TokenSignError, TokenSignResult};
pub use logic::{filter_mechanisms, prepare_input};
pub use worker::TokenWorker;

// Re-export public API
pub use api::{
    list_signing_mechanisms, list_tokens, resolve_key_family, sign, sign_file, verify,
    verify_file,
};
