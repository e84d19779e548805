//! Ports (traits) for token runtime operations
//!
//! These traits define the capabilities the core needs from a token
//! runtime. The use cases depend on these abstractions, not on a concrete
//! PKCS#11 binding, which lets tests drive them with a software token.

mod runtime_loader;
mod token_runtime;
mod token_session;

pub use runtime_loader::RuntimeLoader;
pub use token_runtime::TokenRuntime;
pub use token_session::TokenSession;
