//! Use cases (orchestration)
//!
//! Each use case loads the token runtime, re-locates the selected token and
//! drives the ports for exactly one operation. Sessions never outlive the
//! call that opened them.

mod files;
mod list_mechanisms;
mod list_tokens;
mod resolve_key;
mod session;
mod sign;
mod verify;

pub use files::{sign_file, verify_file};
pub use list_mechanisms::list_signing_mechanisms;
pub use list_tokens::list_tokens;
pub use resolve_key::resolve_key_family;
pub use sign::sign;
pub use verify::verify;
