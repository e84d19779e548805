//! Pure logic (no token I/O)

pub mod catalog;
pub mod digest;

pub use catalog::filter_mechanisms;
pub use digest::prepare_input;
