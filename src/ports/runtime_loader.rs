use super::TokenRuntime;
use crate::error::TokenSignResult;

/// Capability to load and initialize a token runtime
///
/// Every public operation loads a fresh runtime and drops it when done.
pub trait RuntimeLoader {
    type Runtime: TokenRuntime;

    /// # Errors
    ///
    /// Returns `RuntimeError::Unavailable` if the module cannot be loaded
    /// or initialized
    fn load(&self) -> TokenSignResult<Self::Runtime>;
}
