//! Token directory: the tokens currently sitting in a slot

use tracing::{debug, info, warn};

use crate::error::TokenSignResult;
use crate::model::TokenHandle;
use crate::ports::{RuntimeLoader, TokenRuntime};

/// Enumerate present tokens with their descriptive metadata
///
/// A slot whose token info cannot be read is logged and skipped. No token
/// at all is an empty list, not an error.
///
/// # Errors
///
/// Only a runtime that cannot be loaded or cannot list its slots fails the
/// whole call.
pub fn list_tokens<L: RuntimeLoader>(loader: &L) -> TokenSignResult<Vec<TokenHandle>> {
    let runtime = loader.load()?;
    let slots = runtime.slots_with_token()?;
    debug!("{} slot(s) with a token present", slots.len());

    let mut tokens = Vec::with_capacity(slots.len());
    for slot in slots {
        match runtime.token_info(slot) {
            Ok(token) => tokens.push(token),
            Err(e) => warn!("Skipping slot {}: {}", slot, e),
        }
    }

    if tokens.is_empty() {
        info!("No token found in any slot");
    }
    Ok(tokens)
}
