//! Key resolver: which algorithm family the token's signing key belongs to

use tracing::{debug, warn};

use crate::error::{KeyError, TokenSignResult};
use crate::model::{KeyFamily, ObjectQuery, SessionMode, SlotId};
use crate::ports::{RuntimeLoader, TokenRuntime, TokenSession};

use super::session::{first_object, locate_slot};

fn lookup_key_family<R: TokenRuntime>(runtime: &R, slot: SlotId) -> TokenSignResult<KeyFamily> {
    let mut session = runtime.open_session(slot, SessionMode::ReadOnly)?;
    let key = first_object(&mut session, &ObjectQuery::signing_private_key())?
        .ok_or(KeyError::NoSigningKey)?;
    session.key_family(key)
}

/// Best-effort family of the first signing key on an already located slot
///
/// Falls back to [`KeyFamily::fallback`] (RSA) when no key is visible or the
/// lookup fails. The result is a guess in that case, not a verified fact.
pub(crate) fn key_family_on<R: TokenRuntime>(runtime: &R, slot: SlotId) -> KeyFamily {
    match lookup_key_family(runtime, slot) {
        Ok(family) => {
            debug!("Slot {} holds a {} signing key", slot, family);
            family
        }
        Err(e) => {
            let fallback = KeyFamily::fallback();
            warn!(
                "Could not resolve key type on slot {} ({}), assuming {}",
                slot, e, fallback
            );
            fallback
        }
    }
}

/// Resolve the key family of the token in `slot`
///
/// Uses a short read-only session without login. The first signing-capable
/// private key wins.
///
/// # Errors
///
/// Fails only when the runtime cannot be loaded or the token is gone. Key
/// lookup problems degrade to the RSA fallback.
pub fn resolve_key_family<L: RuntimeLoader>(loader: &L, slot: SlotId) -> TokenSignResult<KeyFamily> {
    let runtime = loader.load()?;
    let slot = locate_slot(&runtime, slot)?;
    Ok(key_family_on(&runtime, slot))
}
