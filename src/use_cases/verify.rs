//! Verification engine

use tracing::{debug, info};

use crate::error::{KeyError, TokenSignResult};
use crate::logic::prepare_input;
use crate::model::{MechanismId, ObjectQuery, SessionMode, SlotId};
use crate::ports::{RuntimeLoader, TokenRuntime, TokenSession};

use super::session::{first_object, locate_slot};

/// Verify `signature` over `payload` with the token's first public key
///
/// Runs in a read-only session without login. `mechanism` must be the one
/// that produced the signature, since the artifact does not record it; a
/// mismatch simply verifies as `false`.
///
/// `Ok(false)` means the signature does not match. A failure of the verify
/// primitive itself is `CryptoOperationFailure`, never `false`.
pub fn verify<L: RuntimeLoader>(
    loader: &L,
    slot: SlotId,
    mechanism: MechanismId,
    payload: &[u8],
    signature: &[u8],
) -> TokenSignResult<bool> {
    let runtime = loader.load()?;
    let slot = locate_slot(&runtime, slot)?;

    let mut session = runtime.open_session(slot, SessionMode::ReadOnly)?;
    let key = first_object(&mut session, &ObjectQuery::public_key())?.ok_or(KeyError::NoPublicKey)?;

    let input = prepare_input(mechanism, payload);
    debug!(
        "Verifying {} byte signature with {} on slot {}",
        signature.len(),
        mechanism,
        slot
    );
    let valid = session.verify(mechanism, key, &input, signature)?;

    info!(
        "Signature {} on slot {}",
        if valid { "valid" } else { "invalid" },
        slot
    );
    Ok(valid)
}
