//! Signing engine
//!
//! One sign operation per session: open read-write, log in, find the key,
//! sign, log out and close. The logout and close happen on every exit path
//! through [`AuthenticatedSession`]'s drop.

use tracing::{debug, info};

use crate::error::{KeyError, TokenSignResult};
use crate::logic::prepare_input;
use crate::model::{MechanismId, ObjectQuery, Pin, SessionMode, SignatureArtifact, SlotId};
use crate::ports::{RuntimeLoader, TokenRuntime, TokenSession};

use super::session::{first_object, locate_slot, AuthenticatedSession};

/// Sign `payload` with the first signing key of the token in `slot`
///
/// # Arguments
///
/// * `loader` - Token runtime to load for this operation
/// * `slot` - Slot of the token chosen by the caller
/// * `mechanism` - Signature mechanism, normally one listed by
///   [`list_signing_mechanisms`](super::list_signing_mechanisms)
/// * `pin` - User PIN
/// * `payload` - Bytes to sign
///
/// # Errors
///
/// - `TokenNotFound` if the token left its slot
/// - `AuthenticationFailure` on a wrong or locked PIN
/// - `NoSigningKey` if no private key with `CKA_SIGN` is visible after login
/// - `CryptoOperationFailure` if the token refuses to sign
///
/// No retry is attempted. Lockout after repeated wrong PINs is up to the
/// token.
pub fn sign<L: RuntimeLoader>(
    loader: &L,
    slot: SlotId,
    mechanism: MechanismId,
    pin: &Pin,
    payload: &[u8],
) -> TokenSignResult<SignatureArtifact> {
    let runtime = loader.load()?;
    let slot = locate_slot(&runtime, slot)?;

    let session = runtime.open_session(slot, SessionMode::ReadWrite)?;
    let mut session = AuthenticatedSession::login(session, slot, pin)?;

    let key = first_object(&mut *session, &ObjectQuery::signing_private_key())?
        .ok_or(KeyError::NoSigningKey)?;

    let input = prepare_input(mechanism, payload);
    debug!(
        "Signing {} byte(s) ({} prepared) with {} on slot {}",
        payload.len(),
        input.len(),
        mechanism,
        slot
    );
    let signature = session.sign(mechanism, key, &input)?;
    drop(session);

    info!(
        "Produced {} byte {} signature on slot {}",
        signature.len(),
        mechanism,
        slot
    );
    Ok(SignatureArtifact::new(signature))
}
