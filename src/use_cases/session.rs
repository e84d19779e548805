//! Session helpers shared by the use cases

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::{TokenError, TokenSignResult};
use crate::model::{ObjectQuery, Pin, SlotId};
use crate::ports::{TokenRuntime, TokenSession};

/// Look the slot up again in the live slot list
///
/// A `TokenHandle` may be stale by the time it is used, so every operation
/// re-checks that the token is still present.
pub(crate) fn locate_slot<R: TokenRuntime>(runtime: &R, slot: SlotId) -> TokenSignResult<SlotId> {
    if runtime.slots_with_token()?.contains(&slot) {
        Ok(slot)
    } else {
        Err(TokenError::NotFound { slot_id: slot }.into())
    }
}

/// First object matching `query`, warning when there were more
pub(crate) fn first_object<S: TokenSession>(
    session: &mut S,
    query: &ObjectQuery,
) -> TokenSignResult<Option<S::Object>> {
    let objects = session.find_objects(query)?;
    if objects.len() > 1 {
        warn!(
            "Found {} {:?} objects, using the first and ignoring {}",
            objects.len(),
            query.class,
            objects.len() - 1
        );
    }
    Ok(objects.into_iter().next())
}

/// A logged-in session that logs out when dropped
///
/// Field drop order closes the session right after the logout.
pub(crate) struct AuthenticatedSession<S: TokenSession> {
    session: S,
    slot: SlotId,
}

impl<S: TokenSession> AuthenticatedSession<S> {
    /// Log in with the user PIN; on failure the session is closed
    pub(crate) fn login(mut session: S, slot: SlotId, pin: &Pin) -> TokenSignResult<Self> {
        session.login(pin)?;
        debug!("Logged in to slot {}", slot);
        Ok(Self { session, slot })
    }
}

impl<S: TokenSession> Deref for AuthenticatedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: TokenSession> DerefMut for AuthenticatedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: TokenSession> Drop for AuthenticatedSession<S> {
    fn drop(&mut self) {
        match self.session.logout() {
            Ok(()) => debug!("Logged out of slot {}", self.slot),
            Err(e) => warn!("Logout from slot {} failed: {}", self.slot, e),
        }
    }
}
