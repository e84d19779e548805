//! TokenRuntime trait - slot-level capabilities of a token runtime

use super::TokenSession;
use crate::error::TokenSignResult;
use crate::model::{MechanismId, MechanismInfo, SessionMode, SlotId, TokenHandle};

/// Slot-level queries and session creation
///
/// Works with any runtime that follows the PKCS#11 slot/token model.
pub trait TokenRuntime {
    type Session: TokenSession;

    /// Slots that currently hold a token
    ///
    /// # Errors
    ///
    /// Runtime-level failures; an empty slot list is not an error
    fn slots_with_token(&self) -> TokenSignResult<Vec<SlotId>>;

    /// Descriptive info of the token in `slot`
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MetadataRead` if the info cannot be read
    fn token_info(&self, slot: SlotId) -> TokenSignResult<TokenHandle>;

    /// Mechanisms advertised by `slot`, in the order the slot reports them
    fn mechanism_list(&self, slot: SlotId) -> TokenSignResult<Vec<MechanismId>>;

    /// Flags of one advertised mechanism
    fn mechanism_info(&self, slot: SlotId, mechanism: MechanismId)
        -> TokenSignResult<MechanismInfo>;

    /// Open a session on `slot`
    ///
    /// The session is closed when the returned value is dropped.
    fn open_session(&self, slot: SlotId, mode: SessionMode) -> TokenSignResult<Self::Session>;
}
