//! TokenSession trait - what can be done through an open session

use crate::error::TokenSignResult;
use crate::model::{KeyFamily, MechanismId, ObjectQuery, Pin};

/// An open session on one token
///
/// Implementations close the underlying session on drop, so a session can
/// never outlive the value that owns it.
pub trait TokenSession {
    /// Handle of an object found on the token
    type Object: Copy + std::fmt::Debug;

    /// Log the normal user in
    ///
    /// # Errors
    ///
    /// Returns `TokenError::AuthenticationFailed` on a wrong, locked or
    /// malformed PIN
    fn login(&mut self, pin: &Pin) -> TokenSignResult<()>;

    /// Log the user out
    fn logout(&mut self) -> TokenSignResult<()>;

    /// All objects matching `query`, in the order the token returns them
    fn find_objects(&mut self, query: &ObjectQuery) -> TokenSignResult<Vec<Self::Object>>;

    /// Read `CKA_KEY_TYPE` of a key object and classify it
    fn key_family(&mut self, key: Self::Object) -> TokenSignResult<KeyFamily>;

    /// Run the sign primitive
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::OperationFailed` if the token rejects the
    /// operation
    fn sign(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
    ) -> TokenSignResult<Vec<u8>>;

    /// Run the verify primitive
    ///
    /// A signature that does not match is `Ok(false)`; only a failure of the
    /// primitive itself is an error.
    fn verify(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
        signature: &[u8],
    ) -> TokenSignResult<bool>;
}
