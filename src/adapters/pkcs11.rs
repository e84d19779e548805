//! PKCS#11 implementation of the token runtime ports
//!
//! Loads a vendor module (eToken, SoftHSM2, OpenSC, ...) through cryptoki.

use std::os::raw::c_ulong;
use std::path::{Path, PathBuf};

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::error::{Error as Pkcs11Error, RvError};
use cryptoki::mechanism::{Mechanism, MechanismType};
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass as CkObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::AuthPin;
use tracing::debug;

use crate::config::Config;
use crate::error::{
    CryptoError, CryptoOperation, KeyError, RuntimeError, TokenError, TokenSignError,
    TokenSignResult,
};
use crate::model::{
    KeyFamily, MechanismId, MechanismInfo, ObjectClass, ObjectQuery, Pin, SessionMode, SlotId,
    TokenHandle,
};
use crate::ports::{RuntimeLoader, TokenRuntime, TokenSession};

/// Loads a PKCS#11 module from disk
#[derive(Debug, Clone)]
pub struct Pkcs11Loader {
    module_path: PathBuf,
}

impl Pkcs11Loader {
    pub fn new(module_path: impl Into<PathBuf>) -> Self {
        Self {
            module_path: module_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.module_path.clone())
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }
}

impl RuntimeLoader for Pkcs11Loader {
    type Runtime = Pkcs11Runtime;

    fn load(&self) -> TokenSignResult<Self::Runtime> {
        let unavailable = |e: Pkcs11Error| {
            TokenSignError::Runtime(RuntimeError::Unavailable {
                reason: format!("{}: {}", self.module_path.display(), e),
            })
        };

        let ctx = Pkcs11::new(&self.module_path).map_err(unavailable)?;
        ctx.initialize(CInitializeArgs::OsThreads)
            .map_err(unavailable)?;

        debug!("Loaded PKCS#11 module {}", self.module_path.display());
        Ok(Pkcs11Runtime { ctx })
    }
}

fn return_value(err: &Pkcs11Error) -> Option<RvError> {
    match err {
        Pkcs11Error::Pkcs11(rv, _) => Some(*rv),
        _ => None,
    }
}

fn token_gone(err: &Pkcs11Error) -> bool {
    matches!(
        return_value(err),
        Some(
            RvError::TokenNotPresent
                | RvError::DeviceRemoved
                | RvError::SlotIdInvalid
                | RvError::SessionHandleInvalid
                | RvError::SessionClosed
        )
    )
}

/// Map a failed call on `slot` to `NotFound` when the token went away
fn token_failure(slot: SlotId, err: Pkcs11Error) -> TokenSignError {
    if token_gone(&err) {
        TokenError::NotFound { slot_id: slot }.into()
    } else {
        TokenError::CommunicationFailed {
            reason: err.to_string(),
        }
        .into()
    }
}

fn crypto_failure(slot: SlotId, operation: CryptoOperation, err: Pkcs11Error) -> TokenSignError {
    if token_gone(&err) {
        return TokenError::NotFound { slot_id: slot }.into();
    }
    CryptoError::OperationFailed {
        operation,
        reason: err.to_string(),
    }
    .into()
}

fn mechanism_code(mechanism: MechanismType) -> MechanismId {
    let code: c_ulong = mechanism.into();
    MechanismId::new(u64::from(code))
}

/// Inverse of `mechanism_code`, without another trip to the token
fn mechanism_type(id: MechanismId) -> TokenSignResult<MechanismType> {
    let unknown = || {
        TokenSignError::from(TokenError::CommunicationFailed {
            reason: format!("{} is not a mechanism this module can query", id),
        })
    };
    let code = c_ulong::try_from(id.code()).map_err(|_| unknown())?;
    MechanismType::try_from(code).map_err(|_| unknown())
}

fn to_mechanism(id: MechanismId) -> TokenSignResult<Mechanism<'static>> {
    let mechanism = match id {
        MechanismId::RSA_PKCS => Mechanism::RsaPkcs,
        MechanismId::SHA1_RSA_PKCS => Mechanism::Sha1RsaPkcs,
        MechanismId::SHA256_RSA_PKCS => Mechanism::Sha256RsaPkcs,
        MechanismId::SHA384_RSA_PKCS => Mechanism::Sha384RsaPkcs,
        MechanismId::SHA512_RSA_PKCS => Mechanism::Sha512RsaPkcs,
        MechanismId::ECDSA => Mechanism::Ecdsa,
        MechanismId::ECDSA_SHA1 => Mechanism::EcdsaSha1,
        MechanismId::ECDSA_SHA256 => Mechanism::EcdsaSha256,
        MechanismId::ECDSA_SHA384 => Mechanism::EcdsaSha384,
        MechanismId::ECDSA_SHA512 => Mechanism::EcdsaSha512,
        other => {
            return Err(CryptoError::UnsupportedMechanism {
                mechanism: other.display_name(),
            }
            .into())
        }
    };
    Ok(mechanism)
}

/// An initialized PKCS#11 module; finalized when dropped
pub struct Pkcs11Runtime {
    ctx: Pkcs11,
}

impl Pkcs11Runtime {
    fn slot(&self, id: SlotId) -> TokenSignResult<Slot> {
        self.ctx
            .get_slots_with_token()
            .map_err(|e| token_failure(id, e))?
            .into_iter()
            .find(|slot| slot.id() == id.get())
            .ok_or(TokenSignError::Token(TokenError::NotFound { slot_id: id }))
    }
}

impl TokenRuntime for Pkcs11Runtime {
    type Session = Pkcs11Session;

    fn slots_with_token(&self) -> TokenSignResult<Vec<SlotId>> {
        let slots = self.ctx.get_slots_with_token().map_err(|e| {
            TokenSignError::Runtime(RuntimeError::Unavailable {
                reason: format!("Failed to list slots: {}", e),
            })
        })?;
        Ok(slots.iter().map(|slot| SlotId::new(slot.id())).collect())
    }

    fn token_info(&self, slot_id: SlotId) -> TokenSignResult<TokenHandle> {
        let slot = self.slot(slot_id)?;
        let info = self.ctx.get_token_info(slot).map_err(|e| {
            TokenSignError::Token(TokenError::MetadataRead {
                slot_id,
                reason: e.to_string(),
            })
        })?;

        Ok(TokenHandle::new(
            slot_id,
            info.label(),
            info.manufacturer_id(),
            info.model(),
            info.serial_number(),
        ))
    }

    fn mechanism_list(&self, slot_id: SlotId) -> TokenSignResult<Vec<MechanismId>> {
        let slot = self.slot(slot_id)?;
        let mechanisms = self
            .ctx
            .get_mechanism_list(slot)
            .map_err(|e| token_failure(slot_id, e))?;
        Ok(mechanisms.into_iter().map(mechanism_code).collect())
    }

    fn mechanism_info(
        &self,
        slot_id: SlotId,
        mechanism: MechanismId,
    ) -> TokenSignResult<MechanismInfo> {
        let mechanism_type = mechanism_type(mechanism)?;
        let slot = self.slot(slot_id)?;
        let info = self
            .ctx
            .get_mechanism_info(slot, mechanism_type)
            .map_err(|e| token_failure(slot_id, e))?;
        Ok(MechanismInfo::new(mechanism, info.sign()))
    }

    fn open_session(&self, slot_id: SlotId, mode: SessionMode) -> TokenSignResult<Self::Session> {
        let slot = self.slot(slot_id)?;
        let session = match mode {
            SessionMode::ReadOnly => self.ctx.open_ro_session(slot),
            SessionMode::ReadWrite => self.ctx.open_rw_session(slot),
        }
        .map_err(|e| token_failure(slot_id, e))?;

        debug!("Opened {:?} session on slot {}", mode, slot_id);
        Ok(Pkcs11Session {
            session,
            slot: slot_id,
        })
    }
}

/// An open PKCS#11 session; `C_CloseSession` runs on drop
pub struct Pkcs11Session {
    session: Session,
    slot: SlotId,
}

impl TokenSession for Pkcs11Session {
    type Object = ObjectHandle;

    fn login(&mut self, pin: &Pin) -> TokenSignResult<()> {
        let auth_pin = AuthPin::new(pin.as_str().to_string().into());
        match self.session.login(UserType::User, Some(&auth_pin)) {
            Ok(()) => Ok(()),
            Err(e) if return_value(&e) == Some(RvError::UserAlreadyLoggedIn) => {
                debug!("User already logged in on slot {}", self.slot);
                Ok(())
            }
            Err(e) => match return_value(&e) {
                Some(
                    RvError::PinIncorrect
                    | RvError::PinInvalid
                    | RvError::PinLenRange
                    | RvError::PinExpired
                    | RvError::PinLocked
                    | RvError::UserPinNotInitialized,
                ) => Err(TokenError::AuthenticationFailed {
                    reason: e.to_string(),
                }
                .into()),
                _ => Err(token_failure(self.slot, e)),
            },
        }
    }

    fn logout(&mut self) -> TokenSignResult<()> {
        self.session
            .logout()
            .map_err(|e| token_failure(self.slot, e))
    }

    fn find_objects(&mut self, query: &ObjectQuery) -> TokenSignResult<Vec<Self::Object>> {
        let class = match query.class {
            ObjectClass::PrivateKey => CkObjectClass::PRIVATE_KEY,
            ObjectClass::PublicKey => CkObjectClass::PUBLIC_KEY,
        };
        let mut template = vec![Attribute::Class(class)];
        if let Some(can_sign) = query.can_sign {
            template.push(Attribute::Sign(can_sign));
        }

        self.session
            .find_objects(&template)
            .map_err(|e| token_failure(self.slot, e))
    }

    fn key_family(&mut self, key: Self::Object) -> TokenSignResult<KeyFamily> {
        let attributes = self
            .session
            .get_attributes(key, &[AttributeType::KeyType])
            .map_err(|e| {
                TokenSignError::Key(KeyError::ResolutionFailed {
                    reason: e.to_string(),
                })
            })?;

        match attributes.first() {
            Some(Attribute::KeyType(key_type)) if *key_type == KeyType::RSA => Ok(KeyFamily::Rsa),
            Some(Attribute::KeyType(key_type)) if *key_type == KeyType::EC => Ok(KeyFamily::Ec),
            Some(Attribute::KeyType(_)) => Ok(KeyFamily::Other),
            _ => Err(KeyError::ResolutionFailed {
                reason: "CKA_KEY_TYPE not returned".to_string(),
            }
            .into()),
        }
    }

    fn sign(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
    ) -> TokenSignResult<Vec<u8>> {
        let mechanism = to_mechanism(mechanism)?;
        self.session
            .sign(&mechanism, key, data)
            .map_err(|e| crypto_failure(self.slot, CryptoOperation::Sign, e))
    }

    fn verify(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
        signature: &[u8],
    ) -> TokenSignResult<bool> {
        let mechanism = to_mechanism(mechanism)?;
        match self.session.verify(&mechanism, key, data, signature) {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    return_value(&e),
                    Some(RvError::SignatureInvalid | RvError::SignatureLenRange)
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(crypto_failure(self.slot, CryptoOperation::Verify, e)),
        }
    }
}
