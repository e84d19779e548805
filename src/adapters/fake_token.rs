//! Software token for tests
//!
//! Produces real PKCS#1 v1.5 and ECDSA P-256 signatures and keeps count of
//! sessions, logins and logouts so tests can prove nothing leaks.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as EcSignature, SigningKey as EcSigningKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{
    CryptoError, CryptoOperation, RuntimeError, TokenError, TokenSignError, TokenSignResult,
};
use crate::model::{
    KeyFamily, MechanismId, MechanismInfo, ObjectClass, ObjectQuery, Pin, SessionMode, SlotId,
    TokenHandle,
};
use crate::ports::{RuntimeLoader, TokenRuntime, TokenSession};

pub const FAKE_PIN: &str = "1234";

const RSA_TEST_KEY: &str = include_str!("testdata/rsa2048.pem");
const EC_TEST_SCALAR: [u8; 32] = [0x5a; 32];

pub fn rsa_test_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::from_pkcs8_pem(RSA_TEST_KEY).expect("test RSA key"))
        .clone()
}

pub fn ec_test_key() -> EcSigningKey {
    EcSigningKey::from_slice(&EC_TEST_SCALAR).expect("test EC key")
}

#[derive(Debug, Clone)]
pub enum FakeKey {
    Rsa(Box<RsaPrivateKey>),
    Ec(EcSigningKey),
    /// A key type the core does not classify (reads back as `CKK_DSA`)
    Dsa,
}

#[derive(Debug, Clone)]
pub struct FakeToken {
    pub info: TokenHandle,
    pub pin: Pin,
    pub mechanisms: Vec<MechanismInfo>,
    pub signing_key: Option<FakeKey>,
    /// Number of signing keys the token reports for a private key search
    pub signing_key_count: usize,
    pub public_key: bool,
    pub private_key_visible_without_login: bool,
    pub broken_info: bool,
    pub broken_key_type: bool,
    pub broken_mechanism_info: Vec<MechanismId>,
}

impl FakeToken {
    fn base(slot: u64, label: &str, mechanisms: Vec<MechanismInfo>, key: FakeKey) -> Self {
        Self {
            info: TokenHandle::new(slot, label, "Fake Devices Inc.", "SoftToken", "0000-0001"),
            pin: Pin::from_str(FAKE_PIN).expect("fake PIN"),
            mechanisms,
            signing_key: Some(key),
            signing_key_count: 1,
            public_key: true,
            private_key_visible_without_login: true,
            broken_info: false,
            broken_key_type: false,
            broken_mechanism_info: Vec::new(),
        }
    }

    /// Token holding the test RSA-2048 key, advertising a mix of mechanisms
    pub fn rsa(slot: u64) -> Self {
        Self::base(
            slot,
            "rsa token",
            vec![
                MechanismInfo::new(MechanismId::new(0x0000), false),
                MechanismInfo::new(MechanismId::RSA_PKCS, true),
                MechanismInfo::new(MechanismId::new(0x0003), true),
                MechanismInfo::new(MechanismId::SHA1_RSA_PKCS, true),
                MechanismInfo::new(MechanismId::SHA256_RSA_PKCS, true),
                MechanismInfo::new(MechanismId::SHA384_RSA_PKCS, true),
                MechanismInfo::new(MechanismId::SHA512_RSA_PKCS, true),
                MechanismInfo::new(MechanismId::new(0x0043), true),
                MechanismInfo::new(MechanismId::ECDSA, true),
                MechanismInfo::new(MechanismId::new(0x0250), false),
                MechanismInfo::new(MechanismId::new(MechanismId::VENDOR_DEFINED | 0x10), true),
            ],
            FakeKey::Rsa(Box::new(rsa_test_key())),
        )
    }

    /// Token holding the test P-256 key
    pub fn ec(slot: u64) -> Self {
        Self::base(
            slot,
            "ec token",
            vec![
                MechanismInfo::new(MechanismId::new(0x1040), false),
                MechanismInfo::new(MechanismId::ECDSA, true),
                MechanismInfo::new(MechanismId::ECDSA_SHA1, true),
                MechanismInfo::new(MechanismId::ECDSA_SHA256, true),
                MechanismInfo::new(MechanismId::ECDSA_SHA384, true),
                MechanismInfo::new(MechanismId::ECDSA_SHA512, true),
                MechanismInfo::new(MechanismId::RSA_PKCS, true),
                MechanismInfo::new(MechanismId::SHA256_RSA_PKCS, true),
            ],
            FakeKey::Ec(ec_test_key()),
        )
    }

    pub fn with_key(mut self, key: Option<FakeKey>) -> Self {
        self.signing_key = key;
        self
    }

    pub fn without_public_key(mut self) -> Self {
        self.public_key = false;
        self
    }

    pub fn with_hidden_private_key(mut self) -> Self {
        self.private_key_visible_without_login = false;
        self
    }

    pub fn with_broken_info(mut self) -> Self {
        self.broken_info = true;
        self
    }

    pub fn with_broken_key_type(mut self) -> Self {
        self.broken_key_type = true;
        self
    }

    pub fn with_broken_mechanism_info(mut self, mechanism: MechanismId) -> Self {
        self.broken_mechanism_info.push(mechanism);
        self
    }

    pub fn with_signing_key_count(mut self, count: usize) -> Self {
        self.signing_key_count = count;
        self
    }

    fn advertises(&self, mechanism: MechanismId) -> bool {
        self.mechanisms.iter().any(|m| m.id == mechanism)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub loads: usize,
    pub opened: usize,
    pub open: usize,
    pub read_write: usize,
    pub logins: usize,
    pub logouts: usize,
}

#[derive(Debug)]
struct FakeState {
    tokens: Vec<FakeToken>,
    stats: SessionStats,
}

impl FakeState {
    fn token(&self, slot: SlotId) -> TokenSignResult<&FakeToken> {
        self.tokens
            .iter()
            .find(|t| t.info.slot_id == slot)
            .ok_or(TokenSignError::Token(TokenError::NotFound { slot_id: slot }))
    }
}

#[derive(Debug, Clone)]
pub struct FakeLoader {
    state: Arc<Mutex<FakeState>>,
    available: bool,
}

impl FakeLoader {
    pub fn new(tokens: Vec<FakeToken>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                tokens,
                stats: SessionStats::default(),
            })),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    /// Pull a token out of its slot
    pub fn remove_token(&self, slot: u64) {
        lock(&self.state)
            .tokens
            .retain(|t| t.info.slot_id != SlotId::new(slot));
    }

    pub fn stats(&self) -> SessionStats {
        lock(&self.state).stats
    }
}

fn lock(state: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
    state.lock().expect("fake token state poisoned")
}

impl RuntimeLoader for FakeLoader {
    type Runtime = FakeRuntime;

    fn load(&self) -> TokenSignResult<Self::Runtime> {
        if !self.available {
            return Err(RuntimeError::Unavailable {
                reason: "fake module not installed".to_string(),
            }
            .into());
        }
        lock(&self.state).stats.loads += 1;
        Ok(FakeRuntime {
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl TokenRuntime for FakeRuntime {
    type Session = FakeSession;

    fn slots_with_token(&self) -> TokenSignResult<Vec<SlotId>> {
        Ok(lock(&self.state)
            .tokens
            .iter()
            .map(|t| t.info.slot_id)
            .collect())
    }

    fn token_info(&self, slot: SlotId) -> TokenSignResult<TokenHandle> {
        let state = lock(&self.state);
        let token = state.token(slot)?;
        if token.broken_info {
            return Err(TokenError::MetadataRead {
                slot_id: slot,
                reason: "CKR_DEVICE_ERROR".to_string(),
            }
            .into());
        }
        Ok(token.info.clone())
    }

    fn mechanism_list(&self, slot: SlotId) -> TokenSignResult<Vec<MechanismId>> {
        let state = lock(&self.state);
        Ok(state.token(slot)?.mechanisms.iter().map(|m| m.id).collect())
    }

    fn mechanism_info(
        &self,
        slot: SlotId,
        mechanism: MechanismId,
    ) -> TokenSignResult<MechanismInfo> {
        let state = lock(&self.state);
        let token = state.token(slot)?;
        if token.broken_mechanism_info.contains(&mechanism) {
            return Err(TokenError::CommunicationFailed {
                reason: "CKR_FUNCTION_FAILED".to_string(),
            }
            .into());
        }
        token
            .mechanisms
            .iter()
            .find(|m| m.id == mechanism)
            .copied()
            .ok_or_else(|| {
                TokenError::CommunicationFailed {
                    reason: "CKR_MECHANISM_INVALID".to_string(),
                }
                .into()
            })
    }

    fn open_session(&self, slot: SlotId, mode: SessionMode) -> TokenSignResult<Self::Session> {
        let mut state = lock(&self.state);
        state.token(slot)?;
        state.stats.opened += 1;
        state.stats.open += 1;
        if mode == SessionMode::ReadWrite {
            state.stats.read_write += 1;
        }
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            slot,
            logged_in: false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeObject {
    PrivateKey(usize),
    PublicKey,
}

#[derive(Debug)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    slot: SlotId,
    logged_in: bool,
}

impl FakeSession {
    fn with_token<T>(
        &self,
        f: impl FnOnce(&FakeToken) -> TokenSignResult<T>,
    ) -> TokenSignResult<T> {
        let state = lock(&self.state);
        f(state.token(self.slot)?)
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        lock(&self.state).stats.open -= 1;
    }
}

fn crypto_failure(operation: CryptoOperation, reason: impl Into<String>) -> TokenSignError {
    CryptoError::OperationFailed {
        operation,
        reason: reason.into(),
    }
    .into()
}

fn rsa_scheme(mechanism: MechanismId, data: &[u8]) -> Option<(Pkcs1v15Sign, Vec<u8>)> {
    let prepared = match mechanism {
        MechanismId::RSA_PKCS => (Pkcs1v15Sign::new_unprefixed(), data.to_vec()),
        MechanismId::SHA1_RSA_PKCS => (Pkcs1v15Sign::new::<Sha1>(), Sha1::digest(data).to_vec()),
        MechanismId::SHA256_RSA_PKCS => {
            (Pkcs1v15Sign::new::<Sha256>(), Sha256::digest(data).to_vec())
        }
        MechanismId::SHA384_RSA_PKCS => {
            (Pkcs1v15Sign::new::<Sha384>(), Sha384::digest(data).to_vec())
        }
        MechanismId::SHA512_RSA_PKCS => {
            (Pkcs1v15Sign::new::<Sha512>(), Sha512::digest(data).to_vec())
        }
        _ => return None,
    };
    Some(prepared)
}

/// P-256 field size in bytes
const EC_FIELD_BYTES: usize = 32;

/// Raw `CKM_ECDSA` takes input of any length: shorter input is read as a
/// big-endian integer, longer input is truncated to the field size.
fn ec_raw_input(data: &[u8]) -> Vec<u8> {
    if data.len() >= EC_FIELD_BYTES {
        return data[..EC_FIELD_BYTES].to_vec();
    }
    let mut padded = vec![0u8; EC_FIELD_BYTES - data.len()];
    padded.extend_from_slice(data);
    padded
}

fn ec_prehash(mechanism: MechanismId, data: &[u8]) -> Option<Vec<u8>> {
    let prehash = match mechanism {
        MechanismId::ECDSA => ec_raw_input(data),
        MechanismId::ECDSA_SHA1 => Sha1::digest(data).to_vec(),
        MechanismId::ECDSA_SHA256 => Sha256::digest(data).to_vec(),
        MechanismId::ECDSA_SHA384 => Sha384::digest(data).to_vec(),
        MechanismId::ECDSA_SHA512 => Sha512::digest(data).to_vec(),
        _ => return None,
    };
    Some(prehash)
}

impl TokenSession for FakeSession {
    type Object = FakeObject;

    fn login(&mut self, pin: &Pin) -> TokenSignResult<()> {
        let expected = self.with_token(|t| Ok(t.pin.clone()))?;
        if pin != &expected {
            return Err(TokenError::AuthenticationFailed {
                reason: "CKR_PIN_INCORRECT".to_string(),
            }
            .into());
        }
        self.logged_in = true;
        lock(&self.state).stats.logins += 1;
        Ok(())
    }

    fn logout(&mut self) -> TokenSignResult<()> {
        if !self.logged_in {
            return Err(TokenError::CommunicationFailed {
                reason: "CKR_USER_NOT_LOGGED_IN".to_string(),
            }
            .into());
        }
        self.logged_in = false;
        lock(&self.state).stats.logouts += 1;
        Ok(())
    }

    fn find_objects(&mut self, query: &ObjectQuery) -> TokenSignResult<Vec<Self::Object>> {
        let logged_in = self.logged_in;
        self.with_token(|token| {
            if token.signing_key.is_none() {
                return Ok(Vec::new());
            }
            let objects = match query.class {
                ObjectClass::PrivateKey
                    if query.can_sign != Some(false)
                        && (logged_in || token.private_key_visible_without_login) =>
                {
                    (0..token.signing_key_count)
                        .map(FakeObject::PrivateKey)
                        .collect()
                }
                ObjectClass::PublicKey if token.public_key => vec![FakeObject::PublicKey],
                _ => Vec::new(),
            };
            Ok(objects)
        })
    }

    fn key_family(&mut self, key: Self::Object) -> TokenSignResult<KeyFamily> {
        self.with_token(|token| {
            if token.broken_key_type {
                return Err(TokenError::CommunicationFailed {
                    reason: "CKR_ATTRIBUTE_TYPE_INVALID".to_string(),
                }
                .into());
            }
            let family = match (&token.signing_key, key) {
                (Some(FakeKey::Rsa(_)), _) => KeyFamily::Rsa,
                (Some(FakeKey::Ec(_)), _) => KeyFamily::Ec,
                (Some(FakeKey::Dsa), _) => KeyFamily::from_key_type(0x1),
                (None, _) => {
                    return Err(TokenError::CommunicationFailed {
                        reason: "CKR_OBJECT_HANDLE_INVALID".to_string(),
                    }
                    .into())
                }
            };
            Ok(family)
        })
    }

    fn sign(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
    ) -> TokenSignResult<Vec<u8>> {
        let op = CryptoOperation::Sign;
        if !self.logged_in {
            return Err(crypto_failure(op, "CKR_USER_NOT_LOGGED_IN"));
        }
        if !matches!(key, FakeObject::PrivateKey(_)) {
            return Err(crypto_failure(op, "CKR_KEY_FUNCTION_NOT_PERMITTED"));
        }

        self.with_token(|token| {
            if !token.advertises(mechanism) {
                return Err(crypto_failure(op, "CKR_MECHANISM_INVALID"));
            }
            match &token.signing_key {
                Some(FakeKey::Rsa(private)) => {
                    let (scheme, hashed) = rsa_scheme(mechanism, data)
                        .ok_or_else(|| crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT"))?;
                    private
                        .sign(scheme, &hashed)
                        .map_err(|e| crypto_failure(op, e.to_string()))
                }
                Some(FakeKey::Ec(private)) => {
                    let prehash = ec_prehash(mechanism, data)
                        .ok_or_else(|| crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT"))?;
                    let signature: EcSignature = private
                        .sign_prehash(&prehash)
                        .map_err(|_| crypto_failure(op, "CKR_DATA_LEN_RANGE"))?;
                    Ok(signature.to_bytes().to_vec())
                }
                _ => Err(crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT")),
            }
        })
    }

    fn verify(
        &mut self,
        mechanism: MechanismId,
        key: Self::Object,
        data: &[u8],
        signature: &[u8],
    ) -> TokenSignResult<bool> {
        let op = CryptoOperation::Verify;
        if key != FakeObject::PublicKey {
            return Err(crypto_failure(op, "CKR_KEY_FUNCTION_NOT_PERMITTED"));
        }

        self.with_token(|token| {
            if !token.advertises(mechanism) {
                return Err(crypto_failure(op, "CKR_MECHANISM_INVALID"));
            }
            match &token.signing_key {
                Some(FakeKey::Rsa(private)) => {
                    let (scheme, hashed) = rsa_scheme(mechanism, data)
                        .ok_or_else(|| crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT"))?;
                    Ok(private
                        .to_public_key()
                        .verify(scheme, &hashed, signature)
                        .is_ok())
                }
                Some(FakeKey::Ec(private)) => {
                    let prehash = ec_prehash(mechanism, data)
                        .ok_or_else(|| crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT"))?;
                    let Ok(signature) = EcSignature::from_slice(signature) else {
                        return Ok(false);
                    };
                    Ok(private
                        .verifying_key()
                        .verify_prehash(&prehash, &signature)
                        .is_ok())
                }
                _ => Err(crypto_failure(op, "CKR_KEY_TYPE_INCONSISTENT")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::token_contract::{self, ContractFixture};

    fn fixture(token: FakeToken) -> ContractFixture<FakeLoader> {
        ContractFixture {
            loader: FakeLoader::new(vec![token]),
            pin: Pin::from_str(FAKE_PIN).unwrap(),
            wrong_pin: Pin::from_str("999999").unwrap(),
        }
    }

    contract_tests_for!(
        fake_rsa_token_contract,
        make = || fixture(FakeToken::rsa(1)),
        tests = {
            test_every_listed_slot_has_token_info => token_contract::test_every_listed_slot_has_token_info,
            test_mechanism_info_for_every_advertised_mechanism => token_contract::test_mechanism_info_for_every_advertised_mechanism,
            test_login_wrong_pin_fails => token_contract::test_login_wrong_pin_fails,
            test_login_logout => token_contract::test_login_logout,
            test_sign_verify_roundtrip => token_contract::test_sign_verify_roundtrip,
            test_verify_tampered_signature_is_false => token_contract::test_verify_tampered_signature_is_false,
        }
    );

    contract_tests_for!(
        fake_ec_token_contract,
        make = || fixture(FakeToken::ec(4)),
        tests = {
            test_every_listed_slot_has_token_info => token_contract::test_every_listed_slot_has_token_info,
            test_login_wrong_pin_fails => token_contract::test_login_wrong_pin_fails,
            test_sign_verify_roundtrip => token_contract::test_sign_verify_roundtrip,
            test_verify_tampered_signature_is_false => token_contract::test_verify_tampered_signature_is_false,
        }
    );

    #[test]
    fn test_sessions_are_counted() {
        let loader = FakeLoader::new(vec![FakeToken::rsa(1)]);
        let runtime = loader.load().unwrap();
        let session = runtime
            .open_session(SlotId::new(1), SessionMode::ReadOnly)
            .unwrap();
        assert_eq!(loader.stats().open, 1);
        drop(session);
        assert_eq!(loader.stats().open, 0);
        assert_eq!(loader.stats().opened, 1);
    }

    #[test]
    fn test_removed_token_is_not_found() {
        let loader = FakeLoader::new(vec![FakeToken::rsa(1)]);
        loader.remove_token(1);
        let runtime = loader.load().unwrap();
        assert!(runtime.slots_with_token().unwrap().is_empty());
        assert!(matches!(
            runtime.token_info(SlotId::new(1)),
            Err(TokenSignError::Token(TokenError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_raw_ecdsa_input_is_sized_to_the_field() {
        assert_eq!(ec_raw_input(b"hi"), {
            let mut expected = vec![0u8; 30];
            expected.extend_from_slice(b"hi");
            expected
        });
        assert_eq!(ec_raw_input(&[]).len(), EC_FIELD_BYTES);
        assert_eq!(ec_raw_input(&[9u8; 48]), vec![9u8; 32]);
    }

    #[test]
    fn test_unavailable_loader() {
        assert!(matches!(
            FakeLoader::unavailable().load(),
            Err(TokenSignError::Runtime(RuntimeError::Unavailable { .. }))
        ));
    }
}
