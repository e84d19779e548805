//! Public surface backed by the PKCS#11 module from [`Config`]
//!
//! Every call loads the module, does its work and finalizes it again. Use
//! [`TokenWorker`](crate::TokenWorker) to run them off an interactive
//! thread.

use std::path::{Path, PathBuf};

use crate::adapters::Pkcs11Loader;
use crate::config::Config;
use crate::error::TokenSignResult;
use crate::use_cases;

pub use crate::model::*;

pub fn list_tokens(config: &Config) -> TokenSignResult<Vec<TokenHandle>> {
    use_cases::list_tokens(&Pkcs11Loader::from_config(config))
}

pub fn resolve_key_family(config: &Config, slot: SlotId) -> TokenSignResult<KeyFamily> {
    use_cases::resolve_key_family(&Pkcs11Loader::from_config(config), slot)
}

pub fn list_signing_mechanisms(
    config: &Config,
    slot: SlotId,
) -> TokenSignResult<Vec<MechanismDescriptor>> {
    use_cases::list_signing_mechanisms(&Pkcs11Loader::from_config(config), slot)
}

pub fn sign(
    config: &Config,
    slot: SlotId,
    mechanism: MechanismId,
    pin: &Pin,
    payload: &[u8],
) -> TokenSignResult<SignatureArtifact> {
    use_cases::sign(
        &Pkcs11Loader::from_config(config),
        slot,
        mechanism,
        pin,
        payload,
    )
}

pub fn verify(
    config: &Config,
    slot: SlotId,
    mechanism: MechanismId,
    payload: &[u8],
    signature: &[u8],
) -> TokenSignResult<bool> {
    use_cases::verify(
        &Pkcs11Loader::from_config(config),
        slot,
        mechanism,
        payload,
        signature,
    )
}

pub fn sign_file(
    config: &Config,
    slot: SlotId,
    mechanism: MechanismId,
    pin: &Pin,
    path: &Path,
) -> TokenSignResult<PathBuf> {
    use_cases::sign_file(&Pkcs11Loader::from_config(config), slot, mechanism, pin, path)
}

pub fn verify_file(
    config: &Config,
    slot: SlotId,
    mechanism: MechanismId,
    signature_path: &Path,
) -> TokenSignResult<bool> {
    use_cases::verify_file(
        &Pkcs11Loader::from_config(config),
        slot,
        mechanism,
        signature_path,
    )
}
