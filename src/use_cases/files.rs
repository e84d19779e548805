//! File signing with `.sig` sidecars

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{TokenSignError, TokenSignResult};
use crate::model::{MechanismId, Pin, SignatureArtifact, SlotId};
use crate::ports::RuntimeLoader;

use super::{sign, verify};

/// Sign the file at `path` and write the signature to `<path>.sig`
///
/// The sidecar is only written once the token produced a signature. The bytes
/// go to a temporary file next to it which is then renamed into place, so a
/// failed write leaves neither a truncated `.sig` nor a clobbered old one.
/// Returns the sidecar path.
pub fn sign_file<L: RuntimeLoader>(
    loader: &L,
    slot: SlotId,
    mechanism: MechanismId,
    pin: &Pin,
    path: &Path,
) -> TokenSignResult<PathBuf> {
    let payload = fs::read(path).map_err(|e| TokenSignError::io(path, e))?;
    let signature = sign(loader, slot, mechanism, pin, &payload)?;

    let sidecar = SignatureArtifact::sidecar_path(path);
    write_atomically(&sidecar, signature.as_bytes())?;

    info!("Signature saved to {}", sidecar.display());
    Ok(sidecar)
}

fn write_atomically(target: &Path, bytes: &[u8]) -> TokenSignResult<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |e| TokenSignError::io(target, e);

    let mut staged = NamedTempFile::new_in(dir).map_err(io_err)?;
    staged.write_all(bytes).map_err(io_err)?;
    staged.as_file().sync_all().map_err(io_err)?;
    // On failure the temporary file is removed when the error is dropped
    staged.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Verify a `.sig` sidecar against the file it sits next to
///
/// The original is found by stripping the suffix (any case).
pub fn verify_file<L: RuntimeLoader>(
    loader: &L,
    slot: SlotId,
    mechanism: MechanismId,
    signature_path: &Path,
) -> TokenSignResult<bool> {
    let original = SignatureArtifact::original_path(signature_path)?;

    let signature = fs::read(signature_path).map_err(|e| TokenSignError::io(signature_path, e))?;
    let payload = fs::read(&original).map_err(|e| TokenSignError::io(&original, e))?;

    verify(loader, slot, mechanism, &payload, &signature)
}
