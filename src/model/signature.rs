//! Detached signature artifacts and their `.sig` sidecar naming

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Raw signature bytes as returned by the token
///
/// The sidecar file holds exactly these bytes: no header, no length prefix
/// and no mechanism identifier. Verifying therefore needs the caller to pick
/// the same mechanism that produced the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArtifact(Vec<u8>);

impl SignatureArtifact {
    pub const SUFFIX: &'static str = ".sig";

    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `<original>.sig`
    pub fn sidecar_path(original: &Path) -> PathBuf {
        let mut name = OsString::from(original.as_os_str());
        name.push(Self::SUFFIX);
        PathBuf::from(name)
    }

    /// Strip the `.sig` suffix (any case) to find the signed file
    pub fn original_path(sidecar: &Path) -> Result<PathBuf, ArtifactError> {
        let name = sidecar
            .to_str()
            .ok_or_else(|| ArtifactError::MissingSuffix {
                path: sidecar.to_path_buf(),
            })?;

        let split = name.len().checked_sub(Self::SUFFIX.len());
        match split {
            Some(split)
                if split > 0
                    && name.is_char_boundary(split)
                    && name[split..].eq_ignore_ascii_case(Self::SUFFIX) =>
            {
                Ok(PathBuf::from(&name[..split]))
            }
            _ => Err(ArtifactError::MissingSuffix {
                path: sidecar.to_path_buf(),
            }),
        }
    }
}

impl From<Vec<u8>> for SignatureArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SignatureArtifact {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("not a signature file (expected a '.sig' suffix): {}", path.display())]
    MissingSuffix { path: PathBuf },
}
