//! Algorithm family of the key a token signs with

use std::fmt;

use super::MechanismId;

/// Algorithm family of a token's signing key
///
/// Derived per session from the private key's `CKA_KEY_TYPE`, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Other,
}

impl KeyFamily {
    /// `CKK_RSA`
    pub const CKK_RSA: u64 = 0x0000_0000;
    /// `CKK_EC` (also known as `CKK_ECDSA`)
    pub const CKK_EC: u64 = 0x0000_0003;

    /// Family assumed when the key type cannot be determined
    pub fn fallback() -> Self {
        Self::Rsa
    }

    /// Classify a raw `CKK_*` key type code
    pub fn from_key_type(code: u64) -> Self {
        match code {
            Self::CKK_RSA => Self::Rsa,
            Self::CKK_EC => Self::Ec,
            _ => Self::Other,
        }
    }

    /// Signing mechanisms that are valid for keys of this family
    pub fn allowed_mechanisms(self) -> &'static [MechanismId] {
        match self {
            Self::Rsa => &[
                MechanismId::RSA_PKCS,
                MechanismId::SHA1_RSA_PKCS,
                MechanismId::SHA256_RSA_PKCS,
                MechanismId::SHA384_RSA_PKCS,
                MechanismId::SHA512_RSA_PKCS,
            ],
            Self::Ec => &[
                MechanismId::ECDSA,
                MechanismId::ECDSA_SHA1,
                MechanismId::ECDSA_SHA256,
                MechanismId::ECDSA_SHA384,
                MechanismId::ECDSA_SHA512,
            ],
            Self::Other => &[],
        }
    }

    pub fn allows(self, mechanism: MechanismId) -> bool {
        self.allowed_mechanisms().contains(&mechanism)
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}
