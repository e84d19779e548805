//! PKCS#11 mechanism identifiers and the descriptors shown to callers

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Numeric `CKM_*` mechanism code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MechanismId(u64);

impl MechanismId {
    pub const RSA_PKCS: Self = Self(0x0000_0001);
    pub const SHA1_RSA_PKCS: Self = Self(0x0000_0006);
    pub const SHA256_RSA_PKCS: Self = Self(0x0000_0040);
    pub const SHA384_RSA_PKCS: Self = Self(0x0000_0041);
    pub const SHA512_RSA_PKCS: Self = Self(0x0000_0042);
    pub const ECDSA: Self = Self(0x0000_1041);
    pub const ECDSA_SHA1: Self = Self(0x0000_1042);
    pub const ECDSA_SHA256: Self = Self(0x0000_1044);
    pub const ECDSA_SHA384: Self = Self(0x0000_1045);
    pub const ECDSA_SHA512: Self = Self(0x0000_1046);

    /// First code of the vendor-defined range (`CKM_VENDOR_DEFINED`)
    pub const VENDOR_DEFINED: u64 = 0x8000_0000;

    pub const fn new(code: u64) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u64 {
        self.0
    }

    /// Canonical `CKM_*` name, if the code is a well-known mechanism
    pub fn canonical_name(self) -> Option<&'static str> {
        KNOWN_MECHANISMS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    /// Name shown to the user: the canonical name, or a vendor label
    pub fn display_name(self) -> String {
        match self.canonical_name() {
            Some(name) => name.to_string(),
            None => format!("Vendor Mechanism (0x{:X})", self.0),
        }
    }

    /// Whether the token hashes the input itself for this mechanism
    ///
    /// `CKM_RSA_PKCS` only pads and exponentiates, so its input must already
    /// be a DigestInfo. Everything else we allow either hashes internally or
    /// (raw `CKM_ECDSA`) takes the caller's bytes as the hash.
    pub fn hashes_internally(self) -> bool {
        self != Self::RSA_PKCS
    }
}

impl From<u64> for MechanismId {
    fn from(code: u64) -> Self {
        Self(code)
    }
}

impl fmt::Display for MechanismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for MechanismId {
    type Err = MechanismError;

    /// Accepts `CKM_SHA256_RSA_PKCS`, `sha256_rsa_pkcs`, `0x40` or `64`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MechanismError::Empty);
        }

        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u64::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| MechanismError::Unknown {
                    mechanism: s.to_string(),
                });
        }

        if let Ok(code) = s.parse::<u64>() {
            return Ok(Self(code));
        }

        let upper = s.to_ascii_uppercase();
        let wanted = if upper.starts_with("CKM_") {
            upper
        } else {
            format!("CKM_{upper}")
        };

        KNOWN_MECHANISMS
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(code, _)| Self(*code))
            .ok_or_else(|| MechanismError::Unknown {
                mechanism: s.to_string(),
            })
    }
}

/// A mechanism as advertised by a slot, with the flag we care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanismInfo {
    pub id: MechanismId,
    /// `CKF_SIGN` is set in the mechanism flags
    pub can_sign: bool,
}

impl MechanismInfo {
    pub fn new(id: MechanismId, can_sign: bool) -> Self {
        Self { id, can_sign }
    }
}

/// A signing mechanism offered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismDescriptor {
    pub id: MechanismId,
    pub display_name: String,
    pub can_sign: bool,
}

impl From<MechanismInfo> for MechanismDescriptor {
    fn from(info: MechanismInfo) -> Self {
        Self {
            id: info.id,
            display_name: info.id.display_name(),
            can_sign: info.can_sign,
        }
    }
}

impl fmt::Display for MechanismDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:X})", self.display_name, self.id.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MechanismError {
    #[error("mechanism name is empty")]
    Empty,

    #[error("unknown mechanism: {mechanism}")]
    Unknown { mechanism: String },
}

const KNOWN_MECHANISMS: &[(u64, &str)] = &[
    (0x0000, "CKM_RSA_PKCS_KEY_PAIR_GEN"),
    (0x0001, "CKM_RSA_PKCS"),
    (0x0002, "CKM_RSA_9796"),
    (0x0003, "CKM_RSA_X_509"),
    (0x0004, "CKM_MD2_RSA_PKCS"),
    (0x0005, "CKM_MD5_RSA_PKCS"),
    (0x0006, "CKM_SHA1_RSA_PKCS"),
    (0x0007, "CKM_RIPEMD128_RSA_PKCS"),
    (0x0008, "CKM_RIPEMD160_RSA_PKCS"),
    (0x0009, "CKM_RSA_PKCS_OAEP"),
    (0x000D, "CKM_RSA_PKCS_PSS"),
    (0x000E, "CKM_SHA1_RSA_PKCS_PSS"),
    (0x0010, "CKM_DSA_KEY_PAIR_GEN"),
    (0x0011, "CKM_DSA"),
    (0x0012, "CKM_DSA_SHA1"),
    (0x0040, "CKM_SHA256_RSA_PKCS"),
    (0x0041, "CKM_SHA384_RSA_PKCS"),
    (0x0042, "CKM_SHA512_RSA_PKCS"),
    (0x0043, "CKM_SHA256_RSA_PKCS_PSS"),
    (0x0044, "CKM_SHA384_RSA_PKCS_PSS"),
    (0x0045, "CKM_SHA512_RSA_PKCS_PSS"),
    (0x0046, "CKM_SHA224_RSA_PKCS"),
    (0x0047, "CKM_SHA224_RSA_PKCS_PSS"),
    (0x0120, "CKM_DES_KEY_GEN"),
    (0x0131, "CKM_DES3_KEY_GEN"),
    (0x0132, "CKM_DES3_ECB"),
    (0x0133, "CKM_DES3_CBC"),
    (0x0136, "CKM_DES3_CBC_PAD"),
    (0x0210, "CKM_MD5"),
    (0x0220, "CKM_SHA_1"),
    (0x0221, "CKM_SHA_1_HMAC"),
    (0x0250, "CKM_SHA256"),
    (0x0251, "CKM_SHA256_HMAC"),
    (0x0255, "CKM_SHA224"),
    (0x0260, "CKM_SHA384"),
    (0x0261, "CKM_SHA384_HMAC"),
    (0x0270, "CKM_SHA512"),
    (0x0271, "CKM_SHA512_HMAC"),
    (0x0350, "CKM_GENERIC_SECRET_KEY_GEN"),
    (0x1040, "CKM_EC_KEY_PAIR_GEN"),
    (0x1041, "CKM_ECDSA"),
    (0x1042, "CKM_ECDSA_SHA1"),
    (0x1043, "CKM_ECDSA_SHA224"),
    (0x1044, "CKM_ECDSA_SHA256"),
    (0x1045, "CKM_ECDSA_SHA384"),
    (0x1046, "CKM_ECDSA_SHA512"),
    (0x1050, "CKM_ECDH1_DERIVE"),
    (0x1055, "CKM_EC_EDWARDS_KEY_PAIR_GEN"),
    (0x1057, "CKM_EDDSA"),
    (0x1080, "CKM_AES_KEY_GEN"),
    (0x1081, "CKM_AES_ECB"),
    (0x1082, "CKM_AES_CBC"),
    (0x1085, "CKM_AES_CBC_PAD"),
    (0x1087, "CKM_AES_GCM"),
];
