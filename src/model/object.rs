//! Attribute-based object searches

/// `CKA_CLASS` values the core searches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    PrivateKey,
    PublicKey,
}

/// Template for an object search on an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectQuery {
    pub class: ObjectClass,
    /// When set, `CKA_SIGN` must equal this value
    pub can_sign: Option<bool>,
}

impl ObjectQuery {
    /// Private keys flagged `CKA_SIGN = true`
    pub fn signing_private_key() -> Self {
        Self {
            class: ObjectClass::PrivateKey,
            can_sign: Some(true),
        }
    }

    /// Any public key object
    pub fn public_key() -> Self {
        Self {
            class: ObjectClass::PublicKey,
            can_sign: None,
        }
    }
}

/// How a session is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    ReadOnly,
    ReadWrite,
}
