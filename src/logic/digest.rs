//! Input preparation for the signature primitives

use sha2::{Digest, Sha256};

use crate::model::MechanismId;

/// DER header of a SHA-256 `DigestInfo`:
/// `SEQUENCE { SEQUENCE { OID 2.16.840.1.101.3.4.2.1, NULL }, OCTET STRING (32) }`
pub const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// Length of a prepared `CKM_RSA_PKCS` input
pub const SHA256_DIGEST_INFO_LEN: usize = SHA256_DIGEST_INFO_PREFIX.len() + 32;

/// Bytes to hand to the sign/verify primitive for `mechanism`
///
/// Raw `CKM_RSA_PKCS` gets `DigestInfo(SHA-256(payload))`; every other
/// mechanism gets the payload untouched.
pub fn prepare_input(mechanism: MechanismId, payload: &[u8]) -> Vec<u8> {
    if mechanism.hashes_internally() {
        return payload.to_vec();
    }

    let digest = Sha256::digest(payload);
    let mut input = Vec::with_capacity(SHA256_DIGEST_INFO_LEN);
    input.extend_from_slice(&SHA256_DIGEST_INFO_PREFIX);
    input.extend_from_slice(&digest);
    input
}
