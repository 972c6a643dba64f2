//! secp256k1 signatures over 32-byte sign-doc digests

use crate::{keccak256, CryptoError};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use mycel_primitives::{Address, H256};
use std::cmp::Ordering;

/// Length of an encoded signature (r || s || v)
pub const SIGNATURE_LEN: usize = 65;

/// Length of a SEC1 compressed public key
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Half of the secp256k1 curve order (n/2)
const SECP256K1_N_DIV_2: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D,
    0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Full secp256k1 curve order (n)
const SECP256K1_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
    0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// ECDSA signature with recovery id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component
    pub s: [u8; 32],
    /// recovery id (0/1, or 27/28)
    pub v: u8,
}

/// Verifying key
pub type PublicKey = VerifyingKey;

/// Signing key
pub type PrivateKey = SigningKey;

impl Signature {
    /// Create signature from r, s, v components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Recovery id normalised to 0 or 1
    pub fn recovery_id(&self) -> u8 {
        if self.v >= 27 {
            self.v - 27
        } else {
            self.v
        }
    }

    /// Encode as r || s || v
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Decode from r || s || v
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Signature { r, s, v: bytes[64] })
    }

    /// Low-s form (s <= n/2). High-s signatures are malleable and rejected.
    pub fn is_low_s(&self) -> bool {
        compare_bytes(&self.s, &SECP256K1_N_DIV_2) != Ordering::Greater
    }
}

/// Compare two 32-byte arrays as big-endian integers
fn compare_bytes(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    a.iter().cmp(b.iter())
}

/// n - s
fn subtract_from_n(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: u16 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_N[i] as u16)
            .wrapping_sub(s[i] as u16)
            .wrapping_sub(borrow);
        result[i] = diff as u8;
        borrow = if diff > 255 { 1 } else { 0 };
    }

    result
}

fn to_k256(signature: &Signature) -> Result<K256Signature, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    K256Signature::from_scalars(r, s).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
}

/// Sign a digest, normalising to low-s
pub fn sign(digest: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (signature, mut recovery_id) = private_key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let r: [u8; 32] = signature.r().to_bytes().into();
    let mut s: [u8; 32] = signature.s().to_bytes().into();

    if compare_bytes(&s, &SECP256K1_N_DIV_2) == Ordering::Greater {
        s = subtract_from_n(&s);
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1).map_err(|_| {
            CryptoError::SigningFailed("invalid recovery id after normalization".to_string())
        })?;
    }

    Ok(Signature {
        r,
        s,
        v: recovery_id.to_byte() + 27,
    })
}

/// Verify a signature against a digest and public key
pub fn verify(digest: &H256, signature: &Signature, public_key: &PublicKey) -> Result<bool, CryptoError> {
    if !signature.is_low_s() {
        return Ok(false);
    }
    let k256_sig = to_k256(signature)?;
    Ok(public_key
        .verify_prehash(digest.as_bytes(), &k256_sig)
        .is_ok())
}

/// Recover the public key that produced `signature` over `digest`
pub fn recover_public_key(digest: &H256, signature: &Signature) -> Result<PublicKey, CryptoError> {
    let k256_sig = to_k256(signature)?;
    let recovery_id = RecoveryId::try_from(signature.recovery_id())
        .map_err(|_| CryptoError::InvalidRecoveryId(signature.recovery_id()))?;

    VerifyingKey::recover_from_prehash(digest.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Parse a SEC1-encoded public key (compressed or uncompressed)
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    VerifyingKey::from_sec1_bytes(bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Encode a public key in compressed SEC1 form
pub fn public_key_to_bytes(public_key: &PublicKey) -> [u8; COMPRESSED_PUBKEY_LEN] {
    let encoded = public_key.to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_PUBKEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Derive the account address: last 20 bytes of keccak256(uncompressed x || y)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut addr_bytes = [0u8; 20];
    addr_bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(addr_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_and_verify() {
        let private_key = SigningKey::random(&mut OsRng);
        let digest = keccak256(b"sign doc");

        let signature = sign(&digest, &private_key).unwrap();
        assert!(signature.is_low_s());
        assert!(verify(&digest, &signature, private_key.verifying_key()).unwrap());
    }

    #[test]
    fn test_verify_wrong_digest_fails() {
        let private_key = SigningKey::random(&mut OsRng);
        let signature = sign(&keccak256(b"a"), &private_key).unwrap();
        assert!(!verify(&keccak256(b"b"), &signature, private_key.verifying_key()).unwrap());
    }

    #[test]
    fn test_recover_public_key() {
        let private_key = SigningKey::random(&mut OsRng);
        let digest = keccak256(b"recover me");
        let signature = sign(&digest, &private_key).unwrap();
        let recovered = recover_public_key(&digest, &signature).unwrap();
        assert_eq!(private_key.verifying_key(), &recovered);
    }

    #[test]
    fn test_reject_high_s_signature() {
        let private_key = SigningKey::random(&mut OsRng);
        let digest = keccak256(b"test");
        let mut signature = sign(&digest, &private_key).unwrap();
        signature.s = [0xFF; 32];
        assert!(!verify(&digest, &signature, private_key.verifying_key()).unwrap());
    }

    #[test]
    fn test_signature_bytes_roundtrip_and_length_check() {
        let private_key = SigningKey::random(&mut OsRng);
        let signature = sign(&keccak256(b"x"), &private_key).unwrap();
        let bytes = signature.to_bytes();
        assert_eq!(Signature::from_slice(&bytes).unwrap(), signature);
        assert!(Signature::from_slice(&bytes[..64]).is_err());
    }

    #[test]
    fn test_compressed_public_key_and_address() {
        let private_key = SigningKey::random(&mut OsRng);
        let public_key = private_key.verifying_key();
        let bytes = public_key_to_bytes(public_key);
        assert!(bytes[0] == 0x02 || bytes[0] == 0x03);

        let parsed = public_key_from_bytes(&bytes).unwrap();
        assert_eq!(public_key_to_address(&parsed), public_key_to_address(public_key));
        assert!(public_key_from_bytes(&[0x05; 33]).is_err());
    }
}
