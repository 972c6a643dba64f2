//! # mycel-crypto
//!
//! Cryptographic primitives used by transaction admission.
//!
//! - Keccak-256 (sign-doc digests, address derivation) and SHA-256 (tx hashes)
//! - secp256k1 ECDSA signing and low-s verification
//! - Compressed public key encoding
//! - Address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::{keccak256, sha256};
pub use signature::{
    public_key_from_bytes, public_key_to_address, public_key_to_bytes, recover_public_key, sign,
    verify, PrivateKey, PublicKey, Signature, COMPRESSED_PUBKEY_LEN, SIGNATURE_LEN,
};
