//! # mycel-types
//!
//! Transaction types for the Mycel chain.
//!
//! This crate provides:
//! - [`Tx`](tx::Tx) - a signed transaction: body, auth info and signatures
//! - [`Msg`](msg::Msg) - the messages a transaction carries
//! - [`codec`] - the deterministic binary encoding and the sign-doc digest

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
mod error;
pub mod msg;
pub mod tx;

pub use codec::{decode_tx, encode_auth_info, encode_body, encode_tx, sign_doc_digest};
pub use error::{CodecError, TxError};
pub use msg::{Msg, Packet};
pub use tx::{AuthInfo, Fee, SignerInfo, Tx, TxBody, MAX_GAS_WANTED};
