//! Binary encoding/decoding for transactions.
//!
//! Deterministic little-endian layout. The same bytes feed the tx hash, the
//! size-gas charge and the sign-doc digest, so encoding must never depend on
//! anything but the value itself.
//!
//! ```text
//! tx        = u32 len || body || u32 len || auth_info || u32 count || (u32 len || sig)*
//! body      = u32 count || msg* || string memo || u64 timeout_height || u64 timeout_timestamp
//! auth_info = u32 count || (opt bytes pubkey || u64 sequence)* || fee
//! fee       = coins || u64 gas_limit || opt address payer || opt address granter
//! coins     = u32 count || (string denom || u128 amount)*
//! ```

use crate::error::CodecError;
use crate::msg::{Msg, Packet};
use crate::tx::{AuthInfo, Fee, SignerInfo, Tx, TxBody};
use bytes::Bytes;
use mycel_crypto::keccak256;
use mycel_primitives::{Address, Coin, Coins, H256};

const TAG_SEND: u8 = 0x01;
const TAG_WASM_INSTANTIATE: u8 = 0x02;
const TAG_WASM_EXECUTE: u8 = 0x03;
const TAG_CREATE_DENOM: u8 = 0x04;
const TAG_RECV_PACKET: u8 = 0x10;
const TAG_ACKNOWLEDGEMENT: u8 = 0x11;
const TAG_TIMEOUT: u8 = 0x12;
const TAG_UPDATE_CLIENT: u8 = 0x13;

// ============================================================================
// Writers
// ============================================================================

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    put_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_address(buf: &mut Vec<u8>, addr: &Address) {
    buf.extend_from_slice(addr.as_bytes());
}

fn put_opt_address(buf: &mut Vec<u8>, addr: &Option<Address>) {
    match addr {
        Some(a) => {
            buf.push(1);
            put_address(buf, a);
        }
        None => buf.push(0),
    }
}

fn put_coins(buf: &mut Vec<u8>, coins: &Coins) {
    put_u32(buf, coins.len() as u32);
    for coin in coins {
        put_str(buf, &coin.denom);
        buf.extend_from_slice(&coin.amount.to_le_bytes());
    }
}

fn put_packet(buf: &mut Vec<u8>, p: &Packet) {
    put_u64(buf, p.sequence);
    put_str(buf, &p.source_port);
    put_str(buf, &p.source_channel);
    put_str(buf, &p.destination_port);
    put_str(buf, &p.destination_channel);
    put_bytes(buf, &p.data);
    put_u64(buf, p.timeout_height);
}

fn put_msg(buf: &mut Vec<u8>, msg: &Msg) {
    match msg {
        Msg::Send { from, to, amount } => {
            buf.push(TAG_SEND);
            put_address(buf, from);
            put_address(buf, to);
            put_coins(buf, amount);
        }
        Msg::WasmInstantiate {
            sender,
            code_id,
            label,
            msg,
            funds,
        } => {
            buf.push(TAG_WASM_INSTANTIATE);
            put_address(buf, sender);
            put_u64(buf, *code_id);
            put_str(buf, label);
            put_bytes(buf, msg);
            put_coins(buf, funds);
        }
        Msg::WasmExecute {
            sender,
            contract,
            msg,
            funds,
        } => {
            buf.push(TAG_WASM_EXECUTE);
            put_address(buf, sender);
            put_address(buf, contract);
            put_bytes(buf, msg);
            put_coins(buf, funds);
        }
        Msg::CreateDenom { sender, subdenom } => {
            buf.push(TAG_CREATE_DENOM);
            put_address(buf, sender);
            put_str(buf, subdenom);
        }
        Msg::RecvPacket { signer, packet } => {
            buf.push(TAG_RECV_PACKET);
            put_address(buf, signer);
            put_packet(buf, packet);
        }
        Msg::Acknowledgement {
            signer,
            packet,
            acknowledgement,
        } => {
            buf.push(TAG_ACKNOWLEDGEMENT);
            put_address(buf, signer);
            put_packet(buf, packet);
            put_bytes(buf, acknowledgement);
        }
        Msg::Timeout { signer, packet } => {
            buf.push(TAG_TIMEOUT);
            put_address(buf, signer);
            put_packet(buf, packet);
        }
        Msg::UpdateClient {
            signer,
            client_id,
            header,
        } => {
            buf.push(TAG_UPDATE_CLIENT);
            put_address(buf, signer);
            put_str(buf, client_id);
            put_bytes(buf, header);
        }
    }
}

/// Encode a tx body
pub fn encode_body(body: &TxBody) -> Vec<u8> {
    let mut buf = Vec::new();
    put_u32(&mut buf, body.messages.len() as u32);
    for msg in &body.messages {
        put_msg(&mut buf, msg);
    }
    put_str(&mut buf, &body.memo);
    put_u64(&mut buf, body.timeout_height);
    put_u64(&mut buf, body.timeout_timestamp);
    buf
}

/// Encode auth info
pub fn encode_auth_info(auth: &AuthInfo) -> Vec<u8> {
    let mut buf = Vec::new();
    put_u32(&mut buf, auth.signer_infos.len() as u32);
    for info in &auth.signer_infos {
        match &info.public_key {
            Some(pk) => {
                buf.push(1);
                put_bytes(&mut buf, pk);
            }
            None => buf.push(0),
        }
        put_u64(&mut buf, info.sequence);
    }
    put_coins(&mut buf, &auth.fee.amount);
    put_u64(&mut buf, auth.fee.gas_limit);
    put_opt_address(&mut buf, &auth.fee.payer);
    put_opt_address(&mut buf, &auth.fee.granter);
    buf
}

/// Encode a full transaction
pub fn encode_tx(tx: &Tx) -> Vec<u8> {
    let mut buf = Vec::new();
    put_bytes(&mut buf, &encode_body(&tx.body));
    put_bytes(&mut buf, &encode_auth_info(&tx.auth_info));
    put_u32(&mut buf, tx.signatures.len() as u32);
    for sig in &tx.signatures {
        put_bytes(&mut buf, sig);
    }
    buf
}

/// Digest a signer commits to: chain id, account number, sequence, body and auth info
pub fn sign_doc_digest(tx: &Tx, chain_id: &str, account_number: u64, sequence: u64) -> H256 {
    let mut buf = Vec::new();
    put_str(&mut buf, chain_id);
    put_u64(&mut buf, account_number);
    put_u64(&mut buf, sequence);
    put_bytes(&mut buf, &encode_body(&tx.body));
    put_bytes(&mut buf, &encode_auth_info(&tx.auth_info));
    keccak256(&buf)
}

// ============================================================================
// Reader
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn u128(&mut self) -> Result<u128, CodecError> {
        let mut b = [0u8; 16];
        b.copy_from_slice(self.take(16)?);
        Ok(u128::from_le_bytes(b))
    }

    fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let raw = self.bytes()?;
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn flag(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidFlag(other)),
        }
    }

    fn address(&mut self) -> Result<Address, CodecError> {
        let at = self.pos;
        Address::from_slice(self.take(Address::LEN)?).map_err(|_| CodecError::UnexpectedEof(at))
    }

    fn opt_address(&mut self) -> Result<Option<Address>, CodecError> {
        if self.flag()? {
            Ok(Some(self.address()?))
        } else {
            Ok(None)
        }
    }

    /// Element count, bounded by the bytes left so a forged count cannot
    /// drive a huge allocation.
    fn count(&mut self) -> Result<usize, CodecError> {
        let at = self.pos;
        let n = self.u32()? as usize;
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof(at));
        }
        Ok(n)
    }

    fn coins(&mut self) -> Result<Coins, CodecError> {
        let n = self.count()?;
        let mut coins = Vec::with_capacity(n);
        for _ in 0..n {
            let denom = self.string()?;
            let amount = self.u128()?;
            coins.push(Coin::new(denom, amount));
        }
        Ok(Coins::from_vec(coins))
    }

    fn packet(&mut self) -> Result<Packet, CodecError> {
        Ok(Packet {
            sequence: self.u64()?,
            source_port: self.string()?,
            source_channel: self.string()?,
            destination_port: self.string()?,
            destination_channel: self.string()?,
            data: Bytes::copy_from_slice(self.bytes()?),
            timeout_height: self.u64()?,
        })
    }

    fn msg(&mut self) -> Result<Msg, CodecError> {
        let msg = match self.u8()? {
            TAG_SEND => Msg::Send {
                from: self.address()?,
                to: self.address()?,
                amount: self.coins()?,
            },
            TAG_WASM_INSTANTIATE => Msg::WasmInstantiate {
                sender: self.address()?,
                code_id: self.u64()?,
                label: self.string()?,
                msg: Bytes::copy_from_slice(self.bytes()?),
                funds: self.coins()?,
            },
            TAG_WASM_EXECUTE => Msg::WasmExecute {
                sender: self.address()?,
                contract: self.address()?,
                msg: Bytes::copy_from_slice(self.bytes()?),
                funds: self.coins()?,
            },
            TAG_CREATE_DENOM => Msg::CreateDenom {
                sender: self.address()?,
                subdenom: self.string()?,
            },
            TAG_RECV_PACKET => Msg::RecvPacket {
                signer: self.address()?,
                packet: self.packet()?,
            },
            TAG_ACKNOWLEDGEMENT => Msg::Acknowledgement {
                signer: self.address()?,
                packet: self.packet()?,
                acknowledgement: Bytes::copy_from_slice(self.bytes()?),
            },
            TAG_TIMEOUT => Msg::Timeout {
                signer: self.address()?,
                packet: self.packet()?,
            },
            TAG_UPDATE_CLIENT => Msg::UpdateClient {
                signer: self.address()?,
                client_id: self.string()?,
                header: Bytes::copy_from_slice(self.bytes()?),
            },
            other => return Err(CodecError::UnknownMessage(other)),
        };
        Ok(msg)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

fn decode_body(bytes: &[u8]) -> Result<TxBody, CodecError> {
    let mut r = Reader::new(bytes);
    let n = r.count()?;
    let mut messages = Vec::with_capacity(n);
    for _ in 0..n {
        messages.push(r.msg()?);
    }
    let body = TxBody {
        messages,
        memo: r.string()?,
        timeout_height: r.u64()?,
        timeout_timestamp: r.u64()?,
    };
    r.finish()?;
    Ok(body)
}

fn decode_auth_info(bytes: &[u8]) -> Result<AuthInfo, CodecError> {
    let mut r = Reader::new(bytes);
    let n = r.count()?;
    let mut signer_infos = Vec::with_capacity(n);
    for _ in 0..n {
        let public_key = if r.flag()? {
            Some(Bytes::copy_from_slice(r.bytes()?))
        } else {
            None
        };
        signer_infos.push(SignerInfo {
            public_key,
            sequence: r.u64()?,
        });
    }
    let fee = Fee {
        amount: r.coins()?,
        gas_limit: r.u64()?,
        payer: r.opt_address()?,
        granter: r.opt_address()?,
    };
    r.finish()?;
    Ok(AuthInfo { signer_infos, fee })
}

/// Decode a full transaction; trailing bytes are an error
pub fn decode_tx(bytes: &[u8]) -> Result<Tx, CodecError> {
    let mut r = Reader::new(bytes);
    let body = decode_body(r.bytes()?)?;
    let auth_info = decode_auth_info(r.bytes()?)?;
    let n = r.count()?;
    let mut signatures = Vec::with_capacity(n);
    for _ in 0..n {
        signatures.push(Bytes::copy_from_slice(r.bytes()?));
    }
    r.finish()?;
    Ok(Tx {
        body,
        auth_info,
        signatures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Tx {
        Tx {
            body: TxBody {
                messages: vec![
                    Msg::Send {
                        from: Address::from_bytes([1; 20]),
                        to: Address::from_bytes([2; 20]),
                        amount: Coins::one("uoki", 42),
                    },
                    Msg::Acknowledgement {
                        signer: Address::from_bytes([1; 20]),
                        packet: Packet {
                            sequence: 9,
                            source_port: "transfer".into(),
                            source_channel: "channel-0".into(),
                            destination_port: "transfer".into(),
                            destination_channel: "channel-3".into(),
                            data: Bytes::from_static(b"payload"),
                            timeout_height: 77,
                        },
                        acknowledgement: Bytes::from_static(b"ok"),
                    },
                ],
                memo: "hello".into(),
                timeout_height: 100,
                timeout_timestamp: 0,
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: Some(Bytes::from(vec![2u8; 33])),
                    sequence: 3,
                }],
                fee: Fee {
                    amount: Coins::one("uoki", 1000),
                    gas_limit: 500_000,
                    payer: None,
                    granter: Some(Address::from_bytes([5; 20])),
                },
            },
            signatures: vec![Bytes::from(vec![7u8; 65])],
        }
    }

    #[test]
    fn test_tx_roundtrip() {
        let tx = sample_tx();
        let decoded = decode_tx(&encode_tx(&tx)).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode_tx(&sample_tx());
        bytes.push(0);
        assert_eq!(decode_tx(&bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_truncated_input() {
        let bytes = encode_tx(&sample_tx());
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(decode_tx(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_decode_forged_count_does_not_allocate() {
        // body claims u32::MAX messages
        let mut body = Vec::new();
        put_u32(&mut body, u32::MAX);
        let mut bytes = Vec::new();
        put_bytes(&mut bytes, &body);
        assert!(matches!(decode_tx(&bytes), Err(CodecError::UnexpectedEof(_))));
    }

    #[test]
    fn test_unknown_message_tag() {
        let mut body = Vec::new();
        put_u32(&mut body, 1);
        body.push(0xEE);
        let mut bytes = Vec::new();
        put_bytes(&mut bytes, &body);
        assert_eq!(decode_tx(&bytes), Err(CodecError::UnknownMessage(0xEE)));
    }

    #[test]
    fn test_sign_doc_binds_chain_and_sequence() {
        let tx = sample_tx();
        let base = sign_doc_digest(&tx, "mycel-1", 4, 3);
        assert_ne!(base, sign_doc_digest(&tx, "mycel-2", 4, 3));
        assert_ne!(base, sign_doc_digest(&tx, "mycel-1", 5, 3));
        assert_ne!(base, sign_doc_digest(&tx, "mycel-1", 4, 4));

        // signatures are not part of the sign doc
        let mut resigned = tx.clone();
        resigned.signatures = vec![Bytes::from(vec![9u8; 65])];
        assert_eq!(base, sign_doc_digest(&resigned, "mycel-1", 4, 3));
    }
}
