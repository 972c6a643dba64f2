//! Transaction messages

use crate::error::TxError;
use bytes::Bytes;
use mycel_primitives::{Address, Coins};

/// Cross-chain packet, as carried by relay messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Packet sequence on the sending channel
    pub sequence: u64,
    /// Sending port
    pub source_port: String,
    /// Sending channel
    pub source_channel: String,
    /// Receiving port
    pub destination_port: String,
    /// Receiving channel
    pub destination_channel: String,
    /// Opaque application data
    pub data: Bytes,
    /// Timeout height on the receiving chain (0 = none)
    pub timeout_height: u64,
}

impl Packet {
    fn validate(&self, type_url: &'static str) -> Result<(), TxError> {
        let invalid = |reason: &str| TxError::InvalidMessage {
            type_url,
            reason: reason.to_string(),
        };
        if self.sequence == 0 {
            return Err(invalid("packet sequence cannot be 0"));
        }
        for id in [
            &self.source_port,
            &self.source_channel,
            &self.destination_port,
            &self.destination_channel,
        ] {
            if id.is_empty() {
                return Err(invalid("packet identifiers cannot be empty"));
            }
        }
        if self.data.is_empty() {
            return Err(invalid("packet data cannot be empty"));
        }
        Ok(())
    }
}

/// A single state-changing instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Msg {
    /// Bank transfer
    Send {
        /// Sender
        from: Address,
        /// Recipient
        to: Address,
        /// Amount
        amount: Coins,
    },
    /// Instantiate a stored contract
    WasmInstantiate {
        /// Sender
        sender: Address,
        /// Stored code id
        code_id: u64,
        /// Human-readable label
        label: String,
        /// JSON init message
        msg: Bytes,
        /// Funds sent along
        funds: Coins,
    },
    /// Execute a contract
    WasmExecute {
        /// Sender
        sender: Address,
        /// Contract address
        contract: Address,
        /// JSON execute message
        msg: Bytes,
        /// Funds sent along
        funds: Coins,
    },
    /// Create a token-factory denomination
    CreateDenom {
        /// Creator
        sender: Address,
        /// Sub-denomination
        subdenom: String,
    },
    /// Relay: deliver a packet
    RecvPacket {
        /// Relayer
        signer: Address,
        /// Packet
        packet: Packet,
    },
    /// Relay: acknowledge a packet
    Acknowledgement {
        /// Relayer
        signer: Address,
        /// Packet
        packet: Packet,
        /// Acknowledgement bytes
        acknowledgement: Bytes,
    },
    /// Relay: time a packet out
    Timeout {
        /// Relayer
        signer: Address,
        /// Packet
        packet: Packet,
    },
    /// Relay: update a light client
    UpdateClient {
        /// Relayer
        signer: Address,
        /// Client identifier
        client_id: String,
        /// Header bytes
        header: Bytes,
    },
}

impl Msg {
    /// Type URL, used for routing and by the circuit breaker
    pub fn type_url(&self) -> &'static str {
        match self {
            Msg::Send { .. } => "/mycel.bank.v1.MsgSend",
            Msg::WasmInstantiate { .. } => "/mycel.wasm.v1.MsgInstantiateContract",
            Msg::WasmExecute { .. } => "/mycel.wasm.v1.MsgExecuteContract",
            Msg::CreateDenom { .. } => "/mycel.tokenfactory.v1.MsgCreateDenom",
            Msg::RecvPacket { .. } => "/mycel.ibc.channel.v1.MsgRecvPacket",
            Msg::Acknowledgement { .. } => "/mycel.ibc.channel.v1.MsgAcknowledgement",
            Msg::Timeout { .. } => "/mycel.ibc.channel.v1.MsgTimeout",
            Msg::UpdateClient { .. } => "/mycel.ibc.client.v1.MsgUpdateClient",
        }
    }

    /// Addresses whose signatures this message requires
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::Send { from, .. } => vec![*from],
            Msg::WasmInstantiate { sender, .. }
            | Msg::WasmExecute { sender, .. }
            | Msg::CreateDenom { sender, .. } => vec![*sender],
            Msg::RecvPacket { signer, .. }
            | Msg::Acknowledgement { signer, .. }
            | Msg::Timeout { signer, .. }
            | Msg::UpdateClient { signer, .. } => vec![*signer],
        }
    }

    /// Packet carried by a relay message
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Msg::RecvPacket { packet, .. }
            | Msg::Acknowledgement { packet, .. }
            | Msg::Timeout { packet, .. } => Some(packet),
            _ => None,
        }
    }

    /// Cross-chain relay message (packet or client update)
    pub fn is_relay(&self) -> bool {
        self.packet().is_some() || matches!(self, Msg::UpdateClient { .. })
    }

    /// Stateless checks
    pub fn validate_basic(&self) -> Result<(), TxError> {
        let type_url = self.type_url();
        let invalid = |reason: &str| TxError::InvalidMessage {
            type_url,
            reason: reason.to_string(),
        };
        let check_coins = |coins: &Coins| {
            coins
                .validate()
                .map_err(|e| TxError::InvalidMessage {
                    type_url,
                    reason: e.to_string(),
                })
        };

        match self {
            Msg::Send { from, to, amount } => {
                if from.is_zero() || to.is_zero() {
                    return Err(invalid("zero address"));
                }
                if amount.is_empty() {
                    return Err(invalid("empty amount"));
                }
                check_coins(amount)
            }
            Msg::WasmInstantiate {
                sender,
                code_id,
                label,
                msg,
                funds,
            } => {
                if sender.is_zero() {
                    return Err(invalid("zero sender"));
                }
                if *code_id == 0 {
                    return Err(invalid("code id is required"));
                }
                if label.trim().is_empty() {
                    return Err(invalid("label is required"));
                }
                if msg.is_empty() {
                    return Err(invalid("empty init message"));
                }
                check_coins(funds)
            }
            Msg::WasmExecute {
                sender,
                contract,
                msg,
                funds,
            } => {
                if sender.is_zero() || contract.is_zero() {
                    return Err(invalid("zero address"));
                }
                if msg.is_empty() {
                    return Err(invalid("empty execute message"));
                }
                check_coins(funds)
            }
            Msg::CreateDenom { sender, subdenom } => {
                if sender.is_zero() {
                    return Err(invalid("zero sender"));
                }
                if subdenom.is_empty() || subdenom.len() > 44 {
                    return Err(invalid("subdenom must be 1..=44 characters"));
                }
                Ok(())
            }
            Msg::RecvPacket { signer, packet } | Msg::Timeout { signer, packet } => {
                if signer.is_zero() {
                    return Err(invalid("zero signer"));
                }
                packet.validate(type_url)
            }
            Msg::Acknowledgement {
                signer,
                packet,
                acknowledgement,
            } => {
                if signer.is_zero() {
                    return Err(invalid("zero signer"));
                }
                if acknowledgement.is_empty() {
                    return Err(invalid("empty acknowledgement"));
                }
                packet.validate(type_url)
            }
            Msg::UpdateClient {
                signer,
                client_id,
                header,
            } => {
                if signer.is_zero() {
                    return Err(invalid("zero signer"));
                }
                if client_id.is_empty() || header.is_empty() {
                    return Err(invalid("client id and header are required"));
                }
                Ok(())
            }
        }
    }
}
