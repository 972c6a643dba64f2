//! Packet receipts and commitments

use crate::modules::IBC;
use mycel_ante::{self as ante, AnteResult};
use mycel_crypto::sha256;
use mycel_storage::{KvStore, ModuleStore};
use mycel_types::{Msg, Packet};
use mycel_upgrade::UpgradeResult;

const RECEIPT_PREFIX: &[u8] = b"receipts/";
const COMMITMENT_PREFIX: &[u8] = b"commitments/";
const CLIENT_PREFIX: &[u8] = b"clients/";

fn packet_key(prefix: &[u8], port: &str, channel: &str, sequence: u64) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(port.as_bytes());
    key.push(b'/');
    key.extend_from_slice(channel.as_bytes());
    key.push(b'/');
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

fn receipt_key(packet: &Packet) -> Vec<u8> {
    packet_key(
        RECEIPT_PREFIX,
        &packet.destination_port,
        &packet.destination_channel,
        packet.sequence,
    )
}

fn commitment_key(packet: &Packet) -> Vec<u8> {
    packet_key(
        COMMITMENT_PREFIX,
        &packet.source_port,
        &packet.source_channel,
        packet.sequence,
    )
}

/// Store-backed IBC core keeper.
///
/// Received packets leave a receipt on the destination end; sent packets leave
/// a commitment on the source end until acknowledged or timed out.
#[derive(Clone, Copy, Debug, Default)]
pub struct IbcKeeper;

impl IbcKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Record an outgoing packet
    pub fn commit_packet(&self, store: &dyn KvStore, packet: &Packet) -> AnteResult<()> {
        let commitment = sha256(&packet.data);
        ModuleStore::new(store, IBC).set(&commitment_key(packet), commitment.as_bytes())?;
        Ok(())
    }

    /// Outgoing packet is still awaiting acknowledgement or timeout
    pub fn has_commitment(&self, store: &dyn KvStore, packet: &Packet) -> AnteResult<bool> {
        Ok(ModuleStore::new(store, IBC).has(&commitment_key(packet))?)
    }

    /// Incoming packet was already received
    pub fn has_receipt(&self, store: &dyn KvStore, packet: &Packet) -> AnteResult<bool> {
        Ok(ModuleStore::new(store, IBC).has(&receipt_key(packet))?)
    }

    /// Write the receipt for an incoming packet. Returns false when it was
    /// already received.
    pub fn receive(&self, store: &dyn KvStore, packet: &Packet) -> AnteResult<bool> {
        if self.has_receipt(store, packet)? {
            return Ok(false);
        }
        ModuleStore::new(store, IBC).set(&receipt_key(packet), &[1])?;
        tracing::debug!(
            port = %packet.destination_port,
            channel = %packet.destination_channel,
            sequence = packet.sequence,
            "packet received"
        );
        Ok(true)
    }

    /// Clear the commitment of an acknowledged or timed-out packet. Returns
    /// false when there was none.
    pub fn clear_commitment(&self, store: &dyn KvStore, packet: &Packet) -> AnteResult<bool> {
        if !self.has_commitment(store, packet)? {
            return Ok(false);
        }
        ModuleStore::new(store, IBC).remove(&commitment_key(packet))?;
        Ok(true)
    }

    /// Store the latest header for a light client
    pub fn update_client(&self, store: &dyn KvStore, client_id: &str, header: &[u8]) -> AnteResult<()> {
        let mut key = CLIENT_PREFIX.to_vec();
        key.extend_from_slice(client_id.as_bytes());
        ModuleStore::new(store, IBC).set(&key, header)?;
        Ok(())
    }
}

impl ante::RelayChecker for IbcKeeper {
    fn is_redundant(&self, store: &dyn KvStore, msg: &Msg) -> AnteResult<bool> {
        match msg {
            Msg::RecvPacket { packet, .. } => self.has_receipt(store, packet),
            Msg::Acknowledgement { packet, .. } | Msg::Timeout { packet, .. } => {
                Ok(!self.has_commitment(store, packet)?)
            }
            _ => Ok(false),
        }
    }
}

pub(crate) fn init_genesis(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    store.set(b"params", br#"{"allowed_clients":["07-tendermint"]}"#)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mycel_ante::RelayChecker;
    use mycel_primitives::Address;
    use mycel_storage::MemoryDb;

    fn packet(sequence: u64) -> Packet {
        Packet {
            sequence,
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            destination_port: "transfer".into(),
            destination_channel: "channel-7".into(),
            data: Bytes::from_static(b"{}"),
            timeout_height: 0,
        }
    }

    #[test]
    fn test_receive_once() {
        let db = MemoryDb::new();
        let ibc = IbcKeeper::new();
        let msg = Msg::RecvPacket {
            signer: Address::ZERO,
            packet: packet(1),
        };

        assert!(!ibc.is_redundant(&db, &msg).unwrap());
        assert!(ibc.receive(&db, &packet(1)).unwrap());
        assert!(ibc.is_redundant(&db, &msg).unwrap());
        assert!(!ibc.receive(&db, &packet(1)).unwrap());
    }

    #[test]
    fn test_acknowledgement_clears_commitment() {
        let db = MemoryDb::new();
        let ibc = IbcKeeper::new();
        let ack = Msg::Acknowledgement {
            signer: Address::ZERO,
            packet: packet(3),
            acknowledgement: Bytes::from_static(b"ok"),
        };

        assert!(ibc.is_redundant(&db, &ack).unwrap());
        ibc.commit_packet(&db, &packet(3)).unwrap();
        assert!(!ibc.is_redundant(&db, &ack).unwrap());
        assert!(ibc.clear_commitment(&db, &packet(3)).unwrap());
        assert!(ibc.is_redundant(&db, &ack).unwrap());
    }
}
