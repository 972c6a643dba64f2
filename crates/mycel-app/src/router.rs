//! Message execution after admission

use crate::error::{AppError, AppResult};
use crate::keepers::AppKeepers;
use mycel_ante::Event;
use mycel_primitives::Gas;
use mycel_storage::KvStore;
use mycel_types::Msg;

/// Outcome of one executed message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MsgResponse {
    /// Gas consumed on top of admission
    pub gas_used: Gas,
    /// Emitted events
    pub events: Vec<Event>,
}

/// Executes admitted messages against a transaction's write set
pub trait MsgRouter: Send + Sync {
    /// Run `msg`. Writes go to `store`, which the caller commits only when
    /// every message of the transaction succeeds.
    fn route(&self, store: &dyn KvStore, msg: &Msg) -> AppResult<MsgResponse>;
}

/// Router for the modules compiled into this binary.
///
/// Contract messages need a contract runtime and are reported as unroutable.
pub struct AppRouter {
    keepers: AppKeepers,
}

impl AppRouter {
    /// Router over `keepers`
    pub fn new(keepers: AppKeepers) -> Self {
        Self { keepers }
    }
}

impl MsgRouter for AppRouter {
    fn route(&self, store: &dyn KvStore, msg: &Msg) -> AppResult<MsgResponse> {
        let k = &self.keepers;
        let mut response = MsgResponse::default();

        match msg {
            Msg::Send { from, to, amount } => {
                k.auth.get_or_create(store, to)?;
                k.bank.send(store, from, to, amount)?;
                response.events.push(
                    Event::new("transfer")
                        .attr("sender", from.to_string())
                        .attr("recipient", to.to_string())
                        .attr("amount", amount.to_string()),
                );
            }
            Msg::CreateDenom { sender, subdenom } => {
                let (denom, gas) = k.tokenfactory.create_denom(store, sender, subdenom)?;
                response.gas_used = gas;
                response.events.push(
                    Event::new("create_denom")
                        .attr("creator", sender.to_string())
                        .attr("new_token_denom", denom),
                );
            }
            Msg::RecvPacket { packet, .. } => {
                let result = if k.ibc.receive(store, packet)? { "success" } else { "noop" };
                response.events.push(
                    Event::new("recv_packet")
                        .attr("packet_sequence", packet.sequence.to_string())
                        .attr("result", result),
                );
            }
            Msg::Acknowledgement { packet, .. } | Msg::Timeout { packet, .. } => {
                let kind = if matches!(msg, Msg::Timeout { .. }) {
                    "timeout_packet"
                } else {
                    "acknowledge_packet"
                };
                let result = if k.ibc.clear_commitment(store, packet)? { "success" } else { "noop" };
                response.events.push(
                    Event::new(kind)
                        .attr("packet_sequence", packet.sequence.to_string())
                        .attr("result", result),
                );
            }
            Msg::UpdateClient {
                client_id, header, ..
            } => {
                k.ibc.update_client(store, client_id, header)?;
                response
                    .events
                    .push(Event::new("update_client").attr("client_id", client_id.clone()));
            }
            Msg::WasmInstantiate { .. } | Msg::WasmExecute { .. } => {
                return Err(AppError::Unroutable(msg.type_url()));
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mycel_primitives::{Address, Coins};
    use mycel_storage::MemoryDb;

    #[test]
    fn test_send_creates_recipient() {
        let db = MemoryDb::new();
        let keepers = AppKeepers::new();
        let from = Address::from_bytes([1; 20]);
        let to = Address::from_bytes([2; 20]);
        keepers.bank.mint(&db, &from, &Coins::one("uoki", 10)).unwrap();

        let router = AppRouter::new(keepers.clone());
        let msg = Msg::Send {
            from,
            to,
            amount: Coins::one("uoki", 4),
        };
        let response = router.route(&db, &msg).unwrap();

        assert_eq!(response.events[0].kind, "transfer");
        assert_eq!(keepers.bank.balance(&db, &to, "uoki").unwrap(), 4);
        assert!(keepers.auth.accounts(&db).unwrap().iter().any(|a| a.address == to));
    }

    #[test]
    fn test_contract_messages_are_unroutable() {
        let db = MemoryDb::new();
        let router = AppRouter::new(AppKeepers::new());
        let msg = Msg::WasmExecute {
            sender: Address::ZERO,
            contract: Address::from_bytes([3; 20]),
            msg: Bytes::from_static(b"{}"),
            funds: Coins::new(),
        };
        assert!(matches!(
            router.route(&db, &msg),
            Err(AppError::Unroutable("/mycel.wasm.v1.MsgExecuteContract"))
        ));
    }
}
