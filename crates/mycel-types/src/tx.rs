//! Signed transactions

use crate::codec::encode_tx;
use crate::error::TxError;
use crate::msg::Msg;
use bytes::Bytes;
use mycel_crypto::sha256;
use mycel_primitives::{Address, Coins, Gas, H256};

/// Largest gas limit a transaction may request (2^63 - 1)
pub const MAX_GAS_WANTED: u64 = i64::MAX as u64;

/// Messages and metadata covered by every signature
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxBody {
    /// Messages, executed in order
    pub messages: Vec<Msg>,
    /// Free-form note
    pub memo: String,
    /// Last block height at which the tx may be included (0 = none)
    pub timeout_height: u64,
    /// Unix timestamp after which the tx is invalid (0 = none)
    pub timeout_timestamp: u64,
}

/// Per-signer public key and sequence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignerInfo {
    /// SEC1 public key; required the first time an account signs
    pub public_key: Option<Bytes>,
    /// Account sequence the signature commits to
    pub sequence: u64,
}

/// Fee and gas limit
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    /// Offered fee
    pub amount: Coins,
    /// Gas limit
    pub gas_limit: Gas,
    /// Explicit payer, otherwise the first signer
    pub payer: Option<Address>,
    /// Fee granter paying on behalf of the payer
    pub granter: Option<Address>,
}

/// Signer infos and fee
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthInfo {
    /// One entry per signer, in signer order
    pub signer_infos: Vec<SignerInfo>,
    /// Fee
    pub fee: Fee,
}

/// A signed transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tx {
    /// Body
    pub body: TxBody,
    /// Auth info
    pub auth_info: AuthInfo,
    /// Raw 65-byte signatures, one per signer
    pub signatures: Vec<Bytes>,
}

impl Tx {
    /// Required signers: unique, in order of first appearance across messages
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = Vec::new();
        for msg in &self.body.messages {
            for signer in msg.signers() {
                if !signers.contains(&signer) {
                    signers.push(signer);
                }
            }
        }
        signers
    }

    /// Account charged the fee: the explicit payer, otherwise the first signer
    pub fn fee_payer(&self) -> Option<Address> {
        self.auth_info
            .fee
            .payer
            .or_else(|| self.signers().first().copied())
    }

    /// Fee granter, if any
    pub fn fee_granter(&self) -> Option<Address> {
        self.auth_info.fee.granter
    }

    /// Gas limit
    pub fn gas_limit(&self) -> Gas {
        self.auth_info.fee.gas_limit
    }

    /// Offered fee
    pub fn fee(&self) -> &Coins {
        &self.auth_info.fee.amount
    }

    /// Memo
    pub fn memo(&self) -> &str {
        &self.body.memo
    }

    /// Stateless validity checks
    pub fn validate_basic(&self) -> Result<(), TxError> {
        if self.body.messages.is_empty() {
            return Err(TxError::NoMessages);
        }

        let gas = self.gas_limit();
        if gas > MAX_GAS_WANTED {
            return Err(TxError::InvalidGasLimit(gas));
        }

        self.fee()
            .validate()
            .map_err(|e| TxError::InvalidFee(e.to_string()))?;

        if self.signatures.is_empty() {
            return Err(TxError::NoSignatures);
        }

        let signers = self.signers();
        if self.signatures.len() != signers.len() {
            return Err(TxError::SignerCountMismatch {
                expected: signers.len(),
                got: self.signatures.len(),
            });
        }

        for msg in &self.body.messages {
            msg.validate_basic()?;
        }

        Ok(())
    }

    /// Transaction hash: sha256 of the canonical encoding
    pub fn hash(&self) -> H256 {
        sha256(&encode_tx(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(from: u8, to: u8) -> Msg {
        Msg::Send {
            from: Address::from_bytes([from; 20]),
            to: Address::from_bytes([to; 20]),
            amount: Coins::one("uoki", 10),
        }
    }

    fn tx(messages: Vec<Msg>, sigs: usize) -> Tx {
        Tx {
            body: TxBody {
                messages,
                ..Default::default()
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo::default(); sigs],
                fee: Fee {
                    amount: Coins::one("uoki", 1000),
                    gas_limit: 500_000,
                    ..Default::default()
                },
            },
            signatures: vec![Bytes::from(vec![0u8; 65]); sigs],
        }
    }

    #[test]
    fn test_signers_unique_in_first_appearance_order() {
        let tx = tx(vec![send(2, 9), send(1, 9), send(2, 8)], 2);
        assert_eq!(
            tx.signers(),
            vec![Address::from_bytes([2; 20]), Address::from_bytes([1; 20])]
        );
        assert_eq!(tx.fee_payer(), Some(Address::from_bytes([2; 20])));
    }

    #[test]
    fn test_explicit_payer_wins() {
        let mut tx = tx(vec![send(1, 2)], 1);
        tx.auth_info.fee.payer = Some(Address::from_bytes([7; 20]));
        assert_eq!(tx.fee_payer(), Some(Address::from_bytes([7; 20])));
    }

    #[test]
    fn test_validate_basic() {
        assert!(tx(vec![send(1, 2)], 1).validate_basic().is_ok());
        assert_eq!(tx(vec![], 1).validate_basic(), Err(TxError::NoMessages));
        assert_eq!(tx(vec![send(1, 2)], 0).validate_basic(), Err(TxError::NoSignatures));
        assert_eq!(
            tx(vec![send(1, 2), send(3, 2)], 1).validate_basic(),
            Err(TxError::SignerCountMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_gas_limit_upper_bound() {
        let mut t = tx(vec![send(1, 2)], 1);
        t.auth_info.fee.gas_limit = MAX_GAS_WANTED;
        assert!(t.validate_basic().is_ok());
        t.auth_info.fee.gas_limit = MAX_GAS_WANTED + 1;
        assert_eq!(
            t.validate_basic(),
            Err(TxError::InvalidGasLimit(MAX_GAS_WANTED + 1))
        );
    }

    #[test]
    fn test_hash_changes_with_memo() {
        let a = tx(vec![send(1, 2)], 1);
        let mut b = a.clone();
        b.body.memo = "hello".into();
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.clone().hash());
    }
}
