//! Public keys, signature gas, verification and sequence increment

use crate::context::{Event, ExecMode, SignerData, TxContext};
use crate::error::{AnteError, AnteResult};
use crate::gas::GasMeter;
use crate::keepers::{AnteParams, BaseAccount};
use crate::pipeline::AnteHandler;
use mycel_crypto::{
    public_key_from_bytes, public_key_to_address, verify, Signature, COMPRESSED_PUBKEY_LEN,
};
use mycel_primitives::Address;

/// Prices signature verification
pub trait SigGasConsumer: Send + Sync {
    /// Charge `meter` for verifying one signature by `public_key`
    fn consume(&self, meter: &mut GasMeter, public_key: &[u8], params: &AnteParams) -> AnteResult<()>;
}

/// secp256k1 keys cost `sig_verify_cost_secp256k1`; other key types are refused
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1SigGas;

impl SigGasConsumer for Secp256k1SigGas {
    fn consume(&self, meter: &mut GasMeter, public_key: &[u8], params: &AnteParams) -> AnteResult<()> {
        match public_key.len() {
            COMPRESSED_PUBKEY_LEN | 65 => {
                meter.consume(params.sig_verify_cost_secp256k1, "ante verify: secp256k1")
            }
            n => Err(AnteError::InvalidPubKey(format!(
                "unrecognized public key type ({} bytes)",
                n
            ))),
        }
    }
}

/// Stand-in key charged for unsigned simulations
const SIM_PUBKEY: [u8; COMPRESSED_PUBKEY_LEN] = [0x02; COMPRESSED_PUBKEY_LEN];

impl AnteHandler {
    fn load_account(&self, ctx: &TxContext<'_>, address: &Address) -> AnteResult<BaseAccount> {
        self.account_keeper
            .get_account(ctx.store, address)?
            .ok_or(AnteError::UnknownAddress(*address))
    }

    pub(crate) fn set_pub_key(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let tx = ctx.tx;
        let signers = tx.signers();
        let infos = &tx.auth_info.signer_infos;
        if infos.len() != signers.len() {
            return Err(AnteError::InvalidPubKey(format!(
                "invalid number of pubkeys; expected: {}, got {}",
                signers.len(),
                infos.len()
            )));
        }

        for (i, (signer, info)) in signers.iter().zip(infos).enumerate() {
            let Some(pk) = &info.public_key else {
                continue;
            };
            let key = public_key_from_bytes(pk)
                .map_err(|e| AnteError::InvalidPubKey(e.to_string()))?;
            if !ctx.mode.is_simulate() && public_key_to_address(&key) != *signer {
                return Err(AnteError::InvalidPubKey(format!(
                    "pubKey does not match signer address {} with signer index: {}",
                    signer, i
                )));
            }

            let mut account = self.load_account(ctx, signer)?;
            if account.public_key.is_some() {
                continue;
            }
            account.public_key = Some(pk.to_vec());
            self.account_keeper.set_account(ctx.store, &account)?;
            tracing::trace!(address = %signer, "public key bound");
        }

        for (signer, info) in signers.iter().zip(infos) {
            ctx.emit(Event::new("tx").attr("acc_seq", format!("{}/{}", signer, info.sequence)));
        }
        Ok(())
    }

    pub(crate) fn validate_sig_count(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let max = self.account_keeper.params(ctx.store)?.tx_sig_limit;
        let got = ctx.tx.auth_info.signer_infos.len() as u64;
        if got > max {
            return Err(AnteError::TooManySignatures { max, got });
        }
        Ok(())
    }

    pub(crate) fn sig_gas_consume(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let params = self.account_keeper.params(ctx.store)?;
        let tx = ctx.tx;
        for (i, signer) in tx.signers().iter().enumerate() {
            let account = self.load_account(ctx, signer)?;
            let supplied = tx
                .auth_info
                .signer_infos
                .get(i)
                .and_then(|info| info.public_key.as_deref());
            let key: &[u8] = match account.public_key.as_deref().or(supplied) {
                Some(k) => k,
                None if ctx.mode.is_simulate() => &SIM_PUBKEY,
                None => {
                    return Err(AnteError::InvalidPubKey(
                        "pubkey on account is not set".to_string(),
                    ))
                }
            };
            self.sig_gas_consumer
                .consume(&mut ctx.gas_meter, key, &params)?;
        }
        Ok(())
    }

    pub(crate) fn sig_verification(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let tx = ctx.tx;
        let signers = tx.signers();
        if tx.signatures.len() != signers.len() {
            return Err(AnteError::Unauthorized(format!(
                "invalid number of signer; expected: {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }
        if tx.auth_info.signer_infos.len() != signers.len() {
            return Err(AnteError::Unauthorized(format!(
                "invalid number of signer infos; expected: {}, got {}",
                signers.len(),
                tx.auth_info.signer_infos.len()
            )));
        }

        let verify_crypto = !ctx.mode.is_simulate() && ctx.mode != ExecMode::ReCheck;
        let mut verified = Vec::with_capacity(signers.len());

        for (i, signer) in signers.iter().enumerate() {
            let account = self.load_account(ctx, signer)?;
            let info = &tx.auth_info.signer_infos[i];

            let public_key = match &account.public_key {
                Some(pk) => Some(pk),
                None if ctx.mode.is_simulate() => None,
                None => {
                    return Err(AnteError::InvalidPubKey(
                        "pubkey on account is not set".to_string(),
                    ))
                }
            };

            if info.sequence != account.sequence {
                return Err(AnteError::WrongSequence {
                    expected: account.sequence,
                    got: info.sequence,
                });
            }

            verified.push(SignerData {
                address: *signer,
                sequence: account.sequence,
                account_number: account.account_number,
            });

            if !verify_crypto {
                continue;
            }
            let Some(pk) = public_key else {
                continue;
            };

            let chain_id = &ctx.block.chain_id;
            let digest = self.sign_mode_handler.sign_doc(
                tx,
                chain_id,
                account.account_number,
                account.sequence,
            );
            let failed = || {
                AnteError::Unauthorized(format!(
                    "signature verification failed; please verify account number ({}), sequence ({}) and chain-id ({})",
                    account.account_number, account.sequence, chain_id
                ))
            };
            let signature = Signature::from_slice(&tx.signatures[i]).map_err(|_| failed())?;
            let key = public_key_from_bytes(pk).map_err(|e| AnteError::InvalidPubKey(e.to_string()))?;
            if !verify(&digest, &signature, &key).map_err(|_| failed())? {
                return Err(failed());
            }
        }

        ctx.signers = verified;
        Ok(())
    }

    pub(crate) fn increment_sequence(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        for signer in ctx.tx.signers() {
            let mut account = self.load_account(ctx, &signer)?;
            account.sequence = account
                .sequence
                .checked_add(1)
                .ok_or_else(|| AnteError::Internal("sequence overflow".to_string()))?;
            self.account_keeper.set_account(ctx.store, &account)?;
        }
        Ok(())
    }
}
