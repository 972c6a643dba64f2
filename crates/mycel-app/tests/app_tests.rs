//! Block lifecycle and upgrade catalogue tests for mycel-app

use bytes::Bytes;
use mycel_ante::{AccountKeeper, BaseAccount};
use mycel_app::keepers::{FeeMarketParams, TokenFactoryParams};
use mycel_app::upgrades::{v1_4_0, v2_0_0};
use mycel_app::{modules, App, AppError, AppOptions, Genesis};
use mycel_crypto::{public_key_to_address, public_key_to_bytes, sign, PrivateKey};
use mycel_primitives::{Address, Coins, Dec};
use mycel_storage::{namespace, KvStore, MemoryDb, ModuleStore};
use mycel_types::{encode_tx, sign_doc_digest, AuthInfo, Fee, Msg, Packet, SignerInfo, Tx, TxBody};
use mycel_upgrade::{read_upgrade_info, Plan, UpgradeError, UpgradeOutcome, UpgradeStore, VersionMap};
use rand::rngs::OsRng;
use std::sync::Arc;

const CHAIN_ID: &str = "mycel-test-1";
const GAS: u64 = 200_000;
/// ceil(0.002 * GAS)
const FEE: u128 = 400;
const FUNDS: u128 = 1_000_000;

struct Signer {
    key: PrivateKey,
    address: Address,
    number: u64,
}

impl Signer {
    fn random(number: u64) -> Self {
        let key = PrivateKey::random(&mut OsRng);
        let address = public_key_to_address(key.verifying_key());
        Self {
            key,
            address,
            number,
        }
    }

    fn public_key(&self) -> Bytes {
        Bytes::copy_from_slice(&public_key_to_bytes(self.key.verifying_key()))
    }

    fn sign(&self, messages: Vec<Msg>, sequence: u64, fee: u128) -> Vec<u8> {
        let mut tx = Tx {
            body: TxBody {
                messages,
                ..Default::default()
            },
            auth_info: AuthInfo {
                signer_infos: vec![SignerInfo {
                    public_key: Some(self.public_key()),
                    sequence,
                }],
                fee: Fee {
                    amount: Coins::one("uoki", fee),
                    gas_limit: GAS,
                    ..Default::default()
                },
            },
            signatures: Vec::new(),
        };
        let digest = sign_doc_digest(&tx, CHAIN_ID, self.number, sequence);
        tx.signatures = vec![Bytes::copy_from_slice(
            &sign(&digest, &self.key).unwrap().to_bytes(),
        )];
        encode_tx(&tx)
    }

    fn send(&self, to: Address, amount: u128, sequence: u64) -> Vec<u8> {
        let msg = Msg::Send {
            from: self.address,
            to,
            amount: Coins::one("uoki", amount),
        };
        self.sign(vec![msg], sequence, FEE)
    }
}

fn options() -> AppOptions {
    AppOptions {
        chain_id: CHAIN_ID.to_string(),
        ..Default::default()
    }
}

struct Chain {
    db: Arc<MemoryDb>,
    app: App,
    alice: Signer,
    bob: Signer,
}

impl Chain {
    /// Fresh chain with two funded accounts (numbers 0 and 1)
    fn new() -> Self {
        let db = Arc::new(MemoryDb::new());
        let mut app = App::new(db.clone(), options()).unwrap();
        let alice = Signer::random(0);
        let bob = Signer::random(1);
        let genesis = Genesis::new(CHAIN_ID)
            .with_account(alice.address, Coins::one("uoki", FUNDS))
            .with_account(bob.address, Coins::one("uoki", FUNDS));
        app.init_chain(&genesis).unwrap();
        Self {
            db,
            app,
            alice,
            bob,
        }
    }

    fn balance(&self, address: &Address) -> u128 {
        self.app
            .keepers()
            .bank
            .balance(self.db.as_ref(), address, "uoki")
            .unwrap()
    }

    fn account(&self, address: &Address) -> BaseAccount {
        self.app
            .keepers()
            .auth
            .get_account(self.db.as_ref(), address)
            .unwrap()
            .unwrap()
    }

    /// One block holding `txs`
    fn block(&mut self, txs: &[Vec<u8>]) -> Vec<mycel_app::TxResult> {
        let height = self.app.last_height() + 1;
        self.app.begin_block(height, 1_700_000_000 + height as u64).unwrap();
        let results = txs
            .iter()
            .map(|tx| self.app.deliver_tx(tx).unwrap())
            .collect();
        self.app.end_block().unwrap();
        self.app.commit().unwrap();
        results
    }
}

// ==================== Block lifecycle ====================

#[test]
fn test_genesis_initialises_every_module() {
    let chain = Chain::new();
    let vm = chain.app.version_map().unwrap();
    assert_eq!(vm, modules::module_manager().version_map());
    assert_eq!(chain.balance(&chain.alice.address), FUNDS);
    assert_eq!(chain.app.last_height(), 0);
}

#[test]
fn test_init_chain_twice_rejected() {
    let mut chain = Chain::new();
    let err = chain.app.init_chain(&Genesis::new(CHAIN_ID)).unwrap_err();
    assert!(matches!(err, AppError::AlreadyInitialized(0)));
}

#[test]
fn test_genesis_for_other_chain_rejected() {
    let db = Arc::new(MemoryDb::new());
    let mut app = App::new(db, options()).unwrap();
    let err = app.init_chain(&Genesis::new("other-1")).unwrap_err();
    assert!(matches!(err, AppError::Genesis(_)));
}

#[test]
fn test_send_block() {
    let mut chain = Chain::new();
    let tx = chain.alice.send(chain.bob.address, 5_000, 0);
    let results = chain.block(&[tx]);

    assert!(results[0].is_ok(), "{}", results[0].log);
    assert_eq!(results[0].tx_index, Some(0));
    assert!(results[0].gas_used > 0);
    assert!(results[0].events.iter().any(|e| e.kind == "transfer"));

    assert_eq!(chain.balance(&chain.alice.address), FUNDS - 5_000 - FEE);
    assert_eq!(chain.balance(&chain.bob.address), FUNDS + 5_000);
    let collector = chain.app.keepers().bank.fee_collector();
    assert_eq!(chain.balance(&collector), FEE);

    let alice = chain.account(&chain.alice.address);
    assert_eq!(alice.sequence, 1);
    assert!(alice.public_key.is_some());
    assert_eq!(chain.app.last_height(), 1);
}

#[test]
fn test_tx_indices_within_block() {
    let mut chain = Chain::new();
    let txs = [
        chain.alice.send(chain.bob.address, 1, 0),
        chain.bob.send(chain.alice.address, 1, 0),
        chain.alice.send(chain.bob.address, 1, 1),
    ];
    let results = chain.block(&txs);
    let indices: Vec<_> = results.iter().map(|r| r.tx_index).collect();
    assert_eq!(indices, vec![Some(0), Some(1), Some(2)]);

    let next = chain.block(&[chain.bob.send(chain.alice.address, 1, 1)]);
    assert_eq!(next[0].tx_index, Some(0));
}

#[test]
fn test_failed_message_keeps_fee_and_sequence() {
    let mut chain = Chain::new();
    let tx = chain.alice.send(chain.bob.address, FUNDS * 2, 0);
    let results = chain.block(&[tx]);

    assert_eq!(results[0].code, 5, "{}", results[0].log);
    assert_eq!(chain.balance(&chain.alice.address), FUNDS - FEE);
    assert_eq!(chain.balance(&chain.bob.address), FUNDS);
    assert_eq!(chain.account(&chain.alice.address).sequence, 1);
}

#[test]
fn test_rejected_tx_changes_nothing() {
    let mut chain = Chain::new();
    let underpaid = {
        let msg = Msg::Send {
            from: chain.alice.address,
            to: chain.bob.address,
            amount: Coins::one("uoki", 1),
        };
        chain.alice.sign(vec![msg], 0, FEE - 1)
    };
    let results = chain.block(&[underpaid]);

    assert_eq!(results[0].code, 13);
    assert_eq!(chain.balance(&chain.alice.address), FUNDS);
    assert_eq!(chain.account(&chain.alice.address).sequence, 0);
}

#[test]
fn test_rejected_tx_gas_counts_toward_block() {
    let mut chain = Chain::new();
    let tx = chain.alice.send(chain.bob.address, 10, 7);
    assert_eq!(chain.app.block_gas_used(), None);

    chain.app.begin_block(1, 1_700_000_001).unwrap();
    let result = chain.app.deliver_tx(&tx).unwrap();
    assert_eq!(result.code, 32, "{}", result.log);
    assert!(result.gas_used > 0);
    assert_eq!(chain.app.block_gas_used(), Some(result.gas_used));

    let ok = chain.alice.send(chain.bob.address, 10, 0);
    let delivered = chain.app.deliver_tx(&ok).unwrap();
    assert!(delivered.is_ok(), "{}", delivered.log);
    assert_eq!(
        chain.app.block_gas_used(),
        Some(result.gas_used + delivered.gas_used)
    );
    chain.app.end_block().unwrap();
    chain.app.commit().unwrap();
    assert_eq!(chain.account(&chain.alice.address).sequence, 1);
}

#[test]
fn test_contract_messages_are_unroutable() {
    let mut chain = Chain::new();
    let msg = Msg::WasmExecute {
        sender: chain.alice.address,
        contract: Address::from_bytes([3; 20]),
        msg: Bytes::from_static(b"{\"ping\":{}}"),
        funds: Coins::new(),
    };
    let results = chain.block(&[chain.alice.sign(vec![msg], 0, FEE)]);

    assert_eq!(results[0].code, 6);
    assert_eq!(chain.balance(&chain.alice.address), FUNDS - FEE);
}

#[test]
fn test_undecodable_tx() {
    let mut chain = Chain::new();
    let results = chain.block(&[vec![0xff, 0x00, 0x01]]);
    assert_eq!(results[0].code, 2);
}

#[test]
fn test_create_denom_charges_gas_and_fee() {
    let mut chain = Chain::new();
    chain
        .app
        .keepers()
        .tokenfactory
        .set_params(
            chain.db.as_ref(),
            &TokenFactoryParams {
                denom_creation_fee: Coins::one("uoki", 10_000),
                denom_creation_gas_consume: GAS,
            },
        )
        .unwrap();
    let msg = Msg::CreateDenom {
        sender: chain.alice.address,
        subdenom: "spore".to_string(),
    };

    let results = chain.block(&[chain.alice.sign(vec![msg], 0, FEE)]);
    assert_eq!(results[0].code, 11, "creation gas exceeds the limit");
    assert_eq!(chain.balance(&chain.alice.address), FUNDS - FEE);

    chain
        .app
        .keepers()
        .tokenfactory
        .set_params(
            chain.db.as_ref(),
            &TokenFactoryParams {
                denom_creation_fee: Coins::one("uoki", 10_000),
                denom_creation_gas_consume: 1_000,
            },
        )
        .unwrap();
    let msg = Msg::CreateDenom {
        sender: chain.alice.address,
        subdenom: "spore".to_string(),
    };
    let results = chain.block(&[chain.alice.sign(vec![msg], 1, FEE)]);
    assert!(results[0].is_ok(), "{}", results[0].log);
    assert_eq!(chain.balance(&chain.alice.address), FUNDS - 2 * FEE - 10_000);
}

#[test]
fn test_lifecycle_order_enforced() {
    let mut chain = Chain::new();
    let tx = chain.alice.send(chain.bob.address, 1, 0);
    assert!(matches!(chain.app.deliver_tx(&tx), Err(AppError::Lifecycle(_))));
    assert!(matches!(chain.app.commit(), Err(AppError::Lifecycle(_))));
    assert!(matches!(chain.app.begin_block(2, 0), Err(AppError::Lifecycle(_))));

    chain.app.begin_block(1, 0).unwrap();
    assert!(matches!(chain.app.begin_block(2, 0), Err(AppError::Lifecycle(_))));
}

#[test]
fn test_restart_resumes_height() {
    let mut chain = Chain::new();
    chain.block(&[]);
    chain.block(&[]);

    let app = App::new(chain.db.clone(), options()).unwrap();
    assert_eq!(app.last_height(), 2);

    let other = AppOptions {
        chain_id: "other-1".to_string(),
        ..Default::default()
    };
    assert!(matches!(App::new(chain.db.clone(), other), Err(AppError::Genesis(_))));
}

#[test]
fn test_empty_blocks_hold_floor_price() {
    let mut chain = Chain::new();
    chain.app.begin_block(1, 0).unwrap();
    let price = chain.app.end_block().unwrap();
    assert_eq!(price, Dec::from_str_exact("0.002").unwrap());
}

// ==================== Mempool ====================

#[test]
fn test_check_tx_tracks_sequences_until_commit() {
    let mut chain = Chain::new();
    let first = chain.alice.send(chain.bob.address, 1, 0);

    assert!(chain.app.check_tx(&first).unwrap().is_ok());
    let replay = chain.app.check_tx(&first).unwrap();
    assert_eq!(replay.code, 32);
    let second = chain.alice.send(chain.bob.address, 1, 1);
    assert!(chain.app.check_tx(&second).unwrap().is_ok());

    // Committed state is untouched by checks
    assert_eq!(chain.account(&chain.alice.address).sequence, 0);

    chain.block(&[first.clone()]);
    assert!(chain.app.recheck_tx(&second).unwrap().is_ok());
    assert_eq!(chain.app.check_tx(&first).unwrap().code, 32);
}

#[test]
fn test_simulate_persists_nothing() {
    let chain = Chain::new();
    let tx = chain.alice.send(chain.bob.address, 5_000, 0);

    let result = chain.app.simulate_tx(&tx).unwrap();
    assert!(result.is_ok(), "{}", result.log);
    assert!(result.gas_used > 1_000);
    assert!(chain.app.check_tx(&tx).unwrap().is_ok());
    assert_eq!(chain.balance(&chain.bob.address), FUNDS);
}

#[test]
fn test_simulate_without_gas_limit() {
    let chain = Chain::new();
    let tx = Tx {
        body: TxBody {
            messages: vec![Msg::Send {
                from: chain.alice.address,
                to: chain.bob.address,
                amount: Coins::one("uoki", 5_000),
            }],
            ..Default::default()
        },
        auth_info: AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: Some(chain.alice.public_key()),
                sequence: 0,
            }],
            fee: Fee::default(),
        },
        signatures: vec![Bytes::new()],
    };

    let result = chain.app.simulate_tx(&encode_tx(&tx)).unwrap();
    assert!(result.is_ok(), "{}", result.log);
    assert_eq!(result.gas_wanted, 0);
    assert!(result.gas_used > 1_000);
}

#[test]
fn test_circuit_breaker_blocks_admission() {
    let chain = Chain::new();
    chain
        .app
        .keepers()
        .circuit
        .disable(chain.db.as_ref(), "/mycel.bank.v1.MsgSend")
        .unwrap();
    let result = chain
        .app
        .check_tx(&chain.alice.send(chain.bob.address, 1, 0))
        .unwrap();
    assert_eq!(result.code, 4);
}

#[test]
fn test_redundant_relay_rejected_in_mempool() {
    let mut chain = Chain::new();
    let packet = Packet {
        sequence: 1,
        source_port: "transfer".into(),
        source_channel: "channel-0".into(),
        destination_port: "transfer".into(),
        destination_channel: "channel-3".into(),
        data: Bytes::from_static(b"{\"amount\":\"10\"}"),
        timeout_height: 0,
    };
    let recv = |sequence| {
        chain.alice.sign(
            vec![Msg::RecvPacket {
                signer: chain.alice.address,
                packet: packet.clone(),
            }],
            sequence,
            FEE,
        )
    };
    let first = recv(0);
    let again = recv(1);

    let results = chain.block(&[first]);
    assert!(results[0].is_ok(), "{}", results[0].log);

    let result = chain.app.check_tx(&again).unwrap();
    assert_eq!((result.code, result.codespace), (22, "channel"));
}

#[test]
fn test_fee_market_can_be_disabled() {
    let db = Arc::new(MemoryDb::new());
    let mut app = App::new(
        db.clone(),
        AppOptions {
            chain_id: CHAIN_ID.to_string(),
            min_gas_prices: vec!["0.01uoki".parse().unwrap()],
            ..Default::default()
        },
    )
    .unwrap();
    let alice = Signer::random(0);
    let mut genesis = Genesis::new(CHAIN_ID).with_account(alice.address, Coins::one("uoki", FUNDS));
    genesis.feemarket_params = Some(FeeMarketParams {
        enabled: false,
        ..Default::default()
    });
    app.init_chain(&genesis).unwrap();

    let tx = alice.send(Address::from_bytes([8; 20]), 1, 0);
    assert_eq!(app.check_tx(&tx).unwrap().code, 13);

    let msg = Msg::Send {
        from: alice.address,
        to: Address::from_bytes([8; 20]),
        amount: Coins::one("uoki", 1),
    };
    let paid = alice.sign(vec![msg], 0, 2_000);
    assert!(app.check_tx(&paid).unwrap().is_ok());
}

// ==================== Upgrades ====================

/// Pre-v1.4.0 chain state: legacy auth keys, no supply records, group and
/// circuit still present
fn legacy_chain(account: &Signer) -> Arc<MemoryDb> {
    let db = Arc::new(MemoryDb::new());
    let store: &dyn KvStore = db.as_ref();

    let legacy = BaseAccount {
        address: account.address,
        public_key: None,
        account_number: 0,
        sequence: 0,
    };
    ModuleStore::new(store, modules::AUTH)
        .set_json(account.address.as_bytes(), &legacy)
        .unwrap();
    let mut balance_key = b"bal/".to_vec();
    balance_key.extend_from_slice(account.address.as_bytes());
    balance_key.extend_from_slice(b"uoki");
    ModuleStore::new(store, modules::BANK)
        .set_json(&balance_key, &FUNDS)
        .unwrap();
    ModuleStore::new(store, modules::GROUP).set(b"groups/1", b"{}").unwrap();
    ModuleStore::new(store, modules::CIRCUIT)
        .set(b"disabled//mycel.bank.v1.MsgSend", &[])
        .unwrap();
    for module in [modules::FEEMARKET, modules::FEEGRANT, modules::IBC, modules::WASM] {
        namespace::create(store, module).unwrap();
    }

    let vm: VersionMap = [
        (modules::AUTH, 4),
        (modules::BANK, 3),
        (modules::CIRCUIT, 1),
        (modules::FEEGRANT, 2),
        (modules::FEEMARKET, 1),
        (modules::GROUP, 2),
        (modules::IBC, 6),
        (modules::WASM, 4),
    ]
    .into_iter()
    .map(|(m, v)| (m.to_string(), v))
    .collect();
    UpgradeStore::new(store).set_version_map(&vm).unwrap();
    db
}

#[test]
fn test_catalogue_from_v1_3_to_v2_0() {
    let alice = Signer::random(0);
    let db = legacy_chain(&alice);
    let mut app = App::new(db.clone(), options()).unwrap();
    let store: &dyn KvStore = db.as_ref();

    // v1.4.0 at height 1
    app.schedule_upgrade(&Plan::new(v1_4_0::UPGRADE_NAME, 1)).unwrap();
    let outcome = app.begin_block(1, 0).unwrap();
    let version_map = match outcome {
        UpgradeOutcome::Applied { version_map, .. } => version_map,
        other => panic!("expected v1.4.0 to apply, got {:?}", other),
    };
    app.end_block().unwrap();
    app.commit().unwrap();

    assert_eq!(version_map.get(modules::TOKENFACTORY), Some(&1));
    assert_eq!(version_map.get(modules::AUTH), Some(&5));
    assert_eq!(version_map.get(modules::BANK), Some(&4));
    assert_eq!(version_map.get(modules::GROUP), Some(&2));
    assert_eq!(version_map.get(modules::CIRCUIT), Some(&1));
    assert_eq!(app.version_map().unwrap(), version_map);

    let params = app.keepers().tokenfactory.params(store).unwrap();
    assert_eq!(params.denom_creation_fee, Coins::one("uoki", v1_4_0::DENOM_CREATION_FEE));
    assert_eq!(params.denom_creation_gas_consume, v1_4_0::DENOM_CREATION_GAS);
    assert!(app.keepers().auth.get_account(store, &alice.address).unwrap().is_some());
    assert_eq!(app.keepers().bank.supply(store, "uoki").unwrap(), FUNDS);
    assert!(app.pending_upgrade().unwrap().is_none());

    // v2.0.0 at height 2
    app.schedule_upgrade(&Plan::new(v2_0_0::UPGRADE_NAME, 2)).unwrap();
    let outcome = app.begin_block(2, 0).unwrap();
    assert!(matches!(outcome, UpgradeOutcome::Applied { .. }));
    app.end_block().unwrap();
    app.commit().unwrap();

    let vm = app.version_map().unwrap();
    assert!(!vm.contains_key(modules::GROUP));
    assert!(!vm.contains_key(modules::CIRCUIT));
    assert_eq!(vm, modules::module_manager().version_map());
    assert!(!namespace::exists(store, modules::GROUP).unwrap());
    assert!(!namespace::exists(store, modules::CIRCUIT).unwrap());
    assert!(app.keepers().circuit.disabled(store).unwrap().is_empty());

    assert_eq!(
        app.applied_upgrades().unwrap(),
        vec![
            (v1_4_0::UPGRADE_NAME.to_string(), 1),
            (v2_0_0::UPGRADE_NAME.to_string(), 2)
        ]
    );
}

#[test]
fn test_unknown_upgrade_halts_and_hands_off() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = Chain::new();
    chain.block(&[]);

    let mut app = App::new(
        chain.db.clone(),
        AppOptions {
            chain_id: CHAIN_ID.to_string(),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        },
    )
    .unwrap();
    let plan = Plan::new("v3.0.0", 3).with_info("https://example.invalid/v3.0.0");
    app.schedule_upgrade(&plan).unwrap();

    assert!(matches!(app.begin_block(2, 0).unwrap(), UpgradeOutcome::NotDue(_)));
    app.end_block().unwrap();
    app.commit().unwrap();

    let err = app.begin_block(3, 0).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, AppError::Upgrade(UpgradeError::UpgradeNeeded { height: 3, .. })));
    assert_eq!(read_upgrade_info(dir.path()).unwrap(), Some(plan));
    assert_eq!(app.last_height(), 2);
}

#[test]
fn test_premature_binary_halts() {
    let mut chain = Chain::new();
    chain
        .app
        .schedule_upgrade(&Plan::new(v2_0_0::UPGRADE_NAME, 5))
        .unwrap();
    let err = chain.app.begin_block(1, 0).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, AppError::Upgrade(UpgradeError::PrematureUpgrade { .. })));
}

#[test]
fn test_skip_height_clears_plan() {
    let chain = Chain::new();
    let vm_before = chain.app.version_map().unwrap();
    let mut app = App::new(
        chain.db.clone(),
        AppOptions {
            chain_id: CHAIN_ID.to_string(),
            skip_upgrade_heights: vec![1],
            ..Default::default()
        },
    )
    .unwrap();
    app.schedule_upgrade(&Plan::new(v2_0_0::UPGRADE_NAME, 1)).unwrap();

    let outcome = app.begin_block(1, 0).unwrap();
    assert!(matches!(outcome, UpgradeOutcome::Skipped(_)));
    app.end_block().unwrap();
    app.commit().unwrap();

    assert!(app.pending_upgrade().unwrap().is_none());
    assert_eq!(app.version_map().unwrap(), vm_before);
    assert!(app.applied_upgrades().unwrap().is_empty());
    let skipped = UpgradeStore::new(chain.db.as_ref()).skipped().unwrap();
    assert_eq!(skipped, vec![(1, v2_0_0::UPGRADE_NAME.to_string())]);
}

#[test]
fn test_schedule_validation() {
    let mut chain = Chain::new();
    chain.block(&[]);
    let err = chain
        .app
        .schedule_upgrade(&Plan::new(v2_0_0::UPGRADE_NAME, 1))
        .unwrap_err();
    assert!(matches!(err, AppError::Upgrade(UpgradeError::PlanInPast { .. })));
    assert!(!err.is_fatal());

    chain.app.schedule_upgrade(&Plan::new("v3.0.0", 10)).unwrap();
    assert_eq!(chain.app.cancel_upgrade().unwrap().unwrap().name, "v3.0.0");
    assert!(chain.app.pending_upgrade().unwrap().is_none());
}
