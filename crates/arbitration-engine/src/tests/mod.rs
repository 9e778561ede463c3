//! Cross-module scenarios over in-memory services



use crate::{
    ArbitrationStore, ChainRelationCache, ConfigManager, ConfigUpdate, EngineContext, LifecycleConfig,
    LifecycleCoordinator,
};
use arbitration_types::{ArbitrationTransaction, ChainRelation, FeeData, PrivateKey, ProofData, Role};
use ethers::types::{Address, U256};
use mocks::{ManualClock, MockConnector, MockCoordinator, MockLedger, MockMetadata};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Well-known development key
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Source transaction time used by the scenarios
pub const T: u64 = 1_700_000_000;

pub const SOURCE_CHAIN: u64 = 5;
pub const MAKER: &str = "0x00000000000000000000000000000000000000aa";
pub const SPV: &str = "0x00000000000000000000000000000000000000bb";

pub fn mdc() -> Address {
    Address::repeat_byte(0xdc)
}

pub fn hash(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

pub fn relation(id: u64, min: u64, max: u64) -> ChainRelation {
    ChainRelation {
        id,
        native_token: "0x0000000000000000000000000000000000000000".to_string(),
        min_challenge_delay_secs: min,
        max_challenge_delay_secs: max,
        min_verify_dest_delay_secs: 0,
        max_verify_dest_delay_secs: 0,
        batch_limit: 100,
        enable_timestamp: 0,
        spvs: vec![SPV.to_string()],
    }
}

/// A complete, challengeable candidate from `MAKER` on `SOURCE_CHAIN`
pub fn candidate(source_tx_hash: &str, source_tx_time: u64) -> ArbitrationTransaction {
    ArbitrationTransaction {
        source_maker: Some(MAKER.to_string()),
        source_tx_time: Some(source_tx_time),
        source_chain_id: Some(SOURCE_CHAIN),
        source_tx_block_num: Some(100),
        source_tx_index: Some(1),
        source_tx_hash: Some(source_tx_hash.to_string()),
        rule_key: Some(hash("01")),
        freeze_token: Some(format!("0x{}", "00".repeat(20))),
        freeze_amount1: Some("1000000".to_string()),
        spv_address: Some(SPV.to_string()),
        ..Default::default()
    }
}

pub fn ready_proof() -> ProofData {
    ProofData {
        status: true,
        proof: Some("0xdeadbeef".to_string()),
        raw_datas: Some("0x01".to_string()),
        rlp_rule_bytes: Some("0x02".to_string()),
        ..Default::default()
    }
}

pub fn complete_config() -> ConfigUpdate {
    ConfigUpdate {
        private_key: Some(PrivateKey::new(DEV_KEY)),
        rpc_url: Some("http://localhost:8545".to_string()),
        coordinator_url: Some("http://localhost:3000/".to_string()),
        subgraph_url: Some("http://localhost:8000/subgraphs/name/mdc".to_string()),
        ..Default::default()
    }
}

/// Engine wired to mocks, with a throwaway store and no item delay
pub struct Harness {
    _dir: TempDir,
    pub store: Arc<ArbitrationStore>,
    pub coordinator: Arc<MockCoordinator>,
    pub metadata: Arc<MockMetadata>,
    pub ledger: Arc<MockLedger>,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<EngineContext>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(complete_config())
    }

    pub fn with_config(update: ConfigUpdate) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArbitrationStore::open(dir.path().join("db")).unwrap());
        let config = Arc::new(ConfigManager::load(store.clone(), dir.path().join("keystore"), None).unwrap());
        config.overlay(&update).unwrap();

        let coordinator = Arc::new(MockCoordinator::default());
        let metadata = Arc::new(MockMetadata::default());
        metadata.set_relations(vec![relation(SOURCE_CHAIN, 100, 1000)]);
        metadata.set_mdc(MAKER, mdc());

        let ledger = Arc::new(MockLedger::new(
            FeeData {
                max_fee_per_gas: Some(U256::from(100)),
                max_priority_fee_per_gas: Some(U256::from(2)),
                gas_price: Some(U256::from(50)),
            },
            U256::exp10(18),
        ));
        let clock = Arc::new(ManualClock::at_secs(T));

        let engine = Arc::new(EngineContext {
            store: store.clone(),
            config,
            connector: Arc::new(MockConnector {
                coordinator: coordinator.clone(),
                metadata: metadata.clone(),
                ledger: ledger.clone(),
            }),
            chain_relations: ChainRelationCache::new(Duration::from_secs(60)),
            clock: clock.clone(),
            settings: LifecycleConfig {
                item_delay: Duration::ZERO,
                ..Default::default()
            },
        });

        Self {
            _dir: dir,
            store,
            coordinator,
            metadata,
            ledger,
            clock,
            engine,
        }
    }

    pub fn lifecycle(&self, role: Role) -> LifecycleCoordinator {
        LifecycleCoordinator::new(self.engine.clone(), role)
    }
}
