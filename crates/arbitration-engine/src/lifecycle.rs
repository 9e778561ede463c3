//! Lifecycle Coordinator
//!
//! Drives each arbitration record through
//! `DETECTED -> CHALLENGE_SUBMITTED -> PROOF_REQUESTED -> PROOF_SUBMITTED`.
//!
//! Discovery is role specific (see [`crate::user`] and [`crate::maker`]);
//! proof sync is shared: every record awaiting a proof is polled and, once
//! the coordinator has a ready proof, the role relays it to the ledger.

use crate::chain_relations::ChainRelationCache;
use crate::clock::Clock;
use crate::config::ConfigManager;
use crate::error::{ConfigError, EngineError};
use crate::maker::MakerArbitration;
use crate::store::ArbitrationStore;
use crate::submitter::TransactionSubmitter;
use crate::user::UserArbitration;
use arbitration_types::mdc::parse_address;
use arbitration_types::{
    normalize_hash, ArbitrationConfig, ArbitrationRecord, ArbitrationStatus, CoordinatorApi, EncodeError,
    MetadataSource, ProofData, Role, ServiceConnector,
};
use async_trait::async_trait;
use ethers::types::{Address, H256};
use std::sync::Arc;
use std::time::Duration;

/// Delay between items that touch the coordinator or the ledger
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(3);

/// How far before the last poll the unreimbursed query reaches back
pub const DEFAULT_POLL_LOOKBACK: Duration = Duration::from_secs(60 * 60);

/// Lifecycle tuning
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Pause after each item that submitted or failed
    pub item_delay: Duration,
    /// Overlap of successive unreimbursed windows
    pub poll_lookback: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            item_delay: DEFAULT_ITEM_DELAY,
            poll_lookback: DEFAULT_POLL_LOOKBACK,
        }
    }
}

/// Long-lived collaborators shared by every tick
pub struct EngineContext {
    pub store: Arc<ArbitrationStore>,
    pub config: Arc<ConfigManager>,
    pub connector: Arc<dyn ServiceConnector>,
    pub chain_relations: ChainRelationCache,
    pub clock: Arc<dyn Clock>,
    pub settings: LifecycleConfig,
}

impl EngineContext {
    /// Pause between items
    pub async fn pace(&self) {
        if !self.settings.item_delay.is_zero() {
            tokio::time::sleep(self.settings.item_delay).await;
        }
    }
}

/// Clients built from one configuration snapshot, valid for a single tick
pub struct TickContext {
    pub config: Arc<ArbitrationConfig>,
    pub coordinator: Arc<dyn CoordinatorApi>,
    pub metadata: Arc<dyn MetadataSource>,
    pub submitter: TransactionSubmitter,
}

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Items looked at
    pub processed: usize,
    /// Challenges or proofs sent to the ledger, or proofs requested
    pub advanced: usize,
    /// Items skipped (ineligible, already tracked, not ready)
    pub skipped: usize,
    /// Items that failed and were logged
    pub failed: usize,
}

/// Per-item result of a lifecycle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced,
    Skipped,
}

impl TickReport {
    /// Fold an item result into the counters
    pub fn record(&mut self, result: &Result<StepOutcome, EngineError>) {
        self.processed += 1;
        match result {
            Ok(StepOutcome::Advanced) => self.advanced += 1,
            Ok(StepOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Role-specific half of the lifecycle
#[async_trait]
pub trait RoleStrategy: Send + Sync {
    fn role(&self) -> Role;

    /// Find new work and open records for it
    async fn discover(&self, engine: &EngineContext, tick: &TickContext) -> Result<TickReport, EngineError>;

    /// Work to do before polling proofs (e.g. retrying proof requests)
    async fn before_proof_sync(&self, _engine: &EngineContext, _tick: &TickContext) -> Result<(), EngineError> {
        Ok(())
    }

    /// Relay a ready proof to the ledger
    async fn submit_proof(
        &self,
        engine: &EngineContext,
        tick: &TickContext,
        hash: &str,
        record: &ArbitrationRecord,
        proof: &ProofData,
    ) -> Result<H256, EngineError>;
}

/// Orchestrates discovery and proof sync for one role
pub struct LifecycleCoordinator {
    engine: Arc<EngineContext>,
    strategy: Box<dyn RoleStrategy>,
}

impl LifecycleCoordinator {
    /// Create a coordinator acting in the given role
    pub fn new(engine: Arc<EngineContext>, role: Role) -> Self {
        let strategy: Box<dyn RoleStrategy> = match role {
            Role::User => Box::new(UserArbitration::new(engine.clock.now_millis())),
            Role::Maker => Box::new(MakerArbitration::new()),
        };
        Self { engine, strategy }
    }

    pub fn role(&self) -> Role {
        self.strategy.role()
    }

    pub fn engine(&self) -> &Arc<EngineContext> {
        &self.engine
    }

    /// Build the tick's clients from the current configuration snapshot
    pub async fn prepare_tick(&self) -> Result<TickContext, EngineError> {
        let config = self.engine.config.snapshot();

        let private_key = config.private_key.as_ref().ok_or(ConfigError::MissingPrivateKey)?;
        let rpc_url = config.rpc_url.as_deref().ok_or(ConfigError::MissingRpcUrl)?;
        let coordinator_url = config
            .coordinator_url
            .as_deref()
            .ok_or(ConfigError::MissingCoordinatorUrl)?;
        let subgraph_url = config.subgraph_url.as_deref().ok_or(ConfigError::MissingSubgraphUrl)?;

        let coordinator = self.engine.connector.coordinator(coordinator_url)?;
        let metadata = self.engine.connector.metadata(subgraph_url)?;
        let ledger = self.engine.connector.ledger(rpc_url, private_key).await?;
        let submitter = TransactionSubmitter::new(ledger, config.gas.clone());

        Ok(TickContext {
            config,
            coordinator,
            metadata,
            submitter,
        })
    }

    /// One discovery pass
    pub async fn run_discovery(&self) -> Result<TickReport, EngineError> {
        let tick = self.prepare_tick().await?;
        self.strategy.discover(&self.engine, &tick).await
    }

    /// One proof-sync pass over every record awaiting a proof
    pub async fn run_proof_sync(&self) -> Result<TickReport, EngineError> {
        let tick = self.prepare_tick().await?;

        if let Err(e) = self.strategy.before_proof_sync(&self.engine, &tick).await {
            tracing::error!("Proof request retry failed: {}", e);
        }

        let mut report = TickReport::default();
        let records = self.engine.store.records()?;

        for (hash, record) in records {
            if !record.needs_proof() {
                continue;
            }
            let result = self.sync_proof(&tick, &hash, &record).await;
            if let Err(e) = &result {
                tracing::error!("Proof sync failed for {}: {}", hash, e);
            }
            report.record(&result);
        }

        Ok(report)
    }

    async fn sync_proof(
        &self,
        tick: &TickContext,
        hash: &str,
        record: &ArbitrationRecord,
    ) -> Result<StepOutcome, EngineError> {
        let candidates = tick.coordinator.proof_params(self.role(), hash).await?;
        let Some(proof) = candidates.iter().find(|p| p.status) else {
            return Ok(StepOutcome::Skipped);
        };
        if !proof.is_ready() {
            tracing::debug!("Proof for {} not ready yet", hash);
            return Ok(StepOutcome::Skipped);
        }

        let outcome = self
            .strategy
            .submit_proof(&self.engine, tick, hash, record, proof)
            .await;
        let tx_id = match outcome {
            Ok(tx_id) => tx_id,
            Err(e) => {
                self.engine.pace().await;
                return Err(e);
            }
        };

        self.engine.store.upsert(
            hash,
            &ArbitrationRecord {
                status: Some(ArbitrationStatus::ProofSubmitted),
                is_need_proof: Some(false),
                submit_proof_tx_id: Some(format!("{:?}", tx_id)),
                target_chain: proof.target_chain.as_deref().and_then(|c| c.trim().parse().ok()),
                proof: proof.proof.clone(),
                raw_datas: proof.raw_datas.clone(),
                rlp_rule_bytes: proof.rlp_rule_bytes.clone(),
                ..Default::default()
            },
        )?;
        tracing::info!("Submitted {} proof for {}: {:?}", self.role(), hash, tx_id);

        self.engine.pace().await;
        Ok(StepOutcome::Advanced)
    }
}

/// Stored value if present, otherwise the proof payload's
pub(crate) fn prefer_record<'a>(
    stored: &'a Option<String>,
    payload: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, EncodeError> {
    stored
        .as_deref()
        .or(payload.as_deref())
        .filter(|v| !v.trim().is_empty())
        .ok_or(EncodeError::MissingField(field))
}

/// MDC to call: record, then proof payload, then the maker's MDC by lookup
pub(crate) async fn resolve_mdc(
    tick: &TickContext,
    record: &ArbitrationRecord,
    proof: &ProofData,
) -> Result<Address, EngineError> {
    if let Ok(mdc) = prefer_record(&record.mdc_address, &proof.mdc_address, "mdcAddress") {
        return Ok(parse_address(mdc, "mdcAddress")?);
    }
    let owner = proof
        .source_maker
        .as_deref()
        .ok_or(EncodeError::MissingField("mdcAddress"))?;
    tick.metadata
        .mdc_address(owner)
        .await?
        .ok_or_else(|| EngineError::MdcNotFound(owner.to_string()))
}

/// Source hash for a record, falling back to its key
pub(crate) fn record_hash(hash: &str, record: &ArbitrationRecord) -> String {
    record
        .source_tx_hash
        .as_deref()
        .map(normalize_hash)
        .unwrap_or_else(|| normalize_hash(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_fields_win_over_payload() {
        let stored = Some("0x00000000000000000000000000000000000000c1".to_string());
        let payload = Some("0x00000000000000000000000000000000000000c2".to_string());

        assert_eq!(prefer_record(&stored, &payload, "challenger").unwrap(), stored.as_deref().unwrap());
        assert_eq!(prefer_record(&None, &payload, "challenger").unwrap(), payload.as_deref().unwrap());
        assert!(matches!(
            prefer_record(&None, &None, "challenger"),
            Err(EncodeError::MissingField("challenger"))
        ));
    }

    #[test]
    fn test_record_hash_falls_back_to_key() {
        let record = ArbitrationRecord::default();
        assert_eq!(record_hash("0xABC", &record), "0xabc");

        let record = ArbitrationRecord {
            source_tx_hash: Some("0xDEF".to_string()),
            ..Default::default()
        };
        assert_eq!(record_hash("0xabc", &record), "0xdef");
    }

    #[test]
    fn test_report_counts() {
        let mut report = TickReport::default();
        report.record(&Ok(StepOutcome::Advanced));
        report.record(&Ok(StepOutcome::Skipped));
        report.record(&Err(EngineError::ChainRelationNotFound(1)));
        assert_eq!(
            report,
            TickReport {
                processed: 3,
                advanced: 1,
                skipped: 1,
                failed: 1,
            }
        );
    }
}
