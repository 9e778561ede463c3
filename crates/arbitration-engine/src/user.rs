//! User role
//!
//! Files challenges against transfers the coordinator reports as not
//! reimbursed in time, then proves the source transaction once the
//! coordinator has the proof.

use crate::conditions::is_eligible;
use crate::error::EngineError;
use crate::lifecycle::{
    prefer_record, record_hash, resolve_mdc, EngineContext, RoleStrategy, StepOutcome, TickContext, TickReport,
};
use arbitration_types::mdc::{
    encode_challenge, encode_verify_challenge_source, parse_address, parse_bytes, parse_u256, ChallengeArgs,
    VerifySourceArgs,
};
use arbitration_types::{
    normalize_hash, ArbitrationRecord, ArbitrationStatus, ArbitrationTransaction, ChainRelation, EncodeError,
    NeedProofSubmission, ProofData, Role,
};
use async_trait::async_trait;
use ethers::types::{H256, U256};
use parking_lot::Mutex;

/// User-side strategy
pub struct UserArbitration {
    /// Start of the next unreimbursed window (unix millis)
    window_start: Mutex<i64>,
}

impl UserArbitration {
    /// Start polling from `start_ms`
    pub fn new(start_ms: i64) -> Self {
        Self {
            window_start: Mutex::new(start_ms),
        }
    }

    /// Current window start (unix millis)
    pub fn window_start(&self) -> i64 {
        *self.window_start.lock()
    }

    async fn challenge(
        &self,
        engine: &EngineContext,
        tick: &TickContext,
        relations: &[ChainRelation],
        tx: &ArbitrationTransaction,
    ) -> Result<StepOutcome, EngineError> {
        let Some(raw_hash) = tx.source_tx_hash.as_deref() else {
            return Err(EncodeError::MissingField("sourceTxHash").into());
        };
        let hash = normalize_hash(raw_hash);

        if !is_eligible(tx, relations, engine.clock.now_secs()) {
            tracing::debug!("{} outside its challenge window", hash);
            return Ok(StepOutcome::Skipped);
        }

        if let Some(existing) = engine.store.get(&hash)? {
            if !existing.can_retry_challenge() {
                tracing::debug!("{} already tracked", hash);
                return Ok(StepOutcome::Skipped);
            }
            tracing::info!("Retrying challenge for {}", hash);
        }

        let args = ChallengeArgs::try_from(tx)?;
        let owner = tx
            .source_maker
            .as_deref()
            .ok_or(EncodeError::MissingField("sourceMaker"))?;
        let mdc = tick
            .metadata
            .mdc_address(owner)
            .await?
            .ok_or_else(|| EngineError::MdcNotFound(owner.to_string()))?;
        let data = encode_challenge(&args)?;
        let value = match tx.min_challenge_deposit_amount.as_deref() {
            Some(amount) if !amount.trim().is_empty() => parse_u256(amount, "minChallengeDepositAmount")?,
            _ => U256::zero(),
        };
        let mdc_address = format!("{:?}", mdc);

        // Written before sending so a crash after broadcast never re-challenges;
        // only a failure known to precede the broadcast marks it retryable
        engine.store.upsert(
            &hash,
            &ArbitrationRecord {
                source_tx_hash: Some(hash.clone()),
                from_chain_id: Some(args.source_chain_id),
                mdc_address: Some(mdc_address.clone()),
                spv_address: tx.spv_address.clone(),
                status: Some(ArbitrationStatus::Detected),
                is_need_proof: Some(false),
                challenge_retryable: Some(false),
                ..Default::default()
            },
        )?;

        let tx_id = match tick.submitter.submit(mdc, value, data).await {
            Ok(tx_id) => tx_id,
            Err(e) => {
                if !e.outcome_unknown() {
                    engine.store.upsert(
                        &hash,
                        &ArbitrationRecord {
                            challenge_retryable: Some(true),
                            ..Default::default()
                        },
                    )?;
                }
                return Err(e);
            }
        };
        engine.store.upsert(
            &hash,
            &ArbitrationRecord {
                status: Some(ArbitrationStatus::ChallengeSubmitted),
                submit_challenge_tx_id: Some(format!("{:?}", tx_id)),
                challenger: Some(format!("{:?}", tick.submitter.sender())),
                ..Default::default()
            },
        )?;
        tracing::info!("Challenge submitted for {}: {:?}", hash, tx_id);

        request_proof(engine, tick, &hash, args.source_chain_id, &mdc_address).await;
        Ok(StepOutcome::Advanced)
    }
}

/// Ask the coordinator to prepare the source proof; failures leave the
/// record at `CHALLENGE_SUBMITTED` for a later retry.
async fn request_proof(engine: &EngineContext, tick: &TickContext, hash: &str, chain_id: u64, mdc: &str) -> bool {
    let request = NeedProofSubmission {
        is_source: 1,
        chain_id,
        hash: hash.to_string(),
        mdc_address: mdc.to_string(),
    };
    if let Err(e) = tick.coordinator.need_proof_submission(&request).await {
        tracing::warn!("Proof request for {} failed: {}", hash, e);
        return false;
    }

    let update = ArbitrationRecord {
        status: Some(ArbitrationStatus::ProofRequested),
        is_need_proof: Some(true),
        ..Default::default()
    };
    match engine.store.upsert(hash, &update) {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to record proof request for {}: {}", hash, e);
            false
        }
    }
}

#[async_trait]
impl RoleStrategy for UserArbitration {
    fn role(&self) -> Role {
        Role::User
    }

    async fn discover(&self, engine: &EngineContext, tick: &TickContext) -> Result<TickReport, EngineError> {
        let start = self.window_start();
        let end = engine.clock.now_millis();
        let lookback = engine.settings.poll_lookback.as_millis() as i64;

        // Without relations no candidate can be judged; keep the window
        let relations = engine.chain_relations.get(tick.metadata.as_ref()).await?;

        let candidates = tick
            .coordinator
            .unreimbursed_transactions(start.saturating_sub(lookback), end)
            .await?;
        tracing::debug!("{} unreimbursed candidates in [{}, {}]", candidates.len(), start, end);

        let mut report = TickReport::default();
        for tx in &candidates {
            let result = self.challenge(engine, tick, &relations, tx).await;
            match &result {
                Ok(StepOutcome::Skipped) => {}
                Ok(StepOutcome::Advanced) => engine.pace().await,
                Err(e) => {
                    tracing::error!(
                        "Challenge failed for {}: {}",
                        tx.source_tx_hash.as_deref().unwrap_or("<unknown>"),
                        e
                    );
                    engine.pace().await;
                }
            }
            report.record(&result);
        }

        *self.window_start.lock() = end;
        Ok(report)
    }

    async fn before_proof_sync(&self, engine: &EngineContext, tick: &TickContext) -> Result<(), EngineError> {
        for (hash, record) in engine.store.records()? {
            if record.status != Some(ArbitrationStatus::ChallengeSubmitted) {
                continue;
            }
            let (Some(chain_id), Some(mdc)) = (record.from_chain_id, record.mdc_address.as_deref()) else {
                tracing::warn!("{} lacks chain or MDC, cannot request proof", hash);
                continue;
            };
            if request_proof(engine, tick, &hash, chain_id, mdc).await {
                tracing::info!("Proof requested for {}", hash);
            }
        }
        Ok(())
    }

    async fn submit_proof(
        &self,
        _engine: &EngineContext,
        tick: &TickContext,
        hash: &str,
        record: &ArbitrationRecord,
        proof: &ProofData,
    ) -> Result<H256, EngineError> {
        let challenger = prefer_record(&record.challenger, &proof.challenger, "challenger")?;
        let spv = prefer_record(&record.spv_address, &proof.spv_address, "spvAddress")?;
        let source_chain_id = record
            .from_chain_id
            .or(proof.source_chain)
            .ok_or(EncodeError::MissingField("sourceChainId"))?;
        let mdc = resolve_mdc(tick, record, proof).await?;

        let args = VerifySourceArgs {
            challenger: parse_address(challenger, "challenger")?,
            spv_address: parse_address(spv, "spvAddress")?,
            source_chain_id,
            proof: parse_bytes(proof.proof.as_deref().unwrap_or_default(), "proof")?,
            raw_datas: parse_bytes(proof.raw_datas.as_deref().unwrap_or("0x"), "rawDatas")?,
            rlp_rule_bytes: parse_bytes(proof.rlp_rule_bytes.as_deref().unwrap_or("0x"), "rlpRuleBytes")?,
        };
        let data = encode_verify_challenge_source(&args)?;
        tracing::debug!("Proving source of {}", record_hash(hash, record));

        tick.submitter.submit(mdc, U256::zero(), data).await
    }
}
