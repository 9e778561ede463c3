//! Maker role
//!
//! Answers challenges filed against the configured makers by proving the
//! destination transaction.

use crate::conditions::find_relation;
use crate::error::EngineError;
use crate::lifecycle::{
    prefer_record, record_hash, resolve_mdc, EngineContext, RoleStrategy, StepOutcome, TickContext, TickReport,
};
use arbitration_types::mdc::{
    encode_verify_challenge_dest, parse_address, parse_bytes, parse_h256, parse_u256, VerifyDestArgs,
};
use arbitration_types::{
    normalize_hash, ArbitrationRecord, ArbitrationStatus, EncodeError, MakerChallenge, ProofData, Role,
    MAKER_RESPONSE_PENDING_STATUS,
};
use async_trait::async_trait;
use ethers::types::{H256, U256};

/// Maker-side strategy
#[derive(Debug, Default)]
pub struct MakerArbitration;

impl MakerArbitration {
    pub fn new() -> Self {
        Self
    }

    async fn solicit(
        &self,
        engine: &EngineContext,
        tick: &TickContext,
        challenge: &MakerChallenge,
    ) -> Result<StepOutcome, EngineError> {
        let hash = normalize_hash(&challenge.source_tx_hash);
        if hash.is_empty() {
            return Err(EncodeError::MissingField("sourceTxHash").into());
        }

        if engine.store.get(&hash)?.is_some() {
            tracing::debug!("{} already tracked", hash);
            return Ok(StepOutcome::Skipped);
        }

        let status = tick.coordinator.transaction_status(&hash).await?;
        if status != Some(MAKER_RESPONSE_PENDING_STATUS) {
            tracing::debug!("{} not awaiting a maker response (status {:?})", hash, status);
            return Ok(StepOutcome::Skipped);
        }

        tick.coordinator.maker_ask_proof(&hash).await?;
        engine.store.upsert(
            &hash,
            &ArbitrationRecord {
                source_tx_hash: Some(hash.clone()),
                from_chain_id: challenge.source_chain_id,
                mdc_address: challenge.mdc_address.clone(),
                spv_address: challenge.spv_address.clone(),
                challenger: challenge.verify_pass_challenger.clone(),
                status: Some(ArbitrationStatus::ProofRequested),
                is_need_proof: Some(true),
                ..Default::default()
            },
        )?;
        tracing::info!("Asked coordinator for destination proof of {}", hash);
        Ok(StepOutcome::Advanced)
    }
}

#[async_trait]
impl RoleStrategy for MakerArbitration {
    fn role(&self) -> Role {
        Role::Maker
    }

    async fn discover(&self, engine: &EngineContext, tick: &TickContext) -> Result<TickReport, EngineError> {
        let mut report = TickReport::default();

        for maker in &tick.config.maker_list {
            let challenges = match tick.coordinator.maker_need_response(maker).await {
                Ok(challenges) => challenges,
                Err(e) => {
                    tracing::error!("Failed to list challenges for maker {}: {}", maker, e);
                    continue;
                }
            };
            tracing::debug!("{} challenges awaiting maker {}", challenges.len(), maker);

            for challenge in &challenges {
                let result = self.solicit(engine, tick, challenge).await;
                match &result {
                    Ok(StepOutcome::Skipped) => {}
                    Ok(StepOutcome::Advanced) => engine.pace().await,
                    Err(e) => {
                        tracing::error!("Proof solicitation failed for {}: {}", challenge.source_tx_hash, e);
                        engine.pace().await;
                    }
                }
                report.record(&result);
            }
        }

        Ok(report)
    }

    async fn submit_proof(
        &self,
        engine: &EngineContext,
        tick: &TickContext,
        hash: &str,
        record: &ArbitrationRecord,
        proof: &ProofData,
    ) -> Result<H256, EngineError> {
        let source_chain_id = record
            .from_chain_id
            .or(proof.source_chain)
            .ok_or(EncodeError::MissingField("sourceChainId"))?;
        let relations = engine.chain_relations.get(tick.metadata.as_ref()).await?;
        let chain = find_relation(&relations, source_chain_id)
            .ok_or(EngineError::ChainRelationNotFound(source_chain_id))?;

        let challenger = prefer_record(&record.challenger, &proof.challenger, "challenger")?;
        let spv = prefer_record(&record.spv_address, &proof.spv_address, "spvAddress")?;
        let mdc = resolve_mdc(tick, record, proof).await?;

        let verified_source_tx_data = vec![
            U256::from(chain.min_challenge_delay_secs),
            U256::from(chain.max_challenge_delay_secs),
            proof_number(&proof.target_nonce, "targetNonce")?,
            proof_number(&proof.target_chain, "targetChain")?,
            proof_number(&proof.target_from, "targetFrom")?,
            proof_number(&proof.target_token, "targetToken")?,
            proof_number(&proof.target_amount, "targetAmount")?,
            proof_number(&proof.response_makers_hash, "responseMakersHash")?,
            proof_number(&proof.response_time, "responseTime")?,
        ];

        let args = VerifyDestArgs {
            challenger: parse_address(challenger, "challenger")?,
            spv_address: parse_address(spv, "spvAddress")?,
            source_chain_id,
            source_tx_hash: parse_h256(&record_hash(hash, record), "sourceTxHash")?,
            proof: parse_bytes(proof.proof.as_deref().unwrap_or_default(), "proof")?,
            verified_source_tx_data,
            raw_datas: parse_bytes(proof.raw_datas.as_deref().unwrap_or("0x"), "rawDatas")?,
        };
        let data = encode_verify_challenge_dest(&args)?;

        tick.submitter.submit(mdc, U256::zero(), data).await
    }
}

fn proof_number(value: &Option<String>, field: &'static str) -> Result<U256, EncodeError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => parse_u256(v, field),
        _ => Err(EncodeError::MissingField(field)),
    }
}
