//! Arbitration data model
//!
//! Field names follow the coordinator's camelCase JSON so records and wire
//! payloads round-trip without translation tables.

use crate::serde_util::{opt_string, opt_u64, truthy};
use crate::ARBITRATION_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a transaction hash for use as a store key
pub fn normalize_hash(hash: &str) -> String {
    hash.trim().to_lowercase()
}

/// Full store key for the record of a transaction hash
pub fn record_key(hash: &str) -> String {
    format!("{}{}", ARBITRATION_PREFIX, normalize_hash(hash))
}

/// Which side of the dispute this agent acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user: files challenges and proves the source transaction
    User,
    /// Liquidity maker: answers challenges by proving the destination transaction
    Maker,
}

impl Role {
    /// Coordinator path segment for the proof parameters of this role
    pub fn proof_params_path(&self) -> &'static str {
        match self {
            Role::User => "verifyChallengeSourceParams",
            Role::Maker => "verifyChallengeDestParams",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Maker => write!(f, "maker"),
        }
    }
}

/// Lifecycle phase of an arbitration record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArbitrationStatus {
    /// Placeholder written before the challenge is sent
    Detected,
    /// Challenge is on-chain, proof not yet requested
    ChallengeSubmitted,
    /// Proof requested from the coordinator and awaited
    ProofRequested,
    /// Proof relayed to the ledger (terminal)
    ProofSubmitted,
}

/// One persisted record per distinct transaction hash.
///
/// Every field is optional: a value of this type doubles as a partial update
/// that is shallow-merged into the stored record, and absent fields are
/// neither serialized nor overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_chain: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdc_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spv_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ArbitrationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_need_proof: Option<bool>,
    /// Set when the last challenge attempt failed before anything was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_challenge_tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_proof_tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_datas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rlp_rule_bytes: Option<String>,
    /// Unix seconds of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl ArbitrationRecord {
    /// True while a proof has been requested and not yet relayed
    pub fn needs_proof(&self) -> bool {
        self.is_need_proof.unwrap_or(false)
    }

    /// A placeholder whose challenge provably never reached the ledger
    pub fn can_retry_challenge(&self) -> bool {
        self.status == Some(ArbitrationStatus::Detected) && self.challenge_retryable.unwrap_or(false)
    }

    /// Partial update that only moves the status
    pub fn with_status(status: ArbitrationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Candidate transaction reported by the coordinator as not reimbursed in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationTransaction {
    #[serde(default)]
    pub ebc_address: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub source_maker: Option<String>,
    /// Unix seconds
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_tx_time: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_chain_id: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_tx_block_num: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_tx_index: Option<u64>,
    #[serde(default)]
    pub source_tx_hash: Option<String>,
    #[serde(default)]
    pub rule_key: Option<String>,
    #[serde(default)]
    pub freeze_token: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub freeze_amount1: Option<String>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub parent_node_num_of_target_node: Option<u64>,
    #[serde(default)]
    pub spv_address: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub min_challenge_deposit_amount: Option<String>,
}

/// Per-chain arbitration timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRelation {
    pub id: u64,
    pub native_token: String,
    /// Earliest a challenge may be filed, seconds after the source tx
    pub min_challenge_delay_secs: u64,
    /// Latest a challenge may be filed, seconds after the source tx
    pub max_challenge_delay_secs: u64,
    pub min_verify_dest_delay_secs: u64,
    pub max_verify_dest_delay_secs: u64,
    pub batch_limit: u64,
    pub enable_timestamp: u64,
    pub spvs: Vec<String>,
}

/// Proof candidate returned by `proof/{role}Params/{hash}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    #[serde(default, deserialize_with = "truthy")]
    pub status: bool,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub proof: Option<String>,
    #[serde(default)]
    pub raw_datas: Option<String>,
    #[serde(default)]
    pub rlp_rule_bytes: Option<String>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_chain: Option<u64>,
    #[serde(default)]
    pub source_maker: Option<String>,
    #[serde(default)]
    pub spv_address: Option<String>,
    #[serde(default)]
    pub mdc_address: Option<String>,
    #[serde(default)]
    pub challenger: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub target_nonce: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub target_chain: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub target_from: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub target_token: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub target_amount: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub response_makers_hash: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub response_time: Option<String>,
}

impl ProofData {
    /// A candidate is usable once flagged ready and carrying proof bytes
    pub fn is_ready(&self) -> bool {
        self.status && self.proof.as_deref().map_or(false, |p| !p.is_empty())
    }
}

/// Challenge a maker must respond to, from `makerNeedResponseTxList`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakerChallenge {
    pub source_tx_hash: String,
    #[serde(default)]
    pub verify_pass_challenger: Option<String>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub source_chain_id: Option<u64>,
    #[serde(default)]
    pub mdc_address: Option<String>,
    #[serde(default)]
    pub spv_address: Option<String>,
}

/// Body of `POST proof/needProofSubmission`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedProofSubmission {
    pub is_source: u8,
    pub chain_id: u64,
    pub hash: String,
    pub mdc_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_is_case_insensitive() {
        assert_eq!(record_key("0xABCdef"), record_key("0xabcDEF"));
        assert_eq!(record_key(" 0xABC "), "arbitrationHash/0xabc");
    }

    #[test]
    fn test_partial_record_skips_absent_fields() {
        let patch = ArbitrationRecord {
            is_need_proof: Some(false),
            status: Some(ArbitrationStatus::Detected),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "isNeedProof": false, "status": "DETECTED" })
        );
    }

    #[test]
    fn test_transaction_accepts_stringly_numbers() {
        let tx: ArbitrationTransaction = serde_json::from_str(
            r#"{"sourceTxHash":"0xAA","sourceTxTime":"1700000000","sourceChainId":5,"freezeAmount1":1000}"#,
        )
        .unwrap();
        assert_eq!(tx.source_tx_time, Some(1_700_000_000));
        assert_eq!(tx.source_chain_id, Some(5));
        assert_eq!(tx.freeze_amount1.as_deref(), Some("1000"));
        assert_eq!(tx.rule_key, None);
    }

    #[test]
    fn test_proof_readiness() {
        let mut proof = ProofData {
            status: true,
            ..Default::default()
        };
        assert!(!proof.is_ready());
        proof.proof = Some("0x01".to_string());
        assert!(proof.is_ready());
        proof.status = false;
        assert!(!proof.is_ready());
    }

    #[test]
    fn test_role_paths() {
        assert_eq!(Role::User.proof_params_path(), "verifyChallengeSourceParams");
        assert_eq!(Role::Maker.proof_params_path(), "verifyChallengeDestParams");
    }
}
