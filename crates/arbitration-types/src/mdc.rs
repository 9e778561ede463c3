//! MDC contract call encoding
//!
//! Call data for `challenge`, `verifyChallengeSource` and
//! `verifyChallengeDest`, built from coordinator payloads.

use crate::error::EncodeError;
use crate::types::ArbitrationTransaction;
use ethers::abi::{parse_abi, Token};
use ethers::types::{Address, Bytes, H256, U256};
use std::str::FromStr;

const MDC_ABI: &[&str] = &[
    "function challenge(uint64,uint64,uint64,uint64,bytes32,bytes32,address,uint256,uint256) external payable",
    "function verifyChallengeSource(address,address,uint64,bytes,bytes,bytes) external",
    "function verifyChallengeDest(address,address,uint64,bytes32,bytes,uint256[],bytes) external",
];

/// Arguments of `challenge`
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeArgs {
    pub source_tx_time: u64,
    pub source_chain_id: u64,
    pub source_tx_block_num: u64,
    pub source_tx_index: u64,
    pub source_tx_hash: H256,
    pub rule_key: H256,
    pub freeze_token: Address,
    pub freeze_amount1: U256,
    pub parent_node_num_of_target_node: u64,
}

impl TryFrom<&ArbitrationTransaction> for ChallengeArgs {
    type Error = EncodeError;

    fn try_from(tx: &ArbitrationTransaction) -> Result<Self, Self::Error> {
        let source_tx_time = tx.source_tx_time.ok_or(EncodeError::MissingField("sourceTxTime"))?;
        let source_chain_id = tx.source_chain_id.ok_or(EncodeError::MissingField("sourceChainId"))?;
        let source_tx_block_num = tx
            .source_tx_block_num
            .ok_or(EncodeError::MissingField("sourceTxBlockNum"))?;
        let source_tx_index = tx.source_tx_index.ok_or(EncodeError::MissingField("sourceTxIndex"))?;
        let source_tx_hash = required(&tx.source_tx_hash, "sourceTxHash")?;
        let rule_key = required(&tx.rule_key, "ruleKey")?;
        let freeze_token = required(&tx.freeze_token, "freezeToken")?;
        let freeze_amount1 = required(&tx.freeze_amount1, "freezeAmount1")?;

        Ok(Self {
            source_tx_time,
            source_chain_id,
            source_tx_block_num,
            source_tx_index,
            source_tx_hash: parse_h256(source_tx_hash, "sourceTxHash")?,
            rule_key: parse_h256(rule_key, "ruleKey")?,
            freeze_token: parse_address(freeze_token, "freezeToken")?,
            freeze_amount1: parse_u256(freeze_amount1, "freezeAmount1")?,
            parent_node_num_of_target_node: tx.parent_node_num_of_target_node.unwrap_or(0),
        })
    }
}

/// Arguments of `verifyChallengeSource`
#[derive(Debug, Clone, PartialEq)]
pub struct VerifySourceArgs {
    pub challenger: Address,
    pub spv_address: Address,
    pub source_chain_id: u64,
    pub proof: Bytes,
    pub raw_datas: Bytes,
    pub rlp_rule_bytes: Bytes,
}

/// Arguments of `verifyChallengeDest`
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyDestArgs {
    pub challenger: Address,
    pub spv_address: Address,
    pub source_chain_id: u64,
    pub source_tx_hash: H256,
    pub proof: Bytes,
    pub verified_source_tx_data: Vec<U256>,
    pub raw_datas: Bytes,
}

pub fn encode_challenge(args: &ChallengeArgs) -> Result<Bytes, EncodeError> {
    encode_call(
        "challenge",
        &[
            Token::Uint(args.source_tx_time.into()),
            Token::Uint(args.source_chain_id.into()),
            Token::Uint(args.source_tx_block_num.into()),
            Token::Uint(args.source_tx_index.into()),
            Token::FixedBytes(args.source_tx_hash.as_bytes().to_vec()),
            Token::FixedBytes(args.rule_key.as_bytes().to_vec()),
            Token::Address(args.freeze_token),
            Token::Uint(args.freeze_amount1),
            Token::Uint(args.parent_node_num_of_target_node.into()),
        ],
    )
}

pub fn encode_verify_challenge_source(args: &VerifySourceArgs) -> Result<Bytes, EncodeError> {
    encode_call(
        "verifyChallengeSource",
        &[
            Token::Address(args.challenger),
            Token::Address(args.spv_address),
            Token::Uint(args.source_chain_id.into()),
            Token::Bytes(args.proof.to_vec()),
            Token::Bytes(args.raw_datas.to_vec()),
            Token::Bytes(args.rlp_rule_bytes.to_vec()),
        ],
    )
}

pub fn encode_verify_challenge_dest(args: &VerifyDestArgs) -> Result<Bytes, EncodeError> {
    encode_call(
        "verifyChallengeDest",
        &[
            Token::Address(args.challenger),
            Token::Address(args.spv_address),
            Token::Uint(args.source_chain_id.into()),
            Token::FixedBytes(args.source_tx_hash.as_bytes().to_vec()),
            Token::Bytes(args.proof.to_vec()),
            Token::Array(
                args.verified_source_tx_data
                    .iter()
                    .map(|v| Token::Uint(*v))
                    .collect(),
            ),
            Token::Bytes(args.raw_datas.to_vec()),
        ],
    )
}

fn encode_call(name: &str, tokens: &[Token]) -> Result<Bytes, EncodeError> {
    let abi = parse_abi(MDC_ABI).map_err(|e| EncodeError::Abi(e.to_string()))?;
    let function = abi.function(name).map_err(|e| EncodeError::Abi(e.to_string()))?;
    let data = function
        .encode_input(tokens)
        .map_err(|e| EncodeError::Abi(e.to_string()))?;
    Ok(Bytes::from(data))
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, EncodeError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EncodeError::MissingField(field)),
    }
}

pub fn parse_address(value: &str, field: &'static str) -> Result<Address, EncodeError> {
    Address::from_str(value.trim()).map_err(|e| EncodeError::Invalid {
        field,
        reason: e.to_string(),
    })
}

pub fn parse_h256(value: &str, field: &'static str) -> Result<H256, EncodeError> {
    H256::from_str(value.trim()).map_err(|e| EncodeError::Invalid {
        field,
        reason: e.to_string(),
    })
}

pub fn parse_bytes(value: &str, field: &'static str) -> Result<Bytes, EncodeError> {
    Bytes::from_str(value.trim()).map_err(|e| EncodeError::Invalid {
        field,
        reason: e.to_string(),
    })
}

/// Decimal, or hex with a `0x` prefix
pub fn parse_u256(value: &str, field: &'static str) -> Result<U256, EncodeError> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| format!("{:?}", e)),
        None => U256::from_dec_str(value).map_err(|e| format!("{:?}", e)),
    };
    parsed.map_err(|reason| EncodeError::Invalid { field, reason })
}
