//! Engine errors

use arbitration_types::{CoordinatorError, EncodeError, LedgerError, MetadataError};
use ethers::types::U256;
use thiserror::Error;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. Fatal for the tick that hits them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("private key not configured")]
    MissingPrivateKey,

    #[error("rpc url not configured")]
    MissingRpcUrl,

    #[error("coordinator url not configured")]
    MissingCoordinatorUrl,

    #[error("subgraph endpoint not configured")]
    MissingSubgraphUrl,

    #[error("keystore secret not configured")]
    MissingSecret,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("keystore error: {0}")]
    Keystore(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while driving the arbitration lifecycle
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: U256, required: U256 },

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("chain relation not found for chain {0}")]
    ChainRelationNotFound(u64),

    #[error("no MDC found for maker {0}")]
    MdcNotFound(String),
}

impl EngineError {
    /// Configuration errors abort the whole tick rather than one item
    pub fn is_config(&self) -> bool {
        matches!(self, EngineError::Config(_))
    }

    /// The transaction may have reached the ledger
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, EngineError::Broadcast(_))
    }
}
