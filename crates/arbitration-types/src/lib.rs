//! Shared types for the arbitration agent
//!
//! This crate contains:
//! - The persisted arbitration record and its lifecycle status
//! - Wire types returned by the coordinator and the metadata subgraph
//! - MDC contract call encoding
//! - Async traits for the external services the engine talks to

pub mod config;
pub mod error;
pub mod interfaces;
pub mod mdc;
pub mod serde_util;
pub mod types;

pub use config::{ArbitrationConfig, GasOverrides, PrivateKey};
pub use error::{CoordinatorError, EncodeError, LedgerError, MetadataError};
pub use interfaces::{CoordinatorApi, FeeData, Ledger, MetadataSource, ServiceConnector};
pub use types::{
    normalize_hash, record_key, ArbitrationRecord, ArbitrationStatus, ArbitrationTransaction,
    ChainRelation, MakerChallenge, NeedProofSubmission, ProofData, Role,
};

/// Key prefix for arbitration records in the store
pub const ARBITRATION_PREFIX: &str = "arbitrationHash/";

/// Key of the persisted configuration snapshot
pub const CONFIG_KEY: &str = "config/local";

/// Coordinator transaction status meaning "challenged, maker must respond"
pub const MAKER_RESPONSE_PENDING_STATUS: i64 = 99;
