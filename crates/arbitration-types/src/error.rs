//! Errors raised at the external service boundaries

use thiserror::Error;

/// Coordinator REST API errors
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("coordinator request failed: {0}")]
    Transport(String),

    #[error("coordinator returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid coordinator response: {0}")]
    Decode(String),

    #[error("invalid coordinator url: {0}")]
    InvalidUrl(String),
}

/// Metadata (subgraph) query errors
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("metadata query failed: {0}")]
    Transport(String),

    #[error("metadata query returned errors: {0}")]
    Query(String),

    #[error("invalid metadata response: {0}")]
    Decode(String),
}

/// Ledger JSON-RPC and signing errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger rpc error: {0}")]
    Rpc(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid rpc url: {0}")]
    InvalidUrl(String),

    #[error("no fee data available from ledger")]
    NoFeeData,
}

/// Contract call encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{0} not found")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("abi error: {0}")]
    Abi(String),
}
