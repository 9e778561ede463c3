//! Agent configuration snapshot

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet private key (hex). Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***)")
    }
}

/// Operator-supplied fee settings that take precedence over queried values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

/// Immutable configuration snapshot.
///
/// Owned by the engine's `ConfigManager`; consumers hold an `Arc` to the
/// snapshot they were handed and never mutate it.
#[derive(Debug, Clone, Default)]
pub struct ArbitrationConfig {
    pub private_key: Option<PrivateKey>,
    /// Ledger JSON-RPC endpoint
    pub rpc_url: Option<String>,
    /// Coordinator REST base URL
    pub coordinator_url: Option<String>,
    /// Metadata subgraph endpoint
    pub subgraph_url: Option<String>,
    /// Maker addresses this agent answers challenges for
    pub maker_list: Vec<String>,
    pub gas: GasOverrides,
}
