//! Command-line and environment configuration

use arbitration_engine::ConfigUpdate;
use arbitration_types::{mdc::parse_u256, PrivateKey};
use clap::Args;
use ethers::types::U256;

/// Configuration values accepted from flags or the environment
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Hex private key of the agent wallet
    #[arg(long, env = "ARBITRATION_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Ledger JSON-RPC endpoint
    #[arg(long, env = "ARBITRATION_RPC")]
    pub rpc_url: Option<String>,

    /// Coordinator base URL
    #[arg(long, env = "ARBITRATION_HOST")]
    pub coordinator_url: Option<String>,

    /// MDC subgraph endpoint
    #[arg(long, env = "SUBGRAPH_ENDPOINT")]
    pub subgraph_url: Option<String>,

    /// Maker addresses served in maker mode
    #[arg(long, env = "ARBITRATION_MAKERS", value_delimiter = ',')]
    pub makers: Option<Vec<String>>,

    /// Fixed gas limit instead of estimation
    #[arg(long, env = "ARBITRATION_GAS_LIMIT", value_parser = parse_amount)]
    pub gas_limit: Option<U256>,

    #[arg(long, env = "ARBITRATION_MAX_FEE_PER_GAS", value_parser = parse_amount)]
    pub max_fee_per_gas: Option<U256>,

    #[arg(long, env = "ARBITRATION_MAX_PRIORITY_FEE_PER_GAS", value_parser = parse_amount)]
    pub max_priority_fee_per_gas: Option<U256>,

    /// Legacy gas price; without EIP-1559 overrides it forces legacy pricing
    #[arg(long, env = "ARBITRATION_GAS_PRICE", value_parser = parse_amount)]
    pub gas_price: Option<U256>,
}

fn parse_amount(value: &str) -> Result<U256, String> {
    parse_u256(value, "amount").map_err(|e| e.to_string())
}

/// Treat empty strings as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ConfigArgs {
    pub fn into_update(self) -> ConfigUpdate {
        ConfigUpdate {
            private_key: non_empty(self.private_key).map(PrivateKey::new),
            rpc_url: non_empty(self.rpc_url),
            coordinator_url: non_empty(self.coordinator_url),
            subgraph_url: non_empty(self.subgraph_url),
            maker_list: self.makers,
            gas_limit: self.gas_limit,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            gas_price: self.gas_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn test_flags_map_to_update() {
        let cli = TestCli::try_parse_from([
            "test",
            "--rpc-url",
            "http://localhost:8545",
            "--makers",
            "0xAA,0xbb",
            "--gas-limit",
            "0x5208",
            "--max-fee-per-gas",
            "30000000000",
        ])
        .unwrap();
        let update = cli.config.into_update();

        assert_eq!(update.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(update.maker_list, Some(vec!["0xAA".to_string(), "0xbb".to_string()]));
        assert_eq!(update.gas_limit, Some(U256::from(21_000)));
        assert_eq!(update.max_fee_per_gas, Some(U256::from(30_000_000_000u64)));
        assert!(update.private_key.is_none());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let update = ConfigArgs {
            rpc_url: Some("  ".to_string()),
            private_key: Some(String::new()),
            ..Default::default()
        }
        .into_update();
        assert!(update.is_empty());
    }

    #[test]
    fn test_bad_amount_rejected() {
        assert!(TestCli::try_parse_from(["test", "--gas-price", "lots"]).is_err());
    }
}
