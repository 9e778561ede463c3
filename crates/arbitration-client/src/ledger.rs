//! Ethereum JSON-RPC ledger
//!
//! Wraps an ethers HTTP provider and the agent's local wallet. Transactions
//! are signed locally and sent raw; the node never holds the key.

use arbitration_types::{FeeData, Ledger, LedgerError, PrivateKey};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{transaction::eip2718::TypedTransaction, Address, BlockNumber, H256, U256};
use ethers::utils::keccak256;

/// Ledger backed by a JSON-RPC node and a local signing key
#[derive(Debug, Clone)]
pub struct EthLedger {
    provider: Provider<Http>,
    wallet: LocalWallet,
    chain_id: u64,
}

impl EthLedger {
    /// Connect to `rpc_url` and bind the wallet to the node's chain id
    pub async fn connect(rpc_url: &str, private_key: &PrivateKey) -> Result<Self, LedgerError> {
        let provider =
            Provider::<Http>::try_from(rpc_url.trim()).map_err(|e| LedgerError::InvalidUrl(e.to_string()))?;
        let wallet = parse_wallet(private_key)?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .as_u64();

        tracing::debug!("Connected to chain {} as {:?}", chain_id, wallet.address());
        Ok(Self {
            provider,
            wallet: wallet.with_chain_id(chain_id),
            chain_id,
        })
    }
}

fn parse_wallet(private_key: &PrivateKey) -> Result<LocalWallet, LedgerError> {
    let raw = private_key.expose();
    raw.strip_prefix("0x")
        .unwrap_or(raw)
        .parse::<LocalWallet>()
        .map_err(|e| LedgerError::InvalidKey(e.to_string()))
}

fn rpc_error(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Rpc(e.to_string())
}

#[async_trait]
impl Ledger for EthLedger {
    fn sender(&self) -> Address {
        self.wallet.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn fee_data(&self) -> Result<FeeData, LedgerError> {
        let gas_price = match self.provider.get_gas_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::debug!("eth_gasPrice unavailable: {}", e);
                None
            }
        };

        let fees = match self.provider.estimate_eip1559_fees(None).await {
            Ok((max_fee_per_gas, max_priority_fee_per_gas)) => FeeData {
                max_fee_per_gas: Some(max_fee_per_gas),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
                gas_price,
            },
            Err(e) => {
                tracing::debug!("EIP-1559 fee estimation unavailable: {}", e);
                FeeData {
                    gas_price,
                    ..Default::default()
                }
            }
        };

        if fees == FeeData::default() {
            return Err(LedgerError::NoFeeData);
        }
        Ok(fees)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, LedgerError> {
        self.provider.estimate_gas(tx, None).await.map_err(rpc_error)
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.provider.get_balance(address, None).await.map_err(rpc_error)
    }

    async fn pending_nonce(&self, address: Address) -> Result<U256, LedgerError> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(rpc_error)
    }

    async fn sign_and_broadcast(&self, mut tx: TypedTransaction) -> Result<H256, LedgerError> {
        tx.set_chain_id(self.chain_id);
        if tx.from().is_none() {
            tx.set_from(self.wallet.address());
        }

        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        let pending = self.provider.send_raw_transaction(raw).await.map_err(rpc_error)?;
        if pending.tx_hash() != hash {
            tracing::warn!(
                "Node reported hash {:?}, locally computed {:?}",
                pending.tx_hash(),
                hash
            );
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_accepts_prefixed_and_bare_keys() {
        let bare = parse_wallet(&PrivateKey::new(DEV_KEY)).unwrap();
        let prefixed = parse_wallet(&PrivateKey::new(format!("0x{}", DEV_KEY))).unwrap();
        assert_eq!(bare.address(), prefixed.address());
        assert_eq!(
            format!("{:?}", bare.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            parse_wallet(&PrivateKey::new("not-a-key")),
            Err(LedgerError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let result = EthLedger::connect("not a url", &PrivateKey::new(DEV_KEY)).await;
        assert!(matches!(result, Err(LedgerError::InvalidUrl(_))));
    }
}
