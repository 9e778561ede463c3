//! Service interfaces
//!
//! The engine only sees these traits. Production implementations live in
//! `arbitration-client`; tests plug in in-memory doubles.

use crate::config::PrivateKey;
use crate::error::{CoordinatorError, LedgerError, MetadataError};
use crate::types::{
    ArbitrationTransaction, ChainRelation, MakerChallenge, NeedProofSubmission, ProofData, Role,
};
use async_trait::async_trait;
use ethers::types::{transaction::eip2718::TypedTransaction, Address, H256, U256};
use std::sync::Arc;

/// Coordinator REST API
#[async_trait]
pub trait CoordinatorApi: Send + Sync {
    /// `GET transaction/unreimbursedTransactions?startTime&endTime` (unix millis)
    async fn unreimbursed_transactions(
        &self,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> Result<Vec<ArbitrationTransaction>, CoordinatorError>;

    /// `GET proof/{role}Params/{hash}`
    async fn proof_params(&self, role: Role, hash: &str) -> Result<Vec<ProofData>, CoordinatorError>;

    /// `GET transaction/makerNeedResponseTxList?makerAddress`
    async fn maker_need_response(&self, maker: &str) -> Result<Vec<MakerChallenge>, CoordinatorError>;

    /// `GET transaction/status/{hash}`
    async fn transaction_status(&self, hash: &str) -> Result<Option<i64>, CoordinatorError>;

    /// `POST proof/makerAskProof`
    async fn maker_ask_proof(&self, hash: &str) -> Result<(), CoordinatorError>;

    /// `POST proof/needProofSubmission`
    async fn need_proof_submission(&self, request: &NeedProofSubmission) -> Result<(), CoordinatorError>;
}

/// Chain metadata (subgraph)
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// All chain relations
    async fn chain_relations(&self) -> Result<Vec<ChainRelation>, MetadataError>;

    /// MDC contract owned by a maker, if any
    async fn mdc_address(&self, owner: &str) -> Result<Option<Address>, MetadataError>;
}

/// Fee data as reported by the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeData {
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_price: Option<U256>,
}

/// Ledger JSON-RPC plus the agent's signing wallet
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the signing wallet
    fn sender(&self) -> Address;

    fn chain_id(&self) -> u64;

    async fn fee_data(&self) -> Result<FeeData, LedgerError>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, LedgerError>;

    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;

    /// Transaction count including pending transactions
    async fn pending_nonce(&self, address: Address) -> Result<U256, LedgerError>;

    /// Sign with the wallet, broadcast, and return the transaction hash
    async fn sign_and_broadcast(&self, tx: TypedTransaction) -> Result<H256, LedgerError>;
}

/// Builds service clients from configuration values.
///
/// Called at the start of every tick so configuration updates take effect
/// without a restart.
#[async_trait]
pub trait ServiceConnector: Send + Sync {
    fn coordinator(&self, base_url: &str) -> Result<Arc<dyn CoordinatorApi>, CoordinatorError>;

    fn metadata(&self, endpoint: &str) -> Result<Arc<dyn MetadataSource>, MetadataError>;

    async fn ledger(&self, rpc_url: &str, private_key: &PrivateKey)
        -> Result<Arc<dyn Ledger>, LedgerError>;
}
