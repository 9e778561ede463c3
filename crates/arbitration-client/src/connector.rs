//! Production service connector

use crate::{EthLedger, HttpCoordinator, SubgraphClient};
use arbitration_types::{
    CoordinatorApi, CoordinatorError, Ledger, LedgerError, MetadataError, MetadataSource, PrivateKey,
    ServiceConnector,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Builds HTTP/JSON-RPC clients from configuration values
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

#[async_trait]
impl ServiceConnector for HttpConnector {
    fn coordinator(&self, base_url: &str) -> Result<Arc<dyn CoordinatorApi>, CoordinatorError> {
        Ok(Arc::new(HttpCoordinator::new(base_url)?))
    }

    fn metadata(&self, endpoint: &str) -> Result<Arc<dyn MetadataSource>, MetadataError> {
        Ok(Arc::new(SubgraphClient::new(endpoint)?))
    }

    async fn ledger(&self, rpc_url: &str, private_key: &PrivateKey) -> Result<Arc<dyn Ledger>, LedgerError> {
        Ok(Arc::new(EthLedger::connect(rpc_url, private_key).await?))
    }
}
