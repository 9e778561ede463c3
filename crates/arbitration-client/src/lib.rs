//! Arbitration Client - production implementations of the service seams
//!
//! Handles communication with the outside world:
//! - Coordinator REST API over reqwest
//! - Chain metadata from the MDC subgraph (GraphQL)
//! - Ethereum JSON-RPC with a local signing wallet

pub mod connector;
pub mod coordinator;
pub mod ledger;
pub mod subgraph;

pub use connector::HttpConnector;
pub use coordinator::HttpCoordinator;
pub use ledger::EthLedger;
pub use subgraph::SubgraphClient;

use std::time::Duration;

/// Timeout applied to every coordinator and subgraph request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for coordinator and subgraph requests
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
