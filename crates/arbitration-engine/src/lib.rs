//! Arbitration Engine - lifecycle core of the arbitration agent
//!
//! - Durable record store keyed by normalized transaction hash
//! - Chain relation cache and challenge eligibility
//! - Fee-priced, balance-gated transaction submission
//! - User and maker lifecycle strategies driven by a try-lock scheduler

pub mod chain_relations;
pub mod clock;
pub mod conditions;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod maker;
pub mod scheduler;
pub mod store;
pub mod submitter;
pub mod user;

#[cfg(test)]
mod tests;

pub use chain_relations::{CacheStats, ChainRelationCache, CHAIN_RELATION_TTL};
pub use clock::{Clock, SystemClock};
pub use conditions::is_eligible;
pub use config::{wallet_address, ConfigManager, ConfigUpdate};
pub use error::{ConfigError, EngineError, StoreError};
pub use lifecycle::{EngineContext, LifecycleConfig, LifecycleCoordinator, RoleStrategy, TickContext, TickReport};
pub use maker::MakerArbitration;
pub use scheduler::{JobGuard, Scheduler, SchedulerConfig, TickOutcome};
pub use store::ArbitrationStore;
pub use submitter::{FeePricing, TransactionSubmitter};
pub use user::UserArbitration;
