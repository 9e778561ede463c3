//! Transaction Submitter
//!
//! Builds, prices, signs and broadcasts MDC calls from the agent wallet.
//!
//! Pricing prefers EIP-1559 fees and falls back to a legacy gas price. An
//! operator `gas_price` override without EIP-1559 overrides forces legacy
//! pricing; otherwise overrides win field by field. Before anything is signed the
//! wallet balance must cover `gas_limit * priority_fee` (or `* gas_price`).

use crate::error::EngineError;
use arbitration_types::{FeeData, GasOverrides, Ledger};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, TransactionRequest,
    H256, U256,
};
use std::sync::Arc;

/// Chosen fee model for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePricing {
    /// Type-2 transaction
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    /// Legacy transaction
    Legacy { gas_price: U256 },
}

impl FeePricing {
    /// Pick the fee model from queried fee data and operator overrides
    pub fn select(fees: &FeeData, overrides: &GasOverrides) -> Result<Self, EngineError> {
        if let Some(gas_price) = overrides.gas_price {
            if overrides.max_fee_per_gas.is_none() && overrides.max_priority_fee_per_gas.is_none() {
                return Ok(FeePricing::Legacy { gas_price });
            }
        }

        let max_fee = overrides.max_fee_per_gas.or(fees.max_fee_per_gas);
        let max_priority = overrides
            .max_priority_fee_per_gas
            .or(fees.max_priority_fee_per_gas);

        if let (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) = (max_fee, max_priority) {
            return Ok(FeePricing::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            });
        }

        match overrides.gas_price.or(fees.gas_price) {
            Some(gas_price) => Ok(FeePricing::Legacy { gas_price }),
            None => Err(EngineError::Submission("ledger reported no usable fee data".to_string())),
        }
    }

    /// Per-gas price used for the balance check
    pub fn budget_price(&self) -> U256 {
        match self {
            FeePricing::Eip1559 {
                max_priority_fee_per_gas,
                ..
            } => *max_priority_fee_per_gas,
            FeePricing::Legacy { gas_price } => *gas_price,
        }
    }

    /// Unsigned request carrying this pricing
    pub fn build(&self, from: Address, to: Address, value: U256, data: Bytes, chain_id: u64) -> TypedTransaction {
        match *self {
            FeePricing::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Eip1559TransactionRequest::new()
                .from(from)
                .to(to)
                .value(value)
                .data(data)
                .max_fee_per_gas(max_fee_per_gas)
                .max_priority_fee_per_gas(max_priority_fee_per_gas)
                .chain_id(chain_id)
                .into(),
            FeePricing::Legacy { gas_price } => TransactionRequest::new()
                .from(from)
                .to(to)
                .value(value)
                .data(data)
                .gas_price(gas_price)
                .chain_id(chain_id)
                .into(),
        }
    }
}

/// Signs and sends transactions for the agent wallet
#[derive(Clone)]
pub struct TransactionSubmitter {
    ledger: Arc<dyn Ledger>,
    overrides: GasOverrides,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>, overrides: GasOverrides) -> Self {
        Self { ledger, overrides }
    }

    /// Agent wallet address
    pub fn sender(&self) -> Address {
        self.ledger.sender()
    }

    /// Submit a call and return its transaction hash.
    ///
    /// Fails with `InsufficientBalance` without signing when the wallet cannot
    /// cover the gas budget. Only a failure of the final sign-and-send step
    /// is reported as `Broadcast`; every other error means nothing was sent.
    pub async fn submit(&self, to: Address, value: U256, data: Bytes) -> Result<H256, EngineError> {
        let from = self.ledger.sender();
        let fees = self.ledger.fee_data().await?;
        let pricing = FeePricing::select(&fees, &self.overrides)?;
        let mut tx = pricing.build(from, to, value, data, self.ledger.chain_id());

        let gas_limit = match self.overrides.gas_limit {
            Some(gas_limit) => gas_limit,
            None => self.ledger.estimate_gas(&tx).await?,
        };
        tx.set_gas(gas_limit);

        let required = gas_limit.saturating_mul(pricing.budget_price());
        let balance = self.ledger.balance(from).await?;
        if balance < required {
            tracing::error!(
                "Insufficient balance for {:?}: have {}, need {}",
                from,
                balance,
                required
            );
            return Err(EngineError::InsufficientBalance { balance, required });
        }

        let nonce = self.ledger.pending_nonce(from).await?;
        tx.set_nonce(nonce);

        tracing::debug!(
            "Submitting to {:?} with nonce {} gas {} pricing {:?}",
            to,
            nonce,
            gas_limit,
            pricing
        );

        self.ledger
            .sign_and_broadcast(tx)
            .await
            .map_err(|e| EngineError::Broadcast(e.to_string()))
    }
}
