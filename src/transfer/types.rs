//! Transfer types and error definitions.

use alloy::primitives::{Address, Bytes, U256};
use serde::Serialize;
use thiserror::Error;

use crate::chains::ChainError;

/// An unsigned ERC-20 transfer proposal handed to an external signer.
///
/// `value` is always zero: the economic transfer rides entirely in the
/// calldata; no native currency moves.
#[derive(Debug, Clone, Serialize)]
pub struct UnsignedTransfer {
    /// The token contract, not the payment recipient.
    pub to: Address,
    /// ABI-encoded `transfer(recipient, baseUnits)` call.
    pub data: Bytes,
    pub value: U256,
    /// Estimated gas for the call.
    pub gas_limit: u64,
    pub chain_id: u64,
}

/// Errors from the non-custodial planning path.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The holder cannot fund the transfer; no descriptor is produced.
    #[error("insufficient balance: have {available} USDC, need {requested} USDC")]
    InsufficientBalance {
        available: String,
        requested: String,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Aggregated pre-flight verdict. Checks never short-circuit; every
/// independent failure is listed.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PreflightReport {
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Uniform result of a custodial transfer attempt.
///
/// Populated for every outcome; `elapsed_ms` is always present and raw
/// transport failures never escape this boundary unwrapped.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub succeeded: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub elapsed_ms: u64,
    pub explorer_url: Option<String>,
}

impl TransferOutcome {
    pub fn failure(error: String, elapsed_ms: u64) -> Self {
        Self {
            succeeded: false,
            tx_hash: None,
            error: Some(error),
            block_number: None,
            gas_used: None,
            elapsed_ms,
            explorer_url: None,
        }
    }
}

/// Read-only status of an already-submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success {
        block_number: u64,
        gas_used: u64,
        explorer_url: String,
    },
    Failed {
        block_number: Option<u64>,
        explorer_url: String,
    },
    Error {
        error: String,
    },
}
