//! Transfer construction and execution.
//!
//! Two paths with distinct trust boundaries, kept as separate interfaces:
//!
//! - `planner` — non-custodial: produces an [`UnsignedTransfer`] proposal for
//!   an external signer, using the shared signer-less [`crate::chains::ChainRegistry`].
//! - `executor` — custodial: holds one local key, runs aggregated pre-flight
//!   checks, submits with a gas safety margin, and confirms, always reporting
//!   a [`TransferOutcome`].

pub mod executor;
pub mod planner;
pub mod types;
pub mod wallet;

pub use executor::TransferExecutor;
pub use planner::TransferPlanner;
pub use types::{PlanError, PreflightReport, TransferOutcome, TxStatus, UnsignedTransfer};
pub use wallet::LocalWallet;
