//! Intent types and error definitions.

use serde::Serialize;
use thiserror::Error;

/// The only token the agent transfers.
pub const TOKEN_SYMBOL: &str = "USDC";

/// Policy ceiling for a single transfer, in whole tokens (inclusive).
pub const MAX_AMOUNT: f64 = 1000.0;

/// USDC carries six decimals; reject literals that cannot be represented.
pub const MAX_FRACTIONAL_DIGITS: usize = 6;

/// A validated payment instruction. Only constructed by the parser and
/// immutable afterwards; an intent that failed validation never exists.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    /// Amount in whole tokens.
    pub amount: f64,
    /// The amount exactly as written, used for lossless base-unit conversion.
    pub amount_literal: String,
    /// Always [`TOKEN_SYMBOL`].
    pub token: &'static str,
    /// Recipient ENS name, normalized to lower case.
    pub recipient: String,
    /// The untouched original instruction, kept for diagnostics.
    pub raw_text: String,
}

/// Why an instruction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    /// No phrasing template matched.
    #[error("could not parse payment command: '{0}'")]
    Unrecognized(String),

    /// A template matched but the amount failed policy.
    #[error(
        "invalid amount '{0}': must be between 0.000001 and 1000 USDC with at most 6 decimal places"
    )]
    InvalidAmount(String),

    /// A template matched but the recipient name failed policy.
    #[error(
        "invalid ENS name '{0}': must be a .eth name with a 3-63 character label of alphanumerics and internal hyphens"
    )]
    InvalidName(String),
}
