//! Chain client subsystem.
//!
//! # Data Flow
//! ```text
//! static chain table (types.rs)
//!     → registry.rs (lazy per-chain providers, per-(chain, mode) bindings)
//!     → token.rs (ERC-20 binding: balance, decimals, calldata, gas)
//! ```
//!
//! # Constraints
//! - Providers and bindings are created once per key and reused
//! - Every RPC call carries an explicit timeout
//! - Base-unit conversion always goes through the token's declared decimals

pub mod registry;
pub mod token;
pub mod types;

pub use registry::ChainRegistry;
pub use token::TokenBinding;
pub use types::{chain_spec, BindingMode, ChainError, ChainResult, ChainSpec};
