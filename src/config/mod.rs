//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so a minimal (or absent) config works
//! - Validation separates syntactic (serde) from semantic checks
//! - Configuration errors are startup-fatal, never per-request
//! - The signing key is never part of the file; it comes from the
//!   environment (see [`crate::transfer::wallet`])

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AgentConfig;
