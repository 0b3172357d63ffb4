//! ENS Payment Agent Library
//!
//! Turns a free-text payment instruction ("pay 5 usdc to alice.eth") into an
//! on-chain USDC transfer:
//!
//! ```text
//! instruction text
//!     → intent (parse + validate)
//!     → ens (resolve name, TTL cache)
//!     → chains (balance via cached per-chain bindings)
//!     → transfer::planner (unsigned descriptor, non-custodial)
//!       or transfer::executor (sign, pre-flight, submit, confirm)
//! ```

pub mod agent;
pub mod chains;
pub mod config;
pub mod ens;
pub mod intent;
pub mod transfer;

pub use agent::{Agent, AgentReply};
pub use config::schema::AgentConfig;
