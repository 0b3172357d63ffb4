//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::ens::FailurePolicy;

/// Root configuration for the payment agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Chain connection settings.
    pub chain: ChainSettings,

    /// ENS resolution settings.
    pub resolver: ResolverSettings,

    /// Custodial executor settings.
    pub executor: ExecutorSettings,
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainSettings {
    /// Chain used when a request does not name one.
    pub default_chain_id: u64,

    /// JSON-RPC endpoint override for the default chain. Other chains use
    /// the built-in endpoints.
    pub rpc_url: Option<String>,

    /// USDC contract override for the default chain.
    pub usdc_address: Option<String>,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            default_chain_id: 11155111,
            rpc_url: None,
            usdc_address: None,
            rpc_timeout_secs: 10,
        }
    }
}

/// ENS resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: u64,

    /// Allow address → name lookups.
    pub enable_reverse_resolution: bool,

    /// What to do with transient lookup failures.
    pub failure_policy: FailurePolicy,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            enable_reverse_resolution: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Custodial executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Enable the custodial path. Requires the signing key in the
    /// environment at startup.
    pub enabled: bool,

    /// Maximum submission attempts, counting the first try. Only transient
    /// failures are retried.
    pub max_attempts: u32,

    /// Base delay between submission attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Safety margin added to the gas estimate, in percent.
    pub gas_margin_percent: u64,

    /// Minimum native balance (wei) considered sufficient for gas.
    pub min_gas_balance_wei: u64,

    /// Policy ceiling for a single transfer, in whole tokens.
    pub max_amount: f64,

    /// How long to wait for a confirmation, in seconds.
    pub confirmation_timeout_secs: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            retry_delay_ms: 2000,
            gas_margin_percent: 20,
            min_gas_balance_wei: 1_000_000_000_000_000, // 0.001 ETH
            max_amount: 1000.0,
            confirmation_timeout_secs: 120,
        }
    }
}
