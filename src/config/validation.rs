//! Semantic configuration checks, run after deserialization.

use alloy::primitives::Address;
use url::Url;

use crate::chains::chain_spec;
use crate::config::schema::AgentConfig;

/// A single semantic violation, keyed by the offending field.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn violation(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Check everything serde cannot. Returns all violations, not just the first.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = chain_spec(config.chain.default_chain_id) {
        errors.push(violation("chain.default_chain_id", e.to_string()));
    }
    if let Some(url) = &config.chain.rpc_url {
        if url.parse::<Url>().is_err() {
            errors.push(violation("chain.rpc_url", format!("invalid URL '{url}'")));
        }
    }
    if let Some(address) = &config.chain.usdc_address {
        if address.parse::<Address>().is_err() {
            errors.push(violation(
                "chain.usdc_address",
                format!("invalid address '{address}'"),
            ));
        }
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(violation("chain.rpc_timeout_secs", "must be positive"));
    }
    if config.resolver.cache_ttl_secs == 0 {
        errors.push(violation("resolver.cache_ttl_secs", "must be positive"));
    }
    if config.executor.max_attempts == 0 {
        errors.push(violation("executor.max_attempts", "must be at least 1"));
    }
    if config.executor.max_amount <= 0.0 {
        errors.push(violation("executor.max_amount", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
