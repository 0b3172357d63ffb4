//! Chain-specific types, the static chain table, and error definitions.

use thiserror::Error;

/// Static description of a supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSpec {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Human-readable network name.
    pub display_name: &'static str,
    /// Default JSON-RPC endpoint.
    pub rpc_url: &'static str,
    /// USDC token contract on this network.
    pub usdc_address: &'static str,
    /// Base URL for transaction links, tx hash appended.
    pub explorer_tx_base: &'static str,
}

/// Networks the agent knows about. Anything else is a configuration error.
pub const SUPPORTED_CHAINS: &[ChainSpec] = &[
    ChainSpec {
        chain_id: 1,
        display_name: "Ethereum",
        rpc_url: "https://eth.llamarpc.com",
        usdc_address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        explorer_tx_base: "https://etherscan.io/tx/",
    },
    ChainSpec {
        chain_id: 137,
        display_name: "Polygon",
        rpc_url: "https://polygon.llamarpc.com",
        usdc_address: "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174",
        explorer_tx_base: "https://polygonscan.com/tx/",
    },
    ChainSpec {
        chain_id: 11155111,
        display_name: "Sepolia",
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
        usdc_address: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
        explorer_tx_base: "https://sepolia.etherscan.io/tx/",
    },
];

/// Look up a chain by id.
pub fn chain_spec(chain_id: u64) -> ChainResult<&'static ChainSpec> {
    SUPPORTED_CHAINS
        .iter()
        .find(|spec| spec.chain_id == chain_id)
        .ok_or(ChainError::UnsupportedChain(chain_id))
}

/// How a token binding is connected: with or without a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// Provider only; can read state and estimate gas, never submit.
    ReadOnly,
    /// Wallet-backed provider; can submit transactions.
    Signing,
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Chain id not present in the static table.
    #[error("unsupported chain id {0}")]
    UnsupportedChain(u64),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid RPC endpoint URL.
    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid on-chain address string.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// Signing was requested but no signer is configured.
    #[error("signer error: {0}")]
    Signer(String),

    /// Decimal ↔ base-unit conversion failed.
    #[error("unit conversion error: {0}")]
    Units(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn known_chains_resolve() {
        assert_eq!(chain_spec(1).unwrap().display_name, "Ethereum");
        assert_eq!(chain_spec(137).unwrap().display_name, "Polygon");
        assert_eq!(chain_spec(11155111).unwrap().display_name, "Sepolia");
    }

    #[test]
    fn unknown_chain_is_an_error() {
        let err = chain_spec(42).unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedChain(42)));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn table_entries_are_well_formed() {
        for spec in SUPPORTED_CHAINS {
            assert!(spec.usdc_address.parse::<Address>().is_ok());
            assert!(spec.rpc_url.parse::<url::Url>().is_ok());
            assert!(spec.explorer_tx_base.starts_with("https://"));
        }
    }
}
