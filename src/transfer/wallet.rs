//! Local signing key for the custodial path.
//!
//! # Security
//! - The private key is loaded ONLY from an environment variable
//! - The key is never logged or serialized

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::chains::{ChainError, ChainResult};

/// Environment variable holding the custodial signing key.
pub const PRIVATE_KEY_ENV_VAR: &str = "AGENT_PRIVATE_KEY";

/// The one locally held key used by the custodial executor.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key (with or without a
    /// `0x` prefix). The key material is never logged.
    pub fn from_private_key(private_key_hex: &str) -> ChainResult<Self> {
        let key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Signer(format!("invalid private key format: {e}")))?;

        tracing::info!(address = %signer.address(), "custodial wallet initialized");
        Ok(Self { signer })
    }

    /// Load the wallet from [`PRIVATE_KEY_ENV_VAR`]. Missing key is a
    /// startup-fatal configuration error.
    pub fn from_env() -> ChainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ChainError::Signer(format!("environment variable {PRIVATE_KEY_ENV_VAR} not set"))
        })?;
        Self::from_private_key(&private_key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account).
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn wallet_from_private_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn wallet_accepts_0x_prefix() {
        let wallet = LocalWallet::from_private_key(&format!("0x{TEST_PRIVATE_KEY}")).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn invalid_private_key_is_rejected() {
        let result = LocalWallet::from_private_key("not_a_key");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("invalid private key"));
    }
}
