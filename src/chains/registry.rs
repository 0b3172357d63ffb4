//! Lazy per-chain provider and token-binding registry.
//!
//! Providers and bindings are expensive to set up, so both are created once
//! per key and reused. The dashmap entry API serializes concurrent first
//! accesses to the same key: one task performs the setup, the rest get the
//! finished instance.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::chains::token::TokenBinding;
use crate::chains::types::{chain_spec, BindingMode, ChainError, ChainResult};
use crate::config::schema::ChainSettings;

/// Shared registry of per-chain connections and token bindings.
///
/// A registry built without a signer serves the advisory (non-custodial)
/// path; the custodial executor owns its own signer-backed instance. The two
/// are deliberately separate trust boundaries.
pub struct ChainRegistry {
    providers: DashMap<u64, DynProvider>,
    tokens: DashMap<(u64, BindingMode), Arc<TokenBinding>>,
    /// Overrides from config, applied to the configured default chain only.
    override_chain_id: u64,
    rpc_url_override: Option<String>,
    usdc_address_override: Option<String>,
    signer: Option<PrivateKeySigner>,
    rpc_timeout: Duration,
}

impl ChainRegistry {
    /// Create a signer-less registry for read-only access.
    pub fn new(settings: &ChainSettings) -> Self {
        Self::build(settings, None)
    }

    /// Create a registry whose signing-mode bindings use `signer`.
    pub fn with_signer(settings: &ChainSettings, signer: PrivateKeySigner) -> Self {
        Self::build(settings, Some(signer))
    }

    fn build(settings: &ChainSettings, signer: Option<PrivateKeySigner>) -> Self {
        Self {
            providers: DashMap::new(),
            tokens: DashMap::new(),
            override_chain_id: settings.default_chain_id,
            rpc_url_override: settings.rpc_url.clone(),
            usdc_address_override: settings.usdc_address.clone(),
            signer,
            rpc_timeout: Duration::from_secs(settings.rpc_timeout_secs),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    fn rpc_url_for(&self, chain_id: u64) -> ChainResult<Url> {
        let spec = chain_spec(chain_id)?;
        let raw = match &self.rpc_url_override {
            Some(url) if chain_id == self.override_chain_id => url.as_str(),
            _ => spec.rpc_url,
        };
        raw.parse().map_err(|e: url::ParseError| ChainError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }

    fn usdc_address_for(&self, chain_id: u64) -> ChainResult<Address> {
        let spec = chain_spec(chain_id)?;
        let raw = match &self.usdc_address_override {
            Some(addr) if chain_id == self.override_chain_id => addr.as_str(),
            _ => spec.usdc_address,
        };
        raw.parse()
            .map_err(|_| ChainError::InvalidAddress(raw.to_string()))
    }

    /// Get or lazily create the provider for `chain_id`.
    pub fn provider(&self, chain_id: u64) -> ChainResult<DynProvider> {
        if let Some(existing) = self.providers.get(&chain_id) {
            return Ok(existing.clone());
        }
        let url = self.rpc_url_for(chain_id)?;
        let provider = self
            .providers
            .entry(chain_id)
            .or_try_insert_with(|| {
                tracing::info!(chain_id, rpc_url = %url, "creating chain provider");
                Ok::<_, ChainError>(ProviderBuilder::new().connect_http(url.clone()).erased())
            })?
            .clone();
        Ok(provider)
    }

    /// Get or lazily create the USDC binding for `(chain_id, mode)`.
    ///
    /// `Signing` mode requires a signer supplied at construction.
    pub fn token(&self, chain_id: u64, mode: BindingMode) -> ChainResult<Arc<TokenBinding>> {
        if let Some(existing) = self.tokens.get(&(chain_id, mode)) {
            return Ok(existing.clone());
        }
        let token_address = self.usdc_address_for(chain_id)?;
        let binding = self
            .tokens
            .entry((chain_id, mode))
            .or_try_insert_with(|| {
                let provider = match mode {
                    BindingMode::ReadOnly => self.provider(chain_id)?,
                    BindingMode::Signing => {
                        let signer = self.signer.clone().ok_or_else(|| {
                            ChainError::Signer("no signer configured for signing-mode binding".into())
                        })?;
                        let url = self.rpc_url_for(chain_id)?;
                        ProviderBuilder::new()
                            .wallet(EthereumWallet::from(signer))
                            .connect_http(url)
                            .erased()
                    }
                };
                tracing::info!(chain_id, ?mode, token = %token_address, "creating token binding");
                Ok::<_, ChainError>(Arc::new(TokenBinding::new(
                    token_address,
                    provider,
                    self.rpc_timeout,
                )))
            })?
            .clone();
        Ok(binding)
    }

    /// Preinstall a binding so tests can run without a live endpoint.
    #[cfg(test)]
    pub(crate) fn insert_token(&self, chain_id: u64, mode: BindingMode, binding: Arc<TokenBinding>) {
        self.tokens.insert((chain_id, mode), binding);
    }

    async fn rpc<T, E: std::fmt::Display>(
        &self,
        fut: impl std::future::IntoFuture<Output = Result<T, E>>,
    ) -> ChainResult<T> {
        match timeout(self.rpc_timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::Timeout(self.rpc_timeout.as_secs())),
        }
    }

    /// Current block number; doubles as a connectivity probe.
    pub async fn block_number(&self, chain_id: u64) -> ChainResult<u64> {
        let provider = self.provider(chain_id)?;
        self.rpc(provider.get_block_number()).await
    }

    /// Native-currency balance in wei.
    pub async fn native_balance(&self, chain_id: u64, address: Address) -> ChainResult<U256> {
        let provider = self.provider(chain_id)?;
        self.rpc(provider.get_balance(address)).await
    }

    /// Fetch a transaction receipt, `None` while pending.
    pub async fn transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> ChainResult<Option<TransactionReceipt>> {
        let provider = self.provider(chain_id)?;
        self.rpc(provider.get_transaction_receipt(tx_hash)).await
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("providers", &self.providers.len())
            .field("tokens", &self.tokens.len())
            .field("signing", &self.signer.is_some())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}
