//! ERC-20 token binding for USDC-style tokens.
//!
//! All amount conversions between integer base units and decimal amounts go
//! through the `decimals()` reported by the contract, fetched once per
//! binding and cached.

use alloy::network::Ethereum;
use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder};
use alloy::sol;
use std::future::IntoFuture;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::chains::types::{ChainError, ChainResult};

sol! {
    /// Minimal ERC-20 surface used by the agent.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IErc20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// A cached connection to one token contract on one chain.
pub struct TokenBinding {
    contract: IErc20::IErc20Instance<DynProvider>,
    decimals: OnceCell<u8>,
    rpc_timeout: Duration,
}

impl TokenBinding {
    pub(crate) fn new(address: Address, provider: DynProvider, rpc_timeout: Duration) -> Self {
        Self {
            contract: IErc20::new(address, provider),
            decimals: OnceCell::new(),
            rpc_timeout,
        }
    }

    /// The token contract address.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    async fn rpc<T>(
        &self,
        fut: impl IntoFuture<Output = Result<T, alloy::contract::Error>>,
    ) -> ChainResult<T> {
        match timeout(self.rpc_timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::Timeout(self.rpc_timeout.as_secs())),
        }
    }

    /// Token decimals, fetched from the contract once and reused.
    pub async fn decimals(&self) -> ChainResult<u8> {
        self.decimals
            .get_or_try_init(|| async { self.rpc(self.contract.decimals().call()).await })
            .await
            .copied()
    }

    pub async fn symbol(&self) -> ChainResult<String> {
        self.rpc(self.contract.symbol().call()).await
    }

    pub async fn name(&self) -> ChainResult<String> {
        self.rpc(self.contract.name().call()).await
    }

    /// Holder balance in base units.
    pub async fn balance_of(&self, holder: Address) -> ChainResult<U256> {
        self.rpc(self.contract.balanceOf(holder).call()).await
    }

    /// Holder balance as a decimal string in user-facing units.
    pub async fn balance_decimal(&self, holder: Address) -> ChainResult<String> {
        let raw = self.balance_of(holder).await?;
        self.to_decimal(raw).await
    }

    /// Convert base units to a decimal string.
    pub async fn to_decimal(&self, raw: U256) -> ChainResult<String> {
        let decimals = self.decimals().await?;
        format_units(raw, decimals).map_err(|e| ChainError::Units(e.to_string()))
    }

    /// Convert a decimal amount literal (e.g. `"1.50"`) to base units.
    pub async fn to_base_units(&self, amount: &str) -> ChainResult<U256> {
        let decimals = self.decimals().await?;
        let parsed = parse_units(amount, decimals).map_err(|e| ChainError::Units(e.to_string()))?;
        Ok(parsed.get_absolute())
    }

    /// ABI-encoded `transfer(to, value)` calldata.
    pub fn transfer_calldata(&self, to: Address, value: U256) -> Bytes {
        self.contract.transfer(to, value).calldata().clone()
    }

    /// Estimate gas for `transfer(to, value)` submitted by `from`.
    pub async fn estimate_transfer_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> ChainResult<u64> {
        self.rpc(self.contract.transfer(to, value).from(from).estimate_gas())
            .await
    }

    /// Submit `transfer(to, value)` with an explicit gas limit.
    ///
    /// Requires a signing-mode binding; on a read-only binding the underlying
    /// provider rejects the send.
    pub async fn send_transfer(
        &self,
        to: Address,
        value: U256,
        gas_limit: u64,
    ) -> ChainResult<PendingTransactionBuilder<Ethereum>> {
        self.rpc(self.contract.transfer(to, value).gas(gas_limit).send())
            .await
    }
}

impl std::fmt::Debug for TokenBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBinding")
            .field("address", &self.address())
            .field("decimals", &self.decimals.get())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}
