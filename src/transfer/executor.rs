//! Custodial transfer execution.
//!
//! Signs with the one locally held key, runs aggregated pre-flight checks
//! before any submission, submits with a gas safety margin plus bounded
//! retries on transient failures, and waits for confirmation. Every outcome
//! becomes a [`TransferOutcome`].

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionReceipt;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

use crate::chains::{chain_spec, BindingMode, ChainError, ChainRegistry, ChainResult};
use crate::config::schema::{AgentConfig, ExecutorSettings};
use crate::transfer::types::{PreflightReport, TransferOutcome, TxStatus};
use crate::transfer::wallet::LocalWallet;

/// Executes USDC transfers with a locally held key.
///
/// Owns its own signer-backed [`ChainRegistry`]; the advisory pipeline's
/// signer-less registry is a separate trust boundary and is never shared
/// with this type.
pub struct TransferExecutor {
    wallet: LocalWallet,
    registry: ChainRegistry,
    chain_id: u64,
    explorer_tx_base: &'static str,
    settings: ExecutorSettings,
}

/// Wallet balances relevant to custodial execution.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSummary {
    pub wallet: Address,
    pub native_balance: String,
    pub gas_sufficient: bool,
    pub token_balance: String,
    pub token_symbol: String,
}

struct SubmitFailure {
    message: String,
    tx_hash: Option<String>,
}

impl TransferExecutor {
    pub fn new(wallet: LocalWallet, config: &AgentConfig) -> ChainResult<Self> {
        let chain_id = config.chain.default_chain_id;
        let spec = chain_spec(chain_id)?;
        let registry = ChainRegistry::with_signer(&config.chain, wallet.signer().clone());
        Ok(Self {
            wallet,
            registry,
            chain_id,
            explorer_tx_base: spec.explorer_tx_base,
            settings: config.executor.clone(),
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Run every pre-flight check and aggregate the findings. Never
    /// short-circuits on the first failure.
    pub async fn preflight(&self, to: &str, amount: f64) -> PreflightReport {
        tracing::info!(to, amount, "running pre-flight checks");
        let (recipient, mut errors) = validate_request(to, amount, self.settings.max_amount);
        let warnings = Vec::new();

        // Native funds for gas.
        match self
            .registry
            .native_balance(self.chain_id, self.wallet.address())
            .await
        {
            Ok(balance) if balance > U256::from(self.settings.min_gas_balance_wei) => {}
            Ok(_) => errors.push("insufficient native balance for gas fees".to_string()),
            Err(e) => errors.push(format!("native balance check failed: {e}")),
        }

        match self.registry.token(self.chain_id, BindingMode::Signing) {
            Ok(token) => {
                // Token funds.
                match token.balance_decimal(self.wallet.address()).await {
                    Ok(balance) => {
                        let available: f64 = balance.parse().unwrap_or(0.0);
                        if amount > available {
                            errors.push(format!(
                                "insufficient balance: available {available} USDC, requested {amount} USDC"
                            ));
                        }
                    }
                    Err(e) => errors.push(format!("token balance check failed: {e}")),
                }

                // A failed simulation is a pre-flight failure, not something
                // to discover at submission time.
                if let Some(recipient) = recipient {
                    match token.to_base_units(&amount.to_string()).await {
                        Ok(base_units) => {
                            match token
                                .estimate_transfer_gas(self.wallet.address(), recipient, base_units)
                                .await
                            {
                                Ok(estimate) => {
                                    tracing::debug!(estimate, "transfer gas estimated");
                                }
                                Err(e) => {
                                    errors.push(format!("transaction would likely fail: {e}"))
                                }
                            }
                        }
                        Err(e) => errors.push(format!("amount conversion failed: {e}")),
                    }
                }
            }
            Err(e) => errors.push(format!("token binding unavailable: {e}")),
        }

        PreflightReport::from_findings(errors, warnings)
    }

    /// Sign, submit, and confirm a transfer.
    ///
    /// Aborts before submission if any pre-flight check fails. The returned
    /// outcome always carries elapsed time, whatever happened.
    pub async fn execute(&self, to: &str, amount: f64) -> TransferOutcome {
        let started = Instant::now();
        tracing::info!(to, amount, "initiating custodial transfer");

        let checks = self.preflight(to, amount).await;
        if !checks.passed {
            return TransferOutcome::failure(
                format!("pre-flight checks failed: {}", checks.errors.join(", ")),
                elapsed_ms(started),
            );
        }
        let recipient: Address = match to.parse() {
            Ok(address) => address,
            // Unreachable after a passing pre-flight, but never panic here.
            Err(_) => {
                return TransferOutcome::failure(
                    "invalid recipient address".to_string(),
                    elapsed_ms(started),
                )
            }
        };

        match self.submit_and_confirm(recipient, amount).await {
            Ok(receipt) => {
                let hash = receipt.transaction_hash.to_string();
                tracing::info!(tx_hash = %hash, block = ?receipt.block_number, "transfer confirmed");
                TransferOutcome {
                    succeeded: true,
                    explorer_url: Some(self.explorer_url(&hash)),
                    tx_hash: Some(hash),
                    error: None,
                    block_number: receipt.block_number,
                    gas_used: Some(receipt.gas_used as u64),
                    elapsed_ms: elapsed_ms(started),
                }
            }
            Err(failure) => {
                tracing::error!(error = %failure.message, "transfer failed");
                TransferOutcome {
                    succeeded: false,
                    explorer_url: failure.tx_hash.as_deref().map(|h| self.explorer_url(h)),
                    tx_hash: failure.tx_hash,
                    error: Some(failure.message),
                    block_number: None,
                    gas_used: None,
                    elapsed_ms: elapsed_ms(started),
                }
            }
        }
    }

    async fn submit_and_confirm(
        &self,
        recipient: Address,
        amount: f64,
    ) -> Result<TransactionReceipt, SubmitFailure> {
        let fail = |message: String| SubmitFailure {
            message,
            tx_hash: None,
        };

        let token = self
            .registry
            .token(self.chain_id, BindingMode::Signing)
            .map_err(|e| fail(e.to_string()))?;
        let base_units = token
            .to_base_units(&amount.to_string())
            .await
            .map_err(|e| fail(e.to_string()))?;
        let estimate = token
            .estimate_transfer_gas(self.wallet.address(), recipient, base_units)
            .await
            .map_err(|e| fail(format!("gas estimation failed: {e}")))?;
        let gas_limit = estimate + estimate * self.settings.gas_margin_percent / 100;

        // Bounded retry around transient submission failures; the delay
        // grows linearly with the attempt number.
        let mut attempt = 0u32;
        let pending = loop {
            attempt += 1;
            match token.send_transfer(recipient, base_units, gas_limit).await {
                Ok(pending) => break pending,
                Err(e) if attempt < self.settings.max_attempts && is_transient(&e) => {
                    let delay = Duration::from_millis(
                        self.settings.retry_delay_ms.saturating_mul(attempt as u64),
                    );
                    tracing::warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "submission failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(fail(format!("submission failed: {e}"))),
            }
        };

        let tx_hash = pending.tx_hash().to_string();
        tracing::info!(tx_hash = %tx_hash, gas_limit, "transaction submitted, awaiting confirmation");

        let confirmation = Duration::from_secs(self.settings.confirmation_timeout_secs);
        let receipt = match timeout(confirmation, pending.get_receipt()).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                return Err(SubmitFailure {
                    message: format!("confirmation failed: {e}"),
                    tx_hash: Some(tx_hash),
                })
            }
            Err(_) => {
                return Err(SubmitFailure {
                    message: format!("not confirmed within {} seconds", confirmation.as_secs()),
                    tx_hash: Some(tx_hash),
                })
            }
        };

        if !receipt.status() {
            return Err(SubmitFailure {
                message: "transaction reverted".to_string(),
                tx_hash: Some(tx_hash),
            });
        }
        Ok(receipt)
    }

    /// Read-only status of an already-submitted transaction. Never retries
    /// or resubmits.
    pub async fn transaction_status(&self, tx_hash: TxHash) -> TxStatus {
        match self.registry.transaction_receipt(self.chain_id, tx_hash).await {
            Ok(Some(receipt)) => {
                let explorer_url = self.explorer_url(&receipt.transaction_hash.to_string());
                if receipt.status() {
                    TxStatus::Success {
                        block_number: receipt.block_number.unwrap_or_default(),
                        gas_used: receipt.gas_used as u64,
                        explorer_url,
                    }
                } else {
                    TxStatus::Failed {
                        block_number: receipt.block_number,
                        explorer_url,
                    }
                }
            }
            Ok(None) => TxStatus::Pending,
            Err(e) => TxStatus::Error {
                error: e.to_string(),
            },
        }
    }

    /// Wallet balances for both the gas currency and the token.
    pub async fn balance_summary(&self) -> ChainResult<BalanceSummary> {
        let native = self
            .registry
            .native_balance(self.chain_id, self.wallet.address())
            .await?;
        let token = self.registry.token(self.chain_id, BindingMode::Signing)?;
        let token_balance = token.balance_decimal(self.wallet.address()).await?;
        let token_symbol = token.symbol().await?;

        Ok(BalanceSummary {
            wallet: self.wallet.address(),
            native_balance: format_units(native, 18)
                .map_err(|e| ChainError::Units(e.to_string()))?,
            gas_sufficient: native > U256::from(self.settings.min_gas_balance_wei),
            token_balance,
            token_symbol,
        })
    }

    fn explorer_url(&self, tx_hash: &str) -> String {
        format!("{}{}", self.explorer_tx_base, tx_hash)
    }
}

/// Local (no-network) request checks: address syntax and amount policy.
/// Returns every violation, not just the first.
fn validate_request(to: &str, amount: f64, max_amount: f64) -> (Option<Address>, Vec<String>) {
    let mut errors = Vec::new();
    let recipient = match to.parse::<Address>() {
        Ok(address) => Some(address),
        Err(_) => {
            errors.push("invalid recipient address".to_string());
            None
        }
    };
    if !amount.is_finite() || amount <= 0.0 {
        errors.push("amount must be greater than 0".to_string());
    } else if amount > max_amount {
        errors.push(format!("amount too large (max {max_amount} USDC per transfer)"));
    }
    (recipient, errors)
}

fn is_transient(error: &ChainError) -> bool {
    matches!(error, ChainError::Timeout(_) | ChainError::Rpc(_))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AgentConfig;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn offline_executor() -> TransferExecutor {
        let mut config = AgentConfig::default();
        // Point at a closed local port so network checks fail fast and no
        // request ever leaves the machine.
        config.chain.rpc_url = Some("http://127.0.0.1:9".to_string());
        config.chain.rpc_timeout_secs = 2;
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        TransferExecutor::new(wallet, &config).unwrap()
    }

    #[test]
    fn request_checks_aggregate_all_violations() {
        let (recipient, errors) = validate_request("not-an-address", 5000.0, 1000.0);
        assert!(recipient.is_none());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("invalid recipient address"));
        assert!(errors[1].contains("amount too large"));
    }

    #[test]
    fn request_checks_pass_a_valid_request() {
        let (recipient, errors) = validate_request(
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
            5.0,
            1000.0,
        );
        assert!(recipient.is_some());
        assert!(errors.is_empty());
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let to = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
        assert!(!validate_request(to, 0.0, 1000.0).1.is_empty());
        assert!(!validate_request(to, -1.0, 1000.0).1.is_empty());
        assert!(!validate_request(to, f64::NAN, 1000.0).1.is_empty());
    }

    #[tokio::test]
    async fn preflight_aggregates_local_and_network_failures() {
        let executor = offline_executor();
        let report = executor.preflight("not-an-address", 5000.0).await;
        assert!(!report.passed);
        assert!(report.errors.iter().any(|e| e.contains("invalid recipient address")));
        assert!(report.errors.iter().any(|e| e.contains("amount too large")));
    }

    #[tokio::test]
    async fn failed_preflight_aborts_execution_with_elapsed_time() {
        let executor = offline_executor();
        let outcome = executor.execute("not-an-address", 5000.0).await;
        assert!(!outcome.succeeded);
        assert!(outcome.tx_hash.is_none());
        let error = outcome.error.unwrap();
        assert!(error.contains("pre-flight checks failed"));
        assert!(error.contains("invalid recipient address"));
        assert!(error.contains("amount too large"));
    }

    #[test]
    fn transient_classification() {
        assert!(is_transient(&ChainError::Timeout(5)));
        assert!(is_transient(&ChainError::Rpc("connection reset".into())));
        assert!(!is_transient(&ChainError::UnsupportedChain(7)));
        assert!(!is_transient(&ChainError::Signer("no key".into())));
    }

    #[test]
    fn explorer_url_appends_the_hash() {
        let executor = offline_executor();
        let url = executor.explorer_url("0xabc");
        assert!(url.starts_with("https://"));
        assert!(url.ends_with("/tx/0xabc"));
    }
}
