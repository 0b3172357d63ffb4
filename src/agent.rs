//! Pipeline orchestrator: instruction text in, structured reply out.
//!
//! Parse → resolve → balance check → plan. Every failure degrades to a
//! user-facing reply with an error and a remediation suggestion; nothing
//! here panics or leaks a raw transport fault.

use alloy::primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::chains::{BindingMode, ChainRegistry};
use crate::config::schema::AgentConfig;
use crate::ens::{EnsLookup, EnsResolver};
use crate::intent::{IntentParser, PaymentIntent};
use crate::transfer::types::{PlanError, UnsignedTransfer};
use crate::transfer::TransferPlanner;

/// Structured reply for the thin I/O shells (CLI, HTTP, chat adapters).
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<PaymentIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<UnsignedTransfer>,
}

impl AgentReply {
    fn rejected(error: impl Into<String>, suggestion: &str) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            suggestion: Some(suggestion.to_string()),
            summary: None,
            intent: None,
            recipient_address: None,
            holder_balance: None,
            transfer: None,
        }
    }
}

/// The advisory (non-custodial) pipeline. Holds no keys; produces unsigned
/// transfer proposals only.
pub struct Agent {
    parser: IntentParser,
    resolver: EnsResolver<EnsLookup>,
    planner: TransferPlanner,
    registry: Arc<ChainRegistry>,
    default_chain_id: u64,
}

impl Agent {
    pub fn new(config: &AgentConfig) -> Self {
        let registry = Arc::new(ChainRegistry::new(&config.chain));
        let resolver = EnsResolver::new(
            EnsLookup::new(registry.clone(), config.chain.default_chain_id),
            Duration::from_secs(config.resolver.cache_ttl_secs),
            config.resolver.failure_policy,
            config.resolver.enable_reverse_resolution,
        );
        let planner = TransferPlanner::new(registry.clone());
        Self {
            parser: IntentParser::new(),
            resolver,
            planner,
            registry,
            default_chain_id: config.chain.default_chain_id,
        }
    }

    pub fn resolver(&self) -> &EnsResolver<EnsLookup> {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    /// Run one instruction through the full advisory pipeline.
    pub async fn handle(&self, text: &str, holder: Address, chain_id: Option<u64>) -> AgentReply {
        let chain_id = chain_id.unwrap_or(self.default_chain_id);
        tracing::info!(%holder, chain_id, text, "handling payment instruction");

        let intent = match self.parser.parse(text) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "intent rejected");
                return AgentReply::rejected(e.to_string(), "Try: 'send 5 usdc to alice.eth'");
            }
        };
        tracing::info!(amount = intent.amount, recipient = %intent.recipient, "intent parsed");

        let recipient = match self.resolver.resolve(&intent.recipient).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                tracing::warn!(name = %intent.recipient, "name did not resolve");
                return AgentReply::rejected(
                    format!("could not resolve {}", intent.recipient),
                    "Check the ENS name spelling",
                );
            }
            Err(e) => {
                return AgentReply::rejected(
                    format!("name resolution failed: {e}"),
                    "Please try again shortly",
                );
            }
        };
        tracing::info!(name = %intent.recipient, %recipient, "name resolved");

        let holder_balance = match self
            .registry
            .token(chain_id, BindingMode::ReadOnly)
        {
            Ok(token) => match token.balance_decimal(holder).await {
                Ok(balance) => balance,
                Err(e) => {
                    return AgentReply::rejected(
                        format!("balance check failed: {e}"),
                        "Please try again shortly",
                    );
                }
            },
            Err(e) => return AgentReply::rejected(e.to_string(), "Check the chain id"),
        };

        let transfer = match self.planner.plan(&intent, recipient, chain_id, holder).await {
            Ok(transfer) => transfer,
            Err(PlanError::InsufficientBalance {
                available,
                requested,
            }) => {
                return AgentReply::rejected(
                    format!(
                        "insufficient balance: you have {available} USDC, need {requested} USDC"
                    ),
                    "Add more USDC to your wallet",
                );
            }
            Err(e) => {
                return AgentReply::rejected(
                    format!("transaction preparation failed: {e}"),
                    "Please try again or contact support",
                );
            }
        };

        let summary = format!(
            "Send {} USDC to {} ({})",
            intent.amount,
            intent.recipient,
            short_address(recipient)
        );
        tracing::info!(%summary, "request complete");

        AgentReply {
            success: true,
            error: None,
            suggestion: None,
            summary: Some(summary),
            intent: Some(intent),
            recipient_address: Some(recipient),
            holder_balance: Some(holder_balance),
            transfer: Some(transfer),
        }
    }
}

/// `0xd8dA…96045`-style display form for summaries.
fn short_address(address: Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
