//! Non-custodial transfer planning.
//!
//! Combines a validated intent, a resolved recipient, and a balance check
//! into an [`UnsignedTransfer`] for an external signer. This path never
//! touches a private key.

use alloy::primitives::{Address, U256};
use std::sync::Arc;

use crate::chains::{BindingMode, ChainRegistry};
use crate::intent::PaymentIntent;
use crate::transfer::types::{PlanError, UnsignedTransfer};

pub struct TransferPlanner {
    registry: Arc<ChainRegistry>,
}

impl TransferPlanner {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self { registry }
    }

    /// Build an unsigned transfer descriptor, or fail on insufficient funds.
    ///
    /// Each step is a hard gate: balance, calldata encoding, gas estimation.
    pub async fn plan(
        &self,
        intent: &PaymentIntent,
        recipient: Address,
        chain_id: u64,
        holder: Address,
    ) -> Result<UnsignedTransfer, PlanError> {
        let token = self.registry.token(chain_id, BindingMode::ReadOnly)?;

        let available = token.balance_of(holder).await?;
        let requested = token.to_base_units(&intent.amount_literal).await?;
        if available < requested {
            return Err(PlanError::InsufficientBalance {
                available: token.to_decimal(available).await?,
                requested: intent.amount_literal.clone(),
            });
        }

        let data = token.transfer_calldata(recipient, requested);
        let gas_limit = token
            .estimate_transfer_gas(holder, recipient, requested)
            .await?;

        tracing::info!(
            %holder,
            %recipient,
            amount = %intent.amount_literal,
            gas_limit,
            chain_id,
            "unsigned transfer planned"
        );

        Ok(UnsignedTransfer {
            to: token.address(),
            data,
            value: U256::ZERO,
            gas_limit,
            chain_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::token::TokenBinding;
    use crate::config::schema::ChainSettings;
    use crate::intent::IntentParser;
    use alloy::primitives::{address, Bytes, U64};
    use alloy::providers::mock::Asserter;
    use alloy::providers::{Provider, ProviderBuilder};
    use std::time::Duration;

    const CHAIN_ID: u64 = 11155111;
    const TOKEN: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");

    /// Planner whose token binding talks to a scripted transport instead of
    /// a live endpoint.
    fn planner_with_mock(asserter: &Asserter) -> TransferPlanner {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        let token = TokenBinding::new(TOKEN, provider, Duration::from_secs(2));
        let registry = Arc::new(ChainRegistry::new(&ChainSettings::default()));
        registry.insert_token(CHAIN_ID, BindingMode::ReadOnly, Arc::new(token));
        TransferPlanner::new(registry)
    }

    /// A single ABI-encoded return word.
    fn abi_word(value: u64) -> Bytes {
        Bytes::from(U256::from(value).to_be_bytes_vec())
    }

    fn holder() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse()
            .unwrap()
    }

    fn recipient() -> Address {
        "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn underfunded_holder_gets_an_error_naming_both_amounts() {
        let asserter = Asserter::new();
        asserter.push_success(&abi_word(3_000_000)); // balanceOf: 3 USDC
        asserter.push_success(&abi_word(6)); // decimals
        let planner = planner_with_mock(&asserter);
        let intent = IntentParser::new().parse("pay 5 usdc to alice.eth").unwrap();

        let err = planner
            .plan(&intent, recipient(), CHAIN_ID, holder())
            .await
            .unwrap_err();
        match err {
            PlanError::InsufficientBalance {
                available,
                requested,
            } => {
                assert_eq!(available, "3.000000");
                assert_eq!(requested, "5");
            }
            other => panic!("expected an insufficient balance error, got {other}"),
        }
    }

    #[tokio::test]
    async fn funded_holder_gets_an_unsigned_descriptor() {
        let asserter = Asserter::new();
        asserter.push_success(&abi_word(10_000_000)); // balanceOf: 10 USDC
        asserter.push_success(&abi_word(6)); // decimals
        asserter.push_success(&U64::from(60_000u64)); // gas estimate
        let planner = planner_with_mock(&asserter);
        let intent = IntentParser::new().parse("pay 5 usdc to alice.eth").unwrap();

        let transfer = planner
            .plan(&intent, recipient(), CHAIN_ID, holder())
            .await
            .unwrap();
        assert_eq!(transfer.to, TOKEN);
        assert_eq!(transfer.value, U256::ZERO);
        assert_eq!(transfer.gas_limit, 60_000);
        assert_eq!(transfer.chain_id, CHAIN_ID);
        // transfer(address,uint256) selector
        assert_eq!(&transfer.data[..4], [0xa9, 0x05, 0x9c, 0xbb]);
    }
}
