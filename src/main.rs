//! ENS Payment Agent CLI
//!
//! Thin shell around the pipeline: loads configuration, wires up the agent,
//! runs one operation, and prints the structured result as JSON. All
//! decisions live in the library.

use alloy::primitives::{Address, TxHash};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enspay::agent::Agent;
use enspay::config::{load_config, AgentConfig};
use enspay::transfer::{LocalWallet, TransferExecutor};

#[derive(Parser)]
#[command(name = "enspay", version, about = "Turn payment instructions into USDC transfers")]
struct Cli {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chain id override for this invocation.
    #[arg(long, global = true)]
    chain: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate an instruction without touching the network.
    Parse { text: String },

    /// Resolve an ENS name to an address.
    Resolve { name: String },

    /// Reverse-resolve an address to its primary ENS name.
    Reverse { address: Address },

    /// Run the advisory pipeline: parse, resolve, check balance, and
    /// produce an unsigned transfer for an external signer.
    Plan {
        text: String,
        /// Address whose balance funds the transfer.
        #[arg(long)]
        holder: Address,
    },

    /// Custodially execute a transfer with the local key.
    Execute {
        to: String,
        amount: f64,
    },

    /// Check the status of an already-submitted transaction.
    Status { tx_hash: TxHash },

    /// Show the local wallet's native and token balances.
    Balances,

    /// Show resolution cache statistics.
    CacheStats,

    /// Probe chain connectivity by fetching the current block number.
    Probe,

    /// Show the USDC contract's name, symbol, and decimals.
    TokenInfo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enspay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Configuration problems are startup-fatal, never per-request.
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };
    tracing::info!(
        default_chain_id = config.chain.default_chain_id,
        cache_ttl_secs = config.resolver.cache_ttl_secs,
        custodial = config.executor.enabled,
        "configuration loaded"
    );

    match cli.command {
        Command::Parse { text } => {
            let parser = enspay::intent::IntentParser::new();
            match parser.parse(&text) {
                Ok(intent) => print_json(&intent)?,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Resolve { name } => {
            let agent = Agent::new(&config);
            match agent.resolver().resolve(&name).await? {
                Some(address) => println!("{address}"),
                None => {
                    eprintln!("{name} did not resolve");
                    std::process::exit(1);
                }
            }
        }
        Command::Reverse { address } => {
            let agent = Agent::new(&config);
            match agent.resolver().reverse(address).await? {
                Some(name) => println!("{name}"),
                None => {
                    eprintln!("no primary name for {address}");
                    std::process::exit(1);
                }
            }
        }
        Command::Plan { text, holder } => {
            let agent = Agent::new(&config);
            let reply = agent.handle(&text, holder, cli.chain).await;
            print_json(&reply)?;
            if !reply.success {
                std::process::exit(1);
            }
        }
        Command::Execute { to, amount } => {
            let executor = custodial_executor(&config)?;
            let outcome = executor.execute(&to, amount).await;
            print_json(&outcome)?;
            if !outcome.succeeded {
                std::process::exit(1);
            }
        }
        Command::Status { tx_hash } => {
            let executor = custodial_executor(&config)?;
            let status = executor.transaction_status(tx_hash).await;
            print_json(&status)?;
        }
        Command::Balances => {
            let executor = custodial_executor(&config)?;
            let summary = executor.balance_summary().await?;
            print_json(&summary)?;
        }
        Command::CacheStats => {
            let agent = Agent::new(&config);
            print_json(&agent.resolver().cache_stats())?;
        }
        Command::Probe => {
            let agent = Agent::new(&config);
            let chain_id = cli.chain.unwrap_or(config.chain.default_chain_id);
            let block = agent.registry().block_number(chain_id).await?;
            println!("chain {chain_id} reachable, current block {block}");
        }
        Command::TokenInfo => {
            let agent = Agent::new(&config);
            let chain_id = cli.chain.unwrap_or(config.chain.default_chain_id);
            let token = agent
                .registry()
                .token(chain_id, enspay::chains::BindingMode::ReadOnly)?;
            let info = serde_json::json!({
                "address": token.address(),
                "name": token.name().await?,
                "symbol": token.symbol().await?,
                "decimals": token.decimals().await?,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

/// Build the custodial executor; the missing-key case is startup-fatal.
fn custodial_executor(
    config: &AgentConfig,
) -> Result<TransferExecutor, Box<dyn std::error::Error>> {
    if !config.executor.enabled {
        return Err("custodial execution is disabled; set [executor] enabled = true".into());
    }
    let wallet = LocalWallet::from_env()?;
    Ok(TransferExecutor::new(wallet, config)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
