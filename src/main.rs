//! Trap Checker CLI
//!
//! Prints the risk assessment as pretty JSON. Logs go to stderr
//! (`RUST_LOG`, default info).

use clap::Parser;
use eyre::{eyre, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trap_checker::utils::constants::{get_chain_name, parse_chain};
use trap_checker::{CheckerConfig, ContractTarget, ExplorerDataSource, RiskAggregator};

#[derive(Parser, Debug)]
#[command(name = "trap_checker", version)]
#[command(about = "Score a token contract for common rug-pull traps")]
struct Cli {
    /// Contract address (optional label when scanning a local file)
    #[arg(required_unless_present = "source")]
    address: Option<String>,

    /// Chain id or name: bsc, eth, polygon, arbitrum, optimism, avalanche, base
    #[arg(short, long)]
    chain: Option<String>,

    /// Scan a local Solidity file instead of the verified source
    #[arg(short, long, value_name = "FILE")]
    source: Option<PathBuf>,
}

impl Cli {
    fn chain_id(&self, default: u64) -> Result<u64> {
        match self.chain.as_deref() {
            Some(selector) => {
                parse_chain(selector).ok_or_else(|| eyre!("Unknown chain: {}", selector))
            }
            None => Ok(default),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = CheckerConfig::from_env()?;
    let aggregator = RiskAggregator::new(&config);
    let chain_id = cli.chain_id(config.default_chain_id)?;

    let assessment = match (&cli.source, &cli.address) {
        (Some(path), address) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
            info!("📄 Scanning {} ({} bytes)", path.display(), text.len());
            aggregator.scan_source(address.as_deref().unwrap_or_default(), chain_id, &text)
        }
        (None, Some(address)) => {
            address
                .parse::<alloy_primitives::Address>()
                .map_err(|_| eyre!("Invalid contract address: {}", address))?;

            info!("🔍 Checking {} on {}", address, get_chain_name(chain_id));
            let source = ExplorerDataSource::from_config(&config)?;
            let target = ContractTarget::new(chain_id, address.as_str());
            aggregator
                .assess_within(&source, &target, config.request_timeout)
                .await?
        }
        (None, None) => return Err(eyre!("An address or --source <FILE> is required")),
    };

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["trap_checker", "0xabc", "--chain", "eth"]).unwrap();
        assert_eq!(cli.address.as_deref(), Some("0xabc"));
        assert_eq!(cli.chain_id(56).unwrap(), 1);
        assert!(cli.source.is_none());
    }

    #[test]
    fn test_flags_in_any_order() {
        let cli = Cli::try_parse_from(["trap_checker", "--chain", "eth", "0xabc"]).unwrap();
        assert_eq!(cli.address.as_deref(), Some("0xabc"));
        assert_eq!(cli.chain.as_deref(), Some("eth"));

        let cli = Cli::try_parse_from(["trap_checker", "0xabc", "--source", "f.sol"]).unwrap();
        assert_eq!(cli.address.as_deref(), Some("0xabc"));
        assert_eq!(cli.source, Some(PathBuf::from("f.sol")));
    }

    #[test]
    fn test_parse_source_scan() {
        let cli = Cli::try_parse_from(["trap_checker", "-s", "Token.sol"]).unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("Token.sol")));
        assert!(cli.address.is_none());
        assert_eq!(cli.chain_id(56).unwrap(), 56);
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(Cli::try_parse_from(["trap_checker"]).is_err());
        assert!(Cli::try_parse_from(["trap_checker", "--source"]).is_err());
        // chain is a flag, not a second positional
        assert!(Cli::try_parse_from(["trap_checker", "0xabc", "eth"]).is_err());

        let cli = Cli::try_parse_from(["trap_checker", "0xabc", "-c", "dogechain"]).unwrap();
        assert!(cli.chain_id(56).is_err());
    }
}
