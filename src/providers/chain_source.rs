//! Live `ContractDataSource` backed by the explorer, DexScreener and RPC

use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::dexscreener::DexScreenerClient;
use super::explorer::ExplorerClient;
use super::rpc::{RpcProvider, TokenMetadata};
use super::ContractDataSource;
use crate::models::config::CheckerConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{
    ContractSource, ContractTarget, InterfaceDecl, LiquiditySnapshot, SourceText, TokenInfo,
    TransferRecord,
};
use crate::utils::constants::{get_chain_name, is_chain_supported};

/// Production data source
#[derive(Clone)]
pub struct ExplorerDataSource {
    explorer: ExplorerClient,
    dexscreener: DexScreenerClient,
    /// Lazily created per chain
    rpc: Arc<DashMap<u64, RpcProvider>>,
    call_timeout: Duration,
}

impl ExplorerDataSource {
    pub fn from_config(config: &CheckerConfig) -> Result<Self> {
        Ok(Self {
            explorer: ExplorerClient::new(
                config.explorer_api_url.clone(),
                config.explorer_api_key.clone(),
                config.call_timeout,
            )?,
            dexscreener: DexScreenerClient::new(config.call_timeout)?,
            rpc: Arc::new(DashMap::new()),
            call_timeout: config.call_timeout,
        })
    }

    fn rpc_for(&self, chain_id: u64) -> AppResult<RpcProvider> {
        if let Some(provider) = self.rpc.get(&chain_id) {
            return Ok(provider.clone());
        }
        let provider = RpcProvider::new(chain_id, self.call_timeout)
            .map_err(|e| AppError::new(ErrorCode::RpcNoEndpoints, e.to_string()))?;
        info!(
            "✅ Initialized RPC for {} ({})",
            get_chain_name(chain_id),
            provider.masked_url()
        );
        self.rpc.insert(chain_id, provider.clone());
        Ok(provider)
    }
}

/// Explorer details first, on-chain reads fill the rest. Fails only when
/// neither side produced anything.
fn merge_token_info(
    details: AppResult<ContractSource>,
    onchain: TokenMetadata,
) -> AppResult<TokenInfo> {
    let details = match details {
        Ok(details) => Some(details),
        Err(e) if onchain.is_empty() => return Err(e),
        Err(e) => {
            debug!("Explorer details unavailable, using on-chain metadata: {}", e);
            None
        }
    };
    let non_blank = |s: &String| !s.trim().is_empty();

    Ok(TokenInfo {
        name: onchain
            .name
            .or_else(|| details.as_ref().map(|d| d.contract_name.clone()))
            .filter(non_blank),
        symbol: onchain.symbol,
        decimals: onchain.decimals,
        total_supply: onchain.total_supply.map(|s| s.to_string()),
        contract_name: details.as_ref().map(|d| d.contract_name.clone()).filter(non_blank),
        compiler: details.as_ref().map(|d| d.compiler.clone()).filter(non_blank),
        verified: details.as_ref().is_some_and(ContractSource::is_verified),
    })
}

fn ensure_supported(target: &ContractTarget) -> AppResult<()> {
    if is_chain_supported(target.chain_id) {
        Ok(())
    } else {
        Err(AppError::unsupported_chain(target.chain_id))
    }
}

#[async_trait]
impl ContractDataSource for ExplorerDataSource {
    async fn verified_source(&self, target: &ContractTarget) -> AppResult<SourceText> {
        ensure_supported(target)?;
        self.explorer.source_code(target.chain_id, &target.address).await
    }

    async fn interface(&self, target: &ContractTarget) -> AppResult<InterfaceDecl> {
        ensure_supported(target)?;
        self.explorer.abi(target.chain_id, &target.address).await
    }

    async fn liquidity(&self, target: &ContractTarget, top_n: usize) -> AppResult<LiquiditySnapshot> {
        ensure_supported(target)?;

        let pool = self
            .dexscreener
            .find_pool(&target.address, target.chain_id)
            .await
            .map_err(|e| AppError::dexscreener_error(e.to_string()))?
            .ok_or_else(|| AppError::input_unavailable("No V2 liquidity pool found"))?;
        let pool_address: Address = pool
            .parse()
            .map_err(|_| AppError::malformed(format!("Invalid pool address: {}", pool)))?;

        let rpc = self.rpc_for(target.chain_id)?;
        let (total_supply, top_holders) = tokio::try_join!(
            async {
                rpc.total_supply(pool_address)
                    .await
                    .map_err(|e| AppError::new(ErrorCode::RpcError, e.to_string()))
            },
            self.explorer.token_holders(target.chain_id, &pool, top_n),
        )?;

        Ok(LiquiditySnapshot {
            pool_address: pool,
            total_supply,
            top_holders,
        })
    }

    async fn recent_transfers(
        &self,
        target: &ContractTarget,
        limit: usize,
    ) -> AppResult<Vec<TransferRecord>> {
        ensure_supported(target)?;
        self.explorer
            .token_transfers(target.chain_id, &target.address, limit)
            .await
    }

    async fn token_info(&self, target: &ContractTarget) -> AppResult<TokenInfo> {
        ensure_supported(target)?;
        let token: Address = target
            .address
            .parse()
            .map_err(|_| {
                AppError::invalid_address(format!("Invalid token address: {}", target.address))
            })?;
        let onchain = async {
            match self.rpc_for(target.chain_id) {
                Ok(rpc) => rpc.token_metadata(token).await,
                Err(e) => {
                    debug!("No on-chain metadata for {}: {}", target.address, e);
                    TokenMetadata::default()
                }
            }
        };

        let (details, onchain) = tokio::join!(
            self.explorer.contract_details(target.chain_id, &target.address),
            onchain,
        );
        merge_token_info(details, onchain)
    }

    async fn contract_source(&self, target: &ContractTarget) -> AppResult<ContractSource> {
        ensure_supported(target)?;
        let contract = self
            .explorer
            .contract_details(target.chain_id, &target.address)
            .await?;
        if !contract.is_verified() {
            return Err(AppError::not_verified(&target.address));
        }
        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn verified() -> ContractSource {
        ContractSource {
            source: "contract Trap {}".into(),
            contract_name: "Trap".into(),
            compiler: "v0.8.19+commit.7dd6d404".into(),
        }
    }

    fn onchain() -> TokenMetadata {
        TokenMetadata {
            name: Some("Trap Token".into()),
            symbol: Some("TRAP".into()),
            decimals: Some(18),
            total_supply: Some(U256::from(1_000_000u64)),
        }
    }

    #[test]
    fn test_verified_token_merges_both_sides() {
        let info = merge_token_info(Ok(verified()), onchain()).unwrap();
        assert!(info.verified);
        assert_eq!(info.name.as_deref(), Some("Trap Token"));
        assert_eq!(info.symbol.as_deref(), Some("TRAP"));
        assert_eq!(info.total_supply.as_deref(), Some("1000000"));
        assert_eq!(info.contract_name.as_deref(), Some("Trap"));
        assert_eq!(info.compiler.as_deref(), Some("v0.8.19+commit.7dd6d404"));
    }

    #[test]
    fn test_contract_name_fills_missing_onchain_name() {
        let info = merge_token_info(Ok(verified()), TokenMetadata::default()).unwrap();
        assert_eq!(info.name.as_deref(), Some("Trap"));
        assert!(info.symbol.is_none());
    }

    #[test]
    fn test_unverified_token_keeps_onchain_fields() {
        let info = merge_token_info(Ok(ContractSource::default()), onchain()).unwrap();
        assert!(!info.verified);
        assert!(info.contract_name.is_none());
        assert!(info.compiler.is_none());
        assert_eq!(info.decimals, Some(18));

        let info = merge_token_info(Err(AppError::explorer_error("NOTOK")), onchain()).unwrap();
        assert!(!info.verified);
        assert_eq!(info.symbol.as_deref(), Some("TRAP"));
    }

    #[test]
    fn test_nothing_readable_is_an_error() {
        let err = merge_token_info(
            Err(AppError::explorer_error("NOTOK")),
            TokenMetadata::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExplorerError);
    }
}
