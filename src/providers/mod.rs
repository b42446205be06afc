//! Providers Module - External Data Sources
//!
//! Explorer, RPC and DexScreener clients plus the `ContractDataSource`
//! seam the aggregator collects its inputs through.

pub mod chain_source;
pub mod dexscreener;
pub mod explorer;
pub mod rpc;

pub use chain_source::*;
pub use dexscreener::*;
pub use explorer::*;
pub use rpc::*;

use async_trait::async_trait;

use crate::models::errors::AppResult;
use crate::models::types::{
    ContractSource, ContractTarget, InterfaceDecl, LiquiditySnapshot, SourceText, TokenInfo,
    TransferRecord,
};

/// Read-only collaborator supplying analyzer inputs for one contract.
/// Every method is independent so the aggregator can call them concurrently.
#[async_trait]
pub trait ContractDataSource: Send + Sync {
    /// Verified source; not verified is an error
    async fn verified_source(&self, target: &ContractTarget) -> AppResult<SourceText>;

    /// Declared function names from the ABI
    async fn interface(&self, target: &ContractTarget) -> AppResult<InterfaceDecl>;

    /// LP token supply and its `top_n` largest holders
    async fn liquidity(&self, target: &ContractTarget, top_n: usize) -> AppResult<LiquiditySnapshot>;

    /// Most recent `limit` token transfers, newest first
    async fn recent_transfers(
        &self,
        target: &ContractTarget,
        limit: usize,
    ) -> AppResult<Vec<TransferRecord>>;

    /// Explorer contract details merged with on-chain ERC-20 metadata
    async fn token_info(&self, target: &ContractTarget) -> AppResult<TokenInfo>;

    /// Raw published source; not verified is an error
    async fn contract_source(&self, target: &ContractTarget) -> AppResult<ContractSource>;
}
