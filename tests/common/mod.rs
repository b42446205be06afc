//! In-memory collaborator shared by the integration tests

#![allow(dead_code)]

use alloy_primitives::U256;
use async_trait::async_trait;
use std::time::Duration;

use trap_checker::models::types::HolderBalance;
use trap_checker::{
    AppError, AppResult, ContractDataSource, ContractSource, ContractTarget, InterfaceDecl,
    LiquiditySnapshot, SourceText, TokenInfo, TransferRecord,
};

pub const TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const POOL: &str = "0x2222222222222222222222222222222222222222";
pub const WHALE: &str = "0x3333333333333333333333333333333333333333";
pub const TRADER: &str = "0x4444444444444444444444444444444444444444";
pub const COMPILER: &str = "v0.8.19+commit.7dd6d404";

/// Canned collaborator answers. `None` means the collaborator is down.
#[derive(Clone, Default)]
pub struct FakeChain {
    pub source: Option<SourceText>,
    pub functions: Option<Vec<String>>,
    pub liquidity: Option<LiquiditySnapshot>,
    pub transfers: Option<Vec<TransferRecord>>,
    pub token: Option<TokenInfo>,
    /// Added before every answer
    pub delay: Option<Duration>,
    /// Added before the liquidity answer only
    pub liquidity_delay: Option<Duration>,
}

impl FakeChain {
    /// Healthy contract with no risk signals
    pub fn clean() -> Self {
        Self {
            source: Some(SourceText::Flat(
                "contract Token { function transfer(address to, uint256 v) public {} }".into(),
            )),
            functions: Some(vec!["transfer".into(), "balanceOf".into()]),
            liquidity: Some(snapshot(10_000, &[(TRADER, 500)])),
            transfers: Some(vec![transfer("0xa1", TRADER, WHALE)]),
            token: Some(TokenInfo {
                name: Some("Token".into()),
                symbol: Some("TKN".into()),
                decimals: Some(18),
                total_supply: Some("1000000000000000000000000".into()),
                contract_name: Some("Token".into()),
                compiler: Some(COMPILER.into()),
                verified: true,
            }),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, text: &str) -> Self {
        self.source = Some(SourceText::Flat(text.to_string()));
        self
    }

    pub fn with_functions(mut self, functions: &[&str]) -> Self {
        self.functions = Some(functions.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_liquidity(mut self, snapshot: LiquiditySnapshot) -> Self {
        self.liquidity = Some(snapshot);
        self
    }

    pub fn with_transfers(mut self, transfers: Vec<TransferRecord>) -> Self {
        self.transfers = Some(transfers);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub fn snapshot(total_supply: u64, holders: &[(&str, u64)]) -> LiquiditySnapshot {
    LiquiditySnapshot {
        pool_address: POOL.to_string(),
        total_supply: U256::from(total_supply),
        top_holders: holders
            .iter()
            .map(|(address, balance)| HolderBalance {
                address: address.to_string(),
                balance: U256::from(*balance),
            })
            .collect(),
    }
}

pub fn transfer(hash: &str, from: &str, to: &str) -> TransferRecord {
    TransferRecord {
        hash: hash.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        value: "1000".to_string(),
        token_name: "Token".to_string(),
        token_symbol: "TKN".to_string(),
    }
}

pub fn target() -> ContractTarget {
    ContractTarget::new(56, TOKEN)
}

fn down(what: &str) -> AppError {
    AppError::input_unavailable(format!("{} unavailable", what))
}

#[async_trait]
impl ContractDataSource for FakeChain {
    async fn verified_source(&self, _target: &ContractTarget) -> AppResult<SourceText> {
        self.pause().await;
        self.source.clone().ok_or_else(|| down("source"))
    }

    async fn interface(&self, _target: &ContractTarget) -> AppResult<InterfaceDecl> {
        self.pause().await;
        self.functions
            .clone()
            .map(InterfaceDecl::new)
            .ok_or_else(|| down("abi"))
    }

    async fn liquidity(&self, _target: &ContractTarget, _top_n: usize) -> AppResult<LiquiditySnapshot> {
        self.pause().await;
        if let Some(delay) = self.liquidity_delay {
            tokio::time::sleep(delay).await;
        }
        self.liquidity.clone().ok_or_else(|| down("liquidity"))
    }

    async fn recent_transfers(
        &self,
        _target: &ContractTarget,
        limit: usize,
    ) -> AppResult<Vec<TransferRecord>> {
        self.pause().await;
        self.transfers
            .clone()
            .map(|mut page| {
                page.truncate(limit);
                page
            })
            .ok_or_else(|| down("transfers"))
    }

    async fn token_info(&self, _target: &ContractTarget) -> AppResult<TokenInfo> {
        self.pause().await;
        self.token.clone().ok_or_else(|| down("token info"))
    }

    async fn contract_source(&self, target: &ContractTarget) -> AppResult<ContractSource> {
        self.pause().await;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| AppError::not_verified(&target.address))?;
        Ok(ContractSource {
            source: source.flatten().into_owned(),
            contract_name: "Token".into(),
            compiler: COMPILER.into(),
        })
    }
}
