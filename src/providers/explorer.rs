//! Block Explorer Client - Etherscan v2 unified API
//!
//! One endpoint serves every supported chain; the chain is picked with the
//! `chainid` query parameter. Used for verified source and contract details,
//! ABI, token transfers and LP token holder lists.
//!
//! Explorer responses use `{status, message, result}`; `status != "1"` is an
//! error except for an empty transfer history.

use alloy_primitives::U256;
use eyre::{eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{
    ContractSource, HolderBalance, InterfaceDecl, SourceFile, SourceText, TransferRecord,
};
use crate::utils::constants::{get_chain_name, USER_AGENT as USER_AGENT_CONST};

/// Explorer message for an address without transfers
const NO_TRANSACTIONS: &str = "No transactions found";

/// Raw explorer envelope
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceCodeEntry {
    #[serde(default)]
    source_code: String,
    #[serde(default)]
    contract_name: String,
    #[serde(default)]
    compiler_version: String,
}

impl SourceCodeEntry {
    fn into_contract(self) -> ContractSource {
        ContractSource {
            source: self.source_code,
            contract_name: self.contract_name,
            compiler: self.compiler_version,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HolderEntry {
    #[serde(default)]
    token_holder_address: String,
    #[serde(default)]
    token_holder_quantity: String,
}

/// Etherscan-family explorer client
#[derive(Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExplorerClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build explorer HTTP client: {}", e))?;

        if api_key.is_none() {
            warn!("⚠️ No explorer API key configured; source, ABI and history lookups will be unavailable");
        }

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Run one explorer query and return the raw envelope
    async fn query(&self, chain_id: u64, params: &[(&str, &str)]) -> AppResult<ExplorerResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::missing_api_key("ETHERSCAN_API_KEY"))?;
        let chain = chain_id.to_string();

        let mut query: Vec<(&str, &str)> = vec![("chainid", chain.as_str())];
        query.extend_from_slice(params);
        query.push(("apikey", api_key));

        debug!(
            "🔎 Explorer {} on {}",
            params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&"),
            get_chain_name(chain_id)
        );

        let response = self.client.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if status == 429 {
            return Err(AppError::new(
                ErrorCode::ApiRateLimited,
                "Explorer rate limited (HTTP 429)",
            ));
        }
        if !status.is_success() {
            return Err(AppError::explorer_error(format!("Explorer HTTP error: {}", status)));
        }

        Ok(response.json::<ExplorerResponse>().await?)
    }

    /// `getsourcecode` entry as published. Blank source means not verified.
    pub async fn contract_details(
        &self,
        chain_id: u64,
        address: &str,
    ) -> AppResult<ContractSource> {
        let response = self
            .query(
                chain_id,
                &[("module", "contract"), ("action", "getsourcecode"), ("address", address)],
            )
            .await?;
        ensure_ok(&response)?;
        first_source_entry(response.result)
    }

    /// Verified source, parsed into flat text or a bundle
    pub async fn source_code(&self, chain_id: u64, address: &str) -> AppResult<SourceText> {
        let contract = self.contract_details(chain_id, address).await?;
        let source = parse_source_field(&contract.source);
        if source.is_empty() {
            return Err(AppError::not_verified(address));
        }

        let name = match contract.contract_name.as_str() {
            "" => "unnamed",
            name => name,
        };
        info!(
            "📄 Verified source for {} ({}, {} file(s))",
            address,
            name,
            source.file_count()
        );
        Ok(source)
    }

    /// `getabi`
    pub async fn abi(&self, chain_id: u64, address: &str) -> AppResult<InterfaceDecl> {
        let response = self
            .query(
                chain_id,
                &[("module", "contract"), ("action", "getabi"), ("address", address)],
            )
            .await?;
        ensure_ok(&response)?;

        let raw = response
            .result
            .as_str()
            .ok_or_else(|| AppError::malformed("ABI result is not a string"))?;
        parse_abi(raw)
    }

    /// `tokentx`, newest first
    pub async fn token_transfers(
        &self,
        chain_id: u64,
        token: &str,
        limit: usize,
    ) -> AppResult<Vec<TransferRecord>> {
        let offset = limit.to_string();
        let response = self
            .query(
                chain_id,
                &[
                    ("module", "account"),
                    ("action", "tokentx"),
                    ("contractaddress", token),
                    ("page", "1"),
                    ("offset", offset.as_str()),
                    ("sort", "desc"),
                ],
            )
            .await?;

        if response.status != "1" && response.message.starts_with(NO_TRANSACTIONS) {
            return Ok(Vec::new());
        }
        ensure_ok(&response)?;

        let mut transfers: Vec<TransferRecord> = serde_json::from_value(response.result)?;
        transfers.truncate(limit);
        Ok(transfers)
    }

    /// `tokenholderlist`, sorted by balance descending
    pub async fn token_holders(
        &self,
        chain_id: u64,
        token: &str,
        limit: usize,
    ) -> AppResult<Vec<HolderBalance>> {
        let offset = limit.to_string();
        let response = self
            .query(
                chain_id,
                &[
                    ("module", "token"),
                    ("action", "tokenholderlist"),
                    ("contractaddress", token),
                    ("page", "1"),
                    ("offset", offset.as_str()),
                ],
            )
            .await?;
        ensure_ok(&response)?;

        parse_holders(response.result, limit)
    }
}

fn ensure_ok(response: &ExplorerResponse) -> AppResult<()> {
    if response.status == "1" {
        return Ok(());
    }
    let detail = response.result.as_str().unwrap_or_default();
    let message = format!("{} {}", response.message, detail);
    Err(AppError::explorer_error(message.trim()))
}

fn first_source_entry(result: Value) -> AppResult<ContractSource> {
    let entries: Vec<SourceCodeEntry> = serde_json::from_value(result)?;
    entries
        .into_iter()
        .next()
        .map(SourceCodeEntry::into_contract)
        .ok_or_else(|| AppError::input_unavailable("Explorer returned no source entry"))
}

/// Undo escaped control sequences left in some explorer payloads
fn normalize(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t").replace("\\u0000", "")
}

/// Interpret the explorer `SourceCode` field.
///
/// Multi-file bundles arrive as a JSON object, either standard-json input
/// (`{"language":..,"sources":{name:{content}}}`, often wrapped in an extra
/// pair of braces) or a bare `{name:{content}}` map. Anything that does not
/// parse as a bundle is treated as flat source.
pub fn parse_source_field(raw: &str) -> SourceText {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return SourceText::Flat(normalize(raw));
    }

    let unwrapped = trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .map(|inner| format!("{{{}}}", inner));
    let candidate = unwrapped.as_deref().unwrap_or(trimmed);

    let files = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(mut root)) => {
            let sources = match root.remove("sources") {
                Some(Value::Object(sources)) => sources,
                _ => root,
            };
            sources
                .into_iter()
                .filter_map(|(name, file)| {
                    file.get("content").and_then(Value::as_str).map(|content| SourceFile {
                        name,
                        content: normalize(content),
                    })
                })
                .collect::<Vec<_>>()
        }
        _ => Vec::new(),
    };

    if files.is_empty() {
        SourceText::Flat(normalize(raw))
    } else {
        SourceText::Bundle(files)
    }
}

/// ABI JSON to ordered function names. Unparseable input is `MALFORMED_INPUT`.
pub fn parse_abi(raw: &str) -> AppResult<InterfaceDecl> {
    let entries: Vec<AbiEntry> = serde_json::from_str(raw)
        .map_err(|e| AppError::with_source(ErrorCode::MalformedInput, "ABI is not valid JSON", e))?;

    Ok(InterfaceDecl::new(
        entries
            .into_iter()
            // entries without a type default to functions
            .filter(|e| (e.kind.is_empty() || e.kind == "function") && !e.name.is_empty())
            .map(|e| e.name),
    ))
}

/// Holder list to balances, largest first. Rows with unparseable balances
/// are dropped.
fn parse_holders(result: Value, limit: usize) -> AppResult<Vec<HolderBalance>> {
    let entries: Vec<HolderEntry> = serde_json::from_value(result)?;
    let mut holders: Vec<HolderBalance> = entries
        .into_iter()
        .filter_map(|e| match e.token_holder_quantity.trim().parse::<U256>() {
            Ok(balance) => Some(HolderBalance {
                address: e.token_holder_address,
                balance,
            }),
            Err(_) => {
                warn!("⚠️ Dropping holder {} with invalid balance", e.token_holder_address);
                None
            }
        })
        .collect();

    holders.sort_by(|a, b| b.balance.cmp(&a.balance));
    holders.truncate(limit);
    Ok(holders)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_source_normalized() {
        let source = parse_source_field("pragma solidity ^0.8.0;\\ncontract A {\\tuint x;}\\u0000");
        assert_eq!(
            source,
            SourceText::Flat("pragma solidity ^0.8.0;\ncontract A {\tuint x;}".into())
        );
    }

    #[test]
    fn test_standard_json_bundle_in_double_braces() {
        let raw = r#"{{"language":"Solidity","sources":{"contracts/Token.sol":{"content":"contract Token {}"},"contracts/Ownable.sol":{"content":"contract Ownable {}"}}}}"#;
        match parse_source_field(raw) {
            SourceText::Bundle(files) => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].name, "contracts/Token.sol");
                assert_eq!(files[1].content, "contract Ownable {}");
            }
            other => panic!("expected bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_file_map_bundle() {
        let raw = r#"{"A.sol":{"content":"contract A {}"}}"#;
        let source = parse_source_field(raw);
        assert_eq!(source.flatten(), "contract A {}");
    }

    #[test]
    fn test_unparseable_object_stays_flat() {
        let raw = "{ not json";
        assert_eq!(parse_source_field(raw), SourceText::Flat("{ not json".into()));
    }

    #[test]
    fn test_empty_source_field() {
        assert!(parse_source_field("").is_empty());
    }

    #[test]
    fn test_parse_abi_functions_only() {
        let raw = r#"[
            {"type":"constructor","inputs":[]},
            {"type":"event","name":"OwnershipTransferred"},
            {"type":"function","name":"owner"},
            {"name":"transfer"}
        ]"#;
        let abi = parse_abi(raw).unwrap();
        assert_eq!(abi.functions, vec!["owner".to_string(), "transfer".to_string()]);
    }

    #[test]
    fn test_parse_abi_malformed() {
        let err = parse_abi("Contract source code not verified").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedInput);
    }

    #[test]
    fn test_parse_holders_sorted_and_bounded() {
        let result = serde_json::json!([
            {"TokenHolderAddress": "0xa", "TokenHolderQuantity": "10"},
            {"TokenHolderAddress": "0xb", "TokenHolderQuantity": "5000"},
            {"TokenHolderAddress": "0xc", "TokenHolderQuantity": "oops"},
            {"TokenHolderAddress": "0xd", "TokenHolderQuantity": "700"}
        ]);
        let holders = parse_holders(result, 2).unwrap();
        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0].address, "0xb");
        assert_eq!(holders[1].balance, U256::from(700u64));
    }

    #[test]
    fn test_source_entry_details() {
        let result = serde_json::json!([{
            "SourceCode": "contract Trap {}",
            "ContractName": "Trap",
            "CompilerVersion": "v0.8.19+commit.7dd6d404",
            "ABI": "[]"
        }]);
        let contract = first_source_entry(result).unwrap();
        assert_eq!(contract.contract_name, "Trap");
        assert_eq!(contract.compiler, "v0.8.19+commit.7dd6d404");
        assert!(contract.is_verified());

        let unverified = serde_json::json!([{"SourceCode": "", "ContractName": ""}]);
        assert!(!first_source_entry(unverified).unwrap().is_verified());

        let err = first_source_entry(serde_json::json!([])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InputUnavailable);
    }

    #[test]
    fn test_error_status_surfaces_message() {
        let response = ExplorerResponse {
            status: "0".into(),
            message: "NOTOK".into(),
            result: Value::String("Invalid API Key".into()),
        };
        let err = ensure_ok(&response).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExplorerError);
        assert!(err.message.contains("Invalid API Key"));
    }
}
