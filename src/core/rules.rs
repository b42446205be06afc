//! Pattern Rule Set
//!
//! Immutable table of (detector, label, weight) entries for two categories:
//! general code traps and owner privileges. Compiled once at first use and
//! shared read-only by every request.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::warn;

use crate::models::types::Advisory;

/// Rule category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// General trap pattern in the contract code
    CodeTrap,
    /// Privileged function the owner can call
    OwnerTrap,
}

/// Static description of one rule, before its matcher is compiled
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub id: &'static str,
    pub category: RuleCategory,
    /// Case-insensitive regex over the whole source text
    pub pattern: &'static str,
    pub label: &'static str,
    pub weight: u32,
    /// Advisory emitted when this rule fires
    pub advisory: Option<Advisory>,
}

/// Compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub category: RuleCategory,
    pub label: &'static str,
    pub weight: u32,
    pub advisory: Option<Advisory>,
    matcher: Option<Regex>,
}

impl Rule {
    fn compile(spec: &RuleSpec) -> Self {
        let matcher = match RegexBuilder::new(spec.pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("⚠️ Rule '{}' has an unusable pattern, skipping: {}", spec.id, e);
                None
            }
        };

        Self {
            id: spec.id,
            category: spec.category,
            label: spec.label,
            weight: spec.weight,
            advisory: spec.advisory,
            matcher,
        }
    }

    /// `None` when the matcher could not be compiled
    pub fn matches(&self, text: &str) -> Option<bool> {
        self.matcher.as_ref().map(|re| re.is_match(text))
    }

    pub fn is_usable(&self) -> bool {
        self.matcher.is_some()
    }
}

/// Ordered, immutable rule table
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_specs(specs: &[RuleSpec]) -> Self {
        Self {
            rules: specs.iter().map(Rule::compile).collect(),
        }
    }

    /// Built-in code-trap and owner-trap rules
    pub fn standard() -> Self {
        Self::from_specs(&STANDARD_RULE_SPECS)
    }

    /// Rules in table order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn by_category(&self, category: RuleCategory) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

lazy_static! {
    /// Process-wide standard rule set
    pub static ref STANDARD_RULES: Arc<RuleSet> = Arc::new(RuleSet::standard());
}

const fn code(
    id: &'static str,
    pattern: &'static str,
    label: &'static str,
    weight: u32,
    advisory: Option<Advisory>,
) -> RuleSpec {
    RuleSpec {
        id,
        category: RuleCategory::CodeTrap,
        pattern,
        label,
        weight,
        advisory,
    }
}

const fn owner(
    id: &'static str,
    pattern: &'static str,
    label: &'static str,
    weight: u32,
    advisory: Option<Advisory>,
) -> RuleSpec {
    RuleSpec {
        id,
        category: RuleCategory::OwnerTrap,
        pattern,
        label,
        weight,
        advisory,
    }
}

/// Built-in rules. Table order is display order.
pub const STANDARD_RULE_SPECS: [RuleSpec; 15] = [
    // Code traps
    code(
        "tx_origin_equality",
        r"tx\.origin\s*==",
        "tx.origin == ... (router trap)",
        15,
        Some(Advisory::TxOriginTrap),
    ),
    code(
        "tx_origin_require",
        r"require\s*\(\s*tx\.origin\s*!=",
        "require(tx.origin != ...) (blocks router/MEV)",
        10,
        Some(Advisory::TxOriginTrap),
    ),
    code(
        "trading_flags",
        r"swapEnabled|enableTrading|tradingOpen",
        "swapEnabled / tradingOpen flags",
        8,
        None,
    ),
    code(
        "sell_delay",
        r"_buyCount\s*<\s*_preventSwapBefore|_preventSwapBefore",
        "_buyCount/_preventSwapBefore (delayed selling)",
        6,
        None,
    ),
    code(
        "sell_count_limit",
        r"sellCount|Only\s+\d+\s+sells\s+per\s+block",
        "Sell count limit per block",
        6,
        None,
    ),
    code(
        "prevent_transfer",
        r"_preventTransfer|preventTransfer",
        "_preventTransfer (hidden transfer block)",
        6,
        None,
    ),
    code(
        "tax_wallet",
        r"manualSwap|sendETHToFee|_taxWallet",
        "manualSwap/sendETHToFee/taxWallet (tax withdrawn to dev wallet)",
        10,
        Some(Advisory::TaxWallet),
    ),
    code(
        "self_created_pair",
        r"createPair|addLiquidityETH|factory\(\)",
        "createPair/addLiquidity (self-created LP, can be pulled)",
        8,
        None,
    ),
    code(
        "blacklist",
        r"blacklist|bots\[|isBlacklisted",
        "Blacklist / anti-bot",
        12,
        Some(Advisory::Blacklist),
    ),
    code(
        "tx_limits",
        r"maxTxAmount|maxWalletSize|_maxTxAmount",
        "Transaction / wallet limits",
        5,
        None,
    ),
    // Owner privileges
    owner(
        "mint",
        r"mint\s*\(",
        "Owner can mint new tokens (unlimited supply)",
        20,
        Some(Advisory::Mint),
    ),
    owner(
        "set_tax",
        r"setTax|updateTax|changeTax",
        "Owner can change taxes",
        10,
        None,
    ),
    owner(
        "trading_toggle",
        r"setTradingEnabled|toggleTrading|openTrading",
        "Owner can enable/disable trading",
        10,
        Some(Advisory::TradingToggle),
    ),
    owner(
        "owner_blacklist",
        r"blacklist|setBlacklist|addBlacklist",
        "Owner can add wallets to a blacklist",
        10,
        Some(Advisory::Blacklist),
    ),
    owner(
        "renounce",
        r"renounceOwnership",
        "renounceOwnership function present",
        5,
        None,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_rules_compile() {
        let rules = RuleSet::standard();
        assert_eq!(rules.len(), STANDARD_RULE_SPECS.len());
        assert!(rules.iter().all(Rule::is_usable));
    }

    #[test]
    fn test_rule_ids_unique() {
        let ids: HashSet<_> = STANDARD_RULE_SPECS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), STANDARD_RULE_SPECS.len());
    }

    #[test]
    fn test_category_split() {
        let rules = RuleSet::standard();
        assert_eq!(rules.by_category(RuleCategory::CodeTrap).count(), 10);
        assert_eq!(rules.by_category(RuleCategory::OwnerTrap).count(), 5);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let rules = RuleSet::standard();
        let rule = rules.get("tx_origin_equality").unwrap();
        assert_eq!(rule.matches("if (TX.ORIGIN == owner) revert();"), Some(true));
        assert_eq!(rule.matches("msg.sender == owner"), Some(false));

        let sells = rules.get("sell_count_limit").unwrap();
        assert_eq!(sells.matches("// only 3 sells per block"), Some(true));
    }

    #[test]
    fn test_broken_pattern_is_unusable() {
        let specs = [code("broken", r"(unclosed", "broken", 7, None)];
        let rules = RuleSet::from_specs(&specs);
        let rule = rules.get("broken").unwrap();
        assert!(!rule.is_usable());
        assert_eq!(rule.matches("anything"), None);
    }

    #[test]
    fn test_mint_rule_requires_call_syntax() {
        let rules = RuleSet::standard();
        let mint = rules.get("mint").unwrap();
        assert_eq!(mint.matches("function mint (address to)"), Some(true));
        assert_eq!(mint.matches("uint256 mintedSupply;"), Some(false));
    }
}
