//! Core Module - Risk Signal Aggregation Engine
//!
//! The pattern rule set, the four analyzers and the aggregator that turns
//! their findings into one `RiskAssessment`. Analyzers are pure functions;
//! all I/O happens in the aggregator's collecting stage.

pub mod aggregator;
pub mod liquidity;
pub mod ownership;
pub mod rules;
pub mod source_analyzer;
pub mod transactions;

pub use aggregator::*;
pub use liquidity::analyze_liquidity;
pub use ownership::analyze_ownership;
pub use rules::*;
pub use source_analyzer::analyze_source;
pub use transactions::analyze_transfers;
