//! Utils Module - Shared Helpers
//!
//! Constants, the assessment cache and process-wide telemetry.

pub mod cache;
pub mod constants;
pub mod telemetry;

pub use cache::*;
pub use constants::*;
pub use telemetry::*;
