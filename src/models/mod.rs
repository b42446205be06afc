//! Models Module - Data Structures & Configuration
//!
//! Single source of truth for the data model, error taxonomy and configuration.
//! No tunable values live outside this module and `utils::constants`.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
