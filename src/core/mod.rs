//! Reelsmith Core Engine
//!
//! Core pipeline module. Handles directive construction, external tool
//! execution, artifact publication, the asset ledger, and analytics.

pub mod analytics;
pub mod captions;
pub mod config;
pub mod directives;
pub mod fs;
pub mod ledger;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod tools;
pub mod voiceover;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_pipeline;
