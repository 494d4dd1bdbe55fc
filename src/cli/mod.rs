//! CLI support for resolve-json
//!
//! Provides programmatic access to the `resolve-json` command for embedding
//! in other tools.

mod http;
mod resolve;

pub use http::HttpFetcher;
pub use resolve::{ResolveOptions, execute_resolve};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Resolution failed
    #[error("Resolution error: {0}")]
    Resolve(#[from] crate::ResolveError),

    /// JSON parsing or printing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Variables were not a JSON object
    #[error("Variables must be a JSON object")]
    InvalidVariables,

    /// No input provided
    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
