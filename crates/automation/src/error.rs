//! Error types for the automation library.

use thiserror::Error;

/// Errors that can occur while running an automation routine.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid process configuration (credential, host, flag).
    #[error("configuration error: {0}")]
    Config(String),

    /// A required remote entity (label, field, option, milestone) is absent.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// No stale rule is configured for the given project board.
    #[error("no stale rule configured for project {0}")]
    NoStaleRule(u64),

    /// A remote API rejected the request.
    #[error("{service} API error: {status} - {body}")]
    Api {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// The GraphQL endpoint returned errors instead of data.
    #[error("GraphQL errors: {0}")]
    Graphql(String),

    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
