//! Process configuration.
//!
//! All recognized settings are collected into a single [`Config`] built once
//! at startup and passed by reference to every routine. Nothing below this
//! layer reads environment variables.

use std::env;

use crate::error::{Error, Result};

/// Environment variable holding the GitHub API token.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// Environment variable enabling dry-run mode (`true` or `1`).
pub const ENV_DRY_RUN: &str = "DRY_RUN";

/// Settings shared by every automation routine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default organization scope for queries and board lookups.
    pub organization: String,
    /// Default repository within the organization.
    pub repository: String,
    /// The one project board with a configured stale rule.
    pub framework_project: u64,
    /// When set, mutations are logged but never sent.
    pub dry_run: bool,
    /// Per-collaborator credentials.
    pub credentials: Credentials,
}

impl Config {
    /// Repository reference in `owner/name` form, for search queries.
    #[must_use]
    pub fn repo_ref(&self) -> String {
        format!("{}/{}", self.organization, self.repository)
    }
}

/// Credentials for the three remote collaborators.
///
/// Only the GitHub token is unconditionally required; Jira and Slack
/// credentials are validated when a routine actually needs them.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub github_token: String,
    pub jira: Option<JiraCredentials>,
    pub slack_token: Option<String>,
}

/// Basic-auth material for the Jira REST API.
#[derive(Debug, Clone)]
pub struct JiraCredentials {
    /// Jira site host, e.g. `example.atlassian.net`.
    pub host: String,
    pub username: String,
    pub api_token: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `GITHUB_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self> {
        let github_token = env::var(ENV_GITHUB_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config(format!("{ENV_GITHUB_TOKEN} is not set")))?;

        let jira = match (
            env::var("JIRA_HOST").ok().filter(|v| !v.is_empty()),
            env::var("JIRA_USERNAME").ok().filter(|v| !v.is_empty()),
            env::var("JIRA_API_TOKEN").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(host), Some(username), Some(api_token)) => Some(JiraCredentials {
                host,
                username,
                api_token,
            }),
            _ => None,
        };

        Ok(Self {
            github_token,
            jira,
            slack_token: env::var("SLACK_TOKEN").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Jira credentials, or a configuration error naming what is missing.
    pub fn require_jira(&self) -> Result<&JiraCredentials> {
        self.jira.as_ref().ok_or_else(|| {
            Error::Config("JIRA_HOST, JIRA_USERNAME and JIRA_API_TOKEN must be set".to_string())
        })
    }

    /// Slack token, or a configuration error.
    pub fn require_slack(&self) -> Result<&str> {
        self.slack_token
            .as_deref()
            .ok_or_else(|| Error::Config("SLACK_TOKEN is not set".to_string()))
    }
}

/// Parse a dry-run setting the way the environment contract defines it.
#[must_use]
pub fn parse_dry_run(value: Option<&str>) -> bool {
    matches!(value, Some("true") | Some("1"))
}

/// Read the dry-run flag from the process environment.
#[must_use]
pub fn dry_run_from_env() -> bool {
    parse_dry_run(env::var(ENV_DRY_RUN).ok().as_deref())
}
