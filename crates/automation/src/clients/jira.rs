//! Jira REST v3 client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{NewDocTask, Ticket, TicketLink, TicketSystem};
use crate::config::JiraCredentials;
use crate::error::{Error, Result};

/// Description lead-in used when the caller does not supply one.
const DEFAULT_DESCRIPTION: &str = "Please create documentation for the following work item:";

/// Jira client for the ticket-system capability.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    host: String,
    base_url: String,
    username: String,
    api_token: String,
}

impl JiraClient {
    /// Create a client for the given Jira site.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credentials: &JiraCredentials) -> Result<Self> {
        let base_url = format!("https://{}/rest/api/3", credentials.host);
        Self::with_base_url(credentials, &base_url)
    }

    /// Create a client against a non-default API root (used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(credentials: &JiraCredentials, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            host: credentials.host.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: credentials.username.clone(),
            api_token: credentials.api_token.clone(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .basic_auth(&self.username, Some(&self.api_token))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "Jira",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Atlassian Document Format body: a lead-in paragraph plus a one-entry
    /// bullet list linking the source item.
    fn description_document(prefix: &str, source_url: &str) -> Value {
        json!({
            "type": "doc",
            "version": 1,
            "content": [
                {
                    "type": "paragraph",
                    "content": [
                        { "type": "text", "text": prefix }
                    ]
                },
                {
                    "type": "bulletList",
                    "content": [
                        {
                            "type": "listItem",
                            "content": [
                                {
                                    "type": "paragraph",
                                    "content": [
                                        {
                                            "type": "text",
                                            "text": source_url,
                                            "marks": [
                                                {
                                                    "type": "link",
                                                    "attrs": { "href": source_url }
                                                }
                                            ]
                                        }
                                    ]
                                }
                            ]
                        }
                    ]
                }
            ]
        })
    }
}

#[derive(Deserialize)]
struct RawCreatedIssue {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct RawSearchResult {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
    id: String,
    key: String,
    fields: RawIssueFields,
}

#[derive(Deserialize)]
struct RawIssueFields {
    #[serde(default)]
    summary: String,
    status: Option<RawStatus>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    issuelinks: Vec<RawIssueLink>,
}

#[derive(Deserialize)]
struct RawStatus {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssueLink {
    #[serde(rename = "type")]
    link_type: RawLinkType,
    outward_issue: Option<RawLinkedKey>,
    inward_issue: Option<RawLinkedKey>,
}

#[derive(Deserialize)]
struct RawLinkType {
    name: String,
}

#[derive(Deserialize)]
struct RawLinkedKey {
    key: String,
}

#[async_trait]
impl TicketSystem for JiraClient {
    async fn create_task(&self, task: &NewDocTask) -> Result<Ticket> {
        let prefix = task.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);
        let body = json!({
            "fields": {
                "project": { "id": task.project_id.to_string() },
                "summary": task.summary,
                "issuetype": { "name": "Task" },
                "description": Self::description_document(prefix, &task.source_url),
            }
        });

        let created: RawCreatedIssue = self.post("/issue", &body).await?;
        debug!(key = %created.key, "created ticket");

        Ok(Ticket {
            id: created.id,
            key: created.key,
            summary: task.summary.clone(),
            status: None,
            labels: Vec::new(),
            links: Vec::new(),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<Ticket>> {
        let body = json!({
            "jql": query,
            "fields": ["summary", "status", "labels", "issuelinks"],
        });

        let result: RawSearchResult = self.post("/search", &body).await?;

        Ok(result
            .issues
            .into_iter()
            .map(|raw| Ticket {
                id: raw.id,
                key: raw.key,
                summary: raw.fields.summary,
                status: raw.fields.status.map(|s| s.name),
                labels: raw.fields.labels,
                links: raw
                    .fields
                    .issuelinks
                    .into_iter()
                    .filter_map(|l| {
                        let key = l.outward_issue.or(l.inward_issue)?.key;
                        Some(TicketLink {
                            kind: l.link_type.name,
                            key,
                        })
                    })
                    .collect(),
            })
            .collect())
    }

    fn browse_url(&self, key: &str) -> String {
        format!("https://{}/browse/{key}", self.host)
    }
}
