//! Remote collaborators.
//!
//! Each external system is reached through a narrow capability trait so the
//! routines in [`crate::tasks`] can be exercised against recording fakes.
//! The production implementations live in the submodules: [`GithubClient`]
//! for the issue tracker, [`JiraClient`] for the ticketing system and
//! [`SlackClient`] for the chat tool.

pub mod github;
pub mod jira;
pub mod slack;

pub use github::GithubClient;
pub use jira::JiraClient;
pub use slack::SlackClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pagination::Page;

// =============================================================================
// Issue tracker domain types
// =============================================================================

/// A repository label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A labelable item (issue or pull request) as seen by the triage sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledItem {
    pub id: String,
    pub number: u64,
    pub title: String,
    /// Label names only; ids are resolved separately when mutating.
    pub labels: Vec<String>,
}

/// Membership of an item on one project board.
///
/// `item_id` is the membership record's own id, distinct from the item id;
/// field mutations address the membership, not the item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub item_id: String,
    pub project_number: u64,
    /// Current value of the board's "Status" field, if set.
    pub status: Option<String>,
}

/// An issue or pull request together with its board memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWithMemberships {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    pub memberships: Vec<ProjectMembership>,
}

/// One option of a single-select board field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

/// A single-select field on a project board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectField {
    pub id: String,
    pub name: String,
    pub options: Vec<SelectOption>,
}

impl SelectField {
    /// Option with exactly this name.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Option with this name, compared case-insensitively.
    #[must_use]
    pub fn option_ignore_case(&self, name: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

/// A project board's identity and single-select schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSchema {
    pub id: String,
    pub title: String,
    pub fields: Vec<SelectField>,
}

impl ProjectSchema {
    /// Field with this name, if the board has one.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SelectField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One item on a project board, as returned by the board listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardItem {
    /// Current "Status" value of the membership.
    pub status: Option<String>,
    /// The underlying issue; `None` for draft items and other content.
    pub issue: Option<BoardIssue>,
}

/// Issue content of a board item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardIssue {
    pub id: String,
    pub title: String,
    pub number: u64,
    pub url: String,
    /// Type tag such as "Epic", when the tracker assigns one.
    pub item_type: Option<String>,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Board status of an item within one project, from a search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardStatus {
    pub project_number: u64,
    pub status: Option<String>,
}

/// An issue returned by the stale-candidate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleCandidate {
    pub id: String,
    pub title: String,
    pub number: u64,
    pub url: String,
    pub labels: Vec<String>,
    /// Type of the parent item, e.g. "Epic".
    pub parent_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub boards: Vec<BoardStatus>,
}

impl StaleCandidate {
    /// The item's status on a specific board, if it is a member there.
    #[must_use]
    pub fn status_on(&self, project_number: u64) -> Option<&str> {
        self.boards
            .iter()
            .find(|b| b.project_number == project_number)
            .and_then(|b| b.status.as_deref())
    }
}

/// A pull request returned by search, with enough context to notify or close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub number: u64,
    pub url: String,
    pub owner: String,
    pub repository: String,
    pub assignees: Vec<String>,
    pub requested_reviewers: Vec<String>,
    pub closing_issues: Vec<LinkedIssue>,
}

/// An issue linked to a pull request via a closing reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub id: String,
    pub title: String,
    pub number: u64,
    pub url: String,
    pub owner: String,
    pub repository: String,
}

/// A repository milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
}

/// A branch head, for stale-branch cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub committed_at: DateTime<Utc>,
    /// Number of pull requests ever associated with the branch.
    pub pull_request_count: u64,
}

/// A workflow run, for stuck-run cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Ticketing domain types
// =============================================================================

/// A ticket in the external ticketing system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub links: Vec<TicketLink>,
}

/// A typed link from one ticket to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketLink {
    pub kind: String,
    pub key: String,
}

/// Request to create a documentation task.
#[derive(Debug, Clone)]
pub struct NewDocTask {
    /// Ticketing-system project to file the task under.
    pub project_id: u64,
    pub summary: String,
    /// URL of the source-forge item the task documents.
    pub source_url: String,
    /// Optional description prefix; a default is used when absent.
    pub description: Option<String>,
}

// =============================================================================
// Chat domain types
// =============================================================================

/// A messaging-platform account resolved from a verified email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Capability traits
// =============================================================================

/// Query and mutation surface of the issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Look up a label by name within a repository.
    async fn label(&self, owner: &str, repo: &str, name: &str) -> Result<Option<Label>>;

    /// One page of open issues with their label names.
    async fn open_issues(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<LabeledItem>>;

    /// One page of open pull requests with their label names.
    async fn open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<LabeledItem>>;

    /// An issue with its project-board memberships and current statuses.
    async fn issue_with_memberships(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships>;

    /// A pull request with its project-board memberships.
    async fn pull_request_with_memberships(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships>;

    /// A board's identity and single-select field schema.
    async fn project_schema(&self, organization: &str, number: u64) -> Result<ProjectSchema>;

    /// Resolve a board's node id from its number.
    async fn project_id(&self, organization: &str, number: u64) -> Result<String>;

    /// One page of a board's items.
    async fn project_items(&self, project_id: &str, cursor: Option<String>)
        -> Result<Page<BoardItem>>;

    /// One page of an item's comments.
    async fn comments(&self, item_id: &str, cursor: Option<String>) -> Result<Page<Comment>>;

    /// Search issues eligible for stale handling (single page, server cap).
    async fn search_stale_issues(&self, query: &str) -> Result<Vec<StaleCandidate>>;

    /// Search pull requests (single page, server cap).
    async fn search_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>>;

    /// Verified organizational email addresses for a user.
    async fn verified_domain_emails(&self, login: &str, organization: &str)
        -> Result<Vec<String>>;

    /// One page of a repository's milestones.
    async fn milestones(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<Milestone>>;

    /// One page of a repository's branch heads.
    async fn branches(&self, owner: &str, repo: &str, cursor: Option<String>)
        -> Result<Page<Branch>>;

    /// Workflow runs currently queued for a repository.
    async fn queued_workflow_runs(&self, owner: &str, repo: &str) -> Result<Vec<WorkflowRun>>;

    // --- mutations -----------------------------------------------------------

    async fn add_label(&self, item_id: &str, label_id: &str) -> Result<()>;

    async fn remove_label(&self, item_id: &str, label_id: &str) -> Result<()>;

    /// Close an issue as not planned.
    async fn close_issue(&self, issue_id: &str) -> Result<()>;

    async fn close_pull_request(&self, pull_request_id: &str) -> Result<()>;

    async fn add_comment(&self, item_id: &str, body: &str) -> Result<Comment>;

    /// Ensure an item is on a board; returns the membership id.
    async fn add_board_item(&self, project_id: &str, content_id: &str) -> Result<String>;

    /// Set a single-select field on a board membership.
    async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<()>;

    async fn create_milestone(&self, owner: &str, repo: &str, title: &str) -> Result<Milestone>;

    /// Assign an issue or pull request to a milestone.
    async fn set_milestone(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        milestone_number: u64,
    ) -> Result<()>;

    async fn delete_branch(&self, owner: &str, repo: &str, name: &str) -> Result<()>;

    async fn cancel_workflow_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<()>;
}

/// Surface of the external ticketing system.
#[async_trait]
pub trait TicketSystem: Send + Sync {
    /// Create a documentation task, returning the new ticket.
    async fn create_task(&self, task: &NewDocTask) -> Result<Ticket>;

    /// Search tickets with a structured query.
    async fn search(&self, query: &str) -> Result<Vec<Ticket>>;

    /// Human-facing URL for a ticket key.
    fn browse_url(&self, key: &str) -> String;
}

/// Surface of the messaging platform.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Resolve a user from a verified email; `None` when no account matches.
    async fn user_by_email(&self, email: &str) -> Result<Option<ChatUser>>;

    /// Send a direct message to a resolved user.
    async fn send_dm(&self, user_id: &str, text: &str) -> Result<()>;
}
