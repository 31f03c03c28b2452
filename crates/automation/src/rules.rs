//! Pure decision rules.
//!
//! Everything in this module takes already-fetched data and returns a
//! classification or a target state. No network access, no side effects;
//! the routines in [`crate::tasks`] turn these decisions into mutations.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use regex::Regex;

/// Label marking items awaiting triage.
pub const NEEDS_TRIAGE_LABEL: &str = "needs-triage";
/// Label prefixes that count as "already triaged".
pub const TRIAGE_PREFIXES: &[&str] = &["domain/", "service/"];
/// Prefix of priority labels, e.g. `priority/low`.
pub const PRIORITY_PREFIX: &str = "priority/";
/// Prefix of milestone labels, e.g. `milestone/6.7.0`.
pub const MILESTONE_PREFIX: &str = "milestone/";
/// Label marking close candidates during the grace period.
pub const ABOUT_TO_CLOSE_LABEL: &str = "AboutToClose";
/// Label exempting an item from stale closing.
pub const DO_NOT_CLOSE_LABEL: &str = "DoNotClose";

/// Name of the single-select status field on project boards.
pub const STATUS_FIELD: &str = "Status";
/// Name of the single-select priority field on project boards.
pub const PRIORITY_FIELD: &str = "Priority";

/// Days without activity before an open item becomes a close candidate.
pub const DAYS_UNTIL_STALE: i64 = 180;
/// Days a close candidate must stay unchanged before it is closed.
pub const DAYS_UNTIL_CLOSE: i64 = 30;

const DOC_TASK_TOKEN: &str = "docs-task-created";

/// What the triage rule decided for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageAction {
    /// Add the `needs-triage` label.
    Add,
    /// Remove the `needs-triage` label.
    Remove,
    /// Leave the item alone.
    None,
}

/// Evaluate the triage truth table for an item's label names.
///
/// An item needs the marker if it carries neither the marker nor any
/// `domain/`/`service/` label; it loses the marker once a domain or service
/// label arrives. Every other combination is a no-op, which makes the rule
/// a fixed point after one application.
#[must_use]
pub fn evaluate_triage(labels: &[String]) -> TriageAction {
    let has_needs_triage = labels.iter().any(|l| l == NEEDS_TRIAGE_LABEL);
    let has_domain_or_service = labels
        .iter()
        .any(|l| TRIAGE_PREFIXES.iter().any(|p| l.starts_with(p)));

    match (has_needs_triage, has_domain_or_service) {
        (true, true) => TriageAction::Remove,
        (false, false) => TriageAction::Add,
        _ => TriageAction::None,
    }
}

/// Extract the priority value from a `priority/<value>` label, if any.
#[must_use]
pub fn priority_from_labels(labels: &[String]) -> Option<&str> {
    labels
        .iter()
        .find_map(|l| l.strip_prefix(PRIORITY_PREFIX))
        .filter(|v| !v.is_empty())
}

/// Extract the milestone title from a `milestone/<title>` label, if any.
#[must_use]
pub fn milestone_from_labels(labels: &[String]) -> Option<&str> {
    labels
        .iter()
        .find_map(|l| l.strip_prefix(MILESTONE_PREFIX))
        .filter(|v| !v.is_empty())
}

/// Filter on the current status value of a board membership.
#[derive(Debug, Clone)]
pub enum StatusFilter {
    /// Case-insensitive exact match.
    Exact(String),
    /// Regular-expression match.
    Pattern(Regex),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(&self, status: &str) -> bool {
        match self {
            Self::Exact(expected) => status.eq_ignore_ascii_case(expected),
            Self::Pattern(pattern) => pattern.is_match(status),
        }
    }
}

/// Decide whether an open item qualifies as a close candidate.
///
/// Qualifies when its priority label suffix is `low` OR its board status is
/// `Backlog`, AND its parent is not an Epic, AND it is older than
/// [`DAYS_UNTIL_STALE`] days. Items carrying [`DO_NOT_CLOSE_LABEL`] never
/// qualify (the search query also excludes them; this keeps the rule total).
#[must_use]
pub fn is_close_candidate(
    labels: &[String],
    board_status: Option<&str>,
    parent_type: Option<&str>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if labels.iter().any(|l| l == DO_NOT_CLOSE_LABEL) {
        return false;
    }

    let low_priority = priority_from_labels(labels) == Some("low");
    let backlog = board_status == Some("Backlog");
    let parent_is_epic = parent_type == Some("Epic");
    let old_enough = now - created_at >= Duration::days(DAYS_UNTIL_STALE);

    (low_priority || backlog) && !parent_is_epic && old_enough
}

/// Whether a board item is an epic currently in progress.
#[must_use]
pub fn is_epic_in_progress(status: Option<&str>, item_type: Option<&str>) -> bool {
    status.is_some_and(|s| s.eq_ignore_ascii_case("in progress"))
        && item_type.is_some_and(|t| t.eq_ignore_ascii_case("epic"))
}

/// The hidden marker token embedded in doc-task reference comments.
///
/// Base64-encoded so casual comment edits don't collide with it. This token
/// is the only record linking an item to its documentation ticket; editing
/// or deleting the carrying comment silently re-enables ticket creation.
#[must_use]
pub fn doc_task_marker() -> String {
    BASE64.encode(DOC_TASK_TOKEN)
}

/// Whether a comment body references an existing documentation ticket.
#[must_use]
pub fn references_doc_task(body: &str) -> bool {
    body.contains(&doc_task_marker())
}

/// Build the reference comment posted after creating a documentation ticket.
#[must_use]
pub fn doc_task_comment_body(prefix: Option<&str>, ticket_key: &str, browse_url: &str) -> String {
    let prefix = prefix.unwrap_or("A documentation task has been created for this issue:");
    format!(
        "{prefix} [{ticket_key}]({browse_url}). <!-- {} -->",
        doc_task_marker()
    )
}

/// Search query for stale-candidate issues on a project board.
///
/// Only the hard exclusions (already marked, explicitly protected) and the
/// age cutoff live in the query; the priority/Backlog decision belongs to
/// [`is_close_candidate`].
#[must_use]
pub fn stale_candidate_query(
    organization: &str,
    repository: &str,
    project_number: u64,
    cutoff: NaiveDate,
) -> String {
    format!(
        "repo:{organization}/{repository} is:issue state:open \
         project:{organization}/{project_number} \
         -label:{ABOUT_TO_CLOSE_LABEL} -label:{DO_NOT_CLOSE_LABEL} created:<={cutoff}"
    )
}

/// Search query for close candidates whose grace period has elapsed.
#[must_use]
pub fn close_candidate_query(organization: &str, repository: &str, cutoff: NaiveDate) -> String {
    format!(
        "repo:{organization}/{repository} is:issue state:open \
         label:{ABOUT_TO_CLOSE_LABEL} updated:<={cutoff}"
    )
}

/// Search query for open, non-draft pull requests inactive since `cutoff`.
#[must_use]
pub fn stale_pull_request_query(organization: &str, cutoff: DateTime<Utc>) -> String {
    format!(
        "org:{organization} is:pr is:open draft:false updated:<{}",
        cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Search query locating a pull request by assignee and head branch, used to
/// resolve its linked development issue.
#[must_use]
pub fn linked_pull_request_query(
    organization: &str,
    repository: &str,
    assignee: &str,
    head_ref: &str,
) -> String {
    format!("repo:{organization}/{repository} is:pr assignee:{assignee} head:{head_ref}")
}
