//! Milestone assignment driven by `milestone/<title>` labels.

use tracing::{debug, info};

use crate::clients::IssueTracker;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::pagination::collect_all;
use crate::rules::{linked_pull_request_query, milestone_from_labels};

/// The pull request a milestone sync runs for, as delivered by the
/// triggering event.
#[derive(Debug, Clone)]
pub struct PullRequestContext {
    pub number: u64,
    pub head_ref: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
}

/// Assign a pull request's labelled milestone to its linked development
/// issue, or to the pull request itself when no issue is linked.
///
/// The milestone title comes from a `milestone/<title>` label; the
/// milestone is created on first use. Pull requests without such a label
/// are a no-op.
///
/// # Errors
///
/// Fails on the first tracker error.
pub async fn sync_milestone(
    tracker: &dyn IssueTracker,
    config: &Config,
    pr: &PullRequestContext,
) -> Result<()> {
    let subject = format!("pull request #{}", pr.number);

    let Some(title) = milestone_from_labels(&pr.labels) else {
        info!("{subject} carries no milestone label");
        return Ok(());
    };

    let dispatcher = Dispatcher::new(tracker, config.dry_run);

    let milestones = collect_all(|cursor| {
        tracker.milestones(&config.organization, &config.repository, cursor)
    })
    .await?;
    let milestone = match milestones.into_iter().find(|m| m.title == title) {
        Some(existing) => existing,
        None => {
            let Some(created) = dispatcher
                .create_milestone(&config.organization, &config.repository, title)
                .await?
            else {
                // dry-run: nothing to assign to
                return Ok(());
            };
            created
        }
    };

    if let Some(issue) = development_issue(tracker, config, pr).await? {
        dispatcher
            .set_milestone(
                &issue.owner,
                &issue.repository,
                issue.number,
                &milestone,
                &format!("issue #{} '{}'", issue.number, issue.title),
            )
            .await
    } else {
        debug!("{subject} has no linked development issue");
        dispatcher
            .set_milestone(
                &config.organization,
                &config.repository,
                pr.number,
                &milestone,
                &subject,
            )
            .await
    }
}

async fn development_issue(
    tracker: &dyn IssueTracker,
    config: &Config,
    pr: &PullRequestContext,
) -> Result<Option<crate::clients::LinkedIssue>> {
    let Some(assignee) = pr.assignee.as_deref() else {
        return Ok(None);
    };

    let query = linked_pull_request_query(
        &config.organization,
        &config.repository,
        assignee,
        &pr.head_ref,
    );
    let matches = tracker.search_pull_requests(&query).await?;

    Ok(matches
        .into_iter()
        .find(|p| p.number == pr.number)
        .and_then(|p| p.closing_issues.into_iter().next()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{LinkedIssue, Milestone, PullRequest};
    use crate::tasks::testing::{test_config, FakeTracker};

    fn context(labels: &[&str]) -> PullRequestContext {
        PullRequestContext {
            number: 42,
            head_ref: "feature/sync".to_string(),
            assignee: Some("alice".to_string()),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    fn search_hit(number: u64, closing: Vec<LinkedIssue>) -> PullRequest {
        PullRequest {
            id: format!("PR_{number}"),
            title: format!("change {number}"),
            number,
            url: format!("https://example.com/pull/{number}"),
            owner: "acme".to_string(),
            repository: "platform".to_string(),
            assignees: vec!["alice".to_string()],
            requested_reviewers: Vec::new(),
            closing_issues: closing,
        }
    }

    #[tokio::test]
    async fn assigns_the_linked_issue_to_an_existing_milestone() {
        let mut tracker = FakeTracker::default();
        tracker.milestones = vec![Milestone {
            number: 3,
            title: "6.7.0".to_string(),
        }];
        tracker.pull_request_results = vec![search_hit(
            42,
            vec![LinkedIssue {
                id: "I_7".to_string(),
                title: "the issue".to_string(),
                number: 7,
                url: "https://example.com/7".to_string(),
                owner: "acme".to_string(),
                repository: "platform".to_string(),
            }],
        )];

        sync_milestone(&tracker, &test_config(false), &context(&["milestone/6.7.0"]))
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec!["set_milestone:acme/platform#7:3".to_string()]
        );
    }

    #[tokio::test]
    async fn creates_the_milestone_and_falls_back_to_the_pull_request() {
        let tracker = FakeTracker::default();

        sync_milestone(&tracker, &test_config(false), &context(&["milestone/7.0.0"]))
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec![
                "create_milestone:7.0.0".to_string(),
                "set_milestone:acme/platform#42:99".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn no_milestone_label_is_a_no_op() {
        let tracker = FakeTracker::default();

        sync_milestone(&tracker, &test_config(false), &context(&["bug"]))
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }

    #[tokio::test]
    async fn dry_run_stops_after_the_would_create_log() {
        let tracker = FakeTracker::default();

        sync_milestone(&tracker, &test_config(true), &context(&["milestone/7.0.0"]))
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }
}
