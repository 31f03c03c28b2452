//! Stale-pull-request reminders.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::clients::{ChatService, ChatUser, IssueTracker, PullRequest};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::rules::stale_pull_request_query;

/// Comment left on a pull request closed for inactivity.
const CLOSE_COMMENT: &str =
    "Closing this pull request due to inactivity. Reopen it if the work is still relevant.";

/// Tuning for the stale-pull-request sweep.
#[derive(Debug, Clone)]
pub struct StalePullRequestOptions {
    /// Days without activity before a reminder is sent.
    pub days: i64,
    /// Also close the pull request after notifying.
    pub close: bool,
}

impl Default for StalePullRequestOptions {
    fn default() -> Self {
        Self {
            days: 7,
            close: false,
        }
    }
}

/// Remind assignees of organization-wide pull requests that have gone quiet,
/// optionally closing them.
///
/// The reminder goes to the first assignee's chat account, resolved through
/// their organization-verified emails. Pull requests without an assignee,
/// without verified emails or without a resolvable chat account are skipped,
/// never failed.
///
/// # Errors
///
/// Fails on the first tracker or chat transport error.
pub async fn notify_stale_pull_requests(
    tracker: &dyn IssueTracker,
    chat: &dyn ChatService,
    config: &Config,
    options: &StalePullRequestOptions,
) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(options.days);
    let query = stale_pull_request_query(&config.organization, cutoff);
    let pull_requests = tracker.search_pull_requests(&query).await?;
    info!("{} stale pull request(s) found", pull_requests.len());

    let tracker_dispatch = Dispatcher::new(tracker, config.dry_run);
    let chat_dispatch = Dispatcher::new(chat, config.dry_run);

    for pr in pull_requests {
        let subject = format!("{}/{}#{}", pr.owner, pr.repository, pr.number);

        let Some(assignee) = pr.assignees.first() else {
            debug!("{subject} has no assignee, skipping");
            continue;
        };

        let emails = tracker
            .verified_domain_emails(assignee, &config.organization)
            .await?;
        if emails.is_empty() {
            info!("{assignee} has no verified emails, skipping {subject}");
            continue;
        }

        let Some(user) = resolve_user(chat, &emails).await? else {
            warn!("no chat account found for {assignee}, skipping {subject}");
            continue;
        };

        let text = reminder_text(&pr, options.days);
        chat_dispatch
            .send_dm(&user.id, &text, &format!("{assignee} about {subject}"))
            .await?;

        if options.close {
            tracker_dispatch
                .add_comment(&pr.id, CLOSE_COMMENT, &subject)
                .await?;
            tracker_dispatch.close_pull_request(&pr.id, &subject).await?;
        }
    }

    Ok(())
}

async fn resolve_user(chat: &dyn ChatService, emails: &[String]) -> Result<Option<ChatUser>> {
    for email in emails {
        if email.trim().is_empty() {
            continue;
        }
        if let Some(user) = chat.user_by_email(email).await? {
            return Ok(Some(user));
        }
    }
    Ok(None)
}

fn reminder_text(pr: &PullRequest, days: i64) -> String {
    format!(
        "Your pull request <{}|{} #{}> has seen no activity for {days} days. \
         Please move it forward or close it.",
        pr.url, pr.title, pr.number
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::{test_config, FakeChat, FakeTracker};

    fn pr(number: u64, assignees: &[&str]) -> PullRequest {
        PullRequest {
            id: format!("PR_{number}"),
            title: format!("change {number}"),
            number,
            url: format!("https://example.com/pull/{number}"),
            owner: "acme".to_string(),
            repository: "platform".to_string(),
            assignees: assignees.iter().map(|a| (*a).to_string()).collect(),
            requested_reviewers: Vec::new(),
            closing_issues: Vec::new(),
        }
    }

    #[tokio::test]
    async fn reminds_the_first_assignee() {
        let mut tracker = FakeTracker::default();
        tracker.pull_request_results = vec![pr(1, &["alice", "bob"])];
        tracker
            .emails
            .insert("alice".to_string(), vec!["alice@acme.dev".to_string()]);
        let chat = FakeChat::default().with_user("alice@acme.dev", "U123");

        notify_stale_pull_requests(
            &tracker,
            &chat,
            &test_config(false),
            &StalePullRequestOptions::default(),
        )
        .await
        .unwrap();

        let messages = chat.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "U123");
        assert!(messages[0].1.contains("https://example.com/pull/1"));
        assert!(messages[0].1.contains("7 days"));
        assert!(tracker.recorded().is_empty());
    }

    #[tokio::test]
    async fn skips_unassigned_and_unresolvable() {
        let mut tracker = FakeTracker::default();
        tracker.pull_request_results = vec![pr(1, &[]), pr(2, &["carol"]), pr(3, &["dave"])];
        // carol has no verified emails; dave's email resolves to nobody
        tracker
            .emails
            .insert("dave".to_string(), vec![String::new(), "dave@acme.dev".to_string()]);
        let chat = FakeChat::default();

        notify_stale_pull_requests(
            &tracker,
            &chat,
            &test_config(false),
            &StalePullRequestOptions::default(),
        )
        .await
        .unwrap();

        assert!(chat.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_mode_comments_then_closes() {
        let mut tracker = FakeTracker::default();
        tracker.pull_request_results = vec![pr(4, &["alice"])];
        tracker
            .emails
            .insert("alice".to_string(), vec!["alice@acme.dev".to_string()]);
        let chat = FakeChat::default().with_user("alice@acme.dev", "U123");

        notify_stale_pull_requests(
            &tracker,
            &chat,
            &test_config(false),
            &StalePullRequestOptions {
                days: 14,
                close: true,
            },
        )
        .await
        .unwrap();

        let recorded = tracker.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].starts_with("add_comment:PR_4:"));
        assert_eq!(recorded[1], "close_pull_request:PR_4");
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let mut tracker = FakeTracker::default();
        tracker.pull_request_results = vec![pr(5, &["alice"])];
        tracker
            .emails
            .insert("alice".to_string(), vec!["alice@acme.dev".to_string()]);
        let chat = FakeChat::default().with_user("alice@acme.dev", "U123");

        notify_stale_pull_requests(
            &tracker,
            &chat,
            &test_config(true),
            &StalePullRequestOptions {
                days: 7,
                close: true,
            },
        )
        .await
        .unwrap();

        assert!(chat.messages.lock().unwrap().is_empty());
        assert!(tracker.recorded().is_empty());
    }
}
