//! Abandoned-branch cleanup.

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::info;

use crate::clients::IssueTracker;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::pagination::collect_all;
use crate::rules::DAYS_UNTIL_STALE;

/// Branches never eligible for deletion, regardless of age.
const PROTECTED_BRANCHES: &[&str] = &["main", "master"];

/// Delete branches whose last commit is older than the stale cutoff and
/// that never had a pull request.
///
/// `exclude` spares any branch whose name matches; the default branches
/// are always spared.
///
/// # Errors
///
/// Fails on the first tracker error.
pub async fn cleanup_branches(
    tracker: &dyn IssueTracker,
    config: &Config,
    exclude: Option<&Regex>,
) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(DAYS_UNTIL_STALE);
    let branches = collect_all(|cursor| {
        tracker.branches(&config.organization, &config.repository, cursor)
    })
    .await?;
    info!("{} branch(es) inspected", branches.len());

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    for branch in branches {
        if PROTECTED_BRANCHES.contains(&branch.name.as_str()) {
            continue;
        }
        if exclude.is_some_and(|pattern| pattern.is_match(&branch.name)) {
            continue;
        }
        if branch.pull_request_count > 0 || branch.committed_at >= cutoff {
            continue;
        }

        dispatcher
            .delete_branch(&config.organization, &config.repository, &branch.name)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Branch;
    use crate::tasks::testing::{test_config, FakeTracker};

    fn branch(name: &str, age_days: i64, pull_request_count: u64) -> Branch {
        Branch {
            name: name.to_string(),
            committed_at: Utc::now() - Duration::days(age_days),
            pull_request_count,
        }
    }

    #[tokio::test]
    async fn deletes_only_old_branches_without_pull_requests() {
        let mut tracker = FakeTracker::default();
        tracker.branches = vec![
            branch("experiment/old", 200, 0),
            branch("feature/active", 200, 2),
            branch("feature/fresh", 10, 0),
            branch("main", 400, 0),
        ];

        cleanup_branches(&tracker, &test_config(false), None)
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec!["delete_branch:experiment/old".to_string()]
        );
    }

    #[tokio::test]
    async fn exclude_pattern_spares_matching_branches() {
        let mut tracker = FakeTracker::default();
        tracker.branches = vec![branch("release/1.0", 400, 0), branch("spike/a", 400, 0)];
        let exclude = Regex::new("^release/").unwrap();

        cleanup_branches(&tracker, &test_config(false), Some(&exclude))
            .await
            .unwrap();

        assert_eq!(tracker.recorded(), vec!["delete_branch:spike/a".to_string()]);
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let mut tracker = FakeTracker::default();
        tracker.branches = vec![branch("experiment/old", 200, 0)];

        cleanup_branches(&tracker, &test_config(true), None)
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }
}
