//! Stale-issue lifecycle: mark close candidates, then close them after a
//! grace period.

use chrono::{Duration, Utc};
use tracing::info;

use crate::clients::IssueTracker;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::rules::{
    close_candidate_query, is_close_candidate, stale_candidate_query, ABOUT_TO_CLOSE_LABEL,
    DAYS_UNTIL_CLOSE, DAYS_UNTIL_STALE,
};

/// Mark stale issues on a board with the close-candidate label.
///
/// Only the framework board carries a stale rule; asking for any other
/// board is an error. Candidates come from a single search page, so runs
/// against a backlog larger than the server page cap pick up the remainder
/// on subsequent runs.
///
/// # Errors
///
/// Returns [`Error::NoStaleRule`] for boards without a stale rule, and
/// [`Error::NotFound`] if the marker label is missing while candidates
/// exist.
pub async fn mark_stale_issues(
    tracker: &dyn IssueTracker,
    config: &Config,
    project_number: u64,
) -> Result<()> {
    if project_number != config.framework_project {
        return Err(Error::NoStaleRule(project_number));
    }

    let now = Utc::now();
    let cutoff = (now - Duration::days(DAYS_UNTIL_STALE)).date_naive();
    let query = stale_candidate_query(
        &config.organization,
        &config.repository,
        project_number,
        cutoff,
    );
    let candidates = tracker.search_stale_issues(&query).await?;

    let eligible: Vec<_> = candidates
        .into_iter()
        .filter(|c| {
            is_close_candidate(
                &c.labels,
                c.status_on(project_number),
                c.parent_type.as_deref(),
                c.created_at,
                now,
            )
        })
        .collect();
    info!("{} issue(s) qualify as close candidates", eligible.len());
    if eligible.is_empty() {
        return Ok(());
    }

    let label = tracker
        .label(&config.organization, &config.repository, ABOUT_TO_CLOSE_LABEL)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "label",
            name: ABOUT_TO_CLOSE_LABEL.to_string(),
        })?;

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    for candidate in eligible {
        let subject = format!("issue #{} '{}'", candidate.number, candidate.title);
        dispatcher.add_label(&label, &candidate.id, &subject).await?;
    }

    Ok(())
}

/// Close issues whose close-candidate marker has sat unchanged through the
/// grace period.
///
/// Any activity on the issue bumps its `updated` timestamp and restarts the
/// clock; removing the label takes it out of the search entirely.
///
/// # Errors
///
/// Fails on the first tracker error.
pub async fn close_stale_issues(tracker: &dyn IssueTracker, config: &Config) -> Result<()> {
    let cutoff = (Utc::now() - Duration::days(DAYS_UNTIL_CLOSE)).date_naive();
    let query = close_candidate_query(&config.organization, &config.repository, cutoff);
    let expired = tracker.search_stale_issues(&query).await?;
    info!("{} issue(s) past the grace period", expired.len());

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    for issue in expired {
        let subject = format!("issue #{} '{}'", issue.number, issue.title);
        dispatcher.close_issue(&issue.id, &subject).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{BoardStatus, StaleCandidate};
    use crate::tasks::testing::{test_config, FakeTracker};

    fn candidate(number: u64, labels: &[&str], status: &str, age_days: i64) -> StaleCandidate {
        StaleCandidate {
            id: format!("I_{number}"),
            title: format!("issue {number}"),
            number,
            url: format!("https://example.com/{number}"),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            parent_type: None,
            created_at: Utc::now() - Duration::days(age_days),
            boards: vec![BoardStatus {
                project_number: 27,
                status: Some(status.to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn marks_only_qualifying_candidates() {
        let mut tracker = FakeTracker::default().with_label(ABOUT_TO_CLOSE_LABEL);
        tracker.stale_results = vec![
            candidate(1, &[], "Backlog", 200),
            candidate(2, &["priority/high"], "Active", 400),
            candidate(3, &[], "Backlog", 10),
        ];

        mark_stale_issues(&tracker, &test_config(false), 27)
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec!["add_label:I_1:label-AboutToClose".to_string()]
        );
    }

    #[tokio::test]
    async fn other_boards_have_no_stale_rule() {
        let tracker = FakeTracker::default();

        let err = mark_stale_issues(&tracker, &test_config(false), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoStaleRule(3)));
        assert!(tracker.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn marker_label_is_only_needed_when_candidates_exist() {
        let tracker = FakeTracker::default();

        // No label configured, but also no candidates: not an error.
        mark_stale_issues(&tracker, &test_config(false), 27)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn closes_everything_past_the_grace_period() {
        let mut tracker = FakeTracker::default();
        tracker.stale_results = vec![
            candidate(7, &["AboutToClose"], "Backlog", 300),
            candidate(8, &["AboutToClose"], "Backlog", 250),
        ];

        close_stale_issues(&tracker, &test_config(false)).await.unwrap();

        assert_eq!(
            tracker.recorded(),
            vec!["close_issue:I_7".to_string(), "close_issue:I_8".to_string()]
        );

        let queries = tracker.queries.lock().unwrap();
        assert!(queries[0].contains("label:AboutToClose"));
        assert!(queries[0].contains("updated:<="));
    }

    #[tokio::test]
    async fn dry_run_closes_nothing() {
        let mut tracker = FakeTracker::default();
        tracker.stale_results = vec![candidate(7, &["AboutToClose"], "Backlog", 300)];

        close_stale_issues(&tracker, &test_config(true)).await.unwrap();

        assert!(tracker.recorded().is_empty());
    }
}
