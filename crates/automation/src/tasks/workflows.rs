//! Stuck-workflow-run cancellation.

use chrono::{Duration, Utc};
use tracing::{error, info};

use crate::clients::IssueTracker;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Hours a run may sit in the queue before it counts as stuck.
const STUCK_AFTER_HOURS: i64 = 2;

/// Force-cancel workflow runs that have been queued for too long.
///
/// Cancellation failures are logged per run and do not stop the sweep;
/// a run that left the queue in the meantime simply fails to cancel.
///
/// # Errors
///
/// Fails only if the queued-run listing itself fails.
pub async fn cancel_stuck_workflow_runs(
    tracker: &dyn IssueTracker,
    config: &Config,
) -> Result<()> {
    let cutoff = Utc::now() - Duration::hours(STUCK_AFTER_HOURS);
    let runs = tracker
        .queued_workflow_runs(&config.organization, &config.repository)
        .await?;
    info!("{} queued run(s) found", runs.len());

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    for run in runs {
        if run.created_at >= cutoff {
            continue;
        }
        let subject = format!("run {} '{}'", run.id, run.name);
        if let Err(err) = dispatcher
            .cancel_workflow_run(&config.organization, &config.repository, run.id, &subject)
            .await
        {
            error!("failed to cancel {subject}: {err}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::WorkflowRun;
    use crate::tasks::testing::{test_config, FakeTracker};

    fn run(id: u64, queued_hours: i64) -> WorkflowRun {
        WorkflowRun {
            id,
            name: format!("ci-{id}"),
            created_at: Utc::now() - Duration::hours(queued_hours),
        }
    }

    #[tokio::test]
    async fn cancels_runs_queued_past_the_threshold() {
        let mut tracker = FakeTracker::default();
        tracker.queued_runs = vec![run(1, 3), run(2, 1), run(3, 48)];

        cancel_stuck_workflow_runs(&tracker, &test_config(false))
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec![
                "cancel_workflow_run:1".to_string(),
                "cancel_workflow_run:3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_cancels_nothing() {
        let mut tracker = FakeTracker::default();
        tracker.queued_runs = vec![run(1, 3)];

        cancel_stuck_workflow_runs(&tracker, &test_config(true))
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }
}
