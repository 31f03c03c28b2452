//! Triage-marker sweep over all open issues and pull requests.

use tracing::info;

use crate::clients::{IssueTracker, LabeledItem};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::pagination::collect_all;
use crate::rules::{evaluate_triage, TriageAction, NEEDS_TRIAGE_LABEL};

/// Reconcile the `needs-triage` marker across every open item.
///
/// Items without a `domain/` or `service/` label gain the marker; items that
/// have been routed lose it. Running the sweep twice in a row changes
/// nothing on the second pass.
///
/// # Errors
///
/// Fails fast if the marker label does not exist in the repository, or on
/// the first tracker error.
pub async fn cleanup_needs_triage(tracker: &dyn IssueTracker, config: &Config) -> Result<()> {
    let label = tracker
        .label(&config.organization, &config.repository, NEEDS_TRIAGE_LABEL)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "label",
            name: NEEDS_TRIAGE_LABEL.to_string(),
        })?;

    let issues = collect_all(|cursor| {
        tracker.open_issues(&config.organization, &config.repository, cursor)
    })
    .await?;
    let pull_requests = collect_all(|cursor| {
        tracker.open_pull_requests(&config.organization, &config.repository, cursor)
    })
    .await?;
    info!(
        issues = issues.len(),
        pull_requests = pull_requests.len(),
        "evaluating open items"
    );

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    sweep(&dispatcher, &label, &issues, "issue").await?;
    sweep(&dispatcher, &label, &pull_requests, "pull request").await?;
    Ok(())
}

async fn sweep(
    dispatcher: &Dispatcher<'_, dyn IssueTracker + '_>,
    label: &crate::clients::Label,
    items: &[LabeledItem],
    kind: &str,
) -> Result<()> {
    for item in items {
        let subject = format!("{kind} #{} '{}'", item.number, item.title);
        match evaluate_triage(&item.labels) {
            TriageAction::Add => dispatcher.add_label(label, &item.id, &subject).await?,
            TriageAction::Remove => dispatcher.remove_label(label, &item.id, &subject).await?,
            TriageAction::None => {}
        }
    }
    Ok(())
}
