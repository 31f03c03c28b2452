//! Documentation-task creation for in-progress epics.

use tracing::{debug, info};

use crate::clients::{IssueTracker, NewDocTask, TicketSystem};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::pagination::collect_all;
use crate::rules::{doc_task_comment_body, is_epic_in_progress, references_doc_task};

/// File a documentation task for every in-progress epic on the given boards
/// that does not already reference one.
///
/// The link back is a marker comment on the epic; there is no other record,
/// so an edited or deleted marker comment makes the epic eligible again.
/// In dry-run mode neither the ticket nor the comment is created.
///
/// # Errors
///
/// Fails on the first tracker or ticketing error.
pub async fn create_documentation_tasks(
    tracker: &dyn IssueTracker,
    tickets: &dyn TicketSystem,
    config: &Config,
    ticket_project_id: u64,
    project_numbers: &[u64],
) -> Result<()> {
    let tracker_dispatch = Dispatcher::new(tracker, config.dry_run);
    let ticket_dispatch = Dispatcher::new(tickets, config.dry_run);

    for &project_number in project_numbers {
        let project_id = tracker
            .project_id(&config.organization, project_number)
            .await?;
        let items = collect_all(|cursor| tracker.project_items(&project_id, cursor)).await?;

        for item in items {
            let Some(issue) = item.issue else { continue };
            if !is_epic_in_progress(item.status.as_deref(), issue.item_type.as_deref()) {
                continue;
            }
            let subject = format!("epic #{} '{}'", issue.number, issue.title);

            let comments = collect_all(|cursor| tracker.comments(&issue.id, cursor)).await?;
            if comments.iter().any(|c| references_doc_task(&c.body)) {
                debug!("{subject} already has a documentation task");
                continue;
            }

            let task = NewDocTask {
                project_id: ticket_project_id,
                summary: format!("Documentation for {}", issue.title),
                source_url: issue.url.clone(),
                description: None,
            };
            let Some(ticket) = ticket_dispatch.create_task(&task, &subject).await? else {
                continue;
            };

            let body = doc_task_comment_body(None, &ticket.key, &tickets.browse_url(&ticket.key));
            tracker_dispatch
                .add_comment(&issue.id, &body, &subject)
                .await?;
            info!("{subject} linked to {}", ticket.key);
        }
    }

    Ok(())
}
