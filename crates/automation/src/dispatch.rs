//! Mutation dispatcher with dry-run gating.
//!
//! Every remote write goes through a [`Dispatcher`], which either forwards
//! the call to the wrapped collaborator or, in dry-run mode, logs the intended
//! action as `Would …` and returns without touching the network. The flag is
//! sourced once from [`crate::config::Config`] so no mutation path can bypass
//! it.

use tracing::info;

use crate::clients::{
    ChatService, IssueTracker, Label, Milestone, NewDocTask, SelectOption, Ticket, TicketSystem,
};
use crate::error::Result;

/// Wraps a collaborator reference with the process-wide dry-run flag.
pub struct Dispatcher<'a, C: ?Sized> {
    client: &'a C,
    dry_run: bool,
}

impl<'a, C: ?Sized> Dispatcher<'a, C> {
    pub fn new(client: &'a C, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl<C: IssueTracker + ?Sized> Dispatcher<'_, C> {
    /// Add a label to an item.
    pub async fn add_label(&self, label: &Label, item_id: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would add label '{}' to {subject}", label.name);
            return Ok(());
        }
        self.client.add_label(item_id, &label.id).await?;
        info!("Added label '{}' to {subject}", label.name);
        Ok(())
    }

    /// Remove a label from an item.
    pub async fn remove_label(&self, label: &Label, item_id: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would remove label '{}' from {subject}", label.name);
            return Ok(());
        }
        self.client.remove_label(item_id, &label.id).await?;
        info!("Removed label '{}' from {subject}", label.name);
        Ok(())
    }

    /// Close an issue as not planned.
    pub async fn close_issue(&self, issue_id: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would close {subject}");
            return Ok(());
        }
        self.client.close_issue(issue_id).await?;
        info!("Closed {subject}");
        Ok(())
    }

    pub async fn close_pull_request(&self, pull_request_id: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would close {subject}");
            return Ok(());
        }
        self.client.close_pull_request(pull_request_id).await?;
        info!("Closed {subject}");
        Ok(())
    }

    pub async fn add_comment(&self, item_id: &str, body: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would comment on {subject}");
            return Ok(());
        }
        let comment = self.client.add_comment(item_id, body).await?;
        info!(
            "Commented on {subject}: {}",
            comment.url.as_deref().unwrap_or(&comment.id)
        );
        Ok(())
    }

    /// Ensure an item is on a board; `None` when dry-run suppressed the write.
    pub async fn ensure_board_item(
        &self,
        project_id: &str,
        content_id: &str,
        subject: &str,
    ) -> Result<Option<String>> {
        if self.dry_run {
            info!("Would ensure {subject} is on the board");
            return Ok(None);
        }
        let membership_id = self.client.add_board_item(project_id, content_id).await?;
        Ok(Some(membership_id))
    }

    pub async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option: &SelectOption,
        subject: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!("Would set field to '{}' for {subject}", option.name);
            return Ok(());
        }
        self.client
            .set_field_value(project_id, item_id, field_id, &option.id)
            .await?;
        info!("Set field to '{}' for {subject}", option.name);
        Ok(())
    }

    /// Create a milestone; `None` when dry-run suppressed the write.
    pub async fn create_milestone(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
    ) -> Result<Option<Milestone>> {
        if self.dry_run {
            info!("Would create milestone '{title}' in {owner}/{repo}");
            return Ok(None);
        }
        let milestone = self.client.create_milestone(owner, repo, title).await?;
        info!("Created milestone '{title}' (#{})", milestone.number);
        Ok(Some(milestone))
    }

    pub async fn set_milestone(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        milestone: &Milestone,
        subject: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!("Would add {subject} to milestone '{}'", milestone.title);
            return Ok(());
        }
        self.client
            .set_milestone(owner, repo, issue_number, milestone.number)
            .await?;
        info!("Added {subject} to milestone '{}'", milestone.title);
        Ok(())
    }

    pub async fn delete_branch(&self, owner: &str, repo: &str, name: &str) -> Result<()> {
        if self.dry_run {
            info!("Would delete branch '{name}'");
            return Ok(());
        }
        info!("Deleting branch '{name}'...");
        self.client.delete_branch(owner, repo, name).await
    }

    pub async fn cancel_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        subject: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!("Would force-cancel {subject}");
            return Ok(());
        }
        self.client.cancel_workflow_run(owner, repo, run_id).await?;
        info!("Force-cancelled {subject}");
        Ok(())
    }
}

impl<C: TicketSystem + ?Sized> Dispatcher<'_, C> {
    /// Create a ticket; `None` when dry-run suppressed the write.
    pub async fn create_task(&self, task: &NewDocTask, subject: &str) -> Result<Option<Ticket>> {
        if self.dry_run {
            info!("Would create a documentation task for {subject}");
            return Ok(None);
        }
        let ticket = self.client.create_task(task).await?;
        info!(
            "Created documentation task {}: {}",
            ticket.key,
            self.client.browse_url(&ticket.key)
        );
        Ok(Some(ticket))
    }
}

impl<C: ChatService + ?Sized> Dispatcher<'_, C> {
    pub async fn send_dm(&self, user_id: &str, text: &str, subject: &str) -> Result<()> {
        if self.dry_run {
            info!("Would send a reminder to {subject}");
            return Ok(());
        }
        self.client.send_dm(user_id, text).await?;
        info!("Sent a reminder to {subject}");
        Ok(())
    }
}
