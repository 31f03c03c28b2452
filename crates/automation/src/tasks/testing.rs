//! Recording fakes for exercising the routines without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::{
    Branch, BoardItem, ChatService, ChatUser, Comment, IssueTracker, ItemWithMemberships, Label,
    LabeledItem, Milestone, NewDocTask, ProjectSchema, PullRequest, StaleCandidate, Ticket,
    TicketSystem, WorkflowRun,
};
use crate::config::{Config, Credentials};
use crate::error::Result;
use crate::pagination::Page;

pub(crate) fn test_config(dry_run: bool) -> Config {
    Config {
        organization: "acme".to_string(),
        repository: "platform".to_string(),
        framework_project: 27,
        dry_run,
        credentials: Credentials {
            github_token: "token".to_string(),
            jira: None,
            slack_token: None,
        },
    }
}

pub(crate) fn labeled_item(id: &str, number: u64, labels: &[&str]) -> LabeledItem {
    LabeledItem {
        id: id.to_string(),
        number,
        title: format!("item {number}"),
        labels: labels.iter().map(|l| (*l).to_string()).collect(),
    }
}

/// Issue tracker fake backed by canned data; mutations are recorded as
/// `verb:arg:arg` strings.
#[derive(Default)]
pub(crate) struct FakeTracker {
    pub labels: HashMap<String, Label>,
    pub issues: Vec<LabeledItem>,
    pub pull_requests: Vec<LabeledItem>,
    pub items: HashMap<u64, ItemWithMemberships>,
    pub schemas: HashMap<u64, ProjectSchema>,
    pub project_ids: HashMap<u64, String>,
    pub board_items: HashMap<String, Vec<BoardItem>>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub stale_results: Vec<StaleCandidate>,
    pub pull_request_results: Vec<PullRequest>,
    pub emails: HashMap<String, Vec<String>>,
    pub milestones: Vec<Milestone>,
    pub branches: Vec<Branch>,
    pub queued_runs: Vec<WorkflowRun>,
    pub actions: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeTracker {
    pub(crate) fn with_label(mut self, name: &str) -> Self {
        self.labels.insert(
            name.to_string(),
            Label {
                id: format!("label-{name}"),
                name: name.to_string(),
                color: String::new(),
                description: None,
            },
        );
        self
    }

    pub(crate) fn recorded(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn single_page<T: Clone>(items: &[T]) -> Page<T> {
        Page {
            items: items.to_vec(),
            end_cursor: None,
            has_next_page: false,
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn label(&self, _owner: &str, _repo: &str, name: &str) -> Result<Option<Label>> {
        Ok(self.labels.get(name).cloned())
    }

    async fn open_issues(
        &self,
        _owner: &str,
        _repo: &str,
        _cursor: Option<String>,
    ) -> Result<Page<LabeledItem>> {
        Ok(Self::single_page(&self.issues))
    }

    async fn open_pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
        _cursor: Option<String>,
    ) -> Result<Page<LabeledItem>> {
        Ok(Self::single_page(&self.pull_requests))
    }

    async fn issue_with_memberships(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships> {
        Ok(self.items[&number].clone())
    }

    async fn pull_request_with_memberships(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships> {
        Ok(self.items[&number].clone())
    }

    async fn project_schema(&self, _organization: &str, number: u64) -> Result<ProjectSchema> {
        Ok(self.schemas[&number].clone())
    }

    async fn project_id(&self, _organization: &str, number: u64) -> Result<String> {
        Ok(self.project_ids[&number].clone())
    }

    async fn project_items(
        &self,
        project_id: &str,
        _cursor: Option<String>,
    ) -> Result<Page<BoardItem>> {
        Ok(Self::single_page(
            self.board_items.get(project_id).map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn comments(&self, item_id: &str, _cursor: Option<String>) -> Result<Page<Comment>> {
        Ok(Self::single_page(
            self.comments.get(item_id).map_or(&[][..], Vec::as_slice),
        ))
    }

    async fn search_stale_issues(&self, query: &str) -> Result<Vec<StaleCandidate>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.stale_results.clone())
    }

    async fn search_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.pull_request_results.clone())
    }

    async fn verified_domain_emails(
        &self,
        login: &str,
        _organization: &str,
    ) -> Result<Vec<String>> {
        Ok(self.emails.get(login).cloned().unwrap_or_default())
    }

    async fn milestones(
        &self,
        _owner: &str,
        _repo: &str,
        _cursor: Option<String>,
    ) -> Result<Page<Milestone>> {
        Ok(Self::single_page(&self.milestones))
    }

    async fn branches(
        &self,
        _owner: &str,
        _repo: &str,
        _cursor: Option<String>,
    ) -> Result<Page<Branch>> {
        Ok(Self::single_page(&self.branches))
    }

    async fn queued_workflow_runs(&self, _owner: &str, _repo: &str) -> Result<Vec<WorkflowRun>> {
        Ok(self.queued_runs.clone())
    }

    async fn add_label(&self, item_id: &str, label_id: &str) -> Result<()> {
        self.record(format!("add_label:{item_id}:{label_id}"));
        Ok(())
    }

    async fn remove_label(&self, item_id: &str, label_id: &str) -> Result<()> {
        self.record(format!("remove_label:{item_id}:{label_id}"));
        Ok(())
    }

    async fn close_issue(&self, issue_id: &str) -> Result<()> {
        self.record(format!("close_issue:{issue_id}"));
        Ok(())
    }

    async fn close_pull_request(&self, pull_request_id: &str) -> Result<()> {
        self.record(format!("close_pull_request:{pull_request_id}"));
        Ok(())
    }

    async fn add_comment(&self, item_id: &str, body: &str) -> Result<Comment> {
        self.record(format!("add_comment:{item_id}:{body}"));
        Ok(Comment {
            id: "comment-1".to_string(),
            author: "bot".to_string(),
            body: body.to_string(),
            url: None,
        })
    }

    async fn add_board_item(&self, project_id: &str, content_id: &str) -> Result<String> {
        self.record(format!("add_board_item:{project_id}:{content_id}"));
        Ok(format!("membership-{content_id}"))
    }

    async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<()> {
        self.record(format!(
            "set_field_value:{project_id}:{item_id}:{field_id}:{option_id}"
        ));
        Ok(())
    }

    async fn create_milestone(&self, _owner: &str, _repo: &str, title: &str) -> Result<Milestone> {
        self.record(format!("create_milestone:{title}"));
        Ok(Milestone {
            number: 99,
            title: title.to_string(),
        })
    }

    async fn set_milestone(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        milestone_number: u64,
    ) -> Result<()> {
        self.record(format!(
            "set_milestone:{owner}/{repo}#{issue_number}:{milestone_number}"
        ));
        Ok(())
    }

    async fn delete_branch(&self, _owner: &str, _repo: &str, name: &str) -> Result<()> {
        self.record(format!("delete_branch:{name}"));
        Ok(())
    }

    async fn cancel_workflow_run(&self, _owner: &str, _repo: &str, run_id: u64) -> Result<()> {
        self.record(format!("cancel_workflow_run:{run_id}"));
        Ok(())
    }
}

/// Ticketing fake; created tasks are recorded and keyed DOC-1, DOC-2, ...
#[derive(Default)]
pub(crate) struct FakeTickets {
    pub created: Mutex<Vec<NewDocTask>>,
    pub search_results: Vec<Ticket>,
}

#[async_trait]
impl TicketSystem for FakeTickets {
    async fn create_task(&self, task: &NewDocTask) -> Result<Ticket> {
        let mut created = self.created.lock().unwrap();
        created.push(task.clone());
        let key = format!("DOC-{}", created.len());
        Ok(Ticket {
            id: format!("1000{}", created.len()),
            key,
            summary: task.summary.clone(),
            status: None,
            labels: Vec::new(),
            links: Vec::new(),
        })
    }

    async fn search(&self, _query: &str) -> Result<Vec<Ticket>> {
        Ok(self.search_results.clone())
    }

    fn browse_url(&self, key: &str) -> String {
        format!("https://jira.example.com/browse/{key}")
    }
}

/// Chat fake mapping emails to users; sent messages are recorded.
#[derive(Default)]
pub(crate) struct FakeChat {
    pub users: HashMap<String, ChatUser>,
    pub messages: Mutex<Vec<(String, String)>>,
}

impl FakeChat {
    pub(crate) fn with_user(mut self, email: &str, user_id: &str) -> Self {
        self.users.insert(
            email.to_string(),
            ChatUser {
                id: user_id.to_string(),
                name: None,
            },
        );
        self
    }
}

#[async_trait]
impl ChatService for FakeChat {
    async fn user_by_email(&self, email: &str) -> Result<Option<ChatUser>> {
        Ok(self.users.get(email).cloned())
    }

    async fn send_dm(&self, user_id: &str, text: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}
