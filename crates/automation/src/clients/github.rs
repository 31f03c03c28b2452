//! GitHub API client (GraphQL v4 plus a few REST endpoints).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    Branch, BoardIssue, BoardItem, BoardStatus, Comment, IssueTracker, ItemWithMemberships, Label,
    LabeledItem, LinkedIssue, Milestone, ProjectMembership, ProjectSchema, PullRequest,
    SelectField, SelectOption, StaleCandidate, WorkflowRun,
};
use crate::error::{Error, Result};
use crate::pagination::Page;

const GITHUB_API_URL: &str = "https://api.github.com";

/// REST endpoints return at most this many records per page.
const REST_PAGE_SIZE: usize = 100;

/// GitHub API client for the issue-tracker capability.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl GithubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Create a client against a non-default API root (used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        // Opt in to typed issues (parent/issueType) on GraphQL queries.
        headers.insert("GraphQL-Features", HeaderValue::from_static("issue_types"));
        headers.insert(USER_AGENT, HeaderValue::from_static("project-automation/1.0"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "GitHub",
                status,
                body,
            });
        }

        let envelope: GraphqlEnvelope<T> = response.json().await?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Graphql(messages.join("; ")));
        }

        envelope
            .data
            .ok_or_else(|| Error::Graphql("response carried no data".to_string()))
    }

    async fn rest<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "GitHub",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn rest_no_content(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "GitHub",
                status,
                body,
            });
        }

        Ok(())
    }

    async fn open_items(
        &self,
        query: &str,
        connection: &'static str,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<LabeledItem>> {
        let data: Value = self
            .graphql(
                query,
                json!({ "owner": owner, "repo": repo, "cursor": cursor }),
            )
            .await?;

        let connection: RawItemConnection =
            serde_json::from_value(data["repository"][connection].clone())?;

        let items = connection
            .nodes
            .into_iter()
            .map(|raw| LabeledItem {
                id: raw.id,
                number: raw.number,
                title: raw.title,
                labels: raw.labels.names(),
            })
            .collect();

        Ok(Page {
            items,
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        })
    }

    fn memberships_from(nodes: Vec<RawMembership>) -> Vec<ProjectMembership> {
        nodes
            .into_iter()
            .map(|raw| ProjectMembership {
                item_id: raw.id,
                project_number: raw.project.number,
                status: raw.field_value_by_name.and_then(|v| v.name),
            })
            .collect()
    }
}

// =============================================================================
// GraphQL queries and mutations
// =============================================================================

const LABEL_QUERY: &str = r"
    query labelByName($owner: String!, $repo: String!, $name: String!) {
        repository(owner: $owner, name: $repo) {
            label(name: $name) {
                id
                name
                color
                description
            }
        }
    }
";

const OPEN_ISSUES_QUERY: &str = r"
    query openIssues($owner: String!, $repo: String!, $cursor: String) {
        repository(owner: $owner, name: $repo) {
            issues(first: 100, after: $cursor, states: OPEN) {
                pageInfo {
                    hasNextPage
                    endCursor
                }
                nodes {
                    id
                    number
                    title
                    labels(first: 20) {
                        nodes {
                            name
                        }
                    }
                }
            }
        }
    }
";

const OPEN_PULL_REQUESTS_QUERY: &str = r"
    query openPullRequests($owner: String!, $repo: String!, $cursor: String) {
        repository(owner: $owner, name: $repo) {
            pullRequests(first: 100, after: $cursor, states: OPEN) {
                pageInfo {
                    hasNextPage
                    endCursor
                }
                nodes {
                    id
                    number
                    title
                    labels(first: 20) {
                        nodes {
                            name
                        }
                    }
                }
            }
        }
    }
";

const ISSUE_MEMBERSHIPS_QUERY: &str = r#"
    query issueWithMemberships($owner: String!, $repo: String!, $number: Int!) {
        repository(owner: $owner, name: $repo) {
            issue(number: $number) {
                id
                number
                title
                labels(first: 20) {
                    nodes {
                        name
                    }
                }
                projectItems(first: 20) {
                    nodes {
                        id
                        project {
                            number
                        }
                        fieldValueByName(name: "Status") {
                            ... on ProjectV2ItemFieldSingleSelectValue {
                                name
                            }
                        }
                    }
                }
            }
        }
    }
"#;

const PULL_REQUEST_MEMBERSHIPS_QUERY: &str = r#"
    query pullRequestWithMemberships($owner: String!, $repo: String!, $number: Int!) {
        repository(owner: $owner, name: $repo) {
            pullRequest(number: $number) {
                id
                number
                title
                labels(first: 20) {
                    nodes {
                        name
                    }
                }
                projectItems(first: 20) {
                    nodes {
                        id
                        project {
                            number
                        }
                        fieldValueByName(name: "Status") {
                            ... on ProjectV2ItemFieldSingleSelectValue {
                                name
                            }
                        }
                    }
                }
            }
        }
    }
"#;

const PROJECT_SCHEMA_QUERY: &str = r"
    query projectSchema($organization: String!, $number: Int!) {
        organization(login: $organization) {
            projectV2(number: $number) {
                id
                title
                fields(first: 20) {
                    nodes {
                        ... on ProjectV2SingleSelectField {
                            id
                            name
                            options {
                                id
                                name
                            }
                        }
                    }
                }
            }
        }
    }
";

const PROJECT_ID_QUERY: &str = r"
    query projectIdByNumber($organization: String!, $number: Int!) {
        organization(login: $organization) {
            projectV2(number: $number) {
                id
            }
        }
    }
";

const PROJECT_ITEMS_QUERY: &str = r#"
    query projectItems($projectId: ID!, $cursor: String) {
        node(id: $projectId) {
            ... on ProjectV2 {
                items(first: 100, after: $cursor) {
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                    nodes {
                        fieldValueByName(name: "Status") {
                            ... on ProjectV2ItemFieldSingleSelectValue {
                                name
                            }
                        }
                        content {
                            ... on Issue {
                                id
                                title
                                number
                                url
                                issueType {
                                    name
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

const COMMENTS_QUERY: &str = r"
    query itemComments($itemId: ID!, $cursor: String) {
        node(id: $itemId) {
            ... on Issue {
                comments(first: 100, after: $cursor) {
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                    nodes {
                        id
                        author {
                            login
                        }
                        body
                        url
                    }
                }
            }
        }
    }
";

const STALE_ISSUE_SEARCH_QUERY: &str = r#"
    query staleIssueSearch($query: String!) {
        search(query: $query, type: ISSUE, first: 100) {
            nodes {
                ... on Issue {
                    id
                    title
                    number
                    url
                    createdAt
                    parent {
                        issueType {
                            name
                        }
                    }
                    labels(first: 20) {
                        nodes {
                            name
                        }
                    }
                    projectItems(first: 10) {
                        nodes {
                            project {
                                number
                            }
                            fieldValueByName(name: "Status") {
                                ... on ProjectV2ItemFieldSingleSelectValue {
                                    name
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

const PULL_REQUEST_SEARCH_QUERY: &str = r"
    query pullRequestSearch($query: String!) {
        search(query: $query, type: ISSUE, first: 50) {
            nodes {
                ... on PullRequest {
                    id
                    title
                    number
                    url
                    repository {
                        name
                        owner {
                            login
                        }
                    }
                    assignees(first: 50) {
                        nodes {
                            login
                        }
                    }
                    reviewRequests(first: 50) {
                        nodes {
                            requestedReviewer {
                                ... on User {
                                    login
                                }
                                ... on Team {
                                    name
                                }
                            }
                        }
                    }
                    closingIssuesReferences(first: 1) {
                        nodes {
                            id
                            title
                            number
                            url
                            repository {
                                name
                                owner {
                                    login
                                }
                            }
                        }
                    }
                }
            }
        }
    }
";

const VERIFIED_EMAILS_QUERY: &str = r"
    query verifiedDomainEmails($login: String!, $organization: String!) {
        user(login: $login) {
            organizationVerifiedDomainEmails(login: $organization)
        }
    }
";

const BRANCHES_QUERY: &str = r#"
    query branchHeads($owner: String!, $repo: String!, $cursor: String) {
        repository(owner: $owner, name: $repo) {
            refs(first: 100, after: $cursor, refPrefix: "refs/heads/") {
                pageInfo {
                    hasNextPage
                    endCursor
                }
                nodes {
                    name
                    target {
                        ... on Commit {
                            committedDate
                        }
                    }
                    associatedPullRequests(first: 100) {
                        nodes {
                            number
                        }
                    }
                }
            }
        }
    }
"#;

const ADD_LABEL_MUTATION: &str = r"
    mutation addLabel($labelableId: ID!, $labelIds: [ID!]!) {
        addLabelsToLabelable(input: {
            labelableId: $labelableId,
            labelIds: $labelIds
        }) {
            clientMutationId
        }
    }
";

const REMOVE_LABEL_MUTATION: &str = r"
    mutation removeLabel($labelableId: ID!, $labelIds: [ID!]!) {
        removeLabelsFromLabelable(input: {
            labelableId: $labelableId,
            labelIds: $labelIds
        }) {
            clientMutationId
        }
    }
";

const CLOSE_ISSUE_MUTATION: &str = r"
    mutation closeIssue($issueId: ID!, $reason: IssueClosedStateReason!) {
        closeIssue(input: {
            issueId: $issueId,
            stateReason: $reason
        }) {
            clientMutationId
        }
    }
";

const CLOSE_PULL_REQUEST_MUTATION: &str = r"
    mutation closePullRequest($pullRequestId: ID!) {
        closePullRequest(input: {
            pullRequestId: $pullRequestId
        }) {
            clientMutationId
        }
    }
";

const ADD_COMMENT_MUTATION: &str = r"
    mutation addComment($itemId: ID!, $body: String!) {
        addComment(input: {
            subjectId: $itemId,
            body: $body
        }) {
            commentEdge {
                node {
                    id
                    author {
                        login
                    }
                    body
                    url
                }
            }
        }
    }
";

const ADD_BOARD_ITEM_MUTATION: &str = r"
    mutation addBoardItem($projectId: ID!, $contentId: ID!) {
        addProjectV2ItemById(input: {
            projectId: $projectId,
            contentId: $contentId
        }) {
            item {
                id
            }
        }
    }
";

const SET_FIELD_VALUE_MUTATION: &str = r"
    mutation setFieldValue($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
        updateProjectV2ItemFieldValue(input: {
            projectId: $projectId,
            itemId: $itemId,
            fieldId: $fieldId,
            value: { singleSelectOptionId: $optionId }
        }) {
            projectV2Item {
                id
            }
        }
    }
";

// =============================================================================
// Raw response types
// =============================================================================

#[derive(Deserialize)]
struct GraphqlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorItem>,
}

#[derive(Deserialize)]
struct GraphqlErrorItem {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawNamedNodes {
    #[serde(default)]
    nodes: Vec<RawName>,
}

impl RawNamedNodes {
    fn names(self) -> Vec<String> {
        self.nodes.into_iter().map(|n| n.name).collect()
    }
}

#[derive(Deserialize)]
struct RawName {
    name: String,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemConnection {
    page_info: RawPageInfo,
    #[serde(default)]
    nodes: Vec<RawLabeledItem>,
}

#[derive(Deserialize)]
struct RawLabeledItem {
    id: String,
    number: u64,
    title: String,
    #[serde(default)]
    labels: RawNamedNodes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemWithMemberships {
    id: String,
    number: u64,
    title: String,
    #[serde(default)]
    labels: RawNamedNodes,
    project_items: RawMembershipNodes,
}

#[derive(Deserialize)]
struct RawMembershipNodes {
    #[serde(default)]
    nodes: Vec<RawMembership>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMembership {
    id: String,
    project: RawProjectNumber,
    field_value_by_name: Option<RawFieldValue>,
}

#[derive(Deserialize)]
struct RawProjectNumber {
    number: u64,
}

#[derive(Deserialize)]
struct RawFieldValue {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawProjectSchema {
    id: String,
    title: String,
    fields: RawFieldNodes,
}

#[derive(Deserialize)]
struct RawFieldNodes {
    #[serde(default)]
    nodes: Vec<RawField>,
}

/// Non-single-select fields come back as empty objects; they are dropped.
#[derive(Deserialize)]
struct RawField {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawOption {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoardConnection {
    page_info: RawPageInfo,
    #[serde(default)]
    nodes: Vec<RawBoardItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoardItem {
    field_value_by_name: Option<RawFieldValue>,
    content: Option<RawBoardContent>,
}

/// Draft items and other non-issue content come back as empty objects.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoardContent {
    id: Option<String>,
    title: Option<String>,
    number: Option<u64>,
    url: Option<String>,
    issue_type: Option<RawName>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommentConnection {
    page_info: RawPageInfo,
    #[serde(default)]
    nodes: Vec<RawComment>,
}

#[derive(Deserialize)]
struct RawComment {
    id: String,
    author: Option<RawUser>,
    body: String,
    url: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSearchIssue {
    id: String,
    title: String,
    number: u64,
    url: String,
    created_at: Option<DateTime<Utc>>,
    parent: Option<RawParent>,
    labels: RawNamedNodes,
    project_items: RawSearchMembershipNodes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParent {
    issue_type: Option<RawName>,
}

#[derive(Default, Deserialize)]
struct RawSearchMembershipNodes {
    #[serde(default)]
    nodes: Vec<RawSearchMembership>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSearchMembership {
    project: RawProjectNumber,
    field_value_by_name: Option<RawFieldValue>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSearchPullRequest {
    id: String,
    title: String,
    number: u64,
    url: String,
    repository: Option<RawRepository>,
    assignees: RawUserNodes,
    review_requests: RawReviewRequestNodes,
    closing_issues_references: RawLinkedIssueNodes,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawUser,
}

#[derive(Default, Deserialize)]
struct RawUserNodes {
    #[serde(default)]
    nodes: Vec<RawUser>,
}

#[derive(Default, Deserialize)]
struct RawReviewRequestNodes {
    #[serde(default)]
    nodes: Vec<RawReviewRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReviewRequest {
    requested_reviewer: Option<RawReviewer>,
}

#[derive(Deserialize)]
struct RawReviewer {
    login: Option<String>,
    name: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawLinkedIssueNodes {
    #[serde(default)]
    nodes: Vec<RawLinkedIssue>,
}

#[derive(Deserialize)]
struct RawLinkedIssue {
    id: String,
    title: String,
    number: u64,
    url: String,
    repository: RawRepository,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBranchConnection {
    page_info: RawPageInfo,
    #[serde(default)]
    nodes: Vec<RawBranch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBranch {
    name: String,
    target: Option<RawCommitTarget>,
    associated_pull_requests: RawAssociatedPullRequests,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommitTarget {
    committed_date: Option<DateTime<Utc>>,
}

#[derive(Default, Deserialize)]
struct RawAssociatedPullRequests {
    #[serde(default)]
    nodes: Vec<Value>,
}

#[derive(Deserialize)]
struct RawMilestone {
    number: u64,
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawWorkflowRunList {
    #[serde(default)]
    workflow_runs: Vec<RawWorkflowRun>,
}

#[derive(Deserialize)]
struct RawWorkflowRun {
    id: u64,
    name: String,
    created_at: DateTime<Utc>,
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl IssueTracker for GithubClient {
    async fn label(&self, owner: &str, repo: &str, name: &str) -> Result<Option<Label>> {
        #[derive(Deserialize)]
        struct Data {
            repository: Repo,
        }
        #[derive(Deserialize)]
        struct Repo {
            label: Option<Label>,
        }

        let data: Data = self
            .graphql(
                LABEL_QUERY,
                json!({ "owner": owner, "repo": repo, "name": name }),
            )
            .await?;

        Ok(data.repository.label)
    }

    async fn open_issues(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<LabeledItem>> {
        self.open_items(OPEN_ISSUES_QUERY, "issues", owner, repo, cursor)
            .await
    }

    async fn open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<LabeledItem>> {
        self.open_items(OPEN_PULL_REQUESTS_QUERY, "pullRequests", owner, repo, cursor)
            .await
    }

    async fn issue_with_memberships(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships> {
        #[derive(Deserialize)]
        struct Data {
            repository: Repo,
        }
        #[derive(Deserialize)]
        struct Repo {
            issue: RawItemWithMemberships,
        }

        let data: Data = self
            .graphql(
                ISSUE_MEMBERSHIPS_QUERY,
                json!({ "owner": owner, "repo": repo, "number": number }),
            )
            .await?;

        let raw = data.repository.issue;
        Ok(ItemWithMemberships {
            id: raw.id,
            number: raw.number,
            title: raw.title,
            labels: raw.labels.names(),
            memberships: Self::memberships_from(raw.project_items.nodes),
        })
    }

    async fn pull_request_with_memberships(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ItemWithMemberships> {
        #[derive(Deserialize)]
        struct Data {
            repository: Repo,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Repo {
            pull_request: RawItemWithMemberships,
        }

        let data: Data = self
            .graphql(
                PULL_REQUEST_MEMBERSHIPS_QUERY,
                json!({ "owner": owner, "repo": repo, "number": number }),
            )
            .await?;

        let raw = data.repository.pull_request;
        Ok(ItemWithMemberships {
            id: raw.id,
            number: raw.number,
            title: raw.title,
            labels: raw.labels.names(),
            memberships: Self::memberships_from(raw.project_items.nodes),
        })
    }

    async fn project_schema(&self, organization: &str, number: u64) -> Result<ProjectSchema> {
        #[derive(Deserialize)]
        struct Data {
            organization: Org,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Org {
            project_v2: RawProjectSchema,
        }

        let data: Data = self
            .graphql(
                PROJECT_SCHEMA_QUERY,
                json!({ "organization": organization, "number": number }),
            )
            .await?;

        let raw = data.organization.project_v2;
        let fields = raw
            .fields
            .nodes
            .into_iter()
            .filter_map(|f| match (f.id, f.name) {
                (Some(id), Some(name)) => Some(SelectField {
                    id,
                    name,
                    options: f
                        .options
                        .into_iter()
                        .map(|o| SelectOption {
                            id: o.id,
                            name: o.name,
                        })
                        .collect(),
                }),
                _ => None,
            })
            .collect();

        Ok(ProjectSchema {
            id: raw.id,
            title: raw.title,
            fields,
        })
    }

    async fn project_id(&self, organization: &str, number: u64) -> Result<String> {
        #[derive(Deserialize)]
        struct Data {
            organization: Org,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Org {
            project_v2: IdOnly,
        }
        #[derive(Deserialize)]
        struct IdOnly {
            id: String,
        }

        let data: Data = self
            .graphql(
                PROJECT_ID_QUERY,
                json!({ "organization": organization, "number": number }),
            )
            .await?;

        Ok(data.organization.project_v2.id)
    }

    async fn project_items(
        &self,
        project_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<BoardItem>> {
        #[derive(Deserialize)]
        struct Data {
            node: Node,
        }
        #[derive(Deserialize)]
        struct Node {
            items: RawBoardConnection,
        }

        let data: Data = self
            .graphql(
                PROJECT_ITEMS_QUERY,
                json!({ "projectId": project_id, "cursor": cursor }),
            )
            .await?;

        let connection = data.node.items;
        let items = connection
            .nodes
            .into_iter()
            .map(|raw| BoardItem {
                status: raw.field_value_by_name.and_then(|v| v.name),
                issue: raw.content.and_then(|c| match (c.id, c.title, c.number, c.url) {
                    (Some(id), Some(title), Some(number), Some(url)) => Some(BoardIssue {
                        id,
                        title,
                        number,
                        url,
                        item_type: c.issue_type.map(|t| t.name),
                    }),
                    _ => None,
                }),
            })
            .collect();

        Ok(Page {
            items,
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        })
    }

    async fn comments(&self, item_id: &str, cursor: Option<String>) -> Result<Page<Comment>> {
        #[derive(Deserialize)]
        struct Data {
            node: Node,
        }
        #[derive(Deserialize)]
        struct Node {
            comments: RawCommentConnection,
        }

        let data: Data = self
            .graphql(
                COMMENTS_QUERY,
                json!({ "itemId": item_id, "cursor": cursor }),
            )
            .await?;

        let connection = data.node.comments;
        let items = connection
            .nodes
            .into_iter()
            .map(|raw| Comment {
                id: raw.id,
                author: raw.author.map_or_else(|| "ghost".to_string(), |a| a.login),
                body: raw.body,
                url: raw.url,
            })
            .collect();

        Ok(Page {
            items,
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        })
    }

    async fn search_stale_issues(&self, query: &str) -> Result<Vec<StaleCandidate>> {
        #[derive(Deserialize)]
        struct Data {
            search: Search,
        }
        #[derive(Deserialize)]
        struct Search {
            #[serde(default)]
            nodes: Vec<RawSearchIssue>,
        }

        let data: Data = self
            .graphql(STALE_ISSUE_SEARCH_QUERY, json!({ "query": query }))
            .await?;

        let candidates = data
            .search
            .nodes
            .into_iter()
            .filter_map(|raw| {
                let created_at = raw.created_at?;
                if raw.id.is_empty() {
                    return None;
                }
                Some(StaleCandidate {
                    id: raw.id,
                    title: raw.title,
                    number: raw.number,
                    url: raw.url,
                    labels: raw.labels.names(),
                    parent_type: raw.parent.and_then(|p| p.issue_type).map(|t| t.name),
                    created_at,
                    boards: raw
                        .project_items
                        .nodes
                        .into_iter()
                        .map(|m| BoardStatus {
                            project_number: m.project.number,
                            status: m.field_value_by_name.and_then(|v| v.name),
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(candidates)
    }

    async fn search_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>> {
        #[derive(Deserialize)]
        struct Data {
            search: Search,
        }
        #[derive(Deserialize)]
        struct Search {
            #[serde(default)]
            nodes: Vec<RawSearchPullRequest>,
        }

        let data: Data = self
            .graphql(PULL_REQUEST_SEARCH_QUERY, json!({ "query": query }))
            .await?;

        let pull_requests = data
            .search
            .nodes
            .into_iter()
            .filter_map(|raw| {
                let repository = raw.repository?;
                Some(PullRequest {
                    id: raw.id,
                    title: raw.title,
                    number: raw.number,
                    url: raw.url,
                    owner: repository.owner.login,
                    repository: repository.name,
                    assignees: raw.assignees.nodes.into_iter().map(|u| u.login).collect(),
                    requested_reviewers: raw
                        .review_requests
                        .nodes
                        .into_iter()
                        .filter_map(|r| r.requested_reviewer)
                        .filter_map(|r| r.login.or(r.name))
                        .collect(),
                    closing_issues: raw
                        .closing_issues_references
                        .nodes
                        .into_iter()
                        .map(|i| LinkedIssue {
                            id: i.id,
                            title: i.title,
                            number: i.number,
                            url: i.url,
                            owner: i.repository.owner.login,
                            repository: i.repository.name,
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(pull_requests)
    }

    async fn verified_domain_emails(
        &self,
        login: &str,
        organization: &str,
    ) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Data {
            user: User,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct User {
            #[serde(default)]
            organization_verified_domain_emails: Vec<String>,
        }

        let data: Data = self
            .graphql(
                VERIFIED_EMAILS_QUERY,
                json!({ "login": login, "organization": organization }),
            )
            .await?;

        Ok(data.user.organization_verified_domain_emails)
    }

    async fn milestones(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<Milestone>> {
        // REST pagination by page number, carried as the cursor string.
        let page_number: u64 = cursor.as_deref().and_then(|c| c.parse().ok()).unwrap_or(1);

        let milestones: Vec<RawMilestone> = self
            .rest(self.client.get(format!(
                "{}/repos/{owner}/{repo}/milestones?state=all&per_page={REST_PAGE_SIZE}&page={page_number}",
                self.base_url
            )))
            .await?;

        let has_next_page = milestones.len() == REST_PAGE_SIZE;
        let items = milestones
            .into_iter()
            .map(|m| Milestone {
                number: m.number,
                title: m.title,
            })
            .collect();

        Ok(Page {
            items,
            end_cursor: has_next_page.then(|| (page_number + 1).to_string()),
            has_next_page,
        })
    }

    async fn branches(
        &self,
        owner: &str,
        repo: &str,
        cursor: Option<String>,
    ) -> Result<Page<Branch>> {
        #[derive(Deserialize)]
        struct Data {
            repository: Repo,
        }
        #[derive(Deserialize)]
        struct Repo {
            refs: RawBranchConnection,
        }

        let data: Data = self
            .graphql(
                BRANCHES_QUERY,
                json!({ "owner": owner, "repo": repo, "cursor": cursor }),
            )
            .await?;

        let connection = data.repository.refs;
        let items = connection
            .nodes
            .into_iter()
            .filter_map(|raw| {
                let committed_at = raw.target.and_then(|t| t.committed_date)?;
                Some(Branch {
                    name: raw.name,
                    committed_at,
                    pull_request_count: raw.associated_pull_requests.nodes.len() as u64,
                })
            })
            .collect();

        Ok(Page {
            items,
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        })
    }

    async fn queued_workflow_runs(&self, owner: &str, repo: &str) -> Result<Vec<WorkflowRun>> {
        let list: RawWorkflowRunList = self
            .rest(self.client.get(format!(
                "{}/repos/{owner}/{repo}/actions/runs?status=queued",
                self.base_url
            )))
            .await?;

        Ok(list
            .workflow_runs
            .into_iter()
            .map(|r| WorkflowRun {
                id: r.id,
                name: r.name,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn add_label(&self, item_id: &str, label_id: &str) -> Result<()> {
        let response: Value = self
            .graphql(
                ADD_LABEL_MUTATION,
                json!({ "labelableId": item_id, "labelIds": [label_id] }),
            )
            .await?;
        debug!(response = %response, "addLabel");
        Ok(())
    }

    async fn remove_label(&self, item_id: &str, label_id: &str) -> Result<()> {
        let response: Value = self
            .graphql(
                REMOVE_LABEL_MUTATION,
                json!({ "labelableId": item_id, "labelIds": [label_id] }),
            )
            .await?;
        debug!(response = %response, "removeLabel");
        Ok(())
    }

    async fn close_issue(&self, issue_id: &str) -> Result<()> {
        let response: Value = self
            .graphql(
                CLOSE_ISSUE_MUTATION,
                json!({ "issueId": issue_id, "reason": "NOT_PLANNED" }),
            )
            .await?;
        debug!(response = %response, "closeIssue");
        Ok(())
    }

    async fn close_pull_request(&self, pull_request_id: &str) -> Result<()> {
        let response: Value = self
            .graphql(
                CLOSE_PULL_REQUEST_MUTATION,
                json!({ "pullRequestId": pull_request_id }),
            )
            .await?;
        debug!(response = %response, "closePullRequest");
        Ok(())
    }

    async fn add_comment(&self, item_id: &str, body: &str) -> Result<Comment> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            add_comment: AddComment,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AddComment {
            comment_edge: Edge,
        }
        #[derive(Deserialize)]
        struct Edge {
            node: RawComment,
        }

        let data: Data = self
            .graphql(
                ADD_COMMENT_MUTATION,
                json!({ "itemId": item_id, "body": body }),
            )
            .await?;

        let raw = data.add_comment.comment_edge.node;
        Ok(Comment {
            id: raw.id,
            author: raw.author.map_or_else(|| "ghost".to_string(), |a| a.login),
            body: raw.body,
            url: raw.url,
        })
    }

    async fn add_board_item(&self, project_id: &str, content_id: &str) -> Result<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            add_project_v2_item_by_id: AddItem,
        }
        #[derive(Deserialize)]
        struct AddItem {
            item: IdOnly,
        }
        #[derive(Deserialize)]
        struct IdOnly {
            id: String,
        }

        let data: Data = self
            .graphql(
                ADD_BOARD_ITEM_MUTATION,
                json!({ "projectId": project_id, "contentId": content_id }),
            )
            .await?;

        Ok(data.add_project_v2_item_by_id.item.id)
    }

    async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<()> {
        let response: Value = self
            .graphql(
                SET_FIELD_VALUE_MUTATION,
                json!({
                    "projectId": project_id,
                    "itemId": item_id,
                    "fieldId": field_id,
                    "optionId": option_id,
                }),
            )
            .await?;
        debug!(response = %response, "setFieldValue");
        Ok(())
    }

    async fn create_milestone(&self, owner: &str, repo: &str, title: &str) -> Result<Milestone> {
        let milestone: RawMilestone = self
            .rest(
                self.client
                    .post(format!("{}/repos/{owner}/{repo}/milestones", self.base_url))
                    .json(&json!({ "title": title })),
            )
            .await?;

        Ok(Milestone {
            number: milestone.number,
            title: milestone.title,
        })
    }

    async fn set_milestone(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        milestone_number: u64,
    ) -> Result<()> {
        self.rest_no_content(
            self.client
                .patch(format!(
                    "{}/repos/{owner}/{repo}/issues/{issue_number}",
                    self.base_url
                ))
                .json(&json!({ "milestone": milestone_number })),
        )
        .await
    }

    async fn delete_branch(&self, owner: &str, repo: &str, name: &str) -> Result<()> {
        self.rest_no_content(self.client.delete(format!(
            "{}/repos/{owner}/{repo}/git/refs/heads/{name}",
            self.base_url
        )))
        .await
    }

    async fn cancel_workflow_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<()> {
        self.rest_no_content(self.client.post(format!(
            "{}/repos/{owner}/{repo}/actions/runs/{run_id}/force-cancel",
            self.base_url
        )))
        .await
    }
}
