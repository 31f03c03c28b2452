//! CLI entry point for the automation routines.
//!
//! Run `automation --help` for usage information.

use anyhow::Result;
use clap::{Parser, Subcommand};
use regex::Regex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use automation::clients::{GithubClient, JiraClient, SlackClient};
use automation::config::{dry_run_from_env, Config, Credentials};
use automation::rules::StatusFilter;
use automation::tasks::boards::{ItemRef, StatusChange};
use automation::tasks::milestone::PullRequestContext;
use automation::tasks::pull_requests::StalePullRequestOptions;
use automation::tasks::{
    boards, branches, docs, milestone, pull_requests, stale, triage, workflows,
};

#[derive(Parser)]
#[command(name = "automation")]
#[command(about = "Repository automation across GitHub, Jira and Slack")]
#[command(version)]
struct Cli {
    /// GitHub organization
    #[arg(long, env = "GITHUB_ORGANIZATION", global = true, default_value = "")]
    org: String,

    /// Repository name within the organization
    #[arg(long, env = "GITHUB_REPOSITORY_NAME", global = true, default_value = "")]
    repo: String,

    /// The project board carrying the stale rule
    #[arg(long, env = "FRAMEWORK_PROJECT", global = true, default_value_t = 27)]
    framework_project: u64,

    /// Log intended mutations without sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the needs-triage label across open issues and PRs
    Triage,

    /// Move an issue or PR to a status column on project boards
    SetStatus {
        /// Issue number
        #[arg(long, conflicts_with = "pr")]
        issue: Option<u64>,

        /// Pull request number
        #[arg(long)]
        pr: Option<u64>,

        /// Target status column
        #[arg(long)]
        to: String,

        /// Only move memberships currently in this status
        #[arg(long, conflicts_with = "from_pattern")]
        from: Option<String>,

        /// Only move memberships whose status matches this pattern
        #[arg(long)]
        from_pattern: Option<Regex>,

        /// Project board number (repeatable)
        #[arg(long = "project", required = true)]
        projects: Vec<u64>,
    },

    /// Propagate an issue's priority label to its project boards
    SyncPriority {
        /// Issue number
        #[arg(long)]
        issue: u64,

        /// Project board numbers to leave alone (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<u64>,
    },

    /// Label stale issues on the framework board as close candidates
    MarkStale {
        /// Project board number
        #[arg(long)]
        project: Option<u64>,
    },

    /// Close candidates whose grace period has elapsed
    CloseStale,

    /// File documentation tasks for in-progress epics
    DocTasks {
        /// Ticketing-system project id to file tasks under
        #[arg(long)]
        ticket_project: u64,

        /// Project board number (repeatable)
        #[arg(long = "project", required = true)]
        projects: Vec<u64>,
    },

    /// Remind assignees of stale pull requests across the organization
    NotifyStalePrs {
        /// Days without activity before a reminder
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Also close the pull requests after notifying
        #[arg(long)]
        close: bool,
    },

    /// Assign a PR's labelled milestone to its linked issue
    SyncMilestone {
        /// Pull request number
        #[arg(long)]
        pr: u64,

        /// Head branch of the pull request
        #[arg(long)]
        head_ref: String,

        /// Assignee login, used to locate the linked issue
        #[arg(long)]
        assignee: Option<String>,

        /// Label on the pull request (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// Delete old branches that never had a pull request
    CleanupBranches {
        /// Spare branches matching this pattern
        #[arg(long)]
        exclude: Option<Regex>,
    },

    /// Force-cancel workflow runs stuck in the queue
    CancelStuckRuns,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let credentials = Credentials::from_env()?;
    if cli.org.is_empty() {
        anyhow::bail!("--org or GITHUB_ORGANIZATION is required");
    }
    let config = Config {
        organization: cli.org,
        repository: cli.repo,
        framework_project: cli.framework_project,
        dry_run: cli.dry_run || dry_run_from_env(),
        credentials,
    };
    let github = GithubClient::new(&config.credentials.github_token)?;

    match cli.command {
        Commands::Triage => triage::cleanup_needs_triage(&github, &config).await?,

        Commands::SetStatus {
            issue,
            pr,
            to,
            from,
            from_pattern,
            projects,
        } => {
            let item = match (issue, pr) {
                (Some(number), None) => ItemRef::Issue(number),
                (None, Some(number)) => ItemRef::PullRequest(number),
                _ => anyhow::bail!("exactly one of --issue and --pr is required"),
            };
            let from_status = match (from, from_pattern) {
                (Some(exact), None) => Some(StatusFilter::Exact(exact)),
                (None, Some(pattern)) => Some(StatusFilter::Pattern(pattern)),
                _ => None,
            };
            let change = StatusChange {
                item,
                to_status: to,
                from_status,
            };
            boards::set_status_in_projects(&github, &config, &change, &projects).await?;
        }

        Commands::SyncPriority { issue, exclude } => {
            boards::sync_priorities(&github, &config, issue, &exclude).await?;
        }

        Commands::MarkStale { project } => {
            let project = project.unwrap_or(config.framework_project);
            stale::mark_stale_issues(&github, &config, project).await?;
        }

        Commands::CloseStale => stale::close_stale_issues(&github, &config).await?,

        Commands::DocTasks {
            ticket_project,
            projects,
        } => {
            let jira = JiraClient::new(config.credentials.require_jira()?)?;
            docs::create_documentation_tasks(&github, &jira, &config, ticket_project, &projects)
                .await?;
        }

        Commands::NotifyStalePrs { days, close } => {
            let slack = SlackClient::new(config.credentials.require_slack()?)?;
            let options = StalePullRequestOptions { days, close };
            pull_requests::notify_stale_pull_requests(&github, &slack, &config, &options).await?;
        }

        Commands::SyncMilestone {
            pr,
            head_ref,
            assignee,
            labels,
        } => {
            let context = PullRequestContext {
                number: pr,
                head_ref,
                assignee,
                labels,
            };
            milestone::sync_milestone(&github, &config, &context).await?;
        }

        Commands::CleanupBranches { exclude } => {
            branches::cleanup_branches(&github, &config, exclude.as_ref()).await?;
        }

        Commands::CancelStuckRuns => workflows::cancel_stuck_workflow_runs(&github, &config).await?,
    }

    Ok(())
}
