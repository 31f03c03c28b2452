//! Repository automation routines.
//!
//! Glue between a GitHub organization, its Jira site and its Slack
//! workspace: triage-label sweeps, project-board status and priority sync,
//! stale-issue marking and closing, documentation-task creation for epics,
//! stale-pull-request reminders, milestone assignment, branch cleanup and
//! stuck-workflow cancellation.
//!
//! The library splits into three layers: [`clients`] talks to the remote
//! systems behind narrow capability traits, [`rules`] holds the pure
//! decisions, and [`tasks`] wires the two together with every mutation
//! routed through a dry-run-aware [`dispatch::Dispatcher`].

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pagination;
pub mod rules;
pub mod tasks;

pub use config::{Config, Credentials};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
