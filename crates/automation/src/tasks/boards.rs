//! Project-board status and priority synchronization.

use tracing::{debug, info, warn};

use crate::clients::{IssueTracker, ItemWithMemberships};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::rules::{priority_from_labels, StatusFilter, PRIORITY_FIELD, STATUS_FIELD};

/// The issue or pull request a status change applies to.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef {
    Issue(u64),
    PullRequest(u64),
}

/// A requested board-status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub item: ItemRef,
    /// Target status option name, matched case-insensitively.
    pub to_status: String,
    /// When set, only memberships whose current status matches move.
    pub from_status: Option<StatusFilter>,
}

/// Move an item to a status column on each of the given boards.
///
/// Boards the item is not yet on get a membership first. Boards without a
/// status field, or without the target option, are skipped with a warning;
/// a `from_status` filter additionally skips memberships whose current
/// status does not match.
///
/// # Errors
///
/// Fails on the first tracker error; skips are not errors.
pub async fn set_status_in_projects(
    tracker: &dyn IssueTracker,
    config: &Config,
    change: &StatusChange,
    projects: &[u64],
) -> Result<()> {
    let item = fetch_item(tracker, config, change.item).await?;
    let subject = format!("#{} '{}'", item.number, item.title);
    let dispatcher = Dispatcher::new(tracker, config.dry_run);

    for &project_number in projects {
        let schema = tracker
            .project_schema(&config.organization, project_number)
            .await?;
        let Some(field) = schema.field(STATUS_FIELD) else {
            warn!("project {project_number} has no '{STATUS_FIELD}' field, skipping");
            continue;
        };
        let Some(option) = field.option_ignore_case(&change.to_status) else {
            warn!(
                "project {project_number} has no '{}' status, skipping",
                change.to_status
            );
            continue;
        };

        let membership = item
            .memberships
            .iter()
            .find(|m| m.project_number == project_number);

        let membership_id = match membership {
            Some(existing) => {
                if let Some(filter) = &change.from_status {
                    let current = existing.status.as_deref().unwrap_or_default();
                    if !filter.matches(current) {
                        debug!(
                            "{subject} is '{current}' on project {project_number}, not moving"
                        );
                        continue;
                    }
                }
                existing.item_id.clone()
            }
            None => {
                let Some(id) = dispatcher
                    .ensure_board_item(&schema.id, &item.id, &subject)
                    .await?
                else {
                    continue;
                };
                id
            }
        };

        dispatcher
            .set_field_value(&schema.id, &membership_id, &field.id, option, &subject)
            .await?;
    }

    Ok(())
}

/// Propagate an issue's `priority/<value>` label to the priority field of
/// every board it is on, except the excluded project numbers.
///
/// Issues without a priority label are left alone. Boards without a
/// priority field, or whose field lacks a matching option, are skipped.
///
/// # Errors
///
/// Fails on the first tracker error.
pub async fn sync_priorities(
    tracker: &dyn IssueTracker,
    config: &Config,
    issue_number: u64,
    exclude: &[u64],
) -> Result<()> {
    let item = tracker
        .issue_with_memberships(&config.organization, &config.repository, issue_number)
        .await?;
    let subject = format!("#{} '{}'", item.number, item.title);

    let Some(priority) = priority_from_labels(&item.labels) else {
        info!("{subject} carries no priority label");
        return Ok(());
    };

    let dispatcher = Dispatcher::new(tracker, config.dry_run);
    for membership in &item.memberships {
        if exclude.contains(&membership.project_number) {
            continue;
        }
        let schema = tracker
            .project_schema(&config.organization, membership.project_number)
            .await?;
        let Some(field) = schema.field(PRIORITY_FIELD) else {
            debug!(
                "project {} has no '{PRIORITY_FIELD}' field",
                membership.project_number
            );
            continue;
        };
        let Some(option) = field.option_ignore_case(priority) else {
            warn!(
                "project {} has no '{priority}' priority option",
                membership.project_number
            );
            continue;
        };

        dispatcher
            .set_field_value(&schema.id, &membership.item_id, &field.id, option, &subject)
            .await?;
    }

    Ok(())
}

async fn fetch_item(
    tracker: &dyn IssueTracker,
    config: &Config,
    item: ItemRef,
) -> Result<ItemWithMemberships> {
    match item {
        ItemRef::Issue(number) => {
            tracker
                .issue_with_memberships(&config.organization, &config.repository, number)
                .await
        }
        ItemRef::PullRequest(number) => {
            tracker
                .pull_request_with_memberships(&config.organization, &config.repository, number)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ProjectMembership, ProjectSchema, SelectField, SelectOption};
    use crate::tasks::testing::{test_config, FakeTracker};

    fn schema(project: u64, field: &str, options: &[(&str, &str)]) -> ProjectSchema {
        ProjectSchema {
            id: format!("PVT_{project}"),
            title: format!("Board {project}"),
            fields: vec![SelectField {
                id: format!("F_{field}"),
                name: field.to_string(),
                options: options
                    .iter()
                    .map(|(id, name)| SelectOption {
                        id: (*id).to_string(),
                        name: (*name).to_string(),
                    })
                    .collect(),
            }],
        }
    }

    fn item(number: u64, labels: &[&str], memberships: Vec<ProjectMembership>) -> ItemWithMemberships {
        ItemWithMemberships {
            id: format!("I_{number}"),
            number,
            title: format!("item {number}"),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            memberships,
        }
    }

    #[tokio::test]
    async fn moves_existing_membership_and_joins_missing_board() {
        let mut tracker = FakeTracker::default();
        tracker.schemas.insert(5, schema(5, STATUS_FIELD, &[("o1", "Done")]));
        tracker.schemas.insert(6, schema(6, STATUS_FIELD, &[("o2", "Done")]));
        tracker.items.insert(
            1,
            item(
                1,
                &[],
                vec![ProjectMembership {
                    item_id: "M_5".to_string(),
                    project_number: 5,
                    status: Some("In Progress".to_string()),
                }],
            ),
        );

        let change = StatusChange {
            item: ItemRef::Issue(1),
            to_status: "done".to_string(),
            from_status: None,
        };
        set_status_in_projects(&tracker, &test_config(false), &change, &[5, 6])
            .await
            .unwrap();

        assert_eq!(
            tracker.recorded(),
            vec![
                "set_field_value:PVT_5:M_5:F_Status:o1".to_string(),
                "add_board_item:PVT_6:I_1".to_string(),
                "set_field_value:PVT_6:membership-I_1:F_Status:o2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn from_status_filter_skips_non_matching_memberships() {
        let mut tracker = FakeTracker::default();
        tracker.schemas.insert(5, schema(5, STATUS_FIELD, &[("o1", "Done")]));
        tracker.items.insert(
            2,
            item(
                2,
                &[],
                vec![ProjectMembership {
                    item_id: "M_5".to_string(),
                    project_number: 5,
                    status: Some("Backlog".to_string()),
                }],
            ),
        );

        let change = StatusChange {
            item: ItemRef::Issue(2),
            to_status: "Done".to_string(),
            from_status: Some(StatusFilter::Exact("In Progress".to_string())),
        };
        set_status_in_projects(&tracker, &test_config(false), &change, &[5])
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }

    #[tokio::test]
    async fn missing_field_or_option_is_skipped() {
        let mut tracker = FakeTracker::default();
        tracker.schemas.insert(5, schema(5, "Size", &[("o1", "L")]));
        tracker.schemas.insert(6, schema(6, STATUS_FIELD, &[("o2", "Backlog")]));
        tracker.items.insert(3, item(3, &[], vec![]));

        let change = StatusChange {
            item: ItemRef::PullRequest(3),
            to_status: "Done".to_string(),
            from_status: None,
        };
        set_status_in_projects(&tracker, &test_config(false), &change, &[5, 6])
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }

    #[tokio::test]
    async fn dry_run_neither_joins_nor_moves() {
        let mut tracker = FakeTracker::default();
        tracker.schemas.insert(5, schema(5, STATUS_FIELD, &[("o1", "Done")]));
        tracker.items.insert(1, item(1, &[], vec![]));

        let change = StatusChange {
            item: ItemRef::Issue(1),
            to_status: "Done".to_string(),
            from_status: None,
        };
        set_status_in_projects(&tracker, &test_config(true), &change, &[5])
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }

    #[tokio::test]
    async fn propagates_priority_to_boards_with_the_field() {
        let mut tracker = FakeTracker::default();
        tracker
            .schemas
            .insert(5, schema(5, PRIORITY_FIELD, &[("p1", "High")]));
        tracker.schemas.insert(6, schema(6, STATUS_FIELD, &[("o1", "Done")]));
        tracker
            .schemas
            .insert(27, schema(27, PRIORITY_FIELD, &[("p2", "High")]));
        tracker.items.insert(
            4,
            item(
                4,
                &["priority/high"],
                vec![
                    ProjectMembership {
                        item_id: "M_5".to_string(),
                        project_number: 5,
                        status: None,
                    },
                    ProjectMembership {
                        item_id: "M_6".to_string(),
                        project_number: 6,
                        status: None,
                    },
                    ProjectMembership {
                        item_id: "M_27".to_string(),
                        project_number: 27,
                        status: None,
                    },
                ],
            ),
        );

        sync_priorities(&tracker, &test_config(false), 4, &[27])
            .await
            .unwrap();

        // board 6 lacks the field, board 27 is excluded
        assert_eq!(
            tracker.recorded(),
            vec!["set_field_value:PVT_5:M_5:F_Priority:p1".to_string()]
        );
    }

    #[tokio::test]
    async fn issue_without_priority_label_is_left_alone() {
        let mut tracker = FakeTracker::default();
        tracker.items.insert(
            5,
            item(
                5,
                &["bug"],
                vec![ProjectMembership {
                    item_id: "M_5".to_string(),
                    project_number: 5,
                    status: None,
                }],
            ),
        );

        sync_priorities(&tracker, &test_config(false), 5, &[])
            .await
            .unwrap();

        assert!(tracker.recorded().is_empty());
    }
}
