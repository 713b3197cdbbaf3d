use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime};

use crate::id::{ActivityId, CategoryId, CommentId, TaskId, UserId};

/// Error returned when a user-facing token does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {token}")]
pub struct ParseTokenError {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub token: String,
}

fn normalize_token(token: &str) -> String {
    token.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority, also the rank used for tasks without a priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// Every priority, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Sort rank where a smaller value means more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseTokenError {
                kind: "priority",
                token: s.to_owned(),
            }),
        }
    }
}

/// Kanban workflow status. Independent of [`Task::completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl Status {
    /// Kebab-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "todo" => Ok(Self::Todo),
            "in-progress" | "inprogress" | "doing" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(ParseTokenError {
                kind: "status",
                token: s.to_owned(),
            }),
        }
    }
}

/// A single actionable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Backend-assigned identifier.
    pub id: TaskId,
    /// Short description; never blank.
    pub text: String,
    /// Optional long-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Optional priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Category name. May dangle after the category is deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// First day of work.
    #[serde(default, with = "crate::serde_date::option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    /// Deadline.
    #[serde(default, with = "crate::serde_date::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
    /// Kanban status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Person the task is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Backend-assigned creation time.
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    pub created_at: OffsetDateTime,
    /// Comment thread in posting order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Audit trail in recording order.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

const fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

impl Task {
    /// Build a task with only the required fields set.
    #[must_use]
    pub fn new(id: TaskId, text: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            text: text.into(),
            description: None,
            completed: false,
            priority: None,
            category: None,
            start_date: None,
            due_date: None,
            status: None,
            color: None,
            assigned_to: None,
            created_at,
            comments: Vec::new(),
            activities: Vec::new(),
        }
    }
}

/// User-defined grouping for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Identifier.
    pub id: CategoryId,
    /// Display name, unique per owner.
    pub name: String,
    /// Owning user.
    pub user_id: UserId,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Comment posted on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Identifier.
    pub id: CommentId,
    /// Task the comment belongs to.
    pub task_id: TaskId,
    /// Display name of the author.
    pub author: String,
    /// Comment body.
    pub text: String,
    /// Posting time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Kind of change recorded in an [`Activity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Kanban status changed.
    StatusChange,
    /// Priority changed.
    PriorityChange,
    /// Category changed.
    CategoryChange,
    /// Assignee changed.
    AssignmentChange,
}

/// System-generated audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Identifier.
    pub id: ActivityId,
    /// Task the entry belongs to.
    pub task_id: TaskId,
    /// What changed.
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Human-readable summary.
    pub description: String,
    /// Who made the change.
    pub actor: String,
    /// When the change was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Activity {
    /// Record a new entry with a fresh id.
    #[must_use]
    pub fn record(
        task_id: TaskId,
        kind: ActivityKind,
        description: impl Into<String>,
        actor: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            task_id,
            kind,
            description: description.into(),
            actor: actor.into(),
            timestamp,
        }
    }
}

/// Insert payload for the `tasks` table. The backend fills in id and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Short description.
    pub text: String,
    /// Optional long-form notes.
    pub description: Option<String>,
    /// Category name.
    pub category: Option<String>,
    /// First day of work.
    #[serde(default, with = "crate::serde_date::option")]
    pub start_date: Option<Date>,
    /// Deadline.
    #[serde(default, with = "crate::serde_date::option")]
    pub due_date: Option<Date>,
    /// Priority.
    pub priority: Option<Priority>,
    /// Display color.
    pub color: Option<String>,
}

impl NewTask {
    /// Payload with only the text set.
    #[must_use]
    pub fn titled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Materialize the row the backend would store for this payload.
    #[must_use]
    pub fn into_task(self, id: TaskId, created_at: OffsetDateTime) -> Task {
        Task {
            description: self.description,
            category: self.category,
            start_date: self.start_date,
            due_date: self.due_date,
            priority: self.priority,
            color: self.color,
            status: Some(Status::Todo),
            ..Task::new(id, self.text, created_at)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn parses_user_tokens() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" in_progress ".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("done".parse::<Status>(), Ok(Status::Completed));
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.to_string(), "invalid priority: urgent");
    }

    #[test]
    fn task_uses_camel_case_wire_format() {
        let mut task = Task::new(TaskId::new(), "Write report", datetime!(2024-05-01 09:30 UTC));
        task.due_date = Some(date!(2024 - 06 - 01));
        task.status = Some(Status::InProgress);
        task.assigned_to = Some("sam".into());

        let value = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(value["dueDate"], "2024-06-01");
        assert_eq!(value["status"], "in-progress");
        assert_eq!(value["assignedTo"], "sam");
        assert_eq!(value["createdAt"], "2024-05-01T09:30:00Z");
        assert!(value.get("priority").is_none());
    }

    #[test]
    fn task_tolerates_missing_collections() {
        let id = TaskId::new();
        let json = format!(r#"{{"id":"{id}","text":"Buy milk","dueDate":"2024-06-02T00:00:00.000Z"}}"#);
        let task: Task = serde_json::from_str(&json).expect("deserialize sparse task");
        assert!(task.comments.is_empty());
        assert!(task.activities.is_empty());
        assert!(!task.completed);
        assert_eq!(task.due_date, Some(date!(2024 - 06 - 02)));
        assert_eq!(task.created_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn activity_kind_uses_snake_case() {
        let activity = Activity::record(
            TaskId::new(),
            ActivityKind::AssignmentChange,
            "Assigned from unassigned to sam",
            "System",
            datetime!(2024-05-01 09:30 UTC),
        );
        let value = serde_json::to_value(&activity).expect("serialize activity");
        assert_eq!(value["type"], "assignment_change");
    }

    #[test]
    fn new_task_starts_in_todo() {
        let payload = NewTask {
            priority: Some(Priority::High),
            ..NewTask::titled("Ship")
        };
        let task = payload.into_task(TaskId::new(), datetime!(2024-05-01 00:00 UTC));
        assert_eq!(task.status, Some(Status::Todo));
        assert_eq!(task.priority, Some(Priority::High));
        assert!(!task.completed);
    }
}
