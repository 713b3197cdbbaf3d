//! Partial row updates for the `tasks` table.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{Activity, Priority, Status, Task};

/// Patch for an optional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op", content = "value")]
pub enum FieldPatch<T> {
    /// Overwrite with a new value.
    Set(T),
    /// Clear the field.
    Clear,
}

impl<T: Clone> FieldPatch<T> {
    fn apply_to(&self, field: &mut Option<T>) {
        *field = match self {
            Self::Set(value) => Some(value.clone()),
            Self::Clear => None,
        };
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

/// Partial update of a task row. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    /// New text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Description patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldPatch<String>>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Priority patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<FieldPatch<Priority>>,
    /// Category patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FieldPatch<String>>,
    /// Start date patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<FieldPatch<DateValue>>,
    /// Due date patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<FieldPatch<DateValue>>,
    /// Kanban status patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FieldPatch<Status>>,
    /// Color patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<FieldPatch<String>>,
    /// Assignee patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<FieldPatch<String>>,
    /// Activity entries to append.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<Activity>,
}

/// Calendar date serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateValue(pub Date);

impl Serialize for DateValue {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        crate::serde_date::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::serde_date::deserialize(d).map(Self)
    }
}

impl From<Date> for DateValue {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

impl TaskChanges {
    /// Returns true when applying the changes would be a no-op request.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.color.is_none()
            && self.assigned_to.is_none()
            && self.activities.is_empty()
    }

    /// Changes that only flip the completion flag.
    #[must_use]
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Changes that only set the kanban status.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(FieldPatch::Set(status)),
            ..Self::default()
        }
    }

    /// Apply the changes to a task in place.
    pub fn apply(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text.clone_from(text);
        }
        if let Some(patch) = &self.description {
            patch.apply_to(&mut task.description);
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(patch) = &self.priority {
            patch.apply_to(&mut task.priority);
        }
        if let Some(patch) = &self.category {
            patch.apply_to(&mut task.category);
        }
        if let Some(patch) = &self.start_date {
            apply_date(patch, &mut task.start_date);
        }
        if let Some(patch) = &self.due_date {
            apply_date(patch, &mut task.due_date);
        }
        if let Some(patch) = &self.status {
            patch.apply_to(&mut task.status);
        }
        if let Some(patch) = &self.color {
            patch.apply_to(&mut task.color);
        }
        if let Some(patch) = &self.assigned_to {
            patch.apply_to(&mut task.assigned_to);
        }
        task.activities.extend(self.activities.iter().cloned());
    }

    /// Copy of `task` with the changes applied.
    #[must_use]
    pub fn applied(&self, task: &Task) -> Task {
        let mut next = task.clone();
        self.apply(&mut next);
        next
    }
}

fn apply_date(patch: &FieldPatch<DateValue>, field: &mut Option<Date>) {
    *field = match patch {
        FieldPatch::Set(DateValue(date)) => Some(*date),
        FieldPatch::Clear => None,
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::id::TaskId;
    use crate::model::ActivityKind;
    use time::OffsetDateTime;
    use time::macros::date;

    #[test]
    fn apply_touches_only_set_fields() {
        let mut task = Task::new(TaskId::new(), "Draft", OffsetDateTime::UNIX_EPOCH);
        task.category = Some("Work".into());
        task.color = Some("#ff0000".into());

        let changes = TaskChanges {
            text: Some("Final".into()),
            category: Some(FieldPatch::Clear),
            due_date: Some(FieldPatch::Set(date!(2024 - 06 - 01).into())),
            priority: Some(FieldPatch::Set(Priority::High)),
            ..TaskChanges::default()
        };
        let next = changes.applied(&task);

        assert_eq!(next.text, "Final");
        assert_eq!(next.category, None);
        assert_eq!(next.due_date, Some(date!(2024 - 06 - 01)));
        assert_eq!(next.priority, Some(Priority::High));
        assert_eq!(next.color.as_deref(), Some("#ff0000"));
        assert_eq!(task.text, "Draft");
    }

    #[test]
    fn activities_are_appended() {
        let task = Task::new(TaskId::new(), "Draft", OffsetDateTime::UNIX_EPOCH);
        let entry = Activity::record(
            task.id,
            ActivityKind::StatusChange,
            "Moved to in-progress",
            "sam",
            OffsetDateTime::UNIX_EPOCH,
        );
        let changes = TaskChanges {
            activities: vec![entry.clone()],
            ..TaskChanges::status(Status::InProgress)
        };
        let next = changes.applied(&task);
        assert_eq!(next.activities, vec![entry]);
        assert_eq!(next.status, Some(Status::InProgress));
    }

    #[test]
    fn emptiness() {
        assert!(TaskChanges::default().is_empty());
        assert!(!TaskChanges::completion(true).is_empty());
    }

    #[test]
    fn wire_format_is_tagged() {
        let changes = TaskChanges {
            due_date: Some(FieldPatch::Set(date!(2024 - 06 - 01).into())),
            color: Some(FieldPatch::Clear),
            ..TaskChanges::default()
        };
        let value = serde_json::to_value(&changes).expect("serialize changes");
        assert_eq!(value["dueDate"]["op"], "set");
        assert_eq!(value["dueDate"]["value"], "2024-06-01");
        assert_eq!(value["color"]["op"], "clear");
        let back: TaskChanges = serde_json::from_value(value).expect("deserialize changes");
        assert_eq!(back, changes);
    }
}
