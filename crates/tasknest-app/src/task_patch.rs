//! Edit forms and the task diffs they produce.

use tasknest_core::{Activity, ActivityKind, FieldPatch, Priority, Status, Task, TaskChanges};
use time::{Date, OffsetDateTime};

/// Desired values of every editable task field, as submitted by an edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Task text.
    pub text: String,
    /// Long-form notes (`None` or blank clears).
    pub description: Option<String>,
    /// Priority.
    pub priority: Option<Priority>,
    /// Category name.
    pub category: Option<String>,
    /// First day of work.
    pub start_date: Option<Date>,
    /// Deadline.
    pub due_date: Option<Date>,
    /// Kanban status.
    pub status: Option<Status>,
    /// Display color.
    pub color: Option<String>,
}

impl TaskUpdate {
    /// Form pre-filled with the task's current values.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            description: task.description.clone(),
            priority: task.priority,
            category: task.category.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            status: task.status,
            color: task.color.clone(),
        }
    }
}

fn diff_field<T: PartialEq + Clone>(current: Option<&T>, desired: Option<&T>) -> Option<FieldPatch<T>> {
    match (current, desired) {
        (Some(old), Some(new)) if old == new => None,
        (_, Some(new)) => Some(FieldPatch::Set(new.clone())),
        (Some(_), None) => Some(FieldPatch::Clear),
        (None, None) => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}

fn label<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_owned(), |v| v.to_string())
}

/// Diff between a stored task and an edit form.
#[derive(Debug, Default)]
pub struct TaskPatch {
    changes: TaskChanges,
}

impl TaskPatch {
    /// Compare the task with the submitted form. Status, priority and category
    /// changes each record an [`Activity`] attributed to `actor`.
    #[must_use]
    pub fn from_task(task: &Task, update: TaskUpdate, actor: &str, now: OffsetDateTime) -> Self {
        let TaskUpdate {
            text,
            description,
            priority,
            category,
            start_date,
            due_date,
            status,
            color,
        } = update;
        let description = non_blank(description);
        let category = non_blank(category);
        let color = non_blank(color);

        let mut changes = TaskChanges::default();
        let text = text.trim();
        if text != task.text {
            changes.text = Some(text.to_owned());
        }
        changes.description = diff_field(task.description.as_ref(), description.as_ref());
        changes.priority = diff_field(task.priority.as_ref(), priority.as_ref());
        changes.category = diff_field(task.category.as_ref(), category.as_ref());
        changes.start_date = diff_field(task.start_date.as_ref(), start_date.as_ref()).map(date_patch);
        changes.due_date = diff_field(task.due_date.as_ref(), due_date.as_ref()).map(date_patch);
        changes.status = diff_field(task.status.as_ref(), status.as_ref());
        changes.color = diff_field(task.color.as_ref(), color.as_ref());

        let mut record = |kind, description: String| {
            changes
                .activities
                .push(Activity::record(task.id, kind, description, actor, now));
        };
        if task.status != status {
            record(
                ActivityKind::StatusChange,
                format!("Status changed from {} to {}", label(task.status), label(status)),
            );
        }
        if task.priority != priority {
            record(
                ActivityKind::PriorityChange,
                format!("Priority changed from {} to {}", label(task.priority), label(priority)),
            );
        }
        if task.category != category {
            record(
                ActivityKind::CategoryChange,
                format!(
                    "Category changed from {} to {}",
                    label(task.category.as_deref()),
                    label(category.as_deref())
                ),
            );
        }

        Self { changes }
    }

    /// Returns true when the form matches the stored task.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Convert into the row update sent to the backend.
    #[must_use]
    pub fn into_changes(self) -> TaskChanges {
        self.changes
    }
}

fn date_patch(patch: FieldPatch<Date>) -> FieldPatch<tasknest_core::DateValue> {
    match patch {
        FieldPatch::Set(date) => FieldPatch::Set(date.into()),
        FieldPatch::Clear => FieldPatch::Clear,
    }
}

/// Activity recorded when a task's assignee changes. `None` when unchanged.
#[must_use]
pub fn assignment_activity(task: &Task, assignee: &str, now: OffsetDateTime) -> Option<Activity> {
    let previous = task.assigned_to.as_deref();
    (previous != Some(assignee)).then(|| {
        Activity::record(
            task.id,
            ActivityKind::AssignmentChange,
            format!("Assigned from {} to {assignee}", previous.unwrap_or("unassigned")),
            "System",
            now,
        )
    })
}
