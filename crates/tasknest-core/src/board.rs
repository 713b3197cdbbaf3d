//! Kanban board and calendar views derived from the task list.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::model::{Status, Task};
use crate::predicate::is_due_on;

/// Kanban column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardColumn {
    /// Not started.
    Todo,
    /// Started, not completed.
    InProgress,
    /// Completed.
    Completed,
}

impl BoardColumn {
    /// Columns in display order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Completed];

    /// Column heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    /// Status written to a task dropped into this column.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Todo => Status::Todo,
            Self::InProgress => Status::InProgress,
            Self::Completed => Status::Completed,
        }
    }
}

impl fmt::Display for BoardColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Column a task is shown in. The completion flag wins over the status field.
#[must_use]
pub fn column_of(task: &Task) -> BoardColumn {
    if task.completed {
        return BoardColumn::Completed;
    }
    match task.status {
        Some(Status::InProgress) => BoardColumn::InProgress,
        _ => BoardColumn::Todo,
    }
}

/// Tasks grouped into kanban columns, each in input order.
#[derive(Debug, Default)]
pub struct Board<'a> {
    /// "To Do" column.
    pub todo: Vec<&'a Task>,
    /// "In Progress" column.
    pub in_progress: Vec<&'a Task>,
    /// "Completed" column.
    pub completed: Vec<&'a Task>,
}

impl<'a> Board<'a> {
    /// Distribute tasks across columns.
    #[must_use]
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut board = Self::default();
        for task in tasks {
            match column_of(task) {
                BoardColumn::Todo => board.todo.push(task),
                BoardColumn::InProgress => board.in_progress.push(task),
                BoardColumn::Completed => board.completed.push(task),
            }
        }
        board
    }

    /// Tasks in one column.
    #[must_use]
    pub fn column(&self, column: BoardColumn) -> &[&'a Task] {
        match column {
            BoardColumn::Todo => &self.todo,
            BoardColumn::InProgress => &self.in_progress,
            BoardColumn::Completed => &self.completed,
        }
    }
}

/// Tasks due on `day` (calendar cell contents).
#[must_use]
pub fn due_on(tasks: &[Task], day: Date) -> Vec<&Task> {
    tasks.iter().filter(|task| is_due_on(task, day)).collect()
}

/// Tasks whose start or due date falls in the given month, ordered by start
/// date with undated starts last.
#[must_use]
pub fn timeline(tasks: &[Task], year: i32, month: Month) -> Vec<&Task> {
    let in_month = |day: Option<Date>| day.is_some_and(|d| d.year() == year && d.month() == month);
    let mut items: Vec<&Task> = tasks
        .iter()
        .filter(|task| in_month(task.start_date) || in_month(task.due_date))
        .collect();
    items.sort_by(|a, b| by_start_missing_last(a, b));
    items
}

fn by_start_missing_last(a: &Task, b: &Task) -> Ordering {
    match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
