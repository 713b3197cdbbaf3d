//! Plain-text views. Every function returns the text so it can be tested.

use std::collections::BTreeMap;
use std::fmt::Display;

use tasknest_app::{COLOR_SLOTS, ThemeSettings};
use tasknest_core::{Board, BoardColumn, Category, CategoryShare, Comment, Task, TaskSummary};

use super::short_id;

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_owned(), |value| value.to_string())
}

fn lines(rows: impl IntoIterator<Item = String>) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn check(task: &Task) -> &'static str {
    if task.completed { "[x]" } else { "[ ]" }
}

pub(super) fn task_table(tasks: &[&Task]) -> String {
    let header = [
        "ID | Done | Text | Priority | Category | Due | Status | Assignee".to_owned(),
        "-- | ---- | ---- | -------- | -------- | --- | ------ | --------".to_owned(),
    ];
    let rows = tasks.iter().map(|task| {
        format!(
            "{} | {} | {} | {} | {} | {} | {} | {}",
            short_id(task.id),
            check(task),
            task.text,
            or_dash(task.priority),
            or_dash(task.category.as_deref()),
            or_dash(task.due_date),
            or_dash(task.status),
            or_dash(task.assigned_to.as_deref()),
        )
    });
    lines(header.into_iter().chain(rows))
}

pub(super) fn board(board: &Board<'_>) -> String {
    let mut out = Vec::new();
    for column in BoardColumn::ALL {
        let tasks = board.column(column);
        out.push(format!("== {} ({}) ==", column.title(), tasks.len()));
        for task in tasks {
            let due = task.due_date.map(|due| format!(" due {due}")).unwrap_or_default();
            out.push(format!(
                "  {} {} [{}]{due}",
                short_id(task.id),
                task.text,
                or_dash(task.priority)
            ));
        }
    }
    lines(out)
}

pub(super) fn timeline(tasks: &[&Task]) -> String {
    lines(tasks.iter().map(|task| {
        format!(
            "{} -> {}  {} {}",
            or_dash(task.start_date),
            or_dash(task.due_date),
            short_id(task.id),
            task.text
        )
    }))
}

pub(super) fn stats(summary: &TaskSummary, shares: &[CategoryShare], top: &[&Task]) -> String {
    let mut out = vec![
        format!("Total:         {}", summary.total),
        format!("Completed:     {} ({}%)", summary.completed, summary.completion_rate()),
        format!("Active:        {}", summary.active),
        format!(
            "High priority: {} ({}%)",
            summary.high_priority,
            summary.high_priority_rate()
        ),
        format!("Due today:     {}", summary.due_today),
    ];
    if !shares.is_empty() {
        out.push(String::new());
        out.push("By category:".to_owned());
        out.extend(
            shares
                .iter()
                .map(|share| format!("  {}: {} ({}%)", share.name, share.count, share.percent)),
        );
    }
    if !top.is_empty() {
        out.push(String::new());
        out.push("Top priority:".to_owned());
        out.extend(top.iter().map(|task| {
            format!(
                "  {} {} {} [{}]",
                check(task),
                short_id(task.id),
                task.text,
                or_dash(task.priority)
            )
        }));
    }
    lines(out)
}

pub(super) fn categories(categories: &[Category], tasks: &[Task]) -> String {
    lines(categories.iter().map(|category| {
        let count = tasks
            .iter()
            .filter(|task| task.category.as_deref() == Some(category.name.as_str()))
            .count();
        format!("{} ({count})", category.name)
    }))
}

pub(super) fn comment_thread(comments: &[Comment]) -> String {
    lines(comments.iter().map(|comment| {
        let at = comment.timestamp;
        format!(
            "{} {:02}:{:02} {}: {}",
            at.date(),
            at.hour(),
            at.minute(),
            comment.author,
            comment.text
        )
    }))
}

pub(super) fn theme(settings: &ThemeSettings) -> String {
    let switch = |on: bool| if on { "on" } else { "off" };
    let mut out = vec![
        format!("dark mode:     {}", switch(settings.dark_mode)),
        format!("custom colors: {}", switch(settings.use_custom_colors)),
        format!("notifications: {}", switch(settings.notifications)),
        format!("auto save:     {}", switch(settings.auto_save)),
        format!("compact mode:  {}", switch(settings.compact_mode)),
    ];
    let width = COLOR_SLOTS.iter().map(|slot| slot.len()).max().unwrap_or(0);
    out.extend(
        settings
            .colors
            .entries()
            .iter()
            .map(|(slot, value)| format!("{slot:<width$} {value}")),
    );
    lines(out)
}

pub(super) fn bundle_layout(layout: &BTreeMap<String, Vec<String>>) -> String {
    lines(
        layout
            .iter()
            .map(|(folder, names)| format!("{folder}/ ({}): {}", names.len(), names.join(", "))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasknest_core::id::{CommentId, TaskId};
    use tasknest_core::{Priority, Status};
    use time::macros::{date, datetime};

    fn task(id: &str, text: &str) -> Task {
        Task::new(
            id.parse().unwrap_or_else(|err| panic!("bad id {id}: {err}")),
            text,
            datetime!(2024-06-01 09:00 UTC),
        )
    }

    #[test]
    fn task_table_marks_missing_fields() {
        let mut report = task("0190a1b2-0000-7000-8000-00000000aaaa", "Write report");
        report.priority = Some(Priority::High);
        report.due_date = Some(date!(2024 - 06 - 30));
        report.status = Some(Status::InProgress);
        let mut milk = task("0190a1b2-0000-7000-8000-00000000bbbb", "Buy milk");
        milk.completed = true;

        let table = task_table(&[&report, &milk]);
        let rows: Vec<_> = table.lines().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[2],
            "0000aaaa | [ ] | Write report | high | - | 2024-06-30 | in-progress | -"
        );
        assert_eq!(rows[3], "0000bbbb | [x] | Buy milk | - | - | - | - | -");
    }

    #[test]
    fn board_lists_every_column() {
        let mut done = task("0190a1b2-0000-7000-8000-00000000aaaa", "Ship");
        done.completed = true;
        let tasks = vec![done, task("0190a1b2-0000-7000-8000-00000000bbbb", "Plan")];

        let text = board(&Board::build(&tasks));
        assert!(text.contains("== To Do (1) =="));
        assert!(text.contains("== In Progress (0) =="));
        assert!(text.contains("== Completed (1) =="));
        assert!(text.contains("0000aaaa Ship [-]"));
    }

    #[test]
    fn stats_skip_empty_sections() {
        let text = stats(&TaskSummary::default(), &[], &[]);
        assert!(text.starts_with("Total:         0\n"));
        assert!(text.contains("Completed:     0 (0%)"));
        assert!(!text.contains("By category"));
        assert!(!text.contains("Top priority"));
    }

    #[test]
    fn comments_show_author_and_time() {
        let comment = Comment {
            id: CommentId::new(),
            task_id: TaskId::new(),
            author: "sam".into(),
            text: "looks good".into(),
            timestamp: datetime!(2024-06-02 14:05 UTC),
        };
        assert_eq!(comment_thread(&[comment]), "2024-06-02 14:05 sam: looks good\n");
    }

    #[test]
    fn bundle_layout_lists_folders() {
        let layout = BTreeMap::from([
            ("images".to_owned(), vec!["a.png".to_owned(), "b.jpg".to_owned()]),
            ("others".to_owned(), vec!["c".to_owned()]),
        ]);
        assert_eq!(
            bundle_layout(&layout),
            "images/ (2): a.png, b.jpg\nothers/ (1): c\n"
        );
    }

    #[test]
    fn theme_lists_switches_and_colors() {
        let text = theme(&ThemeSettings::default());
        assert!(text.contains("notifications: on"));
        assert!(text.contains("dark mode:     off"));
        assert!(text.lines().any(|line| line.starts_with("primary")));
    }
}
