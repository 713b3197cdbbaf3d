//! Query executor: filter + stable sort over a borrowed task slice, plus
//! aggregate counters for dashboards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::compare::{SortDirection, SortKey, compare};
use crate::model::{ParseTokenError, Priority, Task};
use crate::predicate::{
    DateRange, TextMatcher, in_date_range, is_active, is_completed, is_due_on, matches_any_category,
    matches_any_priority,
};

/// Which tasks to keep by completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFilter {
    /// Keep every task.
    #[default]
    All,
    /// Only tasks that are not completed.
    Active,
    /// Only completed tasks.
    Completed,
}

impl CompletionFilter {
    /// Whether the task passes this filter.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => is_active(task),
            Self::Completed => is_completed(task),
        }
    }
}

impl fmt::Display for CompletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        })
    }
}

impl FromStr for CompletionFilter {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" | "open" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(ParseTokenError {
                kind: "completion filter",
                token: s.to_owned(),
            }),
        }
    }
}

/// Filter and sort parameters for [`execute`]. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    /// Substring searched in the task text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    /// Accepted category names (exact match); empty accepts all.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,
    /// Accepted priorities; empty accepts all.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub priorities: BTreeSet<Priority>,
    /// Inclusive due-date window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_range: Option<DateRange>,
    /// Completion state filter.
    #[serde(default)]
    pub completion: CompletionFilter,
    /// Ordering key.
    #[serde(default)]
    pub sort_key: SortKey,
    /// Ordering direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
}

impl TaskQuery {
    /// Whether the query filters nothing out.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.search_text.as_deref().is_none_or(|text| text.trim().is_empty())
            && self.categories.is_empty()
            && self.priorities.is_empty()
            && self.due_range.is_none()
            && self.completion == CompletionFilter::All
    }

    /// Whether a task passes every set filter (logical AND).
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.matcher().is_none_or(|m| m.matches(task)) && self.matches_structured(task)
    }

    fn matcher(&self) -> Option<TextMatcher> {
        self.search_text.as_deref().and_then(TextMatcher::new)
    }

    fn matches_structured(&self, task: &Task) -> bool {
        matches_any_category(task, &self.categories)
            && matches_any_priority(task, &self.priorities)
            && in_date_range(task, self.due_range.as_ref())
            && self.completion.matches(task)
    }
}

/// Filter and order `tasks`. The input is untouched; the output borrows from it.
#[must_use]
pub fn execute<'a>(tasks: &'a [Task], query: &TaskQuery) -> Vec<&'a Task> {
    let matcher = query.matcher();
    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|task| matcher.as_ref().is_none_or(|m| m.matches(task)))
        .filter(|task| query.matches_structured(task))
        .collect();
    view.sort_by(|a, b| compare(a, b, query.sort_key, query.sort_direction));
    view
}

/// The `n` most urgent tasks, ties kept in input order.
#[must_use]
pub fn top_by_priority(tasks: &[Task], n: usize) -> Vec<&Task> {
    let mut view: Vec<&Task> = tasks.iter().collect();
    view.sort_by(|a, b| SortKey::Priority.compare(a, b));
    view.truncate(n);
    view
}

/// Aggregate counters over a task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    /// Number of tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Tasks not completed.
    pub active: usize,
    /// Tasks with high priority.
    pub high_priority: usize,
    /// Tasks due on the reference day.
    pub due_today: usize,
}

impl TaskSummary {
    /// Completed share as a rounded percentage; 0 for an empty set.
    #[must_use]
    pub fn completion_rate(&self) -> u8 {
        percent(self.completed, self.total)
    }

    /// High-priority share as a rounded percentage; 0 for an empty set.
    #[must_use]
    pub fn high_priority_rate(&self) -> u8 {
        percent(self.high_priority, self.total)
    }
}

/// Rounded `part / whole` percentage, 0 when `whole` is 0.
#[must_use]
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole);
    // (part * 100 + whole / 2) / whole stays within 0..=100.
    let rounded = (part * 100 + whole / 2) / whole;
    u8::try_from(rounded).unwrap_or(100)
}

/// Count tasks in a single pass. `today` is injected rather than read from a clock.
#[must_use]
pub fn summarize(tasks: &[Task], today: Date) -> TaskSummary {
    tasks.iter().fold(TaskSummary::default(), |mut acc, task| {
        acc.total += 1;
        if is_completed(task) {
            acc.completed += 1;
        } else {
            acc.active += 1;
        }
        if task.priority == Some(Priority::High) {
            acc.high_priority += 1;
        }
        if is_due_on(task, today) {
            acc.due_today += 1;
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use time::macros::{date, datetime};
    use time::{Duration, OffsetDateTime};

    fn task(text: &str) -> Task {
        Task::new(TaskId::new(), text, OffsetDateTime::UNIX_EPOCH)
    }

    fn texts<'a>(view: &[&'a Task]) -> Vec<&'a str> {
        view.iter().map(|t| t.text.as_str()).collect()
    }

    fn sample() -> Vec<Task> {
        let base = datetime!(2024-05-01 08:00 UTC);
        let specs = [
            ("Write report", Some(Priority::High), Some("Work"), Some(date!(2024 - 06 - 03)), false),
            ("buy milk", Some(Priority::Low), Some("Shopping"), None, true),
            ("Plan trip", None, Some("Personal"), Some(date!(2024 - 06 - 01)), false),
            ("Review PR", Some(Priority::High), Some("Work"), Some(date!(2024 - 06 - 01)), true),
            ("Call mom", Some(Priority::Medium), None, Some(date!(2024 - 07 - 10)), false),
        ];
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (text, priority, category, due, completed))| {
                let mut t = task(text);
                t.priority = priority;
                t.category = category.map(str::to_owned);
                t.due_date = due;
                t.completed = completed;
                t.created_at = base + Duration::hours(i64::try_from(i).unwrap_or_default());
                t
            })
            .collect()
    }

    #[test]
    fn priority_ascending_puts_high_first() {
        let mut a = task("A");
        a.priority = Some(Priority::Low);
        a.due_date = Some(date!(2024 - 06 - 01));
        let mut b = task("B");
        b.priority = Some(Priority::High);
        b.due_date = Some(date!(2024 - 06 - 02));
        let tasks = vec![a, b];

        let query = TaskQuery {
            sort_key: SortKey::Priority,
            sort_direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(texts(&execute(&tasks, &query)), vec!["B", "A"]);
    }

    #[test]
    fn default_query_lists_newest_first() {
        let tasks = sample();
        let view = execute(&tasks, &TaskQuery::default());
        assert_eq!(
            texts(&view),
            vec!["Call mom", "Review PR", "Plan trip", "buy milk", "Write report"]
        );
    }

    #[test]
    fn filters_combine_with_and() {
        let tasks = sample();
        let query = TaskQuery {
            categories: ["Work".to_owned()].into(),
            completion: CompletionFilter::Active,
            ..TaskQuery::default()
        };
        assert_eq!(texts(&execute(&tasks, &query)), vec!["Write report"]);

        let query = TaskQuery {
            categories: ["Work".to_owned(), "Shopping".to_owned()].into(),
            sort_key: SortKey::CreatedAt,
            sort_direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(
            texts(&execute(&tasks, &query)),
            vec!["Write report", "buy milk", "Review PR"]
        );

        let query = TaskQuery {
            search_text: Some("  R ".into()),
            priorities: [Priority::High].into(),
            due_range: Some(DateRange::new(date!(2024 - 06 - 01), date!(2024 - 06 - 02))),
            ..TaskQuery::default()
        };
        assert_eq!(texts(&execute(&tasks, &query)), vec!["Review PR"]);
    }

    #[test]
    fn output_is_a_subsequence_that_satisfies_the_query() {
        let tasks = sample();
        let query = TaskQuery {
            completion: CompletionFilter::Active,
            sort_key: SortKey::Alphabetical,
            sort_direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        let view = execute(&tasks, &query);
        for task in &view {
            assert!(tasks.iter().any(|t| std::ptr::eq(t, *task)));
            assert!(query.matches(task));
        }
        assert_eq!(texts(&view), vec!["Call mom", "Plan trip", "Write report"]);
    }

    #[test]
    fn sorting_is_stable_in_both_directions() {
        let mut tasks = Vec::new();
        for text in ["first", "second", "third"] {
            let mut t = task(text);
            t.priority = Some(Priority::Medium);
            tasks.push(t);
        }
        let mut urgent = task("urgent");
        urgent.priority = Some(Priority::High);
        tasks.insert(1, urgent);

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let query = TaskQuery {
                sort_key: SortKey::Priority,
                sort_direction: direction,
                ..TaskQuery::default()
            };
            let view = execute(&tasks, &query);
            let medium: Vec<_> = texts(&view)
                .into_iter()
                .filter(|text| *text != "urgent")
                .collect();
            assert_eq!(medium, vec!["first", "second", "third"]);
        }
    }

    #[test]
    fn due_date_sort_puts_undated_first() {
        let tasks = sample();
        let query = TaskQuery {
            sort_key: SortKey::DueDate,
            sort_direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(
            texts(&execute(&tasks, &query)),
            vec!["buy milk", "Plan trip", "Review PR", "Write report", "Call mom"]
        );
    }

    #[test]
    fn execute_leaves_input_untouched() {
        let tasks = sample();
        let before = tasks.clone();
        let _ = execute(
            &tasks,
            &TaskQuery {
                sort_key: SortKey::Alphabetical,
                ..TaskQuery::default()
            },
        );
        assert_eq!(tasks, before);
    }

    #[test]
    fn summarize_counts_in_one_pass() {
        let tasks = sample();
        let today = date!(2024 - 06 - 01);
        let summary = summarize(&tasks, today);
        assert_eq!(
            summary,
            TaskSummary {
                total: 5,
                completed: 2,
                active: 3,
                high_priority: 2,
                due_today: 2,
            }
        );
        assert_eq!(summary.total, summary.completed + summary.active);
        assert_eq!(summarize(&tasks, today), summary);
        assert_eq!(summary.completion_rate(), 40);
        assert_eq!(summary.high_priority_rate(), 40);
    }

    #[test]
    fn rates_are_zero_for_empty_sets() {
        let summary = summarize(&[], date!(2024 - 06 - 01));
        assert_eq!(summary, TaskSummary::default());
        assert_eq!(summary.completion_rate(), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
    }

    #[test]
    fn top_by_priority_truncates() {
        let tasks = sample();
        let top = top_by_priority(&tasks, 3);
        assert_eq!(texts(&top), vec!["Write report", "Review PR", "Call mom"]);
    }

    #[test]
    fn unfiltered_detection_ignores_blank_search() {
        let query = TaskQuery {
            search_text: Some("  ".into()),
            sort_key: SortKey::Priority,
            ..TaskQuery::default()
        };
        assert!(query.is_unfiltered());
        assert!(
            !TaskQuery {
                completion: CompletionFilter::Completed,
                ..TaskQuery::default()
            }
            .is_unfiltered()
        );
    }
}
