//! Pure boolean tests over a single [`Task`].
//!
//! Predicates are total: a missing field fails the match instead of erroring.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{Priority, Task};

/// Case-insensitive substring matcher for task text.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Whether the task text contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.text.to_lowercase().contains(&self.needle)
    }
}

/// Inclusive calendar range used to filter by due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    #[serde(with = "crate::serde_date")]
    pub start: Date,
    /// Last day of the range.
    #[serde(with = "crate::serde_date")]
    pub end: Date,
}

impl DateRange {
    /// Build a range, swapping the bounds when given in reverse.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Whether `day` lies inside the range.
    #[must_use]
    pub fn contains(&self, day: Date) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Case-insensitive substring match on `text`. A blank query matches everything.
#[must_use]
pub fn matches_text(task: &Task, query: &str) -> bool {
    TextMatcher::new(query).is_none_or(|matcher| matcher.matches(task))
}

/// Exact category match. `None` matches everything.
#[must_use]
pub fn matches_category(task: &Task, category: Option<&str>) -> bool {
    category.is_none_or(|wanted| task.category.as_deref() == Some(wanted))
}

/// Exact priority match.
#[must_use]
pub fn matches_priority(task: &Task, priority: Priority) -> bool {
    task.priority == Some(priority)
}

/// Category membership. An empty set matches everything; tasks without a
/// category fail a non-empty set.
#[must_use]
pub fn matches_any_category(task: &Task, categories: &BTreeSet<String>) -> bool {
    categories.is_empty() || categories.iter().any(|name| matches_category(task, Some(name)))
}

/// Priority membership. An empty set matches everything.
#[must_use]
pub fn matches_any_priority(task: &Task, priorities: &BTreeSet<Priority>) -> bool {
    priorities.is_empty() || priorities.iter().any(|&p| matches_priority(task, p))
}

/// Due date inside an inclusive range. `None` matches everything; tasks
/// without a due date fail any set range.
#[must_use]
pub fn in_date_range(task: &Task, range: Option<&DateRange>) -> bool {
    range.is_none_or(|range| task.due_date.is_some_and(|due| range.contains(due)))
}

/// Task is not yet completed.
#[must_use]
pub const fn is_active(task: &Task) -> bool {
    !task.completed
}

/// Task is completed.
#[must_use]
pub const fn is_completed(task: &Task) -> bool {
    task.completed
}

/// Due date falls on `day`.
#[must_use]
pub fn is_due_on(task: &Task, day: Date) -> bool {
    task.due_date == Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use time::OffsetDateTime;
    use time::macros::date;

    fn task(text: &str) -> Task {
        Task::new(TaskId::new(), text, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn matcher_skips_blank_queries() {
        assert!(TextMatcher::new("").is_none());
        assert!(TextMatcher::new("   ").is_none());
        assert!(matches_text(&task("anything"), "  "));
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let t = task("Improve CLI Output");
        assert!(matches_text(&t, "cli"));
        assert!(matches_text(&t, "  OUTPUT "));
        assert!(!matches_text(&t, "api"));
        assert!(matches_text(&task("Ärger melden"), "ärger"));
    }

    #[test]
    fn category_filter_is_exact_and_optional() {
        let mut t = task("Pay rent");
        assert!(matches_category(&t, None));
        assert!(!matches_category(&t, Some("Personal")));
        t.category = Some("Personal".into());
        assert!(matches_category(&t, Some("Personal")));
        assert!(!matches_category(&t, Some("personal")));
    }

    #[test]
    fn category_membership() {
        let mut t = task("Pay rent");
        let wanted: BTreeSet<String> = ["Work".to_owned(), "Personal".to_owned()].into();
        assert!(matches_any_category(&t, &BTreeSet::new()));
        assert!(!matches_any_category(&t, &wanted));
        t.category = Some("Personal".into());
        assert!(matches_any_category(&t, &wanted));
        t.category = Some("Health".into());
        assert!(!matches_any_category(&t, &wanted));
    }

    #[test]
    fn priority_membership() {
        let mut t = task("Call bank");
        let wanted: BTreeSet<_> = [Priority::High, Priority::Medium].into();
        assert!(matches_any_priority(&t, &BTreeSet::new()));
        assert!(!matches_any_priority(&t, &wanted));
        t.priority = Some(Priority::Medium);
        assert!(matches_any_priority(&t, &wanted));
        assert!(!matches_priority(&t, Priority::High));
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::new(date!(2024 - 06 - 01), date!(2024 - 06 - 30));
        let mut t = task("File taxes");
        assert!(in_date_range(&t, None));
        assert!(!in_date_range(&t, Some(&range)));

        t.due_date = Some(date!(2024 - 06 - 01));
        assert!(in_date_range(&t, Some(&range)));
        t.due_date = Some(date!(2024 - 06 - 30));
        assert!(in_date_range(&t, Some(&range)));
        t.due_date = Some(date!(2024 - 07 - 01));
        assert!(!in_date_range(&t, Some(&range)));
    }

    #[test]
    fn reversed_range_bounds_are_swapped() {
        let range = DateRange::new(date!(2024 - 06 - 30), date!(2024 - 06 - 01));
        assert_eq!(range.start, date!(2024 - 06 - 01));
        assert!(range.contains(date!(2024 - 06 - 15)));
    }

    #[test]
    fn completion_predicates_are_complements() {
        let mut t = task("Water plants");
        assert!(is_active(&t) && !is_completed(&t));
        t.completed = true;
        assert!(!is_active(&t) && is_completed(&t));
    }

    #[test]
    fn due_on_compares_days() {
        let mut t = task("Standup");
        assert!(!is_due_on(&t, date!(2024 - 06 - 01)));
        t.due_date = Some(date!(2024 - 06 - 01));
        assert!(is_due_on(&t, date!(2024 - 06 - 01)));
    }
}
