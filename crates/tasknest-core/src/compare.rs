//! Ordering functions over pairs of tasks.
//!
//! Every comparator yields the ascending order; [`SortDirection::apply`] flips it.
//! Callers must sort with a stable algorithm (`slice::sort_by`) so equal keys keep
//! their input order in both directions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use serde::{Deserialize, Serialize};

use crate::model::{ParseTokenError, Priority, Task};

thread_local! {
    // CLDR root collation with compiled data.
    static ROOT_COLLATOR: Option<CollatorBorrowed<'static>> =
        Collator::try_new(CollatorPreferences::default(), CollatorOptions::default()).ok();
}

/// Field used to order a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// High before medium before low.
    Priority,
    /// Earliest deadline first; tasks without one sort first.
    DueDate,
    /// Case-folded task text.
    Alphabetical,
    /// Creation timestamp.
    #[default]
    CreatedAt,
}

impl SortKey {
    /// Compare two tasks under this key in ascending order.
    #[must_use]
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Priority => by_priority(a, b),
            Self::DueDate => by_due_date(a, b),
            Self::Alphabetical => by_text(a, b),
            Self::CreatedAt => by_created_at(a, b),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Priority => "priority",
            Self::DueDate => "due-date",
            Self::Alphabetical => "alphabetical",
            Self::CreatedAt => "created-at",
        })
    }
}

impl FromStr for SortKey {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "priority" => Ok(Self::Priority),
            "duedate" | "due" => Ok(Self::DueDate),
            "alphabetical" | "text" | "title" => Ok(Self::Alphabetical),
            "createdat" | "created" => Ok(Self::CreatedAt),
            _ => Err(ParseTokenError {
                kind: "sort key",
                token: s.to_owned(),
            }),
        }
    }
}

/// Ascending or descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Keep the comparator's order.
    Asc,
    /// Reverse the comparator's order.
    #[default]
    Desc,
}

impl SortDirection {
    /// Apply the direction to an ascending comparison result.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ParseTokenError {
                kind: "sort direction",
                token: s.to_owned(),
            }),
        }
    }
}

/// Compare under `key`, then apply `direction`.
#[must_use]
pub fn compare(a: &Task, b: &Task, key: SortKey, direction: SortDirection) -> Ordering {
    direction.apply(key.compare(a, b))
}

/// High < medium < low; tasks without a priority rank as low.
#[must_use]
pub fn by_priority(a: &Task, b: &Task) -> Ordering {
    priority_rank(a).cmp(&priority_rank(b))
}

fn priority_rank(task: &Task) -> u8 {
    task.priority.unwrap_or(Priority::Low).rank()
}

/// Earliest due date first. A missing due date is the earliest possible value.
#[must_use]
pub fn by_due_date(a: &Task, b: &Task) -> Ordering {
    // `None < Some(_)` for `Option`, which is exactly the missing-first policy.
    a.due_date.cmp(&b.due_date)
}

/// Locale-aware comparison of the task text, with the raw text as tie-break.
#[must_use]
pub fn by_text(a: &Task, b: &Task) -> Ordering {
    collate(&a.text, &b.text).then_with(|| a.text.cmp(&b.text))
}

fn collate(a: &str, b: &str) -> Ordering {
    ROOT_COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    })
}

/// Oldest first.
#[must_use]
pub fn by_created_at(a: &Task, b: &Task) -> Ordering {
    a.created_at.cmp(&b.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    fn task(text: &str) -> Task {
        Task::new(TaskId::new(), text, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn priority_treats_unset_as_low() {
        let mut high = task("high");
        high.priority = Some(Priority::High);
        let mut low = task("low");
        low.priority = Some(Priority::Low);
        let unset = task("unset");

        assert_eq!(by_priority(&high, &low), Ordering::Less);
        assert_eq!(by_priority(&unset, &low), Ordering::Equal);
        assert_eq!(by_priority(&low, &high), Ordering::Greater);
    }

    #[test]
    fn missing_due_date_sorts_first() {
        let mut due = task("due");
        due.due_date = Some(date!(2024 - 01 - 01));
        let open = task("open");
        assert_eq!(by_due_date(&open, &due), Ordering::Less);
        assert_eq!(by_due_date(&open, &task("other")), Ordering::Equal);
    }

    #[test]
    fn text_ignores_case_first() {
        assert_eq!(by_text(&task("apple"), &task("Banana")), Ordering::Less);
        assert_eq!(by_text(&task("Zoo"), &task("ant")), Ordering::Greater);
        assert_ne!(by_text(&task("Apple"), &task("apple")), Ordering::Equal);
    }

    #[test]
    fn text_collates_accents_and_scripts() {
        assert_eq!(by_text(&task("éclair"), &task("zebra")), Ordering::Less);
        assert_eq!(by_text(&task("Ärger"), &task("Bank")), Ordering::Less);
        assert_eq!(by_text(&task("Œuvre"), &task("Pflanze")), Ordering::Less);
        assert_eq!(by_text(&task("zebra"), &task("яблоко")), Ordering::Less);
        assert_eq!(by_text(&task("résumé"), &task("resume")), Ordering::Greater);
    }

    #[test]
    fn created_at_orders_oldest_first() {
        let mut old = task("old");
        old.created_at = datetime!(2024-01-01 00:00 UTC);
        let mut new = task("new");
        new.created_at = datetime!(2024-02-01 00:00 UTC);
        assert_eq!(by_created_at(&old, &new), Ordering::Less);
    }

    #[test]
    fn descending_reverses_non_equal_results_only() {
        let a = task("a");
        let b = task("b");
        assert_eq!(
            compare(&a, &b, SortKey::Alphabetical, SortDirection::Desc),
            Ordering::Greater
        );
        assert_eq!(
            compare(&a, &task("other"), SortKey::Priority, SortDirection::Desc),
            Ordering::Equal
        );
    }

    #[test]
    fn parses_sort_tokens() {
        assert_eq!("due-date".parse::<SortKey>(), Ok(SortKey::DueDate));
        assert_eq!("createdAt".parse::<SortKey>(), Ok(SortKey::CreatedAt));
        assert_eq!("ASC".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
    }
}
