//! Turn user-facing filter strings into a [`TaskQuery`].

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use tasknest_core::{CompletionFilter, DateRange, ParseTokenError, Priority, SortDirection, SortKey, TaskQuery};
use thiserror::Error;
use time::Date;

/// Error type returned while constructing task queries from user-facing inputs.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    /// Unknown priority, completion, sort key or direction token.
    #[error(transparent)]
    InvalidToken(#[from] ParseTokenError),
    /// A date bound did not parse.
    #[error("invalid {field} date: {source}")]
    InvalidDate {
        /// Which bound (`from` or `until`).
        field: &'static str,
        /// Parser error.
        #[source]
        source: time::error::Parse,
    },
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`TaskQuery`] values.
#[derive(Debug, Clone, Default)]
pub struct TaskQueryBuilder {
    text: Option<String>,
    categories: BTreeSet<String>,
    priorities: BTreeSet<Priority>,
    due_from: Option<Date>,
    due_until: Option<Date>,
    completion: CompletionFilter,
    sort_key: SortKey,
    sort_direction: SortDirection,
}

impl TaskQueryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the optional search text (whitespace-only inputs become `None`).
    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = non_blank(text);
        self
    }

    /// Extend the accepted category names (logical OR). Blank names are ignored.
    #[must_use]
    pub fn with_categories(mut self, names: &[String]) -> Self {
        self.categories
            .extend(names.iter().filter_map(|name| non_blank(Some(name.clone()))));
        self
    }

    /// Extend the accepted priorities (logical OR).
    ///
    /// # Errors
    /// Returns an error if any token is not a known priority.
    pub fn with_priorities(mut self, tokens: &[String]) -> FilterBuildResult<Self> {
        for token in tokens {
            self.priorities.insert(token.parse()?);
        }
        Ok(self)
    }

    /// Configure the completion filter (`all`, `active`, `completed`).
    ///
    /// # Errors
    /// Returns an error for unknown tokens.
    pub fn with_completion(mut self, token: Option<&str>) -> FilterBuildResult<Self> {
        if let Some(token) = token {
            self.completion = token.parse()?;
        }
        Ok(self)
    }

    /// Configure the inclusive due-date window from `YYYY-MM-DD` strings. A
    /// missing bound leaves that side open.
    ///
    /// # Errors
    /// Returns an error if either date fails to parse.
    pub fn with_due_range(mut self, from: Option<String>, until: Option<String>) -> FilterBuildResult<Self> {
        self.due_from = parse_optional_date("from", from)?;
        self.due_until = parse_optional_date("until", until)?;
        Ok(self)
    }

    /// Configure ordering from tokens; `None` keeps the current value.
    ///
    /// # Errors
    /// Returns an error for unknown sort keys or directions.
    pub fn with_sort(mut self, key: Option<&str>, direction: Option<&str>) -> FilterBuildResult<Self> {
        if let Some(key) = key {
            self.sort_key = key.parse()?;
        }
        if let Some(direction) = direction {
            self.sort_direction = direction.parse()?;
        }
        Ok(self)
    }

    /// Configure ordering using already parsed values.
    #[must_use]
    pub const fn with_sort_values(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.sort_direction = direction;
        self
    }

    /// Build the final [`TaskQuery`].
    #[must_use]
    pub fn build(self) -> TaskQuery {
        let due_range = match (self.due_from, self.due_until) {
            (None, None) => None,
            (from, until) => Some(DateRange::new(from.unwrap_or(Date::MIN), until.unwrap_or(Date::MAX))),
        };
        TaskQuery {
            search_text: self.text,
            categories: self.categories,
            priorities: self.priorities,
            due_range,
            completion: self.completion,
            sort_key: self.sort_key,
            sort_direction: self.sort_direction,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parse a `YYYY-MM-DD` date (a full ISO timestamp keeps its date part).
///
/// # Errors
/// Returns an error if the string is not a calendar date.
pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    tasknest_core::serde_date::parse(s.trim())
}

fn parse_optional_date(field: &'static str, value: Option<String>) -> FilterBuildResult<Option<Date>> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    parse_date(&raw)
        .map(Some)
        .map_err(|source| FilterBuildError::InvalidDate { field, source })
}

impl FilterBuildError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::InvalidToken(err) => format!("{} is not a valid {}", err.token, err.kind),
            Self::InvalidDate { field, .. } => format!("--{field} must be a date like 2024-06-01"),
        }
    }
}

impl Display for TaskQueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueryBuilder")
            .field("text", &self.text)
            .field("categories", &self.categories)
            .field("priorities", &self.priorities)
            .field("due_from", &self.due_from)
            .field("due_until", &self.due_until)
            .field("completion", &self.completion)
            .field("sort_key", &self.sort_key)
            .field("sort_direction", &self.sort_direction)
            .finish()
    }
}
