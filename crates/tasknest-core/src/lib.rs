//! Domain types and the task query engine for tasknest.
//!
//! Everything here is pure: functions borrow the task collection, never cache
//! it, and take the reference day as a parameter instead of reading a clock.

/// Kanban board and calendar views.
pub mod board;
/// Named bucketing of files and tasks.
pub mod bucket;
/// Task comparators.
pub mod compare;
/// Identifier types.
pub mod id;
/// Records stored by the persistence backend.
pub mod model;
/// Partial task updates.
pub mod patch;
/// Task predicates.
pub mod predicate;
/// Query executor and summary statistics.
pub mod query;
/// `YYYY-MM-DD` serde helpers.
pub mod serde_date;
/// Export/import document.
pub mod transfer;

pub use board::{Board, BoardColumn, column_of, due_on, timeline};
pub use bucket::{
    CategoryClassifier, CategoryShare, ExtensionTable, FileGroup, OTHERS_BUCKET, UNCATEGORIZED, bucket,
    category_distribution,
};
pub use compare::{SortDirection, SortKey};
pub use model::{
    Activity, ActivityKind, Category, Comment, NewTask, ParseTokenError, Priority, Status, Task,
};
pub use patch::{DateValue, FieldPatch, TaskChanges};
pub use predicate::{DateRange, TextMatcher};
pub use query::{CompletionFilter, TaskQuery, TaskSummary, execute, summarize, top_by_priority};
pub use transfer::{ExportDocument, TransferError};
