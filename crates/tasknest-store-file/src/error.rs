//! Error types for file store operations.

use tasknest_core::id::{CategoryId, CommentId, TaskId};
use thiserror::Error;

/// Errors that can occur during `FileStore` operations.
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// Task was not found in the owner's document.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Category was not found in the owner's document.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Comment was not found in the owner's document.
    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),

    /// Another category of the same owner already uses the name.
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    /// Owner document could not be parsed.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Document path.
        path: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Owner document could not be encoded.
    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to acquire the document cache lock.
    #[error("Document cache lock error")]
    LockError,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other unclassified error.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for FileStoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
