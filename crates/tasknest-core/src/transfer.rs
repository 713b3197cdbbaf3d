//! JSON export/import document: `{ "todos": [...], "categories": [...] }`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Category, Task};

/// Errors raised while encoding or decoding an export document.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The input was not a valid export document.
    #[error("malformed export document: {0}")]
    Parse(#[source] serde_json::Error),
    /// The document could not be encoded.
    #[error("failed to encode export document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Full snapshot of a user's tasks and categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Every task, including embedded comments and activities.
    pub todos: Vec<Task>,
    /// Every category.
    pub categories: Vec<Category>,
}

impl ExportDocument {
    /// Capture the given collections.
    #[must_use]
    pub fn new(todos: &[Task], categories: &[Category]) -> Self {
        Self {
            todos: todos.to_vec(),
            categories: categories.to_vec(),
        }
    }

    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`TransferError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TransferError> {
        serde_json::to_string_pretty(self).map_err(TransferError::Encode)
    }

    /// Decode a document. Missing `comments`/`activities` default to empty;
    /// anything malformed fails as a whole.
    ///
    /// # Errors
    /// Returns [`TransferError::Parse`] for invalid JSON or shape mismatches.
    pub fn from_json(raw: &str) -> Result<Self, TransferError> {
        serde_json::from_str(raw).map_err(TransferError::Parse)
    }
}
