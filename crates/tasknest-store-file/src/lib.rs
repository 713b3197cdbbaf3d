//! JSON-file storage for tasknest.
//!
//! Each owner gets one document, `<root>/<user-id>.json`, holding the
//! `tasks`, `categories` and `comments` tables. Writes go to a sibling temp
//! file first and are renamed into place.

mod error;

pub use error::FileStoreError;

use anyhow::anyhow;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tasknest_core::id::{CategoryId, CommentId, TaskId, UserId};
use tasknest_core::{Category, Comment, NewTask, Task, TaskChanges};
use time::OffsetDateTime;
use tracing::{debug, info};

const DOCUMENT_CACHE_CAPACITY: usize = 16;

type Result<T> = std::result::Result<T, FileStoreError>;

/// Tables stored for one owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OwnerDocument {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    comments: Vec<Comment>,
}

impl OwnerDocument {
    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(FileStoreError::TaskNotFound(id))
    }

    fn ensure_unique_name(&self, name: &str, except: Option<CategoryId>) -> Result<()> {
        let taken = self
            .categories
            .iter()
            .any(|c| c.name == name && Some(c.id) != except);
        if taken {
            return Err(FileStoreError::DuplicateCategory(name.to_owned()));
        }
        Ok(())
    }
}

/// Owner-scoped storage over a directory of JSON documents.
///
/// Clones share the document cache, so concurrent handles see each other's
/// writes.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    documents: Arc<Mutex<LruCache<UserId, OwnerDocument>>>,
}

impl FileStore {
    /// Open (and create if needed) the data directory at `root`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let capacity = NonZeroUsize::new(DOCUMENT_CACHE_CAPACITY)
            .ok_or_else(|| anyhow!("cache capacity must be non-zero"))?;
        info!(root = %root.display(), "Opened file store");
        Ok(Self {
            root,
            documents: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    /// Directory holding the owner documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, owner: UserId) -> PathBuf {
        self.root.join(format!("{owner}.json"))
    }

    fn load_document(&self, owner: UserId) -> Result<OwnerDocument> {
        let path = self.document_path(owner);
        if !path.exists() {
            debug!(%owner, "No document yet; starting empty");
            return Ok(OwnerDocument::default());
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|source| FileStoreError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn save_document(&self, owner: UserId, doc: &OwnerDocument) -> Result<()> {
        let path = self.document_path(owner);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(doc).map_err(FileStoreError::Serialize)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        debug!(%owner, path = %path.display(), "Saved document");
        Ok(())
    }

    fn read<T>(&self, owner: UserId, f: impl FnOnce(&OwnerDocument) -> T) -> Result<T> {
        let mut cache = self.documents.lock().map_err(|_| FileStoreError::LockError)?;
        if let Some(doc) = cache.get(&owner) {
            return Ok(f(doc));
        }
        let doc = self.load_document(owner)?;
        let out = f(&doc);
        cache.put(owner, doc);
        Ok(out)
    }

    /// Apply `f` to a copy of the owner's document and persist it. Nothing is
    /// written or cached when `f` fails.
    fn write<T>(&self, owner: UserId, f: impl FnOnce(&mut OwnerDocument) -> Result<T>) -> Result<T> {
        let mut cache = self.documents.lock().map_err(|_| FileStoreError::LockError)?;
        let mut doc = match cache.get(&owner) {
            Some(doc) => doc.clone(),
            None => self.load_document(owner)?,
        };
        let out = f(&mut doc)?;
        self.save_document(owner, &doc)?;
        cache.put(owner, doc);
        Ok(out)
    }

    /// Every task of `owner`, newest first, with comments attached in posting
    /// order.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read.
    pub fn select_tasks(&self, owner: UserId) -> Result<Vec<Task>> {
        self.read(owner, |doc| {
            // Later inserts win ties.
            let mut tasks: Vec<Task> = doc.tasks.iter().rev().cloned().collect();
            tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            for task in &mut tasks {
                task.comments = comments_of(doc, task.id);
            }
            tasks
        })
    }

    /// Insert a task and return the stored row.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read or written.
    pub fn insert_task(&self, owner: UserId, row: NewTask) -> Result<Task> {
        let task = row.into_task(TaskId::new(), OffsetDateTime::now_utc());
        self.write(owner, |doc| {
            doc.tasks.push(task.clone());
            Ok(())
        })?;
        info!(%owner, task = %task.id, "Inserted task");
        Ok(task)
    }

    /// Apply `changes` to a stored task.
    ///
    /// # Errors
    /// Returns [`FileStoreError::TaskNotFound`] for unknown ids, or an I/O error.
    pub fn update_task(&self, owner: UserId, id: TaskId, changes: &TaskChanges) -> Result<()> {
        self.write(owner, |doc| {
            changes.apply(doc.task_mut(id)?);
            Ok(())
        })?;
        debug!(%owner, task = %id, "Updated task");
        Ok(())
    }

    /// Delete a task together with its comments.
    ///
    /// # Errors
    /// Returns [`FileStoreError::TaskNotFound`] for unknown ids, or an I/O error.
    pub fn delete_task(&self, owner: UserId, id: TaskId) -> Result<()> {
        self.write(owner, |doc| {
            let before = doc.tasks.len();
            doc.tasks.retain(|task| task.id != id);
            if doc.tasks.len() == before {
                return Err(FileStoreError::TaskNotFound(id));
            }
            doc.comments.retain(|comment| comment.task_id != id);
            Ok(())
        })?;
        info!(%owner, task = %id, "Deleted task");
        Ok(())
    }

    /// Every category of `owner`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read.
    pub fn select_categories(&self, owner: UserId) -> Result<Vec<Category>> {
        self.read(owner, |doc| {
            let mut categories = doc.categories.clone();
            categories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            categories
        })
    }

    /// Insert a category.
    ///
    /// # Errors
    /// Returns [`FileStoreError::DuplicateCategory`] when the name is taken.
    pub fn insert_category(&self, owner: UserId, name: &str) -> Result<Category> {
        let category = Category {
            id: CategoryId::new(),
            name: name.to_owned(),
            user_id: owner,
            created_at: OffsetDateTime::now_utc(),
        };
        self.write(owner, |doc| {
            doc.ensure_unique_name(name, None)?;
            doc.categories.push(category.clone());
            Ok(())
        })?;
        info!(%owner, category = %category.name, "Inserted category");
        Ok(category)
    }

    /// Rename a category. Tasks keep the name they were saved with.
    ///
    /// # Errors
    /// Returns [`FileStoreError::CategoryNotFound`] or
    /// [`FileStoreError::DuplicateCategory`].
    pub fn rename_category(&self, owner: UserId, id: CategoryId, name: &str) -> Result<()> {
        self.write(owner, |doc| {
            doc.ensure_unique_name(name, Some(id))?;
            let category = doc
                .categories
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(FileStoreError::CategoryNotFound(id))?;
            name.clone_into(&mut category.name);
            Ok(())
        })
    }

    /// Delete a category. Does not touch tasks.
    ///
    /// # Errors
    /// Returns [`FileStoreError::CategoryNotFound`] for unknown ids.
    pub fn delete_category(&self, owner: UserId, id: CategoryId) -> Result<()> {
        self.write(owner, |doc| {
            let before = doc.categories.len();
            doc.categories.retain(|c| c.id != id);
            if doc.categories.len() == before {
                return Err(FileStoreError::CategoryNotFound(id));
            }
            Ok(())
        })
    }

    /// Comments on `task`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read.
    pub fn select_comments(&self, owner: UserId, task: TaskId) -> Result<Vec<Comment>> {
        self.read(owner, |doc| comments_of(doc, task))
    }

    /// Post a comment on an existing task.
    ///
    /// # Errors
    /// Returns [`FileStoreError::TaskNotFound`] when the task does not exist.
    pub fn insert_comment(&self, owner: UserId, task: TaskId, author: &str, text: &str) -> Result<Comment> {
        let comment = Comment {
            id: CommentId::new(),
            task_id: task,
            author: author.to_owned(),
            text: text.to_owned(),
            timestamp: OffsetDateTime::now_utc(),
        };
        self.write(owner, |doc| {
            doc.task_mut(task)?;
            doc.comments.push(comment.clone());
            Ok(())
        })?;
        debug!(%owner, %task, comment = %comment.id, "Inserted comment");
        Ok(comment)
    }

    /// Delete a comment.
    ///
    /// # Errors
    /// Returns [`FileStoreError::CommentNotFound`] for unknown ids.
    pub fn delete_comment(&self, owner: UserId, id: CommentId) -> Result<()> {
        self.write(owner, |doc| {
            let before = doc.comments.len();
            doc.comments.retain(|c| c.id != id);
            if doc.comments.len() == before {
                return Err(FileStoreError::CommentNotFound(id));
            }
            Ok(())
        })
    }
}

fn comments_of(doc: &OwnerDocument, task: TaskId) -> Vec<Comment> {
    let mut comments: Vec<Comment> = doc
        .comments
        .iter()
        .filter(|c| c.task_id == task)
        .cloned()
        .collect();
    comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    comments
}
