//! Async persistence collaborator used by the sync layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Error, anyhow, bail};
use tasknest_core::id::{CategoryId, CommentId, TaskId, UserId};
use tasknest_core::{Category, Comment, NewTask, Task, TaskChanges};
use tasknest_store_file::{FileStore, FileStoreError};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

/// Owner-scoped `tasks`, `categories` and `comments` tables.
///
/// Every call is one request; inserts return the stored row with its assigned
/// id and timestamp.
#[allow(async_fn_in_trait)]
pub trait RemoteStore: Send + Sync {
    /// Error type bubbled up from the backend.
    type Error: Into<Error> + Send;

    /// Tasks ordered by `createdAt`, newest first.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn select_tasks(&self, owner: UserId) -> Result<Vec<Task>, Self::Error>;

    /// Insert a task row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn insert_task(&self, owner: UserId, row: NewTask) -> Result<Task, Self::Error>;

    /// Apply a partial update to a task row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn update_task(&self, owner: UserId, id: TaskId, changes: TaskChanges) -> Result<(), Self::Error>;

    /// Delete a task row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<(), Self::Error>;

    /// Categories ordered by `createdAt`, oldest first.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn select_categories(&self, owner: UserId) -> Result<Vec<Category>, Self::Error>;

    /// Insert a category row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn insert_category(&self, owner: UserId, name: String) -> Result<Category, Self::Error>;

    /// Rename a category row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn rename_category(&self, owner: UserId, id: CategoryId, name: String) -> Result<(), Self::Error>;

    /// Delete a category row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn delete_category(&self, owner: UserId, id: CategoryId) -> Result<(), Self::Error>;

    /// Comments on a task, oldest first.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn select_comments(&self, owner: UserId, task: TaskId) -> Result<Vec<Comment>, Self::Error>;

    /// Insert a comment row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn insert_comment(
        &self,
        owner: UserId,
        task: TaskId,
        author: String,
        text: String,
    ) -> Result<Comment, Self::Error>;

    /// Delete a comment row.
    ///
    /// # Errors
    /// Returns a backend-specific error when the request fails.
    async fn delete_comment(&self, owner: UserId, id: CommentId) -> Result<(), Self::Error>;
}

async fn blocking<T, F>(store: &Arc<Mutex<FileStore>>, op: F) -> Result<T, FileStoreError>
where
    T: Send + 'static,
    F: FnOnce(&FileStore) -> Result<T, FileStoreError> + Send + 'static,
{
    let guard = store.lock().await;
    // Clone the store to avoid holding the lock during blocking I/O
    let store = guard.clone();
    drop(guard);

    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| FileStoreError::Other(format!("Task join error: {e}")))?
}

impl RemoteStore for Arc<Mutex<FileStore>> {
    type Error = FileStoreError;

    async fn select_tasks(&self, owner: UserId) -> Result<Vec<Task>, Self::Error> {
        blocking(self, move |store| store.select_tasks(owner)).await
    }

    async fn insert_task(&self, owner: UserId, row: NewTask) -> Result<Task, Self::Error> {
        blocking(self, move |store| store.insert_task(owner, row)).await
    }

    async fn update_task(&self, owner: UserId, id: TaskId, changes: TaskChanges) -> Result<(), Self::Error> {
        blocking(self, move |store| store.update_task(owner, id, &changes)).await
    }

    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<(), Self::Error> {
        blocking(self, move |store| store.delete_task(owner, id)).await
    }

    async fn select_categories(&self, owner: UserId) -> Result<Vec<Category>, Self::Error> {
        blocking(self, move |store| store.select_categories(owner)).await
    }

    async fn insert_category(&self, owner: UserId, name: String) -> Result<Category, Self::Error> {
        blocking(self, move |store| store.insert_category(owner, &name)).await
    }

    async fn rename_category(&self, owner: UserId, id: CategoryId, name: String) -> Result<(), Self::Error> {
        blocking(self, move |store| store.rename_category(owner, id, &name)).await
    }

    async fn delete_category(&self, owner: UserId, id: CategoryId) -> Result<(), Self::Error> {
        blocking(self, move |store| store.delete_category(owner, id)).await
    }

    async fn select_comments(&self, owner: UserId, task: TaskId) -> Result<Vec<Comment>, Self::Error> {
        blocking(self, move |store| store.select_comments(owner, task)).await
    }

    async fn insert_comment(
        &self,
        owner: UserId,
        task: TaskId,
        author: String,
        text: String,
    ) -> Result<Comment, Self::Error> {
        blocking(self, move |store| store.insert_comment(owner, task, &author, &text)).await
    }

    async fn delete_comment(&self, owner: UserId, id: CommentId) -> Result<(), Self::Error> {
        blocking(self, move |store| store.delete_comment(owner, id)).await
    }
}

#[derive(Debug, Default)]
struct MemoryTables {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    comments: Vec<Comment>,
}

/// In-process backend with a switch that makes every request fail.
///
/// Counts requests so callers can check that validation failures never reach
/// the backend.
#[derive(Debug)]
pub struct MemoryStore {
    tables: StdMutex<HashMap<UserId, MemoryTables>>,
    clock: StdMutex<OffsetDateTime>,
    offline: AtomicBool,
    requests: AtomicUsize,
    fail_at: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: StdMutex::new(HashMap::new()),
            clock: StdMutex::new(OffsetDateTime::UNIX_EPOCH),
            offline: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(usize::MAX),
        }
    }
}

impl MemoryStore {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent requests fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make only the `n`-th request from now fail (1-based); later ones succeed.
    pub fn fail_request(&self, n: usize) {
        let target = self.requests().saturating_add(n.saturating_sub(1));
        self.fail_at.store(target, Ordering::SeqCst);
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn request(&self) -> Result<(), Error> {
        let seen = self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) || seen == self.fail_at.load(Ordering::SeqCst) {
            bail!("backend unavailable");
        }
        Ok(())
    }

    /// Strictly increasing timestamps so creation order is always observable.
    fn tick(&self) -> Result<OffsetDateTime, Error> {
        let mut last = self.clock.lock().map_err(|_| anyhow!("clock lock poisoned"))?;
        let now = OffsetDateTime::now_utc().max(*last + Duration::microseconds(1));
        *last = now;
        Ok(now)
    }

    fn with_tables<T>(&self, owner: UserId, f: impl FnOnce(&mut MemoryTables) -> Result<T, Error>) -> Result<T, Error> {
        self.request()?;
        let mut tables = self.tables.lock().map_err(|_| anyhow!("table lock poisoned"))?;
        f(tables.entry(owner).or_default())
    }
}

impl RemoteStore for MemoryStore {
    type Error = Error;

    async fn select_tasks(&self, owner: UserId) -> Result<Vec<Task>, Self::Error> {
        self.with_tables(owner, |t| {
            let mut tasks = t.tasks.clone();
            tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(tasks)
        })
    }

    async fn insert_task(&self, owner: UserId, row: NewTask) -> Result<Task, Self::Error> {
        let now = self.tick()?;
        self.with_tables(owner, |t| {
            let task = row.into_task(TaskId::new(), now);
            t.tasks.push(task.clone());
            Ok(task)
        })
    }

    async fn update_task(&self, owner: UserId, id: TaskId, changes: TaskChanges) -> Result<(), Self::Error> {
        self.with_tables(owner, |t| {
            let task = t
                .tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            changes.apply(task);
            Ok(())
        })
    }

    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<(), Self::Error> {
        self.with_tables(owner, |t| {
            let before = t.tasks.len();
            t.tasks.retain(|task| task.id != id);
            if t.tasks.len() == before {
                bail!("task {id} not found");
            }
            t.comments.retain(|c| c.task_id != id);
            Ok(())
        })
    }

    async fn select_categories(&self, owner: UserId) -> Result<Vec<Category>, Self::Error> {
        self.with_tables(owner, |t| Ok(t.categories.clone()))
    }

    async fn insert_category(&self, owner: UserId, name: String) -> Result<Category, Self::Error> {
        let now = self.tick()?;
        self.with_tables(owner, |t| {
            if t.categories.iter().any(|c| c.name == name) {
                bail!("category '{name}' already exists");
            }
            let category = Category {
                id: CategoryId::new(),
                name,
                user_id: owner,
                created_at: now,
            };
            t.categories.push(category.clone());
            Ok(category)
        })
    }

    async fn rename_category(&self, owner: UserId, id: CategoryId, name: String) -> Result<(), Self::Error> {
        self.with_tables(owner, |t| {
            let category = t
                .categories
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow!("category {id} not found"))?;
            category.name = name;
            Ok(())
        })
    }

    async fn delete_category(&self, owner: UserId, id: CategoryId) -> Result<(), Self::Error> {
        self.with_tables(owner, |t| {
            t.categories.retain(|c| c.id != id);
            Ok(())
        })
    }

    async fn select_comments(&self, owner: UserId, task: TaskId) -> Result<Vec<Comment>, Self::Error> {
        self.with_tables(owner, |t| {
            Ok(t.comments.iter().filter(|c| c.task_id == task).cloned().collect())
        })
    }

    async fn insert_comment(
        &self,
        owner: UserId,
        task: TaskId,
        author: String,
        text: String,
    ) -> Result<Comment, Self::Error> {
        let now = self.tick()?;
        self.with_tables(owner, |t| {
            if !t.tasks.iter().any(|row| row.id == task) {
                bail!("task {task} not found");
            }
            let comment = Comment {
                id: CommentId::new(),
                task_id: task,
                author,
                text,
                timestamp: now,
            };
            t.comments.push(comment.clone());
            Ok(comment)
        })
    }

    async fn delete_comment(&self, owner: UserId, id: CommentId) -> Result<(), Self::Error> {
        self.with_tables(owner, |t| {
            t.comments.retain(|c| c.id != id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_store_adapter_round_trips_rows() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = Arc::new(Mutex::new(FileStore::open(dir.path())?));
        let owner = UserId::new();

        let task = store.insert_task(owner, NewTask::titled("Adapter")).await?;
        store
            .update_task(owner, task.id, TaskChanges::completion(true))
            .await?;
        let comment = store
            .insert_comment(owner, task.id, "sam".into(), "hi".into())
            .await?;

        let tasks = RemoteStore::select_tasks(&store, owner).await?;
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].comments, vec![comment]);
        Ok(())
    }

    #[tokio::test]
    async fn offline_memory_store_rejects_and_counts_requests() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        store.set_offline(true);
        assert!(store.insert_task(owner, NewTask::titled("x")).await.is_err());
        assert_eq!(store.requests(), 1);

        store.set_offline(false);
        let task = store
            .insert_task(owner, NewTask::titled("x"))
            .await
            .unwrap_or_else(|err| panic!("insert: {err}"));
        assert_eq!(store.requests(), 2);
        assert_eq!(task.text, "x");
    }

    #[tokio::test]
    async fn memory_store_fails_one_scheduled_request() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        store.fail_request(2);
        assert!(store.insert_task(owner, NewTask::titled("a")).await.is_ok());
        assert!(store.insert_task(owner, NewTask::titled("b")).await.is_err());
        assert!(store.insert_task(owner, NewTask::titled("c")).await.is_ok());
        let texts: Vec<_> = store
            .select_tasks(owner)
            .await
            .unwrap_or_else(|err| panic!("select: {err}"))
            .into_iter()
            .map(|task| task.text)
            .collect();
        assert_eq!(texts.len(), 2);
        assert!(!texts.contains(&"b".to_owned()));
    }
}
