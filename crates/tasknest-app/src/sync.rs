//! Confirm-then-patch synchronization between the session's collections and
//! the backend.
//!
//! Every action moves [`SyncState`] from `Pending` to `Committed` or `Failed`.
//! The backend is asked first; local collections are replaced only once the
//! request succeeded. Validation happens before any request is made.

use std::collections::BTreeSet;

use anyhow::Error;
use tasknest_core::id::{CategoryId, CommentId, TaskId, UserId};
use tasknest_core::{
    Activity, Category, Comment, ExportDocument, FieldPatch, NewTask, Status, Task, TaskChanges, TransferError,
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_CATEGORIES;
use crate::context::{AppContext, NotificationLevel};
use crate::session::Session;
use crate::settings::ThemeSettings;
use crate::store::RemoteStore;
use crate::task_patch::{TaskPatch, TaskUpdate, assignment_activity};

/// Outcome of the most recent action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No action has run yet, or the last one was a no-op.
    #[default]
    Idle,
    /// Waiting on the backend.
    Pending,
    /// The backend confirmed and the local collection was patched.
    Committed,
    /// Validation or the backend rejected the action; nothing was patched.
    Failed,
}

/// Errors raised by [`Workspace`] actions.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// No session is active.
    #[error("not signed in")]
    NoSession,
    /// A required field was blank.
    #[error("{0}")]
    Validation(&'static str),
    /// A category with the same name already exists.
    #[error("category '{0}' already exists")]
    DuplicateCategory(String),
    /// The task is not in the local collection.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// The category is not in the local collection.
    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),
    /// The comment is not in the local collection.
    #[error("comment {0} not found")]
    CommentNotFound(CommentId),
    /// The backend rejected the request.
    #[error("{action}: {source}")]
    Remote {
        /// User-facing description of the failed action.
        action: &'static str,
        /// Backend error.
        #[source]
        source: Error,
    },
    /// An import document could not be decoded.
    #[error(transparent)]
    Import(#[from] TransferError),
}

impl SyncError {
    /// Message pushed to the notification queue.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote { action, .. } => (*action).to_owned(),
            Self::Import(_) => "Failed to import data".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Result of a bulk action. Every item is its own action, so some may
/// commit while others fail.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Items the backend confirmed.
    pub committed: Vec<TaskId>,
    /// Items already in the requested state; no request was made.
    pub skipped: Vec<TaskId>,
    /// Items that were rejected, with the reason.
    pub failed: Vec<(TaskId, SyncError)>,
}

/// Rows written by [`Workspace::restore_document`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    /// Categories inserted (names already present are skipped).
    pub categories: usize,
    /// Tasks inserted.
    pub tasks: usize,
    /// Comments inserted.
    pub comments: usize,
}

/// The signed-in session's collections bound to a backend.
///
/// Actions take `&mut self`, so a session change can never interleave with
/// an action in flight: a result always lands in the context that issued it.
pub struct Workspace<S> {
    store: S,
    context: Option<AppContext>,
    state: SyncState,
    default_categories: Vec<String>,
    settings: ThemeSettings,
}

impl<S> Workspace<S> {
    /// Workspace with no active session.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            context: None,
            state: SyncState::Idle,
            default_categories: DEFAULT_CATEGORIES.iter().map(|name| (*name).to_owned()).collect(),
            settings: ThemeSettings::default(),
        }
    }

    /// Categories inserted for owners that have none.
    #[must_use]
    pub fn with_default_categories(mut self, names: Vec<String>) -> Self {
        self.default_categories = names;
        self
    }

    /// Settings given to every new session context.
    #[must_use]
    pub fn with_settings(mut self, settings: ThemeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Backend handle.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// State recorded by the last action.
    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// Active session context.
    #[must_use]
    pub const fn context(&self) -> Option<&AppContext> {
        self.context.as_ref()
    }

    /// Active session context, mutably (settings, notifications).
    pub fn context_mut(&mut self) -> Option<&mut AppContext> {
        self.context.as_mut()
    }

    fn reject(&mut self, err: SyncError) -> SyncError {
        warn!(error = %err, "Action rejected");
        self.state = SyncState::Failed;
        if let Some(ctx) = self.context.as_mut() {
            ctx.notify(NotificationLevel::Error, err.user_message());
        }
        err
    }

    fn begin(&mut self) -> Result<UserId, SyncError> {
        let Some(ctx) = self.context.as_ref() else {
            return Err(self.reject(SyncError::NoSession));
        };
        let owner = ctx.session().user_id;
        self.state = SyncState::Pending;
        Ok(owner)
    }

    fn settle<T, E: Into<Error>>(&mut self, action: &'static str, result: Result<T, E>) -> Result<T, SyncError> {
        result.map_err(|err| {
            let source = err.into();
            warn!(action, error = %source, "Backend request failed");
            let err = SyncError::Remote { action, source };
            self.state = SyncState::Failed;
            if let Some(ctx) = self.context.as_mut() {
                ctx.notify(NotificationLevel::Error, err.user_message());
            }
            err
        })
    }

    fn refresh(&mut self, patch: impl FnOnce(&mut AppContext)) {
        self.state = SyncState::Committed;
        if let Some(ctx) = self.context.as_mut() {
            patch(ctx);
        }
    }

    fn commit(&mut self, message: &'static str, patch: impl FnOnce(&mut AppContext)) {
        self.refresh(|ctx| {
            patch(ctx);
            ctx.notify(NotificationLevel::Success, message);
        });
        debug!(message, "Committed");
    }

    fn find_task(&mut self, id: TaskId) -> Result<Task, SyncError> {
        let found = match self.context.as_ref() {
            None => Err(SyncError::NoSession),
            Some(ctx) => ctx.task(id).cloned().ok_or(SyncError::TaskNotFound(id)),
        };
        found.map_err(|err| self.reject(err))
    }

    fn find_category(&mut self, id: CategoryId) -> Result<Category, SyncError> {
        let found = match self.context.as_ref() {
            None => Err(SyncError::NoSession),
            Some(ctx) => ctx
                .categories()
                .iter()
                .find(|category| category.id == id)
                .cloned()
                .ok_or(SyncError::CategoryNotFound(id)),
        };
        found.map_err(|err| self.reject(err))
    }

    fn require_text(&mut self, value: &str, message: &'static str) -> Result<String, SyncError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(self.reject(SyncError::Validation(message)));
        }
        Ok(trimmed.to_owned())
    }

    fn actor(&self) -> String {
        self.context
            .as_ref()
            .map_or_else(|| "System".to_owned(), |ctx| ctx.session().email.clone())
    }

    /// Replace the collections with an imported document. Local only; a
    /// malformed document leaves everything untouched.
    ///
    /// # Errors
    /// Returns [`SyncError::Import`] for malformed input and
    /// [`SyncError::NoSession`] when signed out.
    pub fn import_document(&mut self, raw: &str) -> Result<usize, SyncError> {
        if self.context.is_none() {
            return Err(self.reject(SyncError::NoSession));
        }
        let document = ExportDocument::from_json(raw).map_err(|err| self.reject(err.into()))?;
        let count = document.todos.len();
        self.commit("Data imported successfully", move |ctx| {
            ctx.replace_tasks(document.todos);
            ctx.replace_categories(document.categories);
            ctx.replace_comments(None, Vec::new());
        });
        Ok(count)
    }

    /// Export the collections as pretty JSON.
    ///
    /// # Errors
    /// Returns [`SyncError::NoSession`] when signed out.
    pub fn export_document(&self) -> Result<String, SyncError> {
        let ctx = self.context.as_ref().ok_or(SyncError::NoSession)?;
        Ok(ExportDocument::new(ctx.tasks(), ctx.categories()).to_json()?)
    }

    /// Empty the local collections without touching the backend.
    pub fn clear_data(&mut self) {
        if self.context.is_some() {
            self.commit("All data cleared", |ctx| {
                ctx.replace_tasks(Vec::new());
                ctx.replace_categories(Vec::new());
                ctx.replace_comments(None, Vec::new());
            });
        }
    }
}

fn replace_task(ctx: &mut AppContext, updated: Task) {
    let tasks = ctx
        .tasks()
        .iter()
        .map(|task| if task.id == updated.id { updated.clone() } else { task.clone() })
        .collect();
    ctx.replace_tasks(tasks);
}

fn remove_task(ctx: &mut AppContext, id: TaskId) {
    let tasks = ctx.tasks().iter().filter(|task| task.id != id).cloned().collect();
    ctx.replace_tasks(tasks);
    if ctx.comments_task() == Some(id) {
        ctx.replace_comments(None, Vec::new());
    }
}

fn add_comment_locally(ctx: &mut AppContext, comment: Comment) {
    if ctx.comments_task() == Some(comment.task_id) {
        let mut thread = ctx.comments().to_vec();
        thread.push(comment.clone());
        ctx.replace_comments(Some(comment.task_id), thread);
    }
    if let Some(task) = ctx.task(comment.task_id) {
        let mut updated = task.clone();
        updated.comments.push(comment);
        replace_task(ctx, updated);
    }
}

fn remove_comment_locally(ctx: &mut AppContext, id: CommentId) {
    let thread = ctx.comments().iter().filter(|c| c.id != id).cloned().collect();
    ctx.replace_comments(ctx.comments_task(), thread);
    let tasks = ctx
        .tasks()
        .iter()
        .map(|task| {
            let mut task = task.clone();
            task.comments.retain(|c| c.id != id);
            task
        })
        .collect();
    ctx.replace_tasks(tasks);
}

impl<S: RemoteStore> Workspace<S> {
    /// React to an authentication change: a new session gets a fresh context,
    /// is reloaded and seeded with default categories; `None` drops the
    /// context.
    ///
    /// # Errors
    /// Returns [`SyncError`] when loading the new session fails.
    pub async fn on_session_change(&mut self, session: Option<Session>) -> Result<(), SyncError> {
        let Some(session) = session else {
            if self.context.take().is_some() {
                info!("Session ended, collections cleared");
            }
            self.state = SyncState::Idle;
            return Ok(());
        };

        let same_user = self
            .context
            .as_ref()
            .is_some_and(|ctx| ctx.session().user_id == session.user_id);
        if !same_user {
            info!(user = %session.user_id, "Session started");
            self.context = Some(AppContext::new(session, self.settings.clone()));
        }
        self.reload().await?;
        self.seed_default_categories().await?;
        Ok(())
    }

    /// Wait for the next session change and apply it. Returns `false` once
    /// the provider has gone away.
    ///
    /// # Errors
    /// Propagates errors from [`on_session_change`](Self::on_session_change).
    pub async fn follow(&mut self, sessions: &mut watch::Receiver<Option<Session>>) -> Result<bool, SyncError> {
        if sessions.changed().await.is_err() {
            return Ok(false);
        }
        let session = sessions.borrow_and_update().clone();
        self.on_session_change(session).await?;
        Ok(true)
    }

    /// Fetch tasks (newest first) and categories (oldest first).
    ///
    /// # Errors
    /// Returns [`SyncError::Remote`] when either fetch fails; a failed fetch
    /// leaves its collection untouched.
    pub async fn reload(&mut self) -> Result<(), SyncError> {
        let owner = self.begin()?;
        let tasks = self.store.select_tasks(owner).await;
        let tasks = self.settle("Failed to fetch tasks", tasks)?;
        let categories = self.store.select_categories(owner).await;
        let categories = self.settle("Failed to fetch categories", categories)?;
        debug!(tasks = tasks.len(), categories = categories.len(), "Reloaded collections");
        self.refresh(|ctx| {
            ctx.replace_tasks(tasks);
            ctx.replace_categories(categories);
        });
        Ok(())
    }

    /// Insert the default categories when the owner has none. Returns how
    /// many were inserted.
    ///
    /// # Errors
    /// Returns [`SyncError::Remote`] on the first failed insert.
    pub async fn seed_default_categories(&mut self) -> Result<usize, SyncError> {
        let Some(ctx) = self.context.as_ref() else {
            return Err(self.reject(SyncError::NoSession));
        };
        if !ctx.categories().is_empty() {
            return Ok(0);
        }
        let names = self.default_categories.clone();
        for name in &names {
            let owner = self.begin()?;
            let result = self.store.insert_category(owner, name.clone()).await;
            let category = self.settle("Failed to add category", result)?;
            self.refresh(|ctx| {
                let mut categories = ctx.categories().to_vec();
                categories.push(category);
                ctx.replace_categories(categories);
            });
        }
        info!(count = names.len(), "Seeded default categories");
        Ok(names.len())
    }

    /// Create a task. The text must not be blank.
    ///
    /// # Errors
    /// Returns [`SyncError::Validation`] for blank text or
    /// [`SyncError::Remote`] when the insert fails.
    pub async fn add_task(&mut self, mut row: NewTask) -> Result<TaskId, SyncError> {
        row.text = self.require_text(&row.text, "Todo text cannot be empty")?;
        let owner = self.begin()?;
        let result = self.store.insert_task(owner, row).await;
        let task = self.settle("Failed to add todo", result)?;
        let id = task.id;
        self.commit("Todo added", |ctx| {
            let mut tasks = Vec::with_capacity(ctx.tasks().len() + 1);
            tasks.push(task);
            tasks.extend(ctx.tasks().iter().cloned());
            ctx.replace_tasks(tasks);
        });
        Ok(id)
    }

    async fn send_update(
        &mut self,
        task: &Task,
        changes: TaskChanges,
        failure: &'static str,
        success: &'static str,
    ) -> Result<(), SyncError> {
        let owner = self.begin()?;
        let updated = changes.applied(task);
        let result = self.store.update_task(owner, task.id, changes).await;
        self.settle(failure, result)?;
        self.commit(success, |ctx| replace_task(ctx, updated));
        Ok(())
    }

    /// Apply an edit form. Returns `false` (no request) when nothing changed.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks, blank text or a failed update.
    pub async fn update_task(&mut self, id: TaskId, update: TaskUpdate) -> Result<bool, SyncError> {
        let task = self.find_task(id)?;
        self.require_text(&update.text, "Todo text cannot be empty")?;
        let patch = TaskPatch::from_task(&task, update, &self.actor(), OffsetDateTime::now_utc());
        if patch.is_empty() {
            self.state = SyncState::Idle;
            return Ok(false);
        }
        self.send_update(&task, patch.into_changes(), "Failed to update todo", "Todo updated")
            .await?;
        Ok(true)
    }

    /// Flip the completion flag. Returns the new value.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks or a failed update.
    pub async fn toggle_task(&mut self, id: TaskId) -> Result<bool, SyncError> {
        let task = self.find_task(id)?;
        let completed = !task.completed;
        self.send_update(
            &task,
            TaskChanges::completion(completed),
            "Failed to update todo",
            "Todo updated",
        )
        .await?;
        Ok(completed)
    }

    /// Move a task to a kanban column. Moving to `Completed` also sets the
    /// completion flag; any other column clears it.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks or a failed update.
    pub async fn set_status(&mut self, id: TaskId, status: Status) -> Result<bool, SyncError> {
        let task = self.find_task(id)?;
        let mut form = TaskUpdate::from_task(&task);
        form.status = Some(status);
        let mut changes = TaskPatch::from_task(&task, form, &self.actor(), OffsetDateTime::now_utc()).into_changes();
        let completed = status == Status::Completed;
        if task.completed != completed {
            changes.completed = Some(completed);
        }
        if changes.is_empty() {
            self.state = SyncState::Idle;
            return Ok(false);
        }
        self.send_update(&task, changes, "Failed to update todo", "Todo updated")
            .await?;
        Ok(true)
    }

    /// Assign a task. A changed assignee records an assignment activity in
    /// the same request. Returns `false` when the assignee is unchanged.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks, a blank assignee or a failed update.
    pub async fn assign_task(&mut self, id: TaskId, assignee: &str) -> Result<bool, SyncError> {
        let task = self.find_task(id)?;
        let assignee = self.require_text(assignee, "Assignee cannot be empty")?;
        let Some(activity) = assignment_activity(&task, &assignee, OffsetDateTime::now_utc()) else {
            self.state = SyncState::Idle;
            return Ok(false);
        };
        let changes = TaskChanges {
            assigned_to: Some(FieldPatch::Set(assignee)),
            activities: vec![activity],
            ..TaskChanges::default()
        };
        self.send_update(&task, changes, "Failed to update todo", "Todo assigned")
            .await?;
        Ok(true)
    }

    /// Delete a task and its comments.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks or a failed delete; the task
    /// stays in the collection on failure.
    pub async fn delete_task(&mut self, id: TaskId) -> Result<(), SyncError> {
        self.find_task(id)?;
        let owner = self.begin()?;
        let result = self.store.delete_task(owner, id).await;
        self.settle("Failed to delete todo", result)?;
        self.commit("Todo deleted", |ctx| remove_task(ctx, id));
        Ok(())
    }

    /// Mark every listed task completed. Tasks already completed are skipped.
    pub async fn complete_many(&mut self, ids: &[TaskId]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let task = match self.find_task(id) {
                Ok(task) if task.completed => {
                    outcome.skipped.push(id);
                    continue;
                }
                Ok(task) => task,
                Err(err) => {
                    outcome.failed.push((id, err));
                    continue;
                }
            };
            match self
                .send_update(&task, TaskChanges::completion(true), "Failed to update todo", "Todo updated")
                .await
            {
                Ok(()) => outcome.committed.push(id),
                Err(err) => outcome.failed.push((id, err)),
            }
        }
        outcome
    }

    /// Delete every listed task.
    pub async fn delete_many(&mut self, ids: &[TaskId]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.delete_task(id).await {
                Ok(()) => outcome.committed.push(id),
                Err(err) => outcome.failed.push((id, err)),
            }
        }
        outcome
    }

    /// Delete every completed task.
    pub async fn clear_completed(&mut self) -> BulkOutcome {
        let ids: Vec<TaskId> = self
            .context
            .as_ref()
            .map(|ctx| ctx.tasks().iter().filter(|task| task.completed).map(|task| task.id).collect())
            .unwrap_or_default();
        self.delete_many(&ids).await
    }

    /// Create a category. Names must be non-blank and unique.
    ///
    /// # Errors
    /// Returns [`SyncError`] for blank or duplicate names and failed inserts.
    pub async fn add_category(&mut self, name: &str) -> Result<CategoryId, SyncError> {
        let name = self.require_text(name, "Category name cannot be empty")?;
        let exists = self
            .context
            .as_ref()
            .is_some_and(|ctx| ctx.categories().iter().any(|c| c.name == name));
        if exists {
            return Err(self.reject(SyncError::DuplicateCategory(name)));
        }
        let owner = self.begin()?;
        let result = self.store.insert_category(owner, name).await;
        let category = self.settle("Failed to add category", result)?;
        let id = category.id;
        self.commit("Category added", |ctx| {
            let mut categories = ctx.categories().to_vec();
            categories.push(category);
            ctx.replace_categories(categories);
        });
        Ok(id)
    }

    /// Rename a category. Tasks keep the name they were filed under.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown ids, blank or duplicate names and
    /// failed updates.
    pub async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<(), SyncError> {
        let category = self.find_category(id)?;
        let name = self.require_text(name, "Category name cannot be empty")?;
        if category.name == name {
            self.state = SyncState::Idle;
            return Ok(());
        }
        let taken = self
            .context
            .as_ref()
            .is_some_and(|ctx| ctx.categories().iter().any(|c| c.id != id && c.name == name));
        if taken {
            return Err(self.reject(SyncError::DuplicateCategory(name)));
        }
        let owner = self.begin()?;
        let result = self.store.rename_category(owner, id, name.clone()).await;
        self.settle("Failed to update category name", result)?;
        self.commit("Category renamed", |ctx| {
            let categories = ctx
                .categories()
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    if c.id == id {
                        c.name.clone_from(&name);
                    }
                    c
                })
                .collect();
            ctx.replace_categories(categories);
        });
        Ok(())
    }

    /// Delete a category. Tasks filed under it keep the name.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown ids or a failed delete.
    pub async fn delete_category(&mut self, id: CategoryId) -> Result<(), SyncError> {
        self.find_category(id)?;
        let owner = self.begin()?;
        let result = self.store.delete_category(owner, id).await;
        self.settle("Failed to delete category", result)?;
        self.commit("Category deleted", |ctx| {
            let categories = ctx.categories().iter().filter(|c| c.id != id).cloned().collect();
            ctx.replace_categories(categories);
        });
        Ok(())
    }

    /// Fetch a task's comment thread, oldest first.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks or a failed fetch.
    pub async fn load_comments(&mut self, task: TaskId) -> Result<usize, SyncError> {
        self.find_task(task)?;
        let owner = self.begin()?;
        let result = self.store.select_comments(owner, task).await;
        let comments = self.settle("Failed to fetch comments", result)?;
        let count = comments.len();
        self.refresh(|ctx| ctx.replace_comments(Some(task), comments));
        Ok(count)
    }

    /// Comment on a task as the signed-in user.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown tasks, blank text or a failed insert.
    pub async fn add_comment(&mut self, task: TaskId, text: &str) -> Result<CommentId, SyncError> {
        self.find_task(task)?;
        let text = self.require_text(text, "Comment cannot be empty")?;
        let author = self.actor();
        let owner = self.begin()?;
        let result = self.store.insert_comment(owner, task, author, text).await;
        let comment = self.settle("Failed to add comment", result)?;
        let id = comment.id;
        self.commit("Comment added", |ctx| add_comment_locally(ctx, comment));
        Ok(id)
    }

    /// Delete a comment.
    ///
    /// # Errors
    /// Returns [`SyncError`] for unknown comments or a failed delete.
    pub async fn delete_comment(&mut self, id: CommentId) -> Result<(), SyncError> {
        let known = self.context.as_ref().is_some_and(|ctx| {
            ctx.comments().iter().any(|c| c.id == id)
                || ctx.tasks().iter().any(|task| task.comments.iter().any(|c| c.id == id))
        });
        if !known {
            return Err(self.reject(SyncError::CommentNotFound(id)));
        }
        let owner = self.begin()?;
        let result = self.store.delete_comment(owner, id).await;
        self.settle("Failed to delete comment", result)?;
        self.commit("Comment deleted", |ctx| remove_comment_locally(ctx, id));
        Ok(())
    }

    /// Write an export document into the backend: categories not yet present,
    /// then every task (oldest first) with its completion, status, assignee,
    /// activities and comments. Reloads afterwards.
    ///
    /// A malformed document is rejected before any request is made. A failed
    /// request stops the import; rows written before it stay in the backend
    /// and are reloaded so the collections match it.
    ///
    /// # Errors
    /// Returns [`SyncError::Import`] for malformed input or
    /// [`SyncError::Remote`] on the first failed request.
    pub async fn restore_document(&mut self, raw: &str) -> Result<RestoreReport, SyncError> {
        let document = ExportDocument::from_json(raw).map_err(|err| self.reject(err.into()))?;
        let owner = self.begin()?;
        let mut report = RestoreReport::default();
        let written = self.write_document(owner, document, &mut report).await;

        let reloaded = self.reload().await;
        if let Err(err) = written {
            warn!(
                tasks = report.tasks,
                categories = report.categories,
                "Import stopped partway"
            );
            self.state = SyncState::Failed;
            return Err(err);
        }
        reloaded?;
        if let Some(ctx) = self.context.as_mut() {
            ctx.notify(NotificationLevel::Success, "Data imported successfully");
        }
        info!(tasks = report.tasks, categories = report.categories, "Restored export document");
        Ok(report)
    }

    async fn write_document(
        &mut self,
        owner: UserId,
        document: ExportDocument,
        report: &mut RestoreReport,
    ) -> Result<(), SyncError> {

        let mut known: BTreeSet<String> = self
            .context
            .as_ref()
            .map(|ctx| ctx.categories().iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        for category in document.categories {
            if !known.insert(category.name.clone()) {
                continue;
            }
            let result = self.store.insert_category(owner, category.name).await;
            self.settle("Failed to import data", result)?;
            report.categories += 1;
        }

        for task in document.todos.into_iter().rev() {
            let row = NewTask {
                text: task.text,
                description: task.description,
                category: task.category,
                start_date: task.start_date,
                due_date: task.due_date,
                priority: task.priority,
                color: task.color,
            };
            let result = self.store.insert_task(owner, row).await;
            let inserted = self.settle("Failed to import data", result)?;

            let changes = TaskChanges {
                completed: task.completed.then_some(true),
                status: (task.status != inserted.status).then(|| FieldPatch::from(task.status)),
                assigned_to: task.assigned_to.map(FieldPatch::Set),
                activities: task
                    .activities
                    .into_iter()
                    .map(|activity| Activity {
                        task_id: inserted.id,
                        ..activity
                    })
                    .collect(),
                ..TaskChanges::default()
            };
            if !changes.is_empty() {
                let result = self.store.update_task(owner, inserted.id, changes).await;
                self.settle("Failed to import data", result)?;
            }
            for comment in task.comments {
                let result = self
                    .store
                    .insert_comment(owner, inserted.id, comment.author, comment.text)
                    .await;
                self.settle("Failed to import data", result)?;
                report.comments += 1;
            }
            report.tasks += 1;
        }
        Ok(())
    }
}
