//! Session-scoped application state.

use std::fmt;

use serde::Serialize;
use tasknest_core::id::TaskId;
use tasknest_core::{Category, Comment, Task};

use crate::session::Session;
use crate::settings::ThemeSettings;

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// A write was confirmed.
    Success,
    /// An action failed.
    Error,
}

/// User-visible message produced by a sync action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Message text.
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NotificationLevel::Success => write!(f, "{}", self.message),
            NotificationLevel::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Everything owned by one signed-in session. Created at sign-in and dropped
/// at sign-out.
///
/// Collections are only replaced wholesale by the sync layer; readers borrow
/// them through the accessors.
#[derive(Debug, Clone)]
pub struct AppContext {
    session: Session,
    /// Theme and preferences.
    pub settings: ThemeSettings,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    comments: Vec<Comment>,
    comments_task: Option<TaskId>,
    notifications: Vec<Notification>,
}

impl AppContext {
    /// Empty context for `session`.
    #[must_use]
    pub fn new(session: Session, settings: ThemeSettings) -> Self {
        Self {
            session,
            settings,
            tasks: Vec::new(),
            categories: Vec::new(),
            comments: Vec::new(),
            comments_task: None,
            notifications: Vec::new(),
        }
    }

    /// Signed-in user.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Tasks, newest first as loaded.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look a task up by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Categories, oldest first.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Comment thread loaded by the last `load_comments`.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Task whose thread is in [`comments`](Self::comments).
    #[must_use]
    pub const fn comments_task(&self) -> Option<TaskId> {
        self.comments_task
    }

    /// Pending notifications, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take every pending notification.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }

    pub(crate) fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub(crate) fn replace_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub(crate) fn replace_comments(&mut self, task: Option<TaskId>, comments: Vec<Comment>) {
        self.comments_task = task;
        self.comments = comments;
    }
}
