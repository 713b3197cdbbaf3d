//! Integration tests for the sync layer over the file-backed store.
//!
//! These tests drive a [`Workspace`] through sign-in, edits, failures and
//! import the way the CLI does.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use std::sync::Arc;

use tasknest_app::{
    AuthProvider, DEFAULT_CATEGORIES, LocalAuth, MemoryStore, NotificationLevel, Session, SyncError, SyncState,
    TaskQueryBuilder, Workspace,
};
use tasknest_core::id::UserId;
use tasknest_core::{ActivityKind, NewTask, Priority, execute};
use tasknest_store_file::FileStore;
use tempfile::TempDir;
use tokio::sync::Mutex;

fn file_store(dir: &TempDir) -> Arc<Mutex<FileStore>> {
    Arc::new(Mutex::new(FileStore::open(dir.path().join("store")).expect("open store")))
}

fn session(email: &str) -> Session {
    Session {
        user_id: UserId::new(),
        email: email.to_owned(),
    }
}

#[tokio::test]
async fn session_watch_drives_the_workspace() {
    let dir = TempDir::with_prefix("tasknest-sync-test-").expect("create temp dir");
    let auth = LocalAuth::open(dir.path()).expect("open auth");
    let mut sessions = auth.watch();
    let mut workspace = Workspace::new(file_store(&dir));

    auth.sign_up("sam@example.com").await.expect("sign up");
    assert!(workspace.follow(&mut sessions).await.expect("follow sign-in"));
    let ctx = workspace.context().expect("context after sign-in");
    assert_eq!(ctx.session().email, "sam@example.com");
    assert_eq!(ctx.categories().len(), DEFAULT_CATEGORIES.len());

    workspace
        .add_task(NewTask::titled("Persisted"))
        .await
        .expect("add task");

    auth.sign_out().await.expect("sign out");
    assert!(workspace.follow(&mut sessions).await.expect("follow sign-out"));
    assert!(workspace.context().is_none());

    // A second sign-in reloads from disk and does not seed again.
    auth.sign_in("sam@example.com").await.expect("sign in");
    assert!(workspace.follow(&mut sessions).await.expect("follow sign-in again"));
    let ctx = workspace.context().expect("context after second sign-in");
    assert_eq!(ctx.tasks().len(), 1);
    assert_eq!(ctx.tasks()[0].text, "Persisted");
    assert_eq!(ctx.categories().len(), DEFAULT_CATEGORIES.len());

    drop(auth);
    assert!(!workspace.follow(&mut sessions).await.expect("closed channel"));
}

#[tokio::test]
async fn failed_delete_keeps_the_task() {
    let mut workspace = Workspace::new(MemoryStore::new());
    workspace
        .on_session_change(Some(session("kim@example.com")))
        .await
        .expect("sign in");
    let id = workspace
        .add_task(NewTask::titled("Stubborn"))
        .await
        .expect("add task");

    workspace.store().set_offline(true);
    let err = workspace.delete_task(id).await.expect_err("delete should fail");
    assert!(matches!(err, SyncError::Remote { action: "Failed to delete todo", .. }));
    assert_eq!(workspace.state(), SyncState::Failed);

    let ctx = workspace.context().expect("context");
    assert!(ctx.task(id).is_some());
    let last = ctx.notifications().last().expect("notification");
    assert_eq!(last.level, NotificationLevel::Error);
    assert_eq!(last.message, "Failed to delete todo");
}

#[tokio::test]
async fn assignment_is_persisted_with_its_activity() {
    let dir = TempDir::with_prefix("tasknest-sync-test-").expect("create temp dir");
    let store = file_store(&dir);
    let owner = session("lee@example.com");
    let mut workspace = Workspace::new(Arc::clone(&store));
    workspace
        .on_session_change(Some(owner.clone()))
        .await
        .expect("sign in");
    let id = workspace
        .add_task(NewTask::titled("Review"))
        .await
        .expect("add task");

    assert!(workspace.assign_task(id, "alex").await.expect("assign"));
    assert!(!workspace.assign_task(id, "alex").await.expect("same assignee"));

    let mut fresh = Workspace::new(store);
    fresh.on_session_change(Some(owner)).await.expect("reload");
    let task = fresh.context().expect("context").task(id).expect("task").clone();
    assert_eq!(task.assigned_to.as_deref(), Some("alex"));
    assert_eq!(task.activities.len(), 1);
    assert_eq!(task.activities[0].kind, ActivityKind::AssignmentChange);
    assert_eq!(task.activities[0].description, "Assigned from unassigned to alex");
}

#[tokio::test]
async fn restore_copies_an_export_into_another_account() {
    let dir = TempDir::with_prefix("tasknest-sync-test-").expect("create temp dir");
    let store = file_store(&dir);

    let mut source = Workspace::new(Arc::clone(&store));
    source
        .on_session_change(Some(session("a@example.com")))
        .await
        .expect("sign in a");
    let older = source
        .add_task(NewTask {
            category: Some("Work".into()),
            priority: Some(Priority::High),
            ..NewTask::titled("Older")
        })
        .await
        .expect("add older");
    source.add_task(NewTask::titled("Newer")).await.expect("add newer");
    source.toggle_task(older).await.expect("toggle");
    source.add_comment(older, "note").await.expect("comment");
    source.add_category("Garden").await.expect("category");
    let exported = source.export_document().expect("export");

    let mut target = Workspace::new(store);
    target
        .on_session_change(Some(session("b@example.com")))
        .await
        .expect("sign in b");
    let before = target.context().expect("context").tasks().len();
    assert_eq!(before, 0);

    assert!(matches!(
        target.restore_document("not json").await,
        Err(SyncError::Import(_))
    ));

    let report = target.restore_document(&exported).await.expect("restore");
    assert_eq!(report.tasks, 2);
    assert_eq!(report.comments, 1);
    assert_eq!(report.categories, 1);

    let ctx = target.context().expect("context");
    let texts: Vec<_> = ctx.tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Newer", "Older"]);
    assert!(ctx.tasks()[1].completed);
    assert_eq!(ctx.tasks()[1].comments[0].text, "note");
    assert!(ctx.categories().iter().any(|c| c.name == "Garden"));
}

#[tokio::test]
async fn queries_run_over_the_loaded_collection() {
    let mut workspace = Workspace::new(MemoryStore::new());
    workspace
        .on_session_change(Some(session("q@example.com")))
        .await
        .expect("sign in");
    for (text, priority) in [("Write report", Priority::High), ("Buy milk", Priority::Low)] {
        workspace
            .add_task(NewTask {
                priority: Some(priority),
                ..NewTask::titled(text)
            })
            .await
            .expect("add task");
    }

    let query = TaskQueryBuilder::new()
        .with_text(Some("REPORT".into()))
        .with_priorities(&["high".into()])
        .expect("priorities")
        .build();
    let ctx = workspace.context().expect("context");
    let hits: Vec<_> = execute(ctx.tasks(), &query).iter().map(|t| t.text.clone()).collect();
    assert_eq!(hits, vec!["Write report"]);
}
