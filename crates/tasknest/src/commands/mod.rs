//! Session bootstrap and command dispatch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tasknest_app::{
    AppContext, AuthError, AuthProvider, LocalAuth, NotificationLevel, ProjectConfig, Session, ThemeSettings,
    Workspace,
};
use tasknest_core::id::{CategoryId, TaskId};
use tasknest_core::{Category, Task};
use tasknest_store_file::FileStore;
use tokio::sync::Mutex;
use tracing::info;

use crate::Command;

mod handlers;
mod render;

const STORE_DIR: &str = "store";
const SETTINGS_DIR: &str = "settings";

/// Run one command for `user` against the data directory.
pub async fn run(data_dir: &Path, user: &str, command: Command) -> Result<()> {
    fs::create_dir_all(data_dir).with_context(|| format!("failed to create {}", data_dir.display()))?;
    let config = ProjectConfig::from_data_dir(data_dir)?;

    // The organizer works on plain files and needs no profile.
    if let Command::Organize { files, output } = &command {
        return handlers::organize(files, output, &config.files.extension_table());
    }

    let auth = LocalAuth::open(data_dir)?;
    let session = sign_in_or_up(&auth, user).await?;
    let settings_path = settings_path(data_dir, &session);
    let settings = load_settings(&settings_path, &config)?;

    let store = Arc::new(Mutex::new(FileStore::open(data_dir.join(STORE_DIR))?));
    let mut workspace = Workspace::new(store)
        .with_default_categories(config.categories.defaults().to_vec())
        .with_settings(settings);
    workspace.on_session_change(auth.current_session()).await?;

    let result = handlers::dispatch(&mut workspace, &config, &settings_path, command).await;
    if let Some(ctx) = workspace.context_mut() {
        flush_notifications(ctx);
    }
    result
}

async fn sign_in_or_up(auth: &LocalAuth, user: &str) -> Result<Session> {
    match auth.sign_in(user).await {
        Ok(session) => Ok(session),
        Err(AuthError::UnknownAccount(email)) => {
            info!(email = %email, "Creating profile");
            Ok(auth.sign_up(user).await?)
        }
        Err(err) => Err(err.into()),
    }
}

fn settings_path(data_dir: &Path, session: &Session) -> PathBuf {
    data_dir
        .join(SETTINGS_DIR)
        .join(format!("{}.json", session.user_id))
}

/// Stored settings, or defaults with the configured palette for a new profile.
fn load_settings(path: &Path, config: &ProjectConfig) -> Result<ThemeSettings> {
    if !path.exists() {
        let mut settings = ThemeSettings::default();
        if let Some(palette) = config.theme.palette()? {
            settings.apply_palette(palette);
        }
        return Ok(settings);
    }
    ThemeSettings::load(path).with_context(|| format!("failed to read {}", path.display()))
}

fn save_settings(path: &Path, settings: &ThemeSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    settings
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Success messages go to stdout when enabled; failures surface through the
/// command result instead.
fn flush_notifications(ctx: &mut AppContext) {
    let show = ctx.settings.notifications;
    for notification in ctx.drain_notifications() {
        if show && notification.level == NotificationLevel::Success {
            println!("{notification}");
        }
    }
}

/// Last eight characters of an id, enough to address a task.
fn short_id(id: TaskId) -> String {
    let full = id.to_string();
    full[full.len().saturating_sub(8)..].to_owned()
}

/// Resolve a full id or a unique prefix/suffix of one.
fn resolve_task(tasks: &[Task], raw: &str) -> Result<TaskId> {
    let needle = raw.trim().to_ascii_lowercase();
    if needle.is_empty() {
        bail!("task id must not be empty");
    }
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| {
            let id = task.id.to_string();
            id.starts_with(&needle) || id.ends_with(&needle)
        })
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id),
        [] => bail!("no task matches '{raw}'"),
        many => bail!("'{raw}' matches {} tasks; use more characters", many.len()),
    }
}

fn resolve_category(categories: &[Category], name: &str) -> Result<CategoryId> {
    let name = name.trim();
    categories
        .iter()
        .find(|category| category.name.eq_ignore_ascii_case(name))
        .map(|category| category.id)
        .with_context(|| format!("no category named '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasknest_core::id::UserId;
    use time::OffsetDateTime;

    fn task(id: &str) -> Task {
        Task::new(
            id.parse().unwrap_or_else(|err| panic!("bad id {id}: {err}")),
            "t",
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn resolve_task_accepts_unique_prefix_or_suffix() {
        let tasks = vec![
            task("0190a1b2-0000-7000-8000-00000000aaaa"),
            task("0190a1b2-0000-7000-8000-00000000bbbb"),
        ];
        let full = tasks[0].id.to_string();
        assert_eq!(resolve_task(&tasks, &full).unwrap_or_else(|err| panic!("{err}")), tasks[0].id);
        assert_eq!(resolve_task(&tasks, "BBBB").unwrap_or_else(|err| panic!("{err}")), tasks[1].id);
        assert!(resolve_task(&tasks, "0190a1b2").is_err());
        assert!(resolve_task(&tasks, "cccc").is_err());
        assert!(resolve_task(&tasks, "  ").is_err());
    }

    #[test]
    fn short_id_is_the_random_tail() {
        let id: TaskId = "0190a1b2-0000-7000-8000-0000deadbeef"
            .parse()
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(short_id(id), "deadbeef");
    }

    #[test]
    fn resolve_category_ignores_case() {
        let owner = UserId::new();
        let categories = vec![Category {
            id: CategoryId::new(),
            name: "Work".into(),
            user_id: owner,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }];
        assert_eq!(
            resolve_category(&categories, " work ").unwrap_or_else(|err| panic!("{err}")),
            categories[0].id
        );
        assert!(resolve_category(&categories, "Play").is_err());
    }

    #[test]
    fn new_profiles_pick_up_the_configured_palette() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("config.toml"), "[theme]\npalette = \"forest\"\n")?;
        let config = ProjectConfig::from_data_dir(dir.path())?;
        let path = dir.path().join(SETTINGS_DIR).join("someone.json");

        let settings = load_settings(&path, &config)?;
        assert!(settings.use_custom_colors);
        assert_eq!(settings.colors.primary, "#52c41a");

        save_settings(&path, &ThemeSettings::default())?;
        let stored = load_settings(&path, &config)?;
        assert_eq!(stored, ThemeSettings::default());
        Ok(())
    }
}
