use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tasknest_app::{
    AppContext, BulkOutcome, BundleFile, FilterBuildError, ProjectConfig, RemoteStore, TaskQueryBuilder, TaskUpdate,
    ThemeSettings, Workspace, check_paths, parse_date, write_bundle,
};
use tasknest_core::{
    Board, CategoryClassifier, ExtensionTable, NewTask, Priority, Status, TaskQuery, category_distribution, execute,
    summarize, timeline, top_by_priority,
};
use time::{Date, OffsetDateTime};

use super::{render, resolve_category, resolve_task, save_settings, short_id};
use crate::{CategoryCommand, Command, LsArgs, LsFormat, TaskFields, ThemeCommand};

#[allow(clippy::too_many_lines)]
pub(super) async fn dispatch<S: RemoteStore>(
    workspace: &mut Workspace<S>,
    config: &ProjectConfig,
    settings_path: &Path,
    command: Command,
) -> Result<()> {
    match command {
        Command::Add { text, fields } => handle_add(workspace, text, fields).await,
        Command::Edit { task, text, fields } => handle_edit(workspace, &task, text, fields).await,
        Command::Ls(args) => handle_ls(workspace, config, args),
        Command::Done { task } => {
            let id = resolve_task(ctx(workspace)?.tasks(), &task)?;
            let completed = workspace.toggle_task(id).await?;
            println!("{} {}", if completed { "completed" } else { "reopened" }, short_id(id));
            Ok(())
        }
        Command::Status { task, status } => {
            let id = resolve_task(ctx(workspace)?.tasks(), &task)?;
            let status: Status = status.parse().map_err(token_error)?;
            if !workspace.set_status(id, status).await? {
                println!("{} is already {status}", short_id(id));
            }
            Ok(())
        }
        Command::Assign { task, assignee } => {
            let id = resolve_task(ctx(workspace)?.tasks(), &task)?;
            if !workspace.assign_task(id, &assignee).await? {
                println!("{} is already assigned to {}", short_id(id), assignee.trim());
            }
            Ok(())
        }
        Command::Rm { tasks } => {
            let ids = tasks
                .iter()
                .map(|raw| resolve_task(ctx(workspace)?.tasks(), raw))
                .collect::<Result<Vec<_>>>()?;
            report_bulk("deleted", &workspace.delete_many(&ids).await)
        }
        Command::ClearCompleted => {
            let outcome = workspace.clear_completed().await;
            if outcome.committed.is_empty() && outcome.failed.is_empty() {
                println!("No completed tasks");
                return Ok(());
            }
            report_bulk("deleted", &outcome)
        }
        Command::Comment { task, text } => {
            let id = resolve_task(ctx(workspace)?.tasks(), &task)?;
            workspace.add_comment(id, &text).await?;
            Ok(())
        }
        Command::Comments { task } => {
            let id = resolve_task(ctx(workspace)?.tasks(), &task)?;
            if workspace.load_comments(id).await? == 0 {
                println!("No comments yet");
            } else {
                print!("{}", render::comment_thread(ctx(workspace)?.comments()));
            }
            Ok(())
        }
        Command::Category(command) => handle_category(workspace, command).await,
        Command::Stats { today } => {
            let today = match today {
                Some(raw) => parse_day("today", &raw)?,
                None => current_day(),
            };
            let ctx = ctx(workspace)?;
            let summary = summarize(ctx.tasks(), today);
            let shares = category_distribution(ctx.tasks(), &CategoryClassifier::new(ctx.categories()));
            let top = top_by_priority(ctx.tasks(), 5);
            print!("{}", render::stats(&summary, &shares, &top));
            Ok(())
        }
        Command::Board => {
            print!("{}", render::board(&Board::build(ctx(workspace)?.tasks())));
            Ok(())
        }
        Command::Timeline { month } => {
            let first = match month {
                Some(raw) => parse_day("month", &format!("{}-01", raw.trim()))?,
                None => current_day().replace_day(1)?,
            };
            let tasks = timeline(ctx(workspace)?.tasks(), first.year(), first.month());
            if tasks.is_empty() {
                println!("Nothing scheduled in {} {}", first.month(), first.year());
            } else {
                print!("{}", render::timeline(&tasks));
            }
            Ok(())
        }
        Command::Export { output } => {
            let document = workspace.export_document()?;
            write_output(output.as_deref(), &document)
        }
        Command::Import { path } => {
            let raw = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let report = workspace.restore_document(&raw).await?;
            println!(
                "imported {} task(s), {} category(ies), {} comment(s)",
                report.tasks, report.categories, report.comments
            );
            Ok(())
        }
        Command::Organize { files, output } => organize(&files, &output, &config.files.extension_table()),
        Command::Theme(command) => {
            let ctx = workspace.context_mut().context("not signed in")?;
            handle_theme(&mut ctx.settings, settings_path, command)
        }
    }
}

fn ctx<S>(workspace: &Workspace<S>) -> Result<&AppContext> {
    workspace.context().context("not signed in")
}

fn token_error(err: tasknest_core::ParseTokenError) -> anyhow::Error {
    anyhow!(FilterBuildError::from(err).describe_user_facing())
}

fn user_facing(err: FilterBuildError) -> anyhow::Error {
    anyhow!(err.describe_user_facing())
}

fn parse_day(field: &'static str, raw: &str) -> Result<Date> {
    parse_date(raw).map_err(|source| user_facing(FilterBuildError::InvalidDate { field, source }))
}

fn parse_priority(raw: &str) -> Result<Priority> {
    raw.parse().map_err(token_error)
}

fn current_day() -> Date {
    OffsetDateTime::now_utc().date()
}

/// `None` keeps the field, an empty value clears it, anything else is parsed.
fn optional_field<T>(raw: Option<String>, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<Option<T>>> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(Some(None)),
        Some(value) => parse(value.trim()).map(|parsed| Some(Some(parsed))),
    }
}

async fn handle_add<S: RemoteStore>(workspace: &mut Workspace<S>, text: String, fields: TaskFields) -> Result<()> {
    let TaskFields {
        description,
        category,
        priority,
        start,
        due,
        color,
    } = fields;
    let row = NewTask {
        text,
        description,
        category,
        start_date: optional_field(start, |raw| parse_day("start", raw))?.flatten(),
        due_date: optional_field(due, |raw| parse_day("due", raw))?.flatten(),
        priority: optional_field(priority, parse_priority)?.flatten(),
        color,
    };
    let id = workspace.add_task(row).await?;
    println!("{id}");
    Ok(())
}

async fn handle_edit<S: RemoteStore>(
    workspace: &mut Workspace<S>,
    task: &str,
    text: Option<String>,
    fields: TaskFields,
) -> Result<()> {
    let ctx = ctx(workspace)?;
    let id = resolve_task(ctx.tasks(), task)?;
    let current = ctx.task(id).with_context(|| format!("task {id} not found"))?;

    let mut form = TaskUpdate::from_task(current);
    if let Some(text) = text {
        form.text = text;
    }
    if let Some(description) = fields.description {
        form.description = Some(description);
    }
    if let Some(category) = fields.category {
        form.category = Some(category);
    }
    if let Some(color) = fields.color {
        form.color = Some(color);
    }
    if let Some(priority) = optional_field(fields.priority, parse_priority)? {
        form.priority = priority;
    }
    if let Some(start) = optional_field(fields.start, |raw| parse_day("start", raw))? {
        form.start_date = start;
    }
    if let Some(due) = optional_field(fields.due, |raw| parse_day("due", raw))? {
        form.due_date = due;
    }

    if !workspace.update_task(id, form).await? {
        println!("No changes");
    }
    Ok(())
}

fn build_query(config: &ProjectConfig, args: LsArgs) -> Result<TaskQuery> {
    let LsArgs {
        search,
        categories,
        priorities,
        from,
        until,
        status,
        sort,
        direction,
        format: _,
    } = args;
    Ok(TaskQueryBuilder::new()
        .with_sort_values(config.view.sort_key()?, config.view.sort_direction()?)
        .with_text(search)
        .with_categories(&categories)
        .with_priorities(&priorities)
        .map_err(user_facing)?
        .with_completion(status.as_deref())
        .map_err(user_facing)?
        .with_due_range(from, until)
        .map_err(user_facing)?
        .with_sort(sort.as_deref(), direction.as_deref())
        .map_err(user_facing)?
        .build())
}

fn handle_ls<S>(workspace: &Workspace<S>, config: &ProjectConfig, args: LsArgs) -> Result<()> {
    let format = args.format;
    let query = build_query(config, args)?;
    let tasks = execute(ctx(workspace)?.tasks(), &query);

    if tasks.is_empty() {
        if query.is_unfiltered() {
            println!("No tasks found");
        } else {
            println!("No tasks matched the provided filters");
        }
        return Ok(());
    }

    match format {
        LsFormat::Table => print!("{}", render::task_table(&tasks)),
        LsFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}

fn report_bulk(verb: &str, outcome: &BulkOutcome) -> Result<()> {
    for id in &outcome.committed {
        println!("{verb} {}", short_id(*id));
    }
    for (id, err) in &outcome.failed {
        eprintln!("{}: {err}", short_id(*id));
    }
    if !outcome.failed.is_empty() {
        bail!(
            "{} of {} task(s) failed",
            outcome.failed.len(),
            outcome.failed.len() + outcome.committed.len()
        );
    }
    Ok(())
}

async fn handle_category<S: RemoteStore>(workspace: &mut Workspace<S>, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Add { name } => {
            workspace.add_category(&name).await?;
        }
        CategoryCommand::Rename { name, new_name } => {
            let id = resolve_category(ctx(workspace)?.categories(), &name)?;
            workspace.rename_category(id, &new_name).await?;
        }
        CategoryCommand::Rm { name } => {
            let id = resolve_category(ctx(workspace)?.categories(), &name)?;
            workspace.delete_category(id).await?;
        }
        CategoryCommand::Ls => {
            let ctx = ctx(workspace)?;
            print!("{}", render::categories(ctx.categories(), ctx.tasks()));
        }
    }
    Ok(())
}

fn handle_theme(settings: &mut ThemeSettings, settings_path: &Path, command: ThemeCommand) -> Result<()> {
    let message = match command {
        ThemeCommand::Show => {
            print!("{}", render::theme(settings));
            return Ok(());
        }
        ThemeCommand::Export { output } => {
            return write_output(output.as_deref(), &settings.to_json()?);
        }
        ThemeCommand::Palette { name } => {
            settings.apply_palette_named(&name)?;
            "Settings saved successfully"
        }
        ThemeCommand::Set { slot, value } => {
            settings.set_color(&slot, &value)?;
            "Settings saved successfully"
        }
        ThemeCommand::Dark { mode } => {
            settings.dark_mode = mode.enabled();
            "Settings saved successfully"
        }
        ThemeCommand::Compact { mode } => {
            settings.compact_mode = mode.enabled();
            "Settings saved successfully"
        }
        ThemeCommand::Notifications { mode } => {
            settings.notifications = mode.enabled();
            "Settings saved successfully"
        }
        ThemeCommand::Import { path } => {
            let raw = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
            settings.import_json(&raw).context("Failed to import settings")?;
            "Settings imported successfully"
        }
        ThemeCommand::Reset => {
            *settings = ThemeSettings::default();
            "Settings reset to default"
        }
    };
    save_settings(settings_path, settings)?;
    println!("{message}");
    Ok(())
}

fn write_output(output: Option<&Path>, body: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Bundle `files` into a gzip-compressed tar at `output`, one folder per type.
pub(super) fn organize(files: &[PathBuf], output: &Path, table: &ExtensionTable) -> Result<()> {
    let total = check_paths(files)?;
    let inputs = files
        .iter()
        .map(|path| BundleFile::read(path).with_context(|| format!("failed to read {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let layout = match write_bundle(&inputs, table, BufWriter::new(file)) {
        Ok(layout) => layout,
        Err(err) => {
            let _ = fs::remove_file(output);
            return Err(err.into());
        }
    };
    print!("{}", render::bundle_layout(&layout));
    println!("wrote {} ({total} bytes in)", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasknest_core::{CompletionFilter, SortKey};
    use time::macros::date;

    #[test]
    fn optional_field_distinguishes_keep_clear_and_set() -> Result<()> {
        assert_eq!(optional_field(None, parse_priority)?, None);
        assert_eq!(optional_field(Some("  ".into()), parse_priority)?, Some(None));
        assert_eq!(
            optional_field(Some("High".into()), parse_priority)?,
            Some(Some(Priority::High))
        );
        assert!(optional_field(Some("urgent".into()), parse_priority).is_err());
        Ok(())
    }

    #[test]
    fn parse_day_reports_the_field() {
        let Err(err) = parse_day("due", "someday") else {
            panic!("expected a parse error");
        };
        assert_eq!(err.to_string(), "--due must be a date like 2024-06-01");
        assert_eq!(
            parse_day("due", "2024-06-30").unwrap_or_else(|err| panic!("{err}")),
            date!(2024 - 06 - 30)
        );
    }

    #[test]
    fn ls_arguments_build_a_query() -> Result<()> {
        let args = LsArgs {
            search: Some("report".into()),
            categories: vec!["Work".into()],
            priorities: vec!["high".into()],
            status: Some("active".into()),
            sort: Some("priority".into()),
            ..LsArgs::default()
        };
        let query = build_query(&ProjectConfig::default(), args)?;
        assert_eq!(query.search_text.as_deref(), Some("report"));
        assert!(query.categories.contains("Work"));
        assert_eq!(query.completion, CompletionFilter::Active);
        assert_eq!(query.sort_key, SortKey::Priority);

        let bad = LsArgs {
            priorities: vec!["urgent".into()],
            ..LsArgs::default()
        };
        let Err(err) = build_query(&ProjectConfig::default(), bad) else {
            panic!("unknown priority should fail");
        };
        assert_eq!(err.to_string(), "urgent is not a valid priority");
        Ok(())
    }

    #[test]
    fn organize_writes_an_archive() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let photo = dir.path().join("photo.png");
        let notes = dir.path().join("notes.txt");
        fs::write(&photo, b"png")?;
        fs::write(&notes, b"txt")?;
        let output = dir.path().join("out.tar.gz");

        organize(&[photo, notes], &output, &ExtensionTable::default())?;
        assert!(fs::metadata(&output)?.len() > 0);

        let empty: [PathBuf; 0] = [];
        assert!(organize(&empty, &output, &ExtensionTable::default()).is_err());
        Ok(())
    }
}
