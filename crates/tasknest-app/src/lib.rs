//! Application layer for tasknest.
//!
//! This crate binds the pure query engine to a persistence backend: the
//! confirm-then-patch [`Workspace`], the session context, configuration,
//! theme settings and the file bundle writer shared by the CLI.

pub mod bundle;
pub mod config;
pub mod context;
pub mod filter_util;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod task_patch;

// Re-exports for convenience
pub use bundle::{BundleError, BundleFile, MAX_BUNDLE_BYTES, check_paths, write_bundle};
pub use config::{CategoryConfig, DEFAULT_CATEGORIES, FilesConfig, ProjectConfig, ThemeConfig, ViewConfig};
pub use context::{AppContext, Notification, NotificationLevel};
pub use filter_util::{FilterBuildError, FilterBuildResult, TaskQueryBuilder, parse_date};
pub use session::{AuthError, AuthProvider, LocalAuth, Session};
pub use settings::{COLOR_SLOTS, ColorPalette, PALETTES, Palette, SettingsError, ThemeSettings};
pub use store::{MemoryStore, RemoteStore};
pub use sync::{BulkOutcome, RestoreReport, SyncError, SyncState, Workspace};
pub use task_patch::{TaskPatch, TaskUpdate, assignment_activity};
