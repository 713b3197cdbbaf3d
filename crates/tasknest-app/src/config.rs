//! Data-directory configuration.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tasknest_core::{ExtensionTable, FileGroup, SortDirection, SortKey};

use crate::settings::Palette;

const CONFIG_FILE: &str = "config.toml";

/// Categories seeded for an owner who has none.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Work", "Personal", "Shopping", "Health", "Other"];

/// Top-level configuration loaded from `<data-dir>/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Category seeding.
    #[serde(default)]
    pub categories: CategoryConfig,
    /// File organizer groups.
    #[serde(default)]
    pub files: FilesConfig,
    /// Listing defaults.
    #[serde(default)]
    pub view: ViewConfig,
    /// Theme selection.
    #[serde(default)]
    pub theme: ThemeConfig,
}

impl ProjectConfig {
    /// Load configuration from the data directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or fails validation.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.categories.ensure_valid_defaults()?;
        self.files.ensure_valid_groups()?;
        self.view.sort_key()?;
        self.view.sort_direction()?;
        self.theme.palette()?;
        Ok(())
    }
}

/// `[categories]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    #[serde(default = "default_category_names")]
    defaults: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            defaults: default_category_names(),
        }
    }
}

fn default_category_names() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|name| (*name).to_owned()).collect()
}

impl CategoryConfig {
    /// Names seeded for a new owner.
    #[must_use]
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    fn ensure_valid_defaults(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.defaults {
            if name.trim().is_empty() {
                bail!("default category names must not be empty");
            }
            if !seen.insert(name.as_str()) {
                bail!("duplicate default category '{name}'");
            }
        }
        Ok(())
    }
}

/// `[files]` block: extra extension groups for the file organizer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FilesConfig {
    #[serde(default)]
    groups: Vec<FileGroup>,
}

impl FilesConfig {
    /// Default extension table merged with the configured groups.
    #[must_use]
    pub fn extension_table(&self) -> ExtensionTable {
        let groups = self
            .groups
            .iter()
            .map(|group| FileGroup {
                name: group.name.clone(),
                extensions: group.extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect(),
            })
            .collect();
        ExtensionTable::with_extra(groups)
    }

    fn ensure_valid_groups(&self) -> Result<()> {
        for group in &self.groups {
            if group.name.trim().is_empty() {
                bail!("file group names must not be empty");
            }
            if let Some(ext) = group
                .extensions
                .iter()
                .find(|ext| ext.is_empty() || ext.starts_with('.'))
            {
                bail!(
                    "file group '{}' has invalid extension '{ext}' (expected a bare extension like \"rs\")",
                    group.name
                );
            }
        }
        Ok(())
    }
}

/// `[view]` block: default ordering for task listings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ViewConfig {
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    direction: Option<String>,
}

impl ViewConfig {
    /// Configured sort key, defaulting to creation date.
    ///
    /// # Errors
    /// Returns an error for unknown tokens.
    pub fn sort_key(&self) -> Result<SortKey> {
        self.sort.as_deref().map_or(Ok(SortKey::default()), |raw| {
            raw.parse::<SortKey>().context("invalid [view] sort")
        })
    }

    /// Configured direction, defaulting to descending.
    ///
    /// # Errors
    /// Returns an error for unknown tokens.
    pub fn sort_direction(&self) -> Result<SortDirection> {
        self.direction.as_deref().map_or(Ok(SortDirection::default()), |raw| {
            raw.parse::<SortDirection>().context("invalid [view] direction")
        })
    }
}

/// `[theme]` block.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThemeConfig {
    #[serde(default)]
    palette: Option<String>,
}

impl ThemeConfig {
    /// Palette selected in the configuration, if any.
    ///
    /// # Errors
    /// Returns an error when the name matches no predefined palette.
    pub fn palette(&self) -> Result<Option<Palette>> {
        self.palette
            .as_deref()
            .map(|name| Palette::find(name).with_context(|| format!("unknown theme palette '{name}'")))
            .transpose()
    }
}
