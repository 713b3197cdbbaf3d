//! Partition collections into named buckets with an injected classifier.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Category, Task};
use crate::query::percent;

/// Bucket used for files whose extension is missing or unknown.
pub const OTHERS_BUCKET: &str = "others";
/// Bucket used for tasks without a known category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Group `items` by the name `classify` returns.
///
/// Every item lands in exactly one bucket and buckets keep input order.
pub fn bucket<T, I, F, K>(items: I, mut classify: F) -> BTreeMap<String, Vec<T>>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> K,
    K: Into<String>,
{
    let mut buckets: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        let name = classify(&item).into();
        buckets.entry(name).or_default().push(item);
    }
    buckets
}

/// Named group of file extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    /// Bucket name, used as the folder name in bundles.
    pub name: String,
    /// Lowercase extensions without the leading dot.
    pub extensions: Vec<String>,
}

impl FileGroup {
    /// Build a group from string literals.
    #[must_use]
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            extensions: extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect(),
        }
    }
}

/// Extension → bucket lookup table. The first group listing an extension wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTable {
    groups: Vec<FileGroup>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::new(vec![
            FileGroup::new("images", &["jpg", "jpeg", "png", "gif", "bmp", "webp"]),
            FileGroup::new("documents", &["pdf", "doc", "docx", "txt", "rtf", "odt"]),
            FileGroup::new("audio", &["mp3", "wav", "ogg", "flac", "m4a"]),
            FileGroup::new("video", &["mp4", "avi", "mkv", "mov", "wmv"]),
            FileGroup::new("archives", &["zip", "rar", "7z", "tar", "gz"]),
            FileGroup::new("code", &["js", "html", "css", "py", "java", "cpp", "php"]),
        ])
    }
}

impl ExtensionTable {
    /// Build a table from explicit groups.
    #[must_use]
    pub const fn new(groups: Vec<FileGroup>) -> Self {
        Self { groups }
    }

    /// Default table extended with `extra` groups. Extra extensions for an
    /// existing group name are appended to that group.
    #[must_use]
    pub fn with_extra(extra: Vec<FileGroup>) -> Self {
        let mut table = Self::default();
        for group in extra {
            if let Some(existing) = table.groups.iter_mut().find(|g| g.name == group.name) {
                existing.extensions.extend(group.extensions);
            } else {
                table.groups.push(group);
            }
        }
        table
    }

    /// Configured groups.
    #[must_use]
    pub fn groups(&self) -> &[FileGroup] {
        &self.groups
    }

    /// Bucket for a file name. Never fails: unknown or missing extensions map
    /// to [`OTHERS_BUCKET`].
    #[must_use]
    pub fn classify(&self, file_name: &str) -> &str {
        let Some(ext) = extension_of(file_name) else {
            return OTHERS_BUCKET;
        };
        self.groups
            .iter()
            .find(|group| group.extensions.iter().any(|known| *known == ext))
            .map_or(OTHERS_BUCKET, |group| group.name.as_str())
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Classifies tasks by category name, folding unknown or missing categories
/// into [`UNCATEGORIZED`].
#[derive(Debug, Clone, Default)]
pub struct CategoryClassifier {
    known: BTreeSet<String>,
}

impl CategoryClassifier {
    /// Classifier that accepts the given category records.
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        Self {
            known: categories.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Classifier that accepts the given names.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Bucket label for a task.
    #[must_use]
    pub fn label<'a>(&self, task: &'a Task) -> &'a str {
        match task.category.as_deref() {
            Some(name) if self.known.contains(name) => name,
            _ => UNCATEGORIZED,
        }
    }
}

/// One row of the category distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    /// Category label.
    pub name: String,
    /// Number of tasks in the bucket.
    pub count: usize,
    /// Rounded percentage of all tasks.
    pub percent: u8,
}

/// Task count per category, sorted by label.
#[must_use]
pub fn category_distribution(tasks: &[Task], classifier: &CategoryClassifier) -> Vec<CategoryShare> {
    let total = tasks.len();
    bucket(tasks.iter(), |task| classifier.label(*task))
        .into_iter()
        .map(|(name, members)| CategoryShare {
            percent: percent(members.len(), total),
            count: members.len(),
            name,
        })
        .collect()
}
