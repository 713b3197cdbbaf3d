//! File organizer: bucket files by extension into a `.tar.gz` bundle.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{EntryType, Header};
use tasknest_core::{ExtensionTable, bucket};
use thiserror::Error;
use tracing::debug;

/// Largest combined input accepted by [`write_bundle`].
pub const MAX_BUNDLE_BYTES: u64 = 100 * 1024 * 1024;

/// Errors raised while building a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// No files were supplied.
    #[error("no files to organize")]
    Empty,
    /// Combined size is over [`MAX_BUNDLE_BYTES`].
    #[error("total file size {total} bytes exceeds the 100MB limit")]
    TooLarge {
        /// Combined size of the input.
        total: u64,
    },
    /// Name is empty or contains a path separator.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    /// Two files with the same name landed in the same folder.
    #[error("duplicate file {name:?} in {bucket}")]
    DuplicateName {
        /// Bucket folder.
        bucket: String,
        /// Repeated file name.
        name: String,
    },
    /// Reading input or writing the archive failed.
    #[error("bundle I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    /// Original file name, kept as-is in the archive.
    pub name: String,
    /// File content, copied byte for byte.
    pub contents: Vec<u8>,
}

impl BundleFile {
    /// In-memory file.
    #[must_use]
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, naming it after its last path component.
    ///
    /// # Errors
    /// Returns [`BundleError::InvalidName`] for paths without a UTF-8 file name
    /// and [`BundleError::Io`] when reading fails.
    pub fn read(path: &Path) -> Result<Self, BundleError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BundleError::InvalidName(path.display().to_string()))?;
        Ok(Self::new(name, fs::read(path)?))
    }

    fn len(&self) -> u64 {
        self.contents.len() as u64
    }
}

/// Combined size of `paths` from file metadata, so oversized input is rejected
/// before anything is read.
///
/// # Errors
/// Returns [`BundleError::Empty`], [`BundleError::TooLarge`] or an I/O error.
pub fn check_paths(paths: &[impl AsRef<Path>]) -> Result<u64, BundleError> {
    if paths.is_empty() {
        return Err(BundleError::Empty);
    }
    let mut total = 0;
    for path in paths {
        total += fs::metadata(path.as_ref())?.len();
    }
    if total > MAX_BUNDLE_BYTES {
        return Err(BundleError::TooLarge { total });
    }
    Ok(total)
}

/// Bucket `files` with `table` and write a gzip-compressed tar archive to
/// `writer`: one top-level folder per bucket holding its files.
///
/// Returns the file names placed in each bucket.
///
/// # Errors
/// Returns [`BundleError`] when validation fails or the archive cannot be written.
pub fn write_bundle<W: Write>(
    files: &[BundleFile],
    table: &ExtensionTable,
    writer: W,
) -> Result<BTreeMap<String, Vec<String>>, BundleError> {
    if files.is_empty() {
        return Err(BundleError::Empty);
    }
    let total: u64 = files.iter().map(BundleFile::len).sum();
    if total > MAX_BUNDLE_BYTES {
        return Err(BundleError::TooLarge { total });
    }
    if let Some(bad) = files
        .iter()
        .find(|f| f.name.is_empty() || f.name.contains(['/', '\\']))
    {
        return Err(BundleError::InvalidName(bad.name.clone()));
    }

    let buckets = bucket(files.iter(), |file| table.classify(&file.name).to_owned());
    for (name, members) in &buckets {
        let mut seen = BTreeSet::new();
        if let Some(dup) = members.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(BundleError::DuplicateName {
                bucket: name.clone(),
                name: dup.name.clone(),
            });
        }
    }

    let mut archive = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
    for (folder, members) in &buckets {
        let mut dir = Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_size(0);
        archive.append_data(&mut dir, format!("{folder}/"), io::empty())?;

        for file in members {
            let mut header = Header::new_gnu();
            header.set_mode(0o644);
            header.set_size(file.len());
            archive.append_data(&mut header, format!("{folder}/{}", file.name), file.contents.as_slice())?;
        }
        debug!(folder = %folder, files = members.len(), "Bundled folder");
    }
    archive.into_inner()?.finish()?;

    Ok(buckets
        .into_iter()
        .map(|(folder, members)| (folder, members.into_iter().map(|f| f.name.clone()).collect()))
        .collect())
}
