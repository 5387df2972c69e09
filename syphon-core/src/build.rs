//! Collate archived tables into a single cache file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::lockmanager::LOCK_FILENAME;
use crate::check::{CheckOptions, check};
use crate::error::{Result, SyphonError};
use crate::hash::entry::HashEntry;
use crate::hash::logfile::{self, HashLog};
use crate::macros::status;
use crate::table::Table;

/// Files whose names start with this are never build sources.
pub const HIDDEN_PREFIX: char = '.';

#[derive(Clone)]
pub struct BuildOptions {
    /// Output table.
    pub cache: PathBuf,
    /// Defaults to `.sha256sums` beside the cache.
    pub hash_path: Option<PathBuf>,
    /// Extend an existing, verified cache instead of starting over.
    pub incremental: bool,
    pub overwrite: bool,
    /// Record the cache digest in the hash log when done.
    pub post_hash: bool,
    pub verbose: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cache: PathBuf::new(),
            hash_path: None,
            incremental: false,
            overwrite: false,
            post_hash: true,
            verbose: false,
        }
    }
}

impl BuildOptions {
    pub fn new(cache: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
            ..Default::default()
        }
    }

    pub fn hash_path(&self) -> PathBuf {
        self.hash_path
            .clone()
            .unwrap_or_else(|| logfile::default_path(&self.cache))
    }
}

/// Concatenate `files` (in order) into the cache table.
///
/// Returns `Ok(false)` without touching anything when there is nothing to
/// build, or when an incremental build finds the existing cache fails its
/// check.
pub fn build(opts: &BuildOptions, files: &[PathBuf]) -> Result<bool> {
    if files.is_empty() {
        status!(opts.verbose, "Nothing to build");
        return Ok(false);
    }

    let cache_path = &opts.cache;
    let hash_path = opts.hash_path();

    let mut cache = Table::default();
    if cache_path.exists() {
        if !cache_path.is_file() {
            return Err(SyphonError::NotAFile(cache_path.clone()));
        }
        if !opts.overwrite {
            return Err(SyphonError::AlreadyExists(cache_path.clone()));
        }
        if opts.incremental {
            let verified = check(&CheckOptions {
                target: cache_path.clone(),
                hash_path: Some(hash_path.clone()),
                line_split: None,
                verbose: opts.verbose,
            });
            if !verified {
                return Ok(false);
            }
            cache = Table::read_csv(cache_path)?;
        }
    }

    for file in files {
        status!(opts.verbose, "Building from {}", file.display());
        let data = Table::read_csv(file)?;
        let before = (cache.len(), cache.columns().len());
        cache.append(&data);
        status!(
            opts.verbose,
            "Building data ({}, {}) onto cache {:?} => ({}, {})",
            data.len(),
            data.columns().len(),
            before,
            cache.len(),
            cache.columns().len()
        );
    }

    cache.write_csv(cache_path)?;

    if opts.post_hash {
        record_hash(cache_path, &hash_path)?;
    }

    status!(opts.verbose, "Built {}", cache_path.display());
    Ok(true)
}

/// Create the log if needed and update its entry for `cache`.
///
/// The entry path is written relative to the log's directory when the cache
/// lives beneath it, absolute otherwise.
fn record_hash(cache: &Path, hash_path: &Path) -> Result<()> {
    if !hash_path.exists() {
        OpenOptions::new().create(true).append(true).open(hash_path)?;
    }
    let log = HashLog::new(hash_path);
    let base = log.base_dir();

    let absolute = std::path::absolute(cache)?;
    let entry_path = match absolute.strip_prefix(std::path::absolute(&base)?) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => absolute.clone(),
    };

    let handle = log.acquire()?;
    handle.update(&HashEntry::new(entry_path).with_base(base))
}

/// Every regular file under `root`, sorted, minus hidden files and lock
/// sentinels.
pub fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(SyphonError::NotFound(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(HIDDEN_PREFIX) || name == LOCK_FILENAME {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();
    Ok(files)
}
