//! Verify a file against its entry in a hash log.

use std::path::PathBuf;

use crate::hash::entry::{HashEntry, LineSplit};
use crate::hash::logfile::{self, HashLog};
use crate::macros::{complain, status};

#[derive(Clone, Default)]
pub struct CheckOptions {
    /// File to verify.
    pub target: PathBuf,
    /// Defaults to `.sha256sums` beside the target.
    pub hash_path: Option<PathBuf>,
    pub line_split: Option<LineSplit>,
    pub verbose: bool,
}

impl CheckOptions {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }
}

/// True only if the log holds an entry for the target whose digest matches
/// the target's current content. Every failure to establish that is `false`.
pub fn check(opts: &CheckOptions) -> bool {
    let target = &opts.target;
    if !target.exists() {
        complain!(opts.verbose, "No file exists @ {}", target.display());
        return false;
    }

    let hash_path = opts
        .hash_path
        .clone()
        .unwrap_or_else(|| logfile::default_path(target));
    if !hash_path.exists() {
        complain!(opts.verbose, "No file exists @ {}", hash_path.display());
        return false;
    }

    let log = HashLog::new(&hash_path).with_line_split(opts.line_split);
    let Some(expected) = find_entry(&log, opts) else {
        return false;
    };

    let actual = HashEntry::new(target).with_algorithm(log.algorithm());
    let (expected, actual) = match (expected.digest(), actual.digest()) {
        (Ok(e), Ok(a)) => (e.to_string(), a.to_string()),
        (_, Err(e)) | (Err(e), _) => {
            complain!(opts.verbose, "Error reading file @ {}: {e}", target.display());
            return false;
        }
    };

    if expected == actual {
        status!(opts.verbose, "{}: OK", target.display());
        true
    } else {
        complain!(opts.verbose, "{}: FAILED", target.display());
        false
    }
}

/// First entry naming the same file as the target. Entries for files that
/// no longer exist are skipped; a malformed line ends the search.
fn find_entry(log: &HashLog, opts: &CheckOptions) -> Option<HashEntry> {
    let handle = match log.acquire() {
        Ok(h) => h,
        Err(e) => {
            complain!(opts.verbose, "Error reading hash file @ {}: {e}", log.path().display());
            return None;
        }
    };
    let entries = match handle.entries() {
        Ok(it) => it,
        Err(e) => {
            complain!(opts.verbose, "Error reading hash file @ {}: {e}", log.path().display());
            return None;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                complain!(opts.verbose, "Error parsing hash file @ {}: {e}", log.path().display());
                return None;
            }
        };
        if !entry.resolved().exists() {
            continue;
        }
        if entry.same_file(&opts.target) {
            return Some(entry);
        }
    }

    complain!(
        opts.verbose,
        "No entry for file \"{}\" found in \"{}\"",
        opts.target.display(),
        log.path().display()
    );
    None
}
