//! Hash log: a text file of `HashEntry` lines, readable by `sha256sum -c`.
//!
//! One process may hold several handles on the same log at once (a build
//! that runs a check first, say). All of them share a single open file;
//! the file is opened by the first `acquire` and closed when the last
//! handle is dropped.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use super::digest::HashAlgorithm;
use super::entry::{HashEntry, LineSplit};
use crate::error::{Result, SyphonError};

/// Hash log filename placed beside the file it covers.
pub const DEFAULT_FILE: &str = ".sha256sums";

pub fn default_path(target: &Path) -> PathBuf {
    match target.parent() {
        Some(dir) => dir.join(DEFAULT_FILE),
        None => PathBuf::from(DEFAULT_FILE),
    }
}

#[derive(Default)]
struct Shared {
    count: usize,
    file: Option<Rc<RefCell<File>>>,
}

pub struct HashLog {
    path: PathBuf,
    algorithm: HashAlgorithm,
    line_split: Option<LineSplit>,
    shared: RefCell<Shared>,
}

impl HashLog {
    /// Does not touch the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            algorithm: HashAlgorithm::default(),
            line_split: None,
            shared: RefCell::new(Shared::default()),
        }
    }

    /// Like `new`, but fails right away when the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self::new(path);
        drop(log.acquire()?);
        Ok(log)
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_line_split(mut self, split: Option<LineSplit>) -> Self {
        self.line_split = split;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Number of live handles.
    pub fn open_count(&self) -> usize {
        self.shared.borrow().count
    }

    /// Directory relative entry paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn acquire(&self) -> Result<OpenHashLog<'_>> {
        let mut shared = self.shared.borrow_mut();
        let file = match shared.file.clone() {
            Some(f) => f,
            None => {
                let f = OpenOptions::new().read(true).write(true).open(&self.path)?;
                debug!(path = %self.path.display(), "opened hash log");
                let f = Rc::new(RefCell::new(f));
                shared.file = Some(Rc::clone(&f));
                f
            }
        };
        shared.count += 1;
        Ok(OpenHashLog { log: self, file })
    }

    fn release(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.count = shared.count.saturating_sub(1);
        if shared.count == 0 && shared.file.take().is_some() {
            debug!(path = %self.path.display(), "closed hash log");
        }
    }
}

/// A live handle on a `HashLog`.
pub struct OpenHashLog<'a> {
    log: &'a HashLog,
    file: Rc<RefCell<File>>,
}

impl Drop for OpenHashLog<'_> {
    fn drop(&mut self) {
        self.log.release();
    }
}

impl OpenHashLog<'_> {
    pub fn shares_handle_with(&self, other: &OpenHashLog<'_>) -> bool {
        Rc::ptr_eq(&self.file, &other.file)
    }

    fn read_all(&self) -> Result<String> {
        let mut f = self.file.borrow_mut();
        f.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        f.read_to_string(&mut text)?;
        Ok(text)
    }

    fn parse(&self, line: &str) -> Result<HashEntry> {
        HashEntry::from_line_with(line, self.log.line_split, self.log.algorithm)
            .map(|e| e.with_base(self.log.base_dir()))
    }

    /// `entry` with relative paths pinned to the log directory.
    ///
    /// A base-less relative entry is rebuilt so a digest cached against the
    /// working directory is not carried over.
    fn anchor(&self, entry: &HashEntry) -> HashEntry {
        if entry.base().is_some() || Path::new(entry.path()).is_absolute() {
            return entry.clone();
        }
        HashEntry::new(entry.path())
            .with_binary(entry.is_binary())
            .with_algorithm(entry.algorithm())
            .with_base(self.log.base_dir())
    }

    fn check_algorithm(&self, entry: &HashEntry) -> Result<()> {
        if entry.algorithm() != self.log.algorithm {
            return Err(SyphonError::HashAlgorithmMismatch {
                expected: self.log.algorithm.to_string(),
                found: entry.algorithm().to_string(),
            });
        }
        Ok(())
    }

    /// Entries in file order, blank lines skipped. A malformed line yields its
    /// error and ends iteration.
    pub fn entries(&self) -> Result<Entries> {
        let text = self.read_all()?;
        Ok(Entries {
            lines: text.lines().map(str::to_string).collect::<Vec<_>>().into_iter(),
            base: self.log.base_dir(),
            line_split: self.log.line_split,
            algorithm: self.log.algorithm,
            done: false,
        })
    }

    /// Add `entry` as the last line.
    pub fn append(&self, entry: &HashEntry) -> Result<()> {
        self.check_algorithm(entry)?;
        let line = self.anchor(entry).to_line()?;

        let mut f = self.file.borrow_mut();
        let len = f.seek(SeekFrom::End(0))?;
        let mut out = Vec::with_capacity(line.len() + 2);
        if len > 0 {
            f.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            f.read_exact(&mut last)?;
            if last[0] != b'\n' {
                out.push(b'\n');
            }
        }
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
        f.write_all(&out)?;
        f.flush()?;
        Ok(())
    }

    /// Replace the line covering the same file as `entry`, or append.
    pub fn update(&self, entry: &HashEntry) -> Result<()> {
        self.check_algorithm(entry)?;
        let entry = self.anchor(entry);
        let target = entry.resolved();

        let text = self.read_all()?;
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut found = None;
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if self.parse(line)?.same_file(&target) {
                found = Some(i);
                break;
            }
        }

        let Some(i) = found else {
            return self.append(&entry);
        };
        lines[i] = entry.to_line()?;
        let mut out = lines.join("\n");
        out.push('\n');

        let mut f = self.file.borrow_mut();
        f.set_len(0)?;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(out.as_bytes())?;
        f.flush()?;
        debug!(path = %self.log.path.display(), line = i + 1, "rewrote hash log entry");
        Ok(())
    }
}

pub struct Entries {
    lines: std::vec::IntoIter<String>,
    base: PathBuf,
    line_split: Option<LineSplit>,
    algorithm: HashAlgorithm,
    done: bool,
}

impl Iterator for Entries {
    type Item = Result<HashEntry>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let line = self.lines.find(|l| !l.trim().is_empty())?;
        match HashEntry::from_line_with(&line, self.line_split, self.algorithm) {
            Ok(e) => Some(Ok(e.with_base(self.base.clone()))),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
