//! A single `<digest> <marker><path>` record, as printed by `sha256sum`.

use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::digest::{HashAlgorithm, digest_file, parse_hex_digest};
use crate::error::{Result, SyphonError};

/// Pieces of a hash log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitResult {
    pub digest: String,
    pub path: String,
    pub binary: bool,
}

/// Parses one hash log line; `None` marks the line as malformed.
pub type LineSplit = fn(&str) -> Option<SplitResult>;

/// Default splitter for the coreutils format: hex digest, one space, a
/// `*` (binary) or space (text) marker, then the path.
pub fn split_line(line: &str) -> Option<SplitResult> {
    let (digest, rest) = line.split_once(' ')?;
    let binary = match rest.as_bytes().first()? {
        b'*' => true,
        b' ' => false,
        _ => return None,
    };
    let path = &rest[1..];
    if digest.is_empty() || path.is_empty() {
        return None;
    }
    Some(SplitResult {
        digest: digest.to_string(),
        path: path.to_string(),
        binary,
    })
}

#[derive(Clone, Debug)]
pub struct HashEntry {
    path: String,
    base: Option<PathBuf>,
    binary: bool,
    algorithm: HashAlgorithm,
    digest: OnceCell<String>,
}

impl HashEntry {
    /// Entry for `path` as given; nothing is read until the digest is asked for.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
            base: None,
            binary: false,
            algorithm: HashAlgorithm::default(),
            digest: OnceCell::new(),
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Changing the algorithm forgets any cached digest.
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        if algorithm != self.algorithm {
            self.algorithm = algorithm;
            self.digest = OnceCell::new();
        }
        self
    }

    /// Directory a relative path is resolved against.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Path exactly as stored.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn resolved(&self) -> PathBuf {
        let p = Path::new(&self.path);
        match &self.base {
            Some(base) if p.is_relative() => base.join(p),
            _ => p.to_path_buf(),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.digest.get().is_some()
    }

    /// Lowercase hex digest of the file, computed once.
    ///
    /// Text and binary mode read the same bytes; the mode only changes the
    /// marker written to the log.
    pub fn digest(&self) -> Result<&str> {
        if let Some(d) = self.digest.get() {
            return Ok(d);
        }
        let fresh = digest_file(&self.resolved(), self.algorithm)?;
        Ok(self.digest.get_or_init(|| fresh))
    }

    /// True when both paths name the same existing file.
    pub fn same_file(&self, other: &Path) -> bool {
        same_file(&self.resolved(), other)
    }

    pub fn to_line(&self) -> Result<String> {
        let marker = if self.binary { '*' } else { ' ' };
        Ok(format!("{} {}{}", self.digest()?, marker, self.path))
    }

    /// Parse a SHA-256 line with the default or a custom splitter.
    pub fn from_line(line: &str, split: Option<LineSplit>) -> Result<Self> {
        Self::from_line_with(line, split, HashAlgorithm::default())
    }

    pub fn from_line_with(
        line: &str,
        split: Option<LineSplit>,
        algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let malformed = || SyphonError::MalformedLine(line.to_string());

        let parts = split.unwrap_or(split_line)(line).ok_or_else(malformed)?;
        let digest = parse_hex_digest(&parts.digest, algorithm).ok_or_else(malformed)?;
        if parts.path.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            path: parts.path,
            base: None,
            binary: parts.binary,
            algorithm,
            digest: OnceCell::from(digest),
        })
    }
}

impl fmt::Display for HashEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.to_line().map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
