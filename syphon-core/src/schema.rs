//! Archive storage schema: the ordered list of partition columns.
//!
//! On disk a schema is a JSON object whose keys are the contiguous levels
//! `"0"`, `"1"`, ... and whose values are column names:
//!
//! ```json
//! {
//!   "0": "Release",
//!   "1": "Build"
//! }
//! ```
//!
//! Level 0 is the outermost directory of the archive.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyphonError};
use crate::table::Table;

/// Schema filename inside an archive directory.
pub const DEFAULT_FILE: &str = ".schema.json";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    levels: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            levels: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>) {
        self.levels.push(column.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// `(level, column)` pairs, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.levels.iter().enumerate().map(|(i, c)| (i, c.as_str()))
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for (level, column) in self.iter() {
            map.serialize_entry(&level.to_string(), column)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of \"<level>\": \"<column>\" pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Schema, A::Error> {
                let mut by_level = BTreeMap::new();
                while let Some((key, column)) = access.next_entry::<String, String>()? {
                    let level: usize = key
                        .parse()
                        .map_err(|_| de::Error::custom(format!("invalid schema level \"{key}\"")))?;
                    if by_level.insert(level, column).is_some() {
                        return Err(de::Error::custom(format!("duplicate schema level {level}")));
                    }
                }
                // levels must be exactly 0..n
                for (expected, level) in by_level.keys().enumerate() {
                    if *level != expected {
                        return Err(de::Error::custom(format!("missing schema level {expected}")));
                    }
                }
                Ok(Schema {
                    levels: by_level.into_values().collect(),
                })
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

pub fn default_path(archive_dir: &Path) -> PathBuf {
    archive_dir.join(DEFAULT_FILE)
}

pub fn load(path: &Path) -> Result<Schema> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyphonError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&text).map_err(|e| SyphonError::Schema(format!("{}: {e}", path.display())))
}

pub fn save(schema: &Schema, path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() {
        if !overwrite {
            return Err(SyphonError::AlreadyExists(path.to_path_buf()));
        }
        fs::remove_file(path)?;
    }
    let text = serde_json::to_string_pretty(schema)?;
    fs::write(path, text)?;
    Ok(())
}

/// Fails on the first schema column `data` does not have.
pub fn check_columns(schema: &Schema, data: &Table) -> Result<()> {
    for (_, column) in schema.iter() {
        if !data.has_column(column) {
            return Err(SyphonError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Directory-safe form of a partition value.
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .replace(' ', "_")
        .trim_end_matches('.')
        .to_string()
}

/// Directory under `archive` for a table holding a single value per schema column.
pub fn resolve_path(archive: &Path, schema: &Schema, data: &Table) -> Result<PathBuf> {
    let mut result = archive.to_path_buf();
    for (_, column) in schema.iter() {
        let mut values = data
            .distinct_values(column)
            .ok_or_else(|| SyphonError::MissingColumn(column.to_string()))?;
        if values.len() > 1 {
            return Err(SyphonError::AmbiguousValue(column.to_string()));
        }
        let segment = values
            .pop()
            .map(|v| normalize(&v))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SyphonError::MissingValue(column.to_string()))?;
        result.push(segment);
    }
    Ok(result)
}
