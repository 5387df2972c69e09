//! File incoming tables into the schema-partitioned archive tree.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::datafilter::datafilter;
use super::filemap::{FileMap, MappingBehavior, filemap, filemap_with_fallback};
use super::lockmanager::LockManager;
use crate::build::{BuildOptions, build};
use crate::error::{Result, SyphonError};
use crate::macros::status;
use crate::schema::{self, Schema};
use crate::table::Table;

#[derive(Clone, Default)]
pub struct ArchiveOptions {
    /// Archive root directory.
    pub root: PathBuf,
    pub data: Vec<PathBuf>,
    pub meta: Vec<PathBuf>,
    /// `None` tries one-to-one and falls back to one-to-many.
    pub behavior: Option<MappingBehavior>,
    /// No schema writes every table straight into `root`.
    pub schema: Option<PathBuf>,
    /// Cache to extend with the newly archived files.
    pub cache: Option<PathBuf>,
    /// Hash log for the cache build.
    pub hash_path: Option<PathBuf>,
    pub overwrite: bool,
    pub verbose: bool,
}

/// Archive every data file, merged with its metadata.
///
/// Returns `Ok(false)` when there is nothing to archive or any data file
/// ends up producing no archive file. With a cache configured, the result
/// is that of the incremental build over the newly archived files.
pub fn archive(opts: &ArchiveOptions) -> Result<bool> {
    if opts.data.is_empty() {
        status!(opts.verbose, "Nothing to archive");
        return Ok(false);
    }

    let schema = match &opts.schema {
        Some(path) => schema::load(path)?,
        None => Schema::new(),
    };

    let mut locks = LockManager::new();
    let collated = collate(opts, &schema, &mut locks);
    let released = locks.release_all();
    let collated = collated?;
    released?;

    let mut seen = HashSet::new();
    let mut written = Vec::new();
    for (_, files) in &collated {
        if files.is_empty() {
            return Ok(false);
        }
        for f in files {
            if seen.insert(f.clone()) {
                written.push(f.clone());
            }
        }
    }

    let Some(cache) = &opts.cache else {
        return Ok(true);
    };
    let build_opts = BuildOptions {
        cache: cache.clone(),
        hash_path: opts.hash_path.clone(),
        incremental: true,
        overwrite: true,
        post_hash: true,
        verbose: opts.verbose,
    };
    build(&build_opts, &written)
}

fn parent_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Lock every input directory, then archive each data file in turn.
/// Returns each data file with the archive files written for it.
fn collate(
    opts: &ArchiveOptions,
    schema: &Schema,
    locks: &mut LockManager,
) -> Result<Vec<(PathBuf, Vec<PathBuf>)>> {
    for file in opts.data.iter().chain(&opts.meta) {
        if !file.exists() {
            return Err(SyphonError::NotFound(file.clone()));
        }
        locks.lock(parent_dir(file))?;
    }

    let fmap: FileMap = if opts.meta.is_empty() {
        opts.data.iter().map(|d| (d.clone(), Vec::new())).collect()
    } else {
        match opts.behavior {
            Some(behavior) => filemap(behavior, &opts.data, &opts.meta),
            None => filemap_with_fallback(&opts.data, &opts.meta),
        }
    };

    let mut collated: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for datafile in &opts.data {
        if collated.iter().any(|(d, _)| d == datafile) {
            continue;
        }
        let written = match fmap.get(datafile) {
            Some(metafiles) => archive_one(opts, schema, datafile, metafiles)?,
            None => Vec::new(),
        };
        collated.push((datafile.clone(), written));
    }
    Ok(collated)
}

fn archive_one(
    opts: &ArchiveOptions,
    schema: &Schema,
    datafile: &Path,
    metafiles: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut data = Table::read_csv(datafile)?;
    if data.is_empty() {
        status!(opts.verbose, "Skipping empty data file @ {}", datafile.display());
        return Ok(Vec::new());
    }
    data.drop_empty_columns();
    merge_metadata(&mut data, metafiles)?;
    schema::check_columns(schema, &data)?;

    let filename = datafile
        .file_name()
        .ok_or_else(|| SyphonError::NotAFile(datafile.to_path_buf()))?;

    let partitions = datafilter(schema, &data);
    if partitions.is_empty() {
        let target = opts.root.join(filename);
        write_partition(&data, &target, opts)?;
        return Ok(vec![target]);
    }

    let mut written = Vec::with_capacity(partitions.len());
    for part in &partitions {
        let target = schema::resolve_path(&opts.root, schema, part)?.join(filename);
        write_partition(part, &target, opts)?;
        written.push(target);
    }
    Ok(written)
}

fn write_partition(part: &Table, target: &Path, opts: &ArchiveOptions) -> Result<()> {
    if target.exists() && !opts.overwrite {
        return Err(SyphonError::AlreadyExists(target.to_path_buf()));
    }
    fs::create_dir_all(parent_dir(target))?;
    part.write_csv(target)?;
    status!(opts.verbose, "Archived {}", target.display());
    Ok(())
}

/// Add every metadata column to `data`. A metadata column may hold one
/// value only; it is copied row for row when the row counts agree and
/// repeated down every row otherwise.
fn merge_metadata(data: &mut Table, metafiles: &[PathBuf]) -> Result<()> {
    for metafile in metafiles {
        let mut meta = Table::read_csv(metafile)?;
        meta.drop_empty_columns();
        for column in meta.columns().to_vec() {
            let values = meta.distinct_values(&column).unwrap_or_default();
            if values.len() > 1 {
                return Err(SyphonError::InconsistentMetadata(column));
            }
            if meta.len() == data.len() {
                let cells = meta
                    .column(&column)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.map(str::to_string))
                    .collect();
                data.set_column(&column, cells);
            } else if let Some(value) = values.first() {
                data.broadcast(&column, value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::lockmanager::LOCK_FILENAME;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn opts(root: &Path, data: Vec<PathBuf>) -> ArchiveOptions {
        ArchiveOptions {
            root: root.to_path_buf(),
            data,
            ..Default::default()
        }
    }

    #[test]
    fn nothing_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!archive(&opts(dir.path(), vec![])).unwrap());
    }

    #[test]
    fn no_schema_writes_into_root() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in").join("data.csv");
        write(&src, "a,b\n1,2\n");
        let root = dir.path().join("arch");
        assert!(archive(&opts(&root, vec![src])).unwrap());
        let t = Table::read_csv(&root.join("data.csv")).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn missing_schema_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.csv");
        write(&src, "a\n1\n");
        let o = ArchiveOptions {
            schema: Some(dir.path().join("nope.json")),
            ..opts(dir.path(), vec![src])
        };
        assert!(matches!(archive(&o).unwrap_err(), SyphonError::NotFound(_)));
    }

    #[test]
    fn missing_data_file_releases_locks() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("in").join("a.csv");
        write(&present, "a\n1\n");
        let missing = dir.path().join("in").join("b.csv");
        let err = archive(&opts(dir.path(), vec![present, missing.clone()])).unwrap_err();
        assert!(matches!(err, SyphonError::NotFound(p) if p == missing));
        assert!(!dir.path().join("in").join(LOCK_FILENAME).exists());
    }

    #[test]
    fn metadata_is_broadcast_and_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("in").join("run.csv");
        let meta = dir.path().join("in").join("run.meta");
        write(&data, "x\n1\n2\n3\n");
        write(&meta, "Operator,Unused\nAlice Smith,\n");
        let root = dir.path().join("arch");
        fs::create_dir_all(&root).unwrap();
        schema::save(&Schema::from_columns(["Operator"]), &root.join(".s.json"), false).unwrap();
        let o = ArchiveOptions {
            meta: vec![meta],
            schema: Some(root.join(".s.json")),
            ..opts(&root, vec![data])
        };
        assert!(archive(&o).unwrap());

        let t = Table::read_csv(&root.join("alice_smith").join("run.csv")).unwrap();
        assert_eq!(t.columns(), ["x", "Operator"]);
        assert_eq!(t.column("Operator").unwrap(), vec![Some("Alice Smith"); 3]);
    }

    #[test]
    fn row_aligned_metadata_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("in").join("d.csv");
        let meta = dir.path().join("in").join("d.meta");
        write(&data, "x\n1\n2\n");
        write(&meta, "Site,Batch\nlab,7\n,7\n");
        let root = dir.path().join("arch");
        let o = ArchiveOptions {
            meta: vec![meta],
            ..opts(&root, vec![data])
        };
        assert!(archive(&o).unwrap());
        let t = Table::read_csv(&root.join("d.csv")).unwrap();
        assert_eq!(t.column("Site").unwrap(), vec![Some("lab"), None]);
        assert_eq!(t.column("Batch").unwrap(), vec![Some("7"), Some("7")]);
    }

    #[test]
    fn inconsistent_metadata_fails() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("in").join("d.csv");
        let meta = dir.path().join("in").join("d.meta");
        write(&data, "x\n1\n");
        write(&meta, "Operator\nalice\nbob\n");
        let root = dir.path().join("arch");
        let o = ArchiveOptions {
            meta: vec![meta],
            ..opts(&root, vec![data])
        };
        let err = archive(&o).unwrap_err();
        assert!(matches!(err, SyphonError::InconsistentMetadata(c) if c == "Operator"));
        assert!(!root.exists());
        assert!(!dir.path().join("in").join(LOCK_FILENAME).exists());
    }

    #[test]
    fn existing_target_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in").join("data.csv");
        write(&src, "a\n1\n");
        let root = dir.path().join("arch");
        let o = opts(&root, vec![src]);
        assert!(archive(&o).unwrap());
        assert!(matches!(archive(&o).unwrap_err(), SyphonError::AlreadyExists(_)));
        let o = ArchiveOptions {
            overwrite: true,
            ..o
        };
        assert!(archive(&o).unwrap());
    }

    #[test]
    fn empty_data_file_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("in").join("empty.csv");
        let full = dir.path().join("in").join("full.csv");
        write(&empty, "");
        write(&full, "a\n1\n");
        let root = dir.path().join("arch");
        assert!(!archive(&opts(&root, vec![empty, full])).unwrap());
        assert!(root.join("full.csv").exists());
    }

    #[test]
    fn unmatched_one_to_one_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("in").join("a.csv");
        let meta = dir.path().join("in").join("z.meta");
        write(&data, "x\n1\n");
        write(&meta, "k\nv\n");
        let root = dir.path().join("arch");
        let o = ArchiveOptions {
            meta: vec![meta.clone()],
            behavior: Some(MappingBehavior::OneToOne),
            ..opts(&root, vec![data.clone()])
        };
        assert!(!archive(&o).unwrap());

        // the fallback policy pairs them anyway
        let o = ArchiveOptions {
            behavior: None,
            ..o
        };
        assert!(archive(&o).unwrap());
        let t = Table::read_csv(&root.join("a.csv")).unwrap();
        assert_eq!(t.column("k").unwrap(), vec![Some("v")]);
    }
}
