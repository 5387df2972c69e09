use std::path::{Path, PathBuf};
use std::process::ExitCode;

use syphon_core::error::Result;
use syphon_core::schema::{self, Schema};
use syphon_core::{
    ArchiveOptions, BuildOptions, CheckOptions, MappingBehavior, archive, build, check,
    collect_sources, init,
};

/// Exit status for a source file that does not exist.
const MISSING_SOURCE: u8 = 2;

fn status(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

pub fn behavior_from_flags(one_to_one: bool, one_to_many: bool) -> Option<MappingBehavior> {
    match (one_to_one, one_to_many) {
        (_, true) => Some(MappingBehavior::OneToMany),
        (true, false) => Some(MappingBehavior::OneToOne),
        (false, false) => None,
    }
}

/// Split sources into (data, metadata). A source is metadata when its path
/// contains any of `masks`. The first missing source is returned as the error.
pub fn classify_sources(
    sources: &[PathBuf],
    masks: &[String],
) -> std::result::Result<(Vec<PathBuf>, Vec<PathBuf>), PathBuf> {
    let mut data = Vec::new();
    let mut meta = Vec::new();
    for source in sources {
        if !source.exists() {
            return Err(source.clone());
        }
        let path = std::path::absolute(source).map_err(|_| source.clone())?;
        let text = path.to_string_lossy();
        if masks.iter().any(|m| text.contains(m.as_str())) {
            meta.push(path);
        } else {
            data.push(path);
        }
    }
    Ok((data, meta))
}

/// Explicit schema paths must exist; the default one is optional.
fn resolve_schema(destination: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(p),
        None => Some(schema::default_path(destination)).filter(|p| p.exists()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_archive(
    sources: Vec<PathBuf>,
    destination: PathBuf,
    meta_mask: Vec<String>,
    schema: Option<PathBuf>,
    behavior: Option<MappingBehavior>,
    increment: Option<PathBuf>,
    hashfile: Option<PathBuf>,
    force: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let (data, meta) = match classify_sources(&sources, &meta_mask) {
        Ok(split) => split,
        Err(missing) => {
            eprintln!("syphon: cannot archive nonexistent file @ {}", missing.display());
            return Ok(ExitCode::from(MISSING_SOURCE));
        }
    };

    let opts = ArchiveOptions {
        schema: resolve_schema(&destination, schema),
        root: destination,
        data,
        meta,
        behavior,
        cache: increment,
        hash_path: hashfile,
        overwrite: force,
        verbose,
    };
    let ok = archive(&opts)?;
    if !ok {
        eprintln!("archive: incomplete @ {}", opts.root.display());
    }
    Ok(status(ok))
}

pub fn handle_build(
    source: PathBuf,
    destination: PathBuf,
    hashfile: Option<PathBuf>,
    no_hash: bool,
    force: bool,
    verbose: bool,
) -> Result<ExitCode> {
    // the output may live inside the archive it is built from
    let output = std::path::absolute(&destination)?;
    let files: Vec<PathBuf> = collect_sources(&source)?
        .into_iter()
        .filter(|f| std::path::absolute(f).map_or(true, |f| f != output))
        .collect();

    let opts = BuildOptions {
        hash_path: hashfile,
        incremental: false,
        overwrite: force,
        post_hash: !no_hash,
        verbose,
        ..BuildOptions::new(destination)
    };
    let ok = build(&opts, &files)?;
    if ok {
        eprintln!("build: {} <- {} files", opts.cache.display(), files.len());
    }
    Ok(status(ok))
}

pub fn handle_check(source: PathBuf, hashfile: Option<PathBuf>, verbose: bool) -> Result<ExitCode> {
    let opts = CheckOptions {
        hash_path: hashfile,
        verbose,
        ..CheckOptions::new(&source)
    };
    let ok = check(&opts);
    eprintln!("check: {}: {}", source.display(), if ok { "OK" } else { "FAILED" });
    Ok(status(ok))
}

pub fn handle_init(
    destination: PathBuf,
    headers: Vec<String>,
    force: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let path = schema::default_path(&destination);
    init(&Schema::from_columns(headers), &path, force, verbose)?;
    eprintln!("init: wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}
