use std::path::Path;

use crate::error::Result;
use crate::macros::status;
use crate::schema::{self, Schema};

/// Write `schema` to `path`, creating parent directories as needed.
pub fn init(schema: &Schema, path: &Path, overwrite: bool, verbose: bool) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    schema::save(schema, path, overwrite)?;
    status!(verbose, "Init: wrote {}", path.display());
    Ok(())
}
