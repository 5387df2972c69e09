#![forbid(unsafe_code)]

pub mod error;
mod macros;

pub mod table;
pub mod schema;

pub mod archive {
    pub mod datafilter;
    pub mod engine;
    pub mod filemap;
    pub mod lockmanager;
}

pub mod hash {
    pub mod digest;
    pub mod entry;
    pub mod logfile;
}

pub mod build;
pub mod check;
pub mod init;

// Re-exports: stable API surface
pub use archive::engine::{ArchiveOptions, archive};
pub use archive::filemap::MappingBehavior;
pub use build::{BuildOptions, build, collect_sources};
pub use check::{CheckOptions, check};
pub use error::{Result, SyphonError};
pub use hash::digest::HashAlgorithm;
pub use hash::entry::{HashEntry, LineSplit, SplitResult};
pub use hash::logfile::HashLog;
pub use init::init;
pub use schema::Schema;
pub use table::Table;
