use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "syphon: schema-driven CSV archive", long_about = None)]
pub struct Cli {
    /// Overwrite existing files
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Explain what is being done
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import files into the archive directory
    Archive {
        /// Data or metadata files
        #[arg(required = true, num_args = 1.., value_name = "SOURCE")]
        sources: Vec<PathBuf>,

        /// Directory where data is stored
        #[arg(value_name = "DESTINATION")]
        destination: PathBuf,

        /// A source whose path contains MASK is a metadata file (repeatable)
        #[arg(short = 'm', long = "meta-mask", value_name = "MASK")]
        meta_mask: Vec<String>,

        /// JSON file holding the storage schema (defaults to DESTINATION/.schema.json)
        #[arg(short, long, value_name = "SCHEMAFILE")]
        schema: Option<PathBuf>,

        /// Pair each data file with the metadata file of the same name
        #[arg(long, conflicts_with = "one_to_many")]
        one_to_one: bool,

        /// Pair each data file with every metadata file
        #[arg(long)]
        one_to_many: bool,

        /// Build file to update with the newly archived files
        #[arg(short = 'i', long = "increment", value_name = "BUILDFILE")]
        increment: Option<PathBuf>,

        /// Hash file used for the BUILDFILE integrity check
        #[arg(long, value_name = "HASHFILE", requires = "increment")]
        hashfile: Option<PathBuf>,
    },

    /// Combine an archive into a single file
    Build {
        /// Directory where data is stored
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Output file
        #[arg(value_name = "DESTINATION")]
        destination: PathBuf,

        /// File to update with the new DESTINATION hash
        #[arg(value_name = "HASHFILE")]
        hashfile: Option<PathBuf>,

        /// Skip hashing the output
        #[arg(long)]
        no_hash: bool,
    },

    /// Verify the integrity of a built file
    Check {
        /// File output by the build command
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// File holding the hash entry of SOURCE
        #[arg(value_name = "HASHFILE")]
        hashfile: Option<PathBuf>,
    },

    /// Create an archive directory storage schema
    Init {
        /// Directory where data is stored
        #[arg(value_name = "DESTINATION")]
        destination: PathBuf,

        /// Column headers for the archive hierarchy, outermost first
        #[arg(required = true, num_args = 1.., value_name = "HEADER")]
        headers: Vec<String>,
    },
}
