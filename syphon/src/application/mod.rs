pub mod handlers;

use std::process::ExitCode;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use syphon_core::error::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (force, verbose) = (cli.force, cli.verbose);
    match cli.command {
        Commands::Archive {
            sources,
            destination,
            meta_mask,
            schema,
            one_to_one,
            one_to_many,
            increment,
            hashfile,
        } => handlers::handle_archive(
            sources,
            destination,
            meta_mask,
            schema,
            handlers::behavior_from_flags(one_to_one, one_to_many),
            increment,
            hashfile,
            force,
            verbose,
        ),
        Commands::Build {
            source,
            destination,
            hashfile,
            no_hash,
        } => handlers::handle_build(source, destination, hashfile, no_hash, force, verbose),
        Commands::Check { source, hashfile } => handlers::handle_check(source, hashfile, verbose),
        Commands::Init {
            destination,
            headers,
        } => handlers::handle_init(destination, headers, force, verbose),
    }
}
