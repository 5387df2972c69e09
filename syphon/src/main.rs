mod application;
mod presentation {
    pub mod cli;
}

use std::process::ExitCode;

fn main() -> ExitCode {
    match application::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("syphon: {e}");
            ExitCode::FAILURE
        }
    }
}
