use std::process::ExitCode;

use clap::Parser;
use exifguard::cli::Cli;
use exifguard::{app, logging};
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level());

    match app::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = err.kind(), error = %err, "No se pudo iniciar la vigilancia");
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
