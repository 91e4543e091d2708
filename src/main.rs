//! Plinth's main application entry point.
//! Parses arguments, sets up logging and dispatches to the command handlers.

use std::process::ExitCode;

use plinth::{
    cli::get_args,
    commands::{execute, Status},
    error::default_error_handler,
    logger::init_logger,
};

/// Main application entry point.
fn main() -> ExitCode {
    let args = get_args();
    init_logger(args.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match execute(&args, &mut out) {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::Failed(message)) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
        Err(err) => default_error_handler(err),
    }
}
