use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};
use quill_cli::cli_args::Args;
use quill_cli::error::Result;
use quill_cli::prompt;
use quill_cli::session::{describe_output, Session};
use quill_core::status::Status;

/// Runs the given line once, waiting for it to settle. Returns whether it
/// succeeded.
fn run_once(session: &mut Session, line: &str) -> bool {
    let output = session.execute(Some(line));
    if !output.is_completed() {
        debug!("Waiting for `{line}` to settle");
    }
    let record = output.wait();
    if let Some(text) = describe_output(&record) {
        if record.error {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }
    !record.error
}

/// Prints the status of the line. Returns whether it is valid.
fn check(session: &mut Session, line: &str) -> bool {
    let (status, message) = session.check(line);
    match message {
        Some(message) => println!("{status}: {message}"),
        None => println!("{status}"),
    }
    status == Status::Valid
}

fn execute() -> Result<bool> {
    let args = Args::parse();
    let mut session = Session::from_args(&args)?;

    match args.input_line() {
        Some(line) if args.check => Ok(check(&mut session, &line)),
        Some(line) => Ok(run_once(&mut session, &line)),
        None => {
            info!("Starting the prompt");
            prompt::run(&mut session)?;
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match execute() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
