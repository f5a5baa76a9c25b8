//! `setpoint` binary: parse, run, map errors to exit codes.

use std::process::ExitCode;

fn main() -> ExitCode {
    match wbc_setpoint::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
