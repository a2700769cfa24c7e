//! Run the Lisp front end on a source string and print the output of the
//! requested stage to standard output.
//!
//! Example usage:
//!
//!     cargo run -- \
//!         --stage evaluate \
//!         --source '((lambda (x) (+ x 10)) 5)'

use std::process::ExitCode;

use clap::Parser;
use lisp_front_end::end_to_end::{run_interpreter, InterpreterConfig};

fn main() -> ExitCode {
    let interpreter_config = InterpreterConfig::parse();

    let default_filter = if interpreter_config.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let interpreter_result = run_interpreter(&interpreter_config);

    match interpreter_result {
        Ok(stage_output) => {
            println!("{}", stage_output);
            ExitCode::SUCCESS
        }

        Err(run_error) => {
            eprintln!("{}", run_error);
            ExitCode::FAILURE
        }
    }
}
