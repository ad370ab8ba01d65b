use std::process::ExitCode;

use vector_lda::cli::{self, Exit};

fn main() -> ExitCode {
    env_logger::init();

    let args = match cli::parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(Exit::Info(message)) => {
            print!("{message}");
            return ExitCode::SUCCESS;
        }
        Err(Exit::Usage(message)) => {
            log::debug!("{message}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    match cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
