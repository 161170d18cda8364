use clap::Parser;
use organizer::cli::{Cli, run_cli};
use organizer::output::{ConsoleReporter, OutputFormatter};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut reporter = ConsoleReporter::new(cli.verbose);

    match run_cli(&cli, &mut reporter) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
