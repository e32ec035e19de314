use clap::Parser;
use datetidy::cli::{Cli, run_cli};
use datetidy::logging::init_logging;
use datetidy::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_cli(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(class = ?e.class(), error = %e, "run aborted");
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
