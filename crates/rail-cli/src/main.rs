//! Rail CLI binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rail_cli::cli::{Cli, Commands};
use rail_cli::commands::{ConfigCommand, HealthCommand, PathCommand, RunCommand, ShowCommand};
use rail_cli::output::OutputFormat;
use rail_logs::Settings;

fn main() -> ExitCode {
    // Write-path warnings from the rail surface at the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, rail_cli::CliError> {
    let settings = match &cli.config {
        Some(path) => Arc::new(Settings::from_file(path)?),
        None => rail_logs::config::global(),
    };
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Show(args) => {
            let cmd = ShowCommand::new(&settings);
            cmd.execute(&mut stdout, &format, &args)?;
        }
        Commands::Health(args) => {
            let cmd = HealthCommand::new(&settings);
            cmd.execute(&mut stdout, &format, &args)?;
        }
        Commands::Path { component } => {
            let cmd = PathCommand::new(&settings);
            cmd.execute(&mut stdout, &format, &component)?;
        }
        Commands::Config => {
            let cmd = ConfigCommand::new(&settings);
            cmd.execute(&mut stdout, &format)?;
        }
        Commands::Run(args) => {
            let cmd = RunCommand::new(Arc::clone(&settings));
            let code = cmd.execute(&mut stdout, &format, &args)?;
            return Ok(ExitCode::from(exit_status(code)));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Maps a child exit code onto a process exit status; signals become 1.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["rail", "path", "demo"]).expect("parse");
        assert!(matches!(cli.command, Commands::Path { .. }));
    }

    #[test]
    fn exit_status_mapping() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(-1), 1);
        assert_eq!(exit_status(300), 1);
    }
}
