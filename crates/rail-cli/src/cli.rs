//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rail - read and drive the structured logging rail.
#[derive(Parser, Debug, Clone)]
#[command(name = "rail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file to use. Without it the default location is tried and
    /// built-in defaults apply when nothing is found.
    #[arg(short, long, env = "RAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show entries of a log file.
    Show(ShowArgs),

    /// Summarize health per run (context id).
    Health(HealthArgs),

    /// Print where a component's log is written.
    Path {
        /// Component name.
        component: String,
    },

    /// Print the effective configuration.
    Config,

    /// Run a command under a logger; the exit code mirrors the command.
    Run(RunArgs),
}

/// Arguments for the show command.
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Log file to read.
    pub file: PathBuf,

    /// Include numbered archives, oldest first.
    #[arg(long)]
    pub history: bool,

    /// Only these levels (repeatable).
    #[arg(short, long)]
    pub level: Vec<String>,

    /// Only these components (repeatable).
    #[arg(long)]
    pub component: Vec<String>,

    /// Only these context ids (repeatable).
    #[arg(long = "context")]
    pub context: Vec<String>,

    /// Case-insensitive text in the event or detail values.
    #[arg(long)]
    pub contains: Option<String>,
}

/// Arguments for the health command.
#[derive(Args, Debug, Clone)]
pub struct HealthArgs {
    /// Log file to read.
    pub file: PathBuf,

    /// Include numbered archives, oldest first.
    #[arg(long)]
    pub history: bool,
}

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Component the logger is bound to.
    pub component: String,

    /// Program and arguments, after `--`.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_filters() {
        let cli = Cli::parse_from([
            "rail", "show", "demo.log", "--level", "failure", "--level", "error", "--contains",
            "disk",
        ]);
        match cli.command {
            Commands::Show(args) => {
                assert_eq!(args.file, PathBuf::from("demo.log"));
                assert_eq!(args.level, vec!["failure", "error"]);
                assert_eq!(args.contains.as_deref(), Some("disk"));
                assert!(!args.history);
            }
            other => unreachable!("expected show, got {other:?}"),
        }
    }

    #[test]
    fn parses_run_after_double_dash() {
        let cli = Cli::parse_from(["rail", "run", "build", "--", "make", "-j4"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.component, "build");
                assert_eq!(args.command, vec!["make", "-j4"]);
            }
            other => unreachable!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["rail", "run", "build"]).is_err());
    }

    #[test]
    fn respects_format_flag() {
        let cli = Cli::parse_from(["rail", "--format", "json", "config"]);
        assert_eq!(cli.format, Format::Json);
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
