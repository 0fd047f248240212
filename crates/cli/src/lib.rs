pub mod commands;
pub mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fieldforce_core::config::{LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "fieldforce",
    about = "Sales-force activity reports per organization",
    long_about = "Reconcile each organization's reporting hierarchy, roll leaf activity up through \
                  every management level, and write waterfall reports.",
    after_help = "Examples:\n  fieldforce report --org lupin\n  fieldforce report --all --from 2026-03-01 --to 2026-03-15\n  fieldforce migrate\n  fieldforce config"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (defaults to fieldforce.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate waterfall reports and return structured status output")]
    Report(ReportArgs),
    #[command(about = "Apply pending activity-store migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

#[derive(Clone, Debug, Default, Args)]
pub struct ReportArgs {
    #[arg(long, value_name = "KEY", conflicts_with = "all", help = "Single organization key")]
    pub org: Option<String>,
    #[arg(long, help = "Every configured organization (the default)")]
    pub all: bool,
    #[arg(long, value_name = "YYYY-MM-DD", help = "First day of the period")]
    pub from: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Last day of the period")]
    pub to: Option<NaiveDate>,
    #[arg(long, value_name = "DIR", help = "Output directory (defaults to report.output_dir)")]
    pub out: Option<PathBuf>,
}

pub fn load_options(config_path: Option<&Path>) -> LoadOptions {
    LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    }
}

/// Installs the global subscriber on stderr. Later calls are no-ops.
pub fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = load_options(cli.config.as_deref());

    let result = match cli.command {
        Command::Report(args) => commands::report::run(options, &args),
        Command::Migrate => commands::migrate::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
