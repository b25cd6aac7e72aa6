use crate::commands::{run_catalog, run_parameters, run_quote, run_settings};
use crate::infra::parse_param;
use crate::render::OutputFormat;
use crate::server;
use clap::{Args, Parser, Subcommand};
use quote_engine::error::AppError;
use quote_engine::pricing::SettingsKey;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quote-engine",
    about = "Price building-safety engineering quotes from the command line or over HTTP",
    version
)]
struct Cli {
    /// Override the settings file (defaults to QUOTE_SETTINGS_PATH)
    #[arg(long, global = true)]
    settings_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Generate a quote for a selection of tasks and services
    Quote(QuoteArgs),
    /// List the pricing parameters that apply to a selection
    Parameters(SelectionArgs),
    /// List services and their tasks
    Catalog(CatalogArgs),
    /// Inspect or change stored pricing settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SelectionArgs {
    /// Task id to include (repeatable)
    #[arg(long = "task")]
    pub(crate) tasks: Vec<String>,
    /// Service id whose tasks are all included (repeatable)
    #[arg(long = "service")]
    pub(crate) services: Vec<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Task id to include (repeatable)
    #[arg(long = "task")]
    pub(crate) tasks: Vec<String>,
    /// Service id whose tasks are all included (repeatable)
    #[arg(long = "service")]
    pub(crate) services: Vec<String>,
    /// Pricing parameter as key=value, e.g. distance=120 (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    pub(crate) params: Vec<(String, Value)>,
    /// Commercial discount in percent
    #[arg(long, default_value_t = 0.0)]
    pub(crate) discount: f64,
    /// Leave parameters without a value instead of using catalog defaults
    #[arg(long)]
    pub(crate) no_defaults: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SettingsCommand {
    /// Print the effective settings, defaults included
    Show,
    /// Store one setting from its JSON value, e.g. `set defaultVatRate 10`
    Set {
        #[arg(value_parser = parse_settings_key)]
        key: SettingsKey,
        value: String,
    },
    /// Drop a stored setting so its default applies again
    Reset {
        #[arg(value_parser = parse_settings_key)]
        key: SettingsKey,
    },
}

fn parse_settings_key(raw: &str) -> Result<SettingsKey, String> {
    SettingsKey::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = SettingsKey::ordered()
            .iter()
            .map(|key| key.as_str())
            .collect();
        format!("unknown setting '{raw}', expected one of {}", known.join(", "))
    })
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings_path = cli.settings_path;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, settings_path).await,
        Command::Quote(args) => run_quote(args, settings_path),
        Command::Parameters(args) => run_parameters(args, settings_path),
        Command::Catalog(args) => run_catalog(args, settings_path),
        Command::Settings { command } => run_settings(command, settings_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn quote_command_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "quote-engine",
            "quote",
            "--task",
            "visite_audit_sec",
            "--service",
            "maintenance",
            "--param",
            "distance=120",
            "--param",
            "complexity=Moyenne",
            "--discount",
            "5",
            "--format",
            "csv",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Quote(args)) => {
                assert_eq!(args.tasks, vec!["visite_audit_sec".to_string()]);
                assert_eq!(args.services, vec!["maintenance".to_string()]);
                assert_eq!(args.params.len(), 2);
                assert_eq!(args.discount, 5.0);
                assert_eq!(args.format, OutputFormat::Csv);
                assert!(!args.no_defaults);
            }
            other => panic!("expected quote command, got {other:?}"),
        }
    }

    #[test]
    fn settings_keys_are_validated_by_the_parser() {
        let cli = Cli::try_parse_from(["quote-engine", "settings", "reset", "pricePerPage"])
            .expect("arguments parse");
        assert!(matches!(
            cli.command,
            Some(Command::Settings {
                command: SettingsCommand::Reset {
                    key: SettingsKey::PricePerPage
                }
            })
        ));

        assert!(Cli::try_parse_from(["quote-engine", "settings", "reset", "bogus"]).is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["quote-engine"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
