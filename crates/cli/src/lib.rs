pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use tempo_core::config::{AppConfig, LoadOptions, LogFormat};

use commands::catalog::CatalogArgs;
use commands::clients::ClientsArgs;
use commands::quote::QuoteArgs;

#[derive(Debug, Parser)]
#[command(
    name = "tempo",
    about = "Tempo quote builder CLI",
    long_about = "Inspect configuration, prepare the quote store, browse the catalog and build quotes end to end.",
    after_help = "Examples:\n  tempo config\n  tempo catalog --category Marketing\n  tempo quote --client 1 --item 3=1 --item 5=2 --discount 10 --send"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the effective configuration with the source of each value")]
    Config,
    #[command(about = "Apply pending database migrations (no-op for the memory backend)")]
    Migrate,
    #[command(about = "Load the demo clients and service offerings")]
    Seed,
    #[command(about = "List active service offerings")]
    Catalog(CatalogArgs),
    #[command(about = "List clients")]
    Clients(ClientsArgs),
    #[command(about = "Build a quote through every wizard step and optionally send it")]
    Quote(QuoteArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Catalog(args) => commands::catalog::run(&args),
        Command::Clients(args) => commands::clients::run(&args),
        Command::Quote(args) => commands::quote::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries only the JSON command result.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "cli.logging.already_installed", "subscriber already set");
    }
}
