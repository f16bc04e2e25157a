//! dbcsync CLI entry point.

use clap::Parser;
use dbcsync::cli::commands;
use dbcsync::cli::{Cli, Commands};
use dbcsync::config::{self, Config, LoadedConfig};
use dbcsync::error::Error;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Run the command and handle errors
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Load the config, or report that a fresh template was written.
///
/// Returns `None` when the config did not exist yet: the template is
/// on disk and the user has been told to edit it before re-running.
fn load_config(path: &Path) -> Result<Option<Config>, Error> {
    match Config::load_or_init(path)? {
        LoadedConfig::Loaded(config) => Ok(Some(config)),
        LoadedConfig::Created(path) => {
            println!(
                "Config template created at {}. Edit it and re-run.",
                path.display()
            );
            Ok(None)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config_path = config::resolve_config_path(cli.config.as_deref());

    match &cli.command {
        Commands::Init { force } => commands::init::execute(&config_path, *force, cli.json),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(cli.json),

        Commands::Read { name, record, out } => {
            let Some(config) = load_config(&config_path)? else {
                return Ok(());
            };
            commands::read::execute(&config, name, *record, *out, cli.json)
        }
        Commands::Header { name } => {
            let Some(config) = load_config(&config_path)? else {
                return Ok(());
            };
            commands::header::execute(&config, name, cli.json)
        }
        Commands::Import { name } => {
            let Some(config) = load_config(&config_path)? else {
                return Ok(());
            };
            commands::import::execute(&config, name.as_deref(), cli.json)
        }
        Commands::Export { name, force } => {
            let Some(config) = load_config(&config_path)? else {
                return Ok(());
            };
            commands::export::execute(&config, name.as_deref(), *force, cli.json)
        }
    }
}
