mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use enbp_config::{Config, FileStateStore, KeyringSecretStore};
use enbp_core::AppContext;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::commands::Ui;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "enbp", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config = load_config(&cli.global)?;
            let ui = Ui::new(&cli.global, &config)?;

            // Config commands don't need persisted state
            if let Command::Config(args) = cmd {
                return commands::config_cmd::handle(args, &config, &cli.global, &ui);
            }

            let ctx = build_context(&config)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &ui).await
        }
    }
}

/// Config file (or `--config`) plus flag overrides.
fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(enbp_config::config_path);
    let mut config = enbp_config::load_config_from(&path)?;

    if global.insecure {
        config.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        config.timeout_secs = timeout;
    }
    Ok(config)
}

fn build_context(config: &Config) -> Result<AppContext, CliError> {
    let core = enbp_config::to_core_config(config)?;
    let state = FileStateStore::open(enbp_config::state_path(config))?;
    Ok(AppContext::new(
        core,
        Arc::new(state),
        Arc::new(KeyringSecretStore::default()),
    ))
}
