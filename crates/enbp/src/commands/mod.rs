//! Command dispatch: bridges CLI args -> core workflows -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod pack;
pub mod sites;
pub mod upload;
pub mod util;
pub mod watch;

use clap::ValueEnum;

use enbp_config::Config;
use enbp_core::AppContext;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Presentation settings resolved from flags and config.
#[derive(Debug, Clone)]
pub struct Ui {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
}

impl Ui {
    /// `--output` wins over the config file's `output`.
    pub fn new(global: &GlobalOpts, config: &Config) -> Result<Self, CliError> {
        let format = match global.output {
            Some(format) => format,
            None => OutputFormat::from_str(&config.output, true).map_err(|reason| {
                CliError::Validation {
                    field: "output".into(),
                    reason,
                }
            })?,
        };
        Ok(Self {
            format,
            color: output::should_color(global.color),
            quiet: global.quiet,
            yes: global.yes,
        })
    }
}

/// Dispatch a state-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &AppContext, ui: &Ui) -> Result<(), CliError> {
    match cmd {
        Command::Pack(args) => pack::handle(ctx, args, ui).await,
        Command::Upload(args) => upload::handle(ctx, args, ui).await,
        Command::Sites(args) => sites::handle(ctx, args, ui).await,
        Command::Devices(args) => devices::handle(ctx, args, ui).await,
        Command::Watch => watch::handle(ctx, ui).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command must be handled before dispatch".into(),
        }),
    }
}
