//! Config subcommand handlers.

use serde::Serialize;

use enbp_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Ui;

#[derive(Serialize)]
struct Paths {
    config: String,
    state: String,
}

pub fn handle(
    args: ConfigArgs,
    cfg: &Config,
    global: &GlobalOpts,
    ui: &Ui,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let rendered = match ui.format {
                OutputFormat::Table | OutputFormat::Plain => config::render_config(cfg)?,
                format => output::render_single(format, cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(rendered.trim_end(), ui.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let paths = Paths {
                config: global
                    .config
                    .clone()
                    .unwrap_or_else(config::config_path)
                    .display()
                    .to_string(),
                state: config::state_path(cfg).display().to_string(),
            };
            let rendered = output::render_single(
                ui.format,
                &paths,
                |p| format!("config: {}\nstate:  {}", p.config, p.state),
                |p| p.config.clone(),
            )?;
            output::print_output(&rendered, ui.quiet);
            Ok(())
        }
    }
}
