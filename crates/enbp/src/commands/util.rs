//! Shared helpers for command handlers: prompts, confirmation, progress
//! and Ctrl-C cancellation.

use std::io::{self, IsTerminal};
use std::time::Duration;

use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

use super::Ui;

fn interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Map a dialoguer failure into CliError. An interrupted prompt is a
/// cancellation.
fn prompt_err(e: dialoguer::Error) -> CliError {
    match e {
        dialoguer::Error::IO(io) if io.kind() == io::ErrorKind::Interrupted => CliError::Cancelled,
        dialoguer::Error::IO(io) => CliError::Io(io),
    }
}

fn require_interactive(field: &str) -> Result<(), CliError> {
    if interactive() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: "required when not running interactively".into(),
        })
    }
}

/// Prompt for a line of text. Empty input cancels.
pub fn prompt_text(field: &str, prompt: &str) -> Result<String, CliError> {
    require_interactive(field)?;
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(CliError::Cancelled);
    }
    Ok(value)
}

/// Prompt for a hidden value. Empty input cancels.
pub fn prompt_secret(field: &str, prompt: &str) -> Result<String, CliError> {
    require_interactive(field)?;
    let value = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_err)?;
    if value.is_empty() {
        return Err(CliError::Cancelled);
    }
    Ok(value)
}

/// Pick one of `items`. Escape cancels.
pub fn pick(field: &str, prompt: &str, items: &[String]) -> Result<usize, CliError> {
    require_interactive(field)?;
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .map_err(prompt_err)?
        .ok_or(CliError::Cancelled)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, ui: &Ui) -> Result<bool, CliError> {
    if ui.yes {
        return Ok(true);
    }
    if !interactive() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    tracing::debug!("ctrl-c received, cancelling");
                    token.cancel();
                }
            }
        }
    });
    cancel
}

/// Spinner on stderr; hidden when quiet or not attached to a terminal.
pub fn spinner(message: &str, ui: &Ui) -> ProgressBar {
    if ui.quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
