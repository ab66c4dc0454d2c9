//! `enbp upload`: package, upload and assign.

use std::path::PathBuf;

use bytesize::ByteSize;
use serde::Serialize;

use enbp_core::manifest;
use enbp_core::{AppContext, Device, tasks};

use crate::cli::UploadArgs;
use crate::error::CliError;
use crate::output;

use super::{Ui, util};

#[derive(Serialize)]
struct UploadSummary {
    blueprint_id: String,
    device_id: String,
    device_name: String,
    site_id: String,
    site_name: String,
    archive_bytes: u64,
}

fn resolve_manifest(ctx: &AppContext, arg: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = arg {
        return Ok(path);
    }
    manifest::recent(&**ctx.state())
        .map(|m| m.path().to_path_buf())
        .ok_or_else(|| CliError::Validation {
            field: "manifest".into(),
            reason: "no manifest given and none was used before".into(),
        })
}

fn resolve_device(ctx: &AppContext, id: Option<String>) -> Result<Device, CliError> {
    match id {
        Some(id) => ctx
            .devices()
            .get_by_id(&id)?
            .ok_or_else(|| CliError::NotFound {
                resource_type: "device".into(),
                identifier: id,
                list_command: "devices list".into(),
            }),
        None => ctx.active_device().get()?.ok_or(CliError::NoActiveDevice),
    }
}

pub async fn handle(ctx: &AppContext, args: UploadArgs, ui: &Ui) -> Result<(), CliError> {
    let manifest_path = resolve_manifest(ctx, args.manifest)?;
    let device = resolve_device(ctx, args.device)?;

    let cancel = util::cancel_on_ctrl_c();
    let spinner = util::spinner(
        &format!("Uploading {} to {}", manifest_path.display(), device.name),
        ui,
    );
    let result = tasks::upload_blueprint(ctx, &manifest_path, &device, &cancel).await;
    spinner.finish_and_clear();
    let outcome = result?;

    let summary = UploadSummary {
        blueprint_id: outcome.blueprint_id,
        device_id: outcome.device.id,
        device_name: outcome.device.name,
        site_id: outcome.site.id,
        site_name: outcome.site.name,
        archive_bytes: u64::try_from(outcome.archive_size).unwrap_or(u64::MAX),
    };
    let rendered = output::render_single(
        ui.format,
        &summary,
        |s| {
            format!(
                "Blueprint {} ({}) assigned to {} on {}",
                s.blueprint_id,
                ByteSize::b(s.archive_bytes),
                s.device_name,
                s.site_name
            )
        },
        |s| s.blueprint_id.clone(),
    )?;
    output::print_output(&rendered, ui.quiet);
    Ok(())
}
