//! Device command handlers.

use tabled::Tabled;

use enbp_core::{AppContext, Device, tasks};

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output;

use super::{Ui, util};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "")]
    active: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Blueprint")]
    blueprint: String,
}

impl DeviceRow {
    fn new(device: &Device, color: bool) -> Self {
        Self {
            active: output::active_marker(device.is_active(), color),
            id: device.id.clone(),
            name: device.name.clone(),
            status: output::status_label(device.connectivity_status, color),
            device_type: device.device_type.clone().unwrap_or_default(),
            blueprint: device.blueprint_id.clone().unwrap_or_default(),
        }
    }
}

fn detail(device: &Device) -> String {
    let site = device
        .site
        .as_ref()
        .map_or_else(|| "-".to_owned(), |s| format!("{} ({})", s.name, s.id));
    [
        format!("ID:        {}", device.id),
        format!("Name:      {}", device.name),
        format!("Status:    {}", device.connectivity_status),
        format!(
            "Type:      {}",
            device.device_type.as_deref().unwrap_or("-")
        ),
        format!(
            "Blueprint: {}",
            device.blueprint_id.as_deref().unwrap_or("-")
        ),
        format!("Site:      {site}"),
    ]
    .join("\n")
}

fn render_devices(devices: &[Device], ui: &Ui) -> Result<(), CliError> {
    let rendered = output::render_list(
        ui.format,
        devices,
        |d| DeviceRow::new(d, ui.color),
        |d| d.id.clone(),
    )?;
    output::print_output(&rendered, ui.quiet);
    Ok(())
}

async fn refresh(ctx: &AppContext, ui: &Ui) -> Result<Vec<Device>, CliError> {
    let cancel = util::cancel_on_ctrl_c();
    let spinner = util::spinner("Fetching devices", ui);
    let result = tasks::refresh_active_site_devices(ctx, &cancel).await;
    spinner.finish_and_clear();
    Ok(result?)
}

pub async fn handle(ctx: &AppContext, args: DevicesArgs, ui: &Ui) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { refresh: fetch } => {
            if ctx.sites().get_active()?.is_none() {
                return Err(CliError::NoActiveSite);
            }
            let devices = if fetch {
                refresh(ctx, ui).await?
            } else {
                ctx.devices().get_all()?
            };
            render_devices(&devices, ui)
        }

        DevicesCommand::Refresh => {
            let devices = refresh(ctx, ui).await?;
            render_devices(&devices, ui)
        }

        DevicesCommand::Select { id } => {
            let device = ctx.devices().connect_by_id(&id)?;
            output::notice(
                &format!("Selected {} ({})", device.name, device.id),
                ui.quiet,
            );
            Ok(())
        }

        DevicesCommand::Deselect => {
            let Some(device) = ctx.active_device().get()? else {
                output::notice("No device selected", ui.quiet);
                return Ok(());
            };
            ctx.devices().disconnect_by_id(&device.id)?;
            // The list may have been replaced since selection.
            ctx.active_device().clear()?;
            output::notice(&format!("Deselected {}", device.name), ui.quiet);
            Ok(())
        }

        DevicesCommand::Active => {
            let device = ctx.active_device().get()?.ok_or(CliError::NoActiveDevice)?;
            let rendered = output::render_single(ui.format, &device, detail, |d| d.id.clone())?;
            output::print_output(&rendered, ui.quiet);
            Ok(())
        }
    }
}
