//! `enbp watch`: run the pollers and print selection changes until Ctrl-C.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use enbp_core::{ActiveDeviceEvent, AppContext, Device, Site, SiteEvent};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

use super::Ui;

/// One line of machine-readable watch output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchLine {
    ActiveSite { site: Option<Site> },
    Devices { devices: Vec<Device> },
    DeviceSelected { device: Option<Device> },
    DeviceUpdated { device: Device },
}

impl WatchLine {
    fn human(&self, ui: &Ui) -> String {
        match self {
            Self::ActiveSite { site: Some(site) } => {
                format!("site     {} ({}) is now active", site.name, site.id)
            }
            Self::ActiveSite { site: None } => "site     disconnected".into(),
            Self::Devices { devices } => {
                let online = devices.iter().filter(|d| d.is_online()).count();
                format!("devices  {} on site, {online} online", devices.len())
            }
            Self::DeviceSelected { device: Some(d) } => {
                format!("device   selected {} ({})", d.name, d.id)
            }
            Self::DeviceSelected { device: None } => "device   selection cleared".into(),
            Self::DeviceUpdated { device } => format!(
                "device   {} is {} (blueprint {})",
                device.name,
                output::status_label(device.connectivity_status, ui.color),
                device.blueprint_id.as_deref().unwrap_or("-")
            ),
        }
    }

    fn render(&self, ui: &Ui) -> Result<String, CliError> {
        match ui.format {
            OutputFormat::Table | OutputFormat::Plain => Ok(self.human(ui)),
            _ => serde_json::to_string(self).map_err(|e| CliError::Render(e.to_string())),
        }
    }
}

/// Next event from `rx`, skipping over lag. `None` once the sender is gone.
async fn next<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "watch output lagged"),
            Err(RecvError::Closed) => return None,
        }
    }
}

pub async fn handle(ctx: &AppContext, ui: &Ui) -> Result<(), CliError> {
    let mut sites = ctx.sites().subscribe();
    let mut devices = ctx.devices().subscribe();
    let mut active = ctx.active_device().subscribe();

    match ctx.sites().get_active()? {
        Some(site) => output::notice(
            &format!("Watching {} ({}), Ctrl-C to stop", site.name, site.id),
            ui.quiet,
        ),
        None => output::notice("No active site, waiting for one. Ctrl-C to stop", ui.quiet),
    }

    let pollers = ctx.spawn_pollers();
    let result = loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            Some(event) = next(&mut sites) => match event {
                SiteEvent::ActiveSiteChanged(site) => WatchLine::ActiveSite { site },
                SiteEvent::SitesChanged => continue,
            },
            Some(list) = next(&mut devices) => WatchLine::Devices {
                devices: Arc::unwrap_or_clone(list),
            },
            Some(event) = next(&mut active) => match event {
                ActiveDeviceEvent::Selected(device) => WatchLine::DeviceSelected { device },
                ActiveDeviceEvent::Updated(device) => WatchLine::DeviceUpdated { device },
            },
        };
        match line.render(ui) {
            Ok(text) => output::print_output(&text, ui.quiet),
            Err(e) => break Err(e),
        }
    };

    pollers.shutdown().await;
    result
}
