//! Site command handlers.

use secrecy::SecretString;
use tabled::Tabled;

use enbp_core::{AppContext, Site, tasks};

use crate::cli::{SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

use super::{Ui, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "")]
    active: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl SiteRow {
    fn new(site: &Site, color: bool) -> Self {
        Self {
            active: output::active_marker(site.is_active, color),
            id: site.id.clone(),
            name: site.name.clone(),
            kind: site.kind.to_string(),
            address: site.address.clone(),
        }
    }
}

// ── Lookups ─────────────────────────────────────────────────────────

fn site_not_found(id: &str) -> CliError {
    CliError::NotFound {
        resource_type: "site".into(),
        identifier: id.into(),
        list_command: "sites list".into(),
    }
}

/// `id`, or the active site when omitted.
fn site_or_active(ctx: &AppContext, id: Option<&str>) -> Result<Site, CliError> {
    match id {
        Some(id) => ctx.sites().get_by_id(id)?.ok_or_else(|| site_not_found(id)),
        None => ctx.sites().get_active()?.ok_or(CliError::NoActiveSite),
    }
}

fn added_message(kind: &str, site: &Site) -> String {
    let state = if site.is_active { ", now active" } else { "" };
    format!("Added {kind} site {} ({}){state}", site.name, site.id)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: SitesArgs, ui: &Ui) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List => {
            let sites = ctx.sites().get_all()?;
            let rendered = output::render_list(
                ui.format,
                &sites,
                |s| SiteRow::new(s, ui.color),
                |s| s.id.clone(),
            )?;
            output::print_output(&rendered, ui.quiet);
            Ok(())
        }

        SitesCommand::AddGateway { address, token } => {
            let address = match address {
                Some(address) => address,
                None => util::prompt_text("address", "Gateway address (e.g. http://192.168.8.8)")?,
            };
            let token = match token {
                Some(token) => token,
                None => util::prompt_secret("token", "Gateway API token")?,
            };

            let cancel = util::cancel_on_ctrl_c();
            let spinner = util::spinner(&format!("Connecting to {address}"), ui);
            let result =
                tasks::connect_gateway_site(ctx, &address, SecretString::from(token), &cancel)
                    .await;
            spinner.finish_and_clear();
            let site = result?;
            output::notice(&added_message("gateway", &site), ui.quiet);
            Ok(())
        }

        SitesCommand::AddCloud {
            site_id,
            name,
            token,
        } => add_cloud(ctx, site_id, name, token, ui).await,

        SitesCommand::Connect { id } => {
            let site = ctx
                .sites()
                .connect_by_id(&id)?
                .ok_or_else(|| site_not_found(&id))?;
            output::notice(&format!("Connected to {} ({})", site.name, site.id), ui.quiet);
            Ok(())
        }

        SitesCommand::Disconnect { id } => {
            let site = site_or_active(ctx, id.as_deref())?;
            if ctx.sites().disconnect_by_id(&site.id)? {
                output::notice(&format!("Disconnected from {}", site.name), ui.quiet);
            } else {
                output::notice(&format!("{} is not connected", site.name), ui.quiet);
            }
            Ok(())
        }

        SitesCommand::Remove { id } => {
            let site = ctx.sites().get_by_id(&id)?.ok_or_else(|| site_not_found(&id))?;
            if !util::confirm(
                &format!("Remove site '{}' and its token?", site.name),
                "sites remove",
                ui,
            )? {
                return Ok(());
            }
            ctx.sites().remove_by_id(&id)?;
            output::notice(&format!("Removed {}", site.name), ui.quiet);
            Ok(())
        }

        SitesCommand::RemoveAll => {
            if !util::confirm(
                "Remove every site and stored token?",
                "sites remove-all",
                ui,
            )? {
                return Ok(());
            }
            let removed = ctx.sites().remove_all()?;
            output::notice(&format!("Removed {} site(s)", removed.len()), ui.quiet);
            Ok(())
        }

        SitesCommand::Check { id } => {
            let site = site_or_active(ctx, id.as_deref())?;
            let cancel = util::cancel_on_ctrl_c();
            let spinner = util::spinner(&format!("Checking {}", site.name), ui);
            let result = tasks::check_site_connection(ctx, &site, &cancel).await;
            spinner.finish_and_clear();
            result?;
            output::notice(&format!("{} ({}) is reachable", site.name, site.id), ui.quiet);
            Ok(())
        }
    }
}

/// Register a cloud site, picking it from the token's sites when no id is
/// given.
async fn add_cloud(
    ctx: &AppContext,
    site_id: Option<String>,
    name: Option<String>,
    token: Option<String>,
    ui: &Ui,
) -> Result<(), CliError> {
    let token = match token {
        Some(token) => Some(token),
        None if ctx.repository().is_cloud_token_set()? => None,
        None => Some(util::prompt_secret("token", "Enapter Cloud API token")?),
    };
    let cancel = util::cancel_on_ctrl_c();

    let (site_id, name) = match site_id {
        Some(id) => (id, name),
        None => {
            let listing_token = match &token {
                Some(token) => SecretString::from(token.clone()),
                None => ctx
                    .repository()
                    .cloud_token()?
                    .ok_or(CliError::AuthFailed {
                        message: "No cloud API token stored".into(),
                    })?,
            };
            let spinner = util::spinner("Fetching cloud sites", ui);
            let result = tasks::list_cloud_sites(ctx, &listing_token, None, &cancel).await;
            spinner.finish_and_clear();
            let remote = result?;
            if remote.is_empty() {
                return Err(CliError::NotFound {
                    resource_type: "cloud site".into(),
                    identifier: "*".into(),
                    list_command: "sites list".into(),
                });
            }
            let labels: Vec<String> = remote
                .iter()
                .map(|s| format!("{} ({})", s.name, s.id))
                .collect();
            let choice = util::pick("site-id", "Cloud site", &labels)?;
            let picked = &remote[choice];
            (picked.id.clone(), name.or_else(|| Some(picked.name.clone())))
        }
    };

    let spinner = util::spinner(&format!("Connecting to cloud site {site_id}"), ui);
    let result = tasks::connect_cloud_site(
        ctx,
        &site_id,
        name.as_deref(),
        token.map(SecretString::from),
        &cancel,
    )
    .await;
    spinner.finish_and_clear();
    let site = result?;
    output::notice(&added_message("cloud", &site), ui.quiet);
    Ok(())
}
