// ── Site connection workflows ──

use enbp_api::ApiClient;
use enbp_api::types::SiteResponse;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::context::AppContext;
use crate::convert::device_on_site;
use crate::error::CoreError;
use crate::model::{Device, Site, SiteKind, normalize_gateway_address};

use super::{Rollback, cancellable, ensure_not_cancelled};

const CLOUD_LABEL: &str = "Enapter Cloud";
const UNKNOWN_SITE_ID: &str = "unknown";

/// Accept `http(s)://host[:port][/path]`, trimmed.
fn validate_address(address: &str) -> Result<String, CoreError> {
    let address = address.trim();
    let url = Url::parse(address).map_err(|e| CoreError::InvalidAddress {
        address: address.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::InvalidAddress {
            address: address.to_owned(),
            reason: format!("unsupported scheme {:?}, expected http or https", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::InvalidAddress {
            address: address.to_owned(),
            reason: "missing host".into(),
        });
    }
    Ok(address.to_owned())
}

/// Make `site` active when nothing else is.
fn activate_if_idle(ctx: &AppContext, site: Site) -> Result<Site, CoreError> {
    if ctx.sites().get_active()?.is_some() {
        return Ok(site);
    }
    Ok(ctx.sites().connect_by_id(&site.id)?.unwrap_or(site))
}

// ── Gateway ──────────────────────────────────────────────────────────

/// Register the gateway at `address` and store its token.
///
/// The gateway is asked for its own id and name first. The token write is
/// undone if anything after it fails or the operation is cancelled.
pub async fn connect_gateway_site(
    ctx: &AppContext,
    address: &str,
    token: SecretString,
    cancel: &CancellationToken,
) -> Result<Site, CoreError> {
    let address = normalize_gateway_address(&validate_address(address)?);
    ensure_not_cancelled(cancel)?;

    let client = ApiClient::new(&address, &token, ctx.clients().transport())?;
    let remote = cancellable(cancel, client.get_gateway_site())
        .await?
        .map_err(|e| CoreError::remote_named(&address, UNKNOWN_SITE_ID, e))?;
    debug!(site_id = %remote.id, address = %address, "gateway answered");

    let site = Site::gateway(remote.id, remote.name, &address, false);
    let repository = ctx.repository().clone();
    let previous = repository.gateway_token(&site)?;

    let mut rollback = Rollback::new();
    repository.set_gateway_token(&site, &token)?;
    {
        let site = site.clone();
        rollback.push("gateway token", move || match previous {
            Some(token) => repository.set_gateway_token(&site, &token),
            None => repository.delete_gateway_token(&site),
        });
    }

    ensure_not_cancelled(cancel)?;
    ctx.sites().add(site.clone())?;
    let site = activate_if_idle(ctx, site)?;
    rollback.commit();

    info!(site_id = %site.id, site = %site.name, address = %site.address, "gateway site added");
    Ok(site)
}

// ── Cloud ────────────────────────────────────────────────────────────

/// Sites visible to `token` on the cloud, optionally filtered by name.
pub async fn list_cloud_sites(
    ctx: &AppContext,
    token: &SecretString,
    name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Vec<SiteResponse>, CoreError> {
    ensure_not_cancelled(cancel)?;
    let client = ApiClient::new(ctx.clients().cloud_url(), token, ctx.clients().transport())?;
    cancellable(cancel, client.list_sites(name))
        .await?
        .map_err(|e| CoreError::remote_named(CLOUD_LABEL, UNKNOWN_SITE_ID, e))
}

/// Register cloud site `site_id`.
///
/// `token` replaces the stored cloud token; without one the stored token
/// is used. The site is verified remotely before it is added, and its name
/// defaults to the remote one. A replaced token is restored on failure.
pub async fn connect_cloud_site(
    ctx: &AppContext,
    site_id: &str,
    name: Option<&str>,
    token: Option<SecretString>,
    cancel: &CancellationToken,
) -> Result<Site, CoreError> {
    ensure_not_cancelled(cancel)?;
    let repository = ctx.repository().clone();
    let previous = repository.cloud_token()?;

    let mut rollback = Rollback::new();
    let token = match (token, previous) {
        (Some(token), previous) => {
            repository.set_cloud_token(&token)?;
            let repository = repository.clone();
            rollback.push("cloud token", move || match previous {
                Some(previous) => repository.set_cloud_token(&previous),
                None => repository.delete_cloud_token(),
            });
            token
        }
        (None, Some(stored)) => stored,
        (None, None) => {
            return Err(CoreError::TokenNotFound {
                site: name.unwrap_or(site_id).to_owned(),
            });
        }
    };

    let label = name.unwrap_or(CLOUD_LABEL);
    let client = ApiClient::new(ctx.clients().cloud_url(), &token, ctx.clients().transport())?;
    let remote = cancellable(cancel, client.get_site(site_id))
        .await?
        .map_err(|e| CoreError::remote_named(label, site_id, e))?;
    if remote.id != site_id {
        return Err(CoreError::SiteIdMismatch {
            site: label.to_owned(),
            site_id: site_id.to_owned(),
            remote_id: remote.id,
        });
    }

    ensure_not_cancelled(cancel)?;
    let site = Site::cloud(site_id, name.map_or(remote.name, str::to_owned), false);
    ctx.sites().add(site.clone())?;
    let site = activate_if_idle(ctx, site)?;
    rollback.commit();

    info!(site_id = %site.id, site = %site.name, "cloud site added");
    Ok(site)
}

// ── Checks & device listing ──────────────────────────────────────────

/// Verify the stored credential, reachability and remote identity of
/// `site`.
pub async fn check_site_connection(
    ctx: &AppContext,
    site: &Site,
    cancel: &CancellationToken,
) -> Result<(), CoreError> {
    ensure_not_cancelled(cancel)?;
    let client = ctx.clients().for_site(site)?;
    let remote = match site.kind {
        SiteKind::Gateway => cancellable(cancel, client.get_gateway_site()).await?,
        SiteKind::Cloud => cancellable(cancel, client.get_site(&site.id)).await?,
    }
    .map_err(|e| CoreError::remote(site, e))?;

    if remote.id != site.id {
        return Err(CoreError::SiteIdMismatch {
            site: site.name.clone(),
            site_id: site.id.clone(),
            remote_id: remote.id,
        });
    }
    debug!(site_id = %site.id, "site connection ok");
    Ok(())
}

/// Devices of `site`, each carrying a reference back to it.
pub async fn fetch_site_devices(
    ctx: &AppContext,
    site: &Site,
    cancel: &CancellationToken,
) -> Result<Vec<Device>, CoreError> {
    ensure_not_cancelled(cancel)?;
    let client = ctx.clients().for_site(site)?;
    let raw = cancellable(cancel, client.list_site_devices(&site.id))
        .await?
        .map_err(|e| CoreError::remote(site, e))?;
    Ok(raw.into_iter().map(|d| device_on_site(d, site)).collect())
}

/// Fetch the active site's devices and merge them into the cache.
pub async fn refresh_active_site_devices(
    ctx: &AppContext,
    cancel: &CancellationToken,
) -> Result<Vec<Device>, CoreError> {
    let site = ctx.sites().get_active()?.ok_or(CoreError::NoActiveSite)?;
    let devices = fetch_site_devices(ctx, &site, cancel).await?;
    ctx.devices().update_all(devices)?;
    ctx.devices().get_all()
}
