// ── Blueprint packaging & upload ──

use std::path::PathBuf;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::CoreError;
use crate::manifest::{self, Manifest};
use crate::model::{Device, Site};

use super::{cancellable, ensure_not_cancelled};

/// A loaded manifest and the archive built from it.
#[derive(Debug, Clone)]
pub struct PackagedBlueprint {
    pub manifest: Manifest,
    pub archive: Vec<u8>,
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub blueprint_id: String,
    pub device: Device,
    pub site: Site,
    pub archive_size: usize,
}

/// Load `manifest_path` and package it.
///
/// A missing archive becomes [`CoreError::PackagingFailed`]. On success
/// the manifest is remembered as the most recent one.
pub async fn package_blueprint(
    ctx: &AppContext,
    manifest_path: impl Into<PathBuf>,
) -> Result<PackagedBlueprint, CoreError> {
    let mut manifest = Manifest::new(manifest_path);
    manifest.load(ctx.packager().source()).await?;

    let Some(archive) = ctx.packager().zip(&manifest).await? else {
        return Err(CoreError::PackagingFailed {
            manifest: manifest.path().display().to_string(),
        });
    };

    if let Err(e) = manifest::remember_recent(&**ctx.state(), &manifest) {
        warn!(error = %e, "failed to remember recent manifest");
    }
    Ok(PackagedBlueprint { manifest, archive })
}

/// The site `device` belongs to: its back-reference, its stored site, or
/// the active site, in that order.
fn site_for_device(ctx: &AppContext, device: &Device) -> Result<Site, CoreError> {
    if let Some(site) = &device.site {
        return Ok(site.clone());
    }
    if let Some(site_id) = &device.site_id {
        if let Some(site) = ctx.sites().get_by_id(site_id)? {
            return Ok(site);
        }
    }
    ctx.sites().get_active()?.ok_or(CoreError::NoActiveSite)
}

/// Package the blueprint at `manifest_path`, upload it and assign it to
/// `device`.
///
/// Cancellation is honoured before each network call. An assignment
/// failure after a successful upload is reported as
/// [`CoreError::AssignFailed`] and is not retried.
pub async fn upload_blueprint(
    ctx: &AppContext,
    manifest_path: impl Into<PathBuf>,
    device: &Device,
    cancel: &CancellationToken,
) -> Result<UploadOutcome, CoreError> {
    let packaged = package_blueprint(ctx, manifest_path).await?;
    let site = site_for_device(ctx, device)?;
    let client = ctx.clients().for_site(&site)?;
    let archive_size = packaged.archive.len();

    ensure_not_cancelled(cancel)?;
    let blueprint_id = cancellable(cancel, client.upload_blueprint(Bytes::from(packaged.archive)))
        .await?
        .map_err(|e| CoreError::remote(&site, e))?;
    info!(blueprint_id = %blueprint_id, bytes = archive_size, site_id = %site.id, "blueprint uploaded");

    if cancel.is_cancelled() {
        warn!(blueprint_id = %blueprint_id, device_id = %device.id, "cancelled before assignment");
        return Err(CoreError::Cancelled);
    }
    cancellable(cancel, client.assign_blueprint(&device.id, &blueprint_id))
        .await?
        .map_err(|e| CoreError::AssignFailed {
            blueprint_id: blueprint_id.clone(),
            device_id: device.id.clone(),
            reason: CoreError::remote(&site, e).to_string(),
        })?;
    info!(blueprint_id = %blueprint_id, device_id = %device.id, "blueprint assigned");

    Ok(UploadOutcome {
        blueprint_id,
        device: device.clone(),
        site,
        archive_size,
    })
}

/// [`upload_blueprint`] targeting the selected device.
pub async fn upload_blueprint_to_active_device(
    ctx: &AppContext,
    manifest_path: impl Into<PathBuf>,
    cancel: &CancellationToken,
) -> Result<UploadOutcome, CoreError> {
    let device = ctx
        .devices()
        .active_device()
        .get()?
        .ok_or(CoreError::NoActiveDevice)?;
    upload_blueprint(ctx, manifest_path, &device, cancel).await
}
