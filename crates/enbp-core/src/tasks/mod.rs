// ── User-facing workflows ──
//
// Multi-step operations driven by the CLI. Each takes a
// `CancellationToken`; once it fires no further network call is issued
// and registered compensating actions undo partial writes.

pub mod connect;
pub mod upload;

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;

pub use connect::{
    check_site_connection, connect_cloud_site, connect_gateway_site, fetch_site_devices,
    list_cloud_sites, refresh_active_site_devices,
};
pub use upload::{
    PackagedBlueprint, UploadOutcome, package_blueprint, upload_blueprint,
    upload_blueprint_to_active_device,
};

/// Await `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, CoreError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Cancelled),
        out = fut => Ok(out),
    }
}

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), CoreError> {
    if cancel.is_cancelled() {
        Err(CoreError::Cancelled)
    } else {
        Ok(())
    }
}

type Compensation = Box<dyn FnOnce() -> Result<(), CoreError> + Send>;

/// Compensating actions for a workflow in progress.
///
/// Dropped without [`commit`](Self::commit), the actions run in reverse
/// registration order. This covers early `?` returns as well as a dropped
/// future.
#[derive(Default)]
pub(crate) struct Rollback {
    actions: Vec<(&'static str, Compensation)>,
}

impl Rollback {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        label: &'static str,
        action: impl FnOnce() -> Result<(), CoreError> + Send + 'static,
    ) {
        self.actions.push((label, Box::new(action)));
    }

    pub(crate) fn commit(mut self) {
        self.actions.clear();
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        while let Some((label, action)) = self.actions.pop() {
            match action() {
                Ok(()) => debug!(action = label, "rolled back"),
                Err(e) => warn!(action = label, error = %e, "rollback failed"),
            }
        }
    }
}
