// ── Background polling ──
//
// A `Poller` is Idle (no task) or Polling (one task on a fixed interval).
// `start()` always stops the previous task first, fetches immediately, then
// ticks. Each tick re-checks the target and goes Idle when it is gone.
// Selection events restart the poller through a watcher task.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::SiteClients;
use crate::convert::device_on_site;
use crate::error::CoreError;
use crate::model::{Device, Site};

use super::devices::{ActiveDeviceService, DevicesOnSiteService};
use super::sites::SitesConnectionsService;

/// Default refresh period for both pollers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// One unit of periodic work.
pub trait PollJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Whether there is anything to poll right now.
    fn has_target(&self) -> bool;

    /// Fetch remote state and merge it. Failures are handled inside.
    fn poll_once(&self) -> impl Future<Output = ()> + Send;
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Poller<J: PollJob> {
    job: Arc<J>,
    interval: Duration,
    root: CancellationToken,
    running: Mutex<Option<Running>>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: PollJob> Poller<J> {
    pub fn new(job: J, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            job: Arc::new(job),
            interval,
            root: CancellationToken::new(),
            running: Mutex::new(None),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Stop any running task, then poll now and on every interval if a
    /// target exists.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = running.take() {
            previous.cancel.cancel();
        }
        if self.root.is_cancelled() {
            return;
        }
        if !self.job.has_target() {
            debug!(poller = self.job.name(), "nothing to poll, staying idle");
            return;
        }

        let cancel = self.root.child_token();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.job),
            self.interval,
            cancel.clone(),
        ));
        debug!(poller = self.job.name(), interval = ?self.interval, "polling started");
        *running = Some(Running { cancel, handle });
    }

    /// Cancel the running task, if any. Does not wait for it.
    pub fn stop(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = running.take() {
            previous.cancel.cancel();
            debug!(poller = self.job.name(), "polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.cancel.is_cancelled() && !r.handle.is_finished())
    }

    /// Restart whenever `rx` yields an event for which `trigger` is true.
    pub fn restart_on<E>(self: &Arc<Self>, mut rx: broadcast::Receiver<E>, trigger: fn(&E) -> bool)
    where
        E: Clone + Send + 'static,
    {
        let poller: Weak<Self> = Arc::downgrade(self);
        let cancel = self.root.clone();
        let name = self.job.name();

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = rx.recv() => event,
                };
                let restart = match event {
                    Ok(event) => trigger(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(poller = name, skipped, "missed selection events, restarting");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if restart {
                    let Some(poller) = poller.upgrade() else { break };
                    poller.start();
                }
            }
        });

        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Cancel everything and wait for the tasks to exit.
    pub async fn shutdown(&self) {
        self.root.cancel();
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let watchers: Vec<_> = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        if let Some(running) = running {
            let _ = running.handle.await;
        }
        for handle in watchers {
            let _ = handle.await;
        }
    }
}

impl<J: PollJob> Drop for Poller<J> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn poll_loop<J: PollJob>(job: Arc<J>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = job.poll_once() => {}
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if !job.has_target() {
                    debug!(poller = job.name(), "target gone, going idle");
                    break;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = job.poll_once() => {}
                }
            }
        }
    }
}

// ── Devices on the active site ───────────────────────────────────────

/// Refreshes the device list of the active site. A failed fetch drops the
/// site's caches and disconnects it.
pub struct DevicesOnSiteJob {
    sites: Arc<SitesConnectionsService>,
    devices: Arc<DevicesOnSiteService>,
    clients: Arc<SiteClients>,
}

impl DevicesOnSiteJob {
    pub fn new(
        sites: Arc<SitesConnectionsService>,
        devices: Arc<DevicesOnSiteService>,
        clients: Arc<SiteClients>,
    ) -> Self {
        Self {
            sites,
            devices,
            clients,
        }
    }

    async fn fetch(&self, site: &Site) -> Result<Vec<Device>, CoreError> {
        let client = self.clients.for_site(site)?;
        let raw = client
            .list_site_devices(&site.id)
            .await
            .map_err(|e| CoreError::remote(site, e))?;
        Ok(raw.into_iter().map(|d| device_on_site(d, site)).collect())
    }

    fn still_active(&self, site: &Site) -> bool {
        matches!(self.sites.get_active(), Ok(Some(current)) if current.id == site.id)
    }

    fn drop_site(&self, site: &Site) {
        if let Err(e) = self.devices.clear() {
            warn!(error = %e, "failed to clear devices");
        }
        if let Err(e) = self.sites.disconnect_by_id(&site.id) {
            warn!(site_id = %site.id, error = %e, "failed to disconnect site");
        }
    }
}

impl PollJob for DevicesOnSiteJob {
    fn name(&self) -> &'static str {
        "devices-on-site"
    }

    fn has_target(&self) -> bool {
        matches!(self.sites.get_active(), Ok(Some(_)))
    }

    async fn poll_once(&self) {
        let site = match self.sites.get_active() {
            Ok(Some(site)) => site,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "devices poll: cannot read active site");
                return;
            }
        };

        let result = self.fetch(&site).await;
        if !self.still_active(&site) {
            debug!(site_id = %site.id, "active site changed during poll, discarding result");
            return;
        }

        match result {
            Ok(devices) => {
                if let Err(e) = self.devices.update_all(devices) {
                    warn!(site_id = %site.id, error = %e, "devices poll: failed to store devices");
                }
            }
            Err(e) => {
                warn!(site_id = %site.id, error = %e, "devices poll failed, disconnecting site");
                self.drop_site(&site);
            }
        }
    }
}

// ── Active device ────────────────────────────────────────────────────

/// Refreshes the selected device. Failures are logged and retried on the
/// next tick.
pub struct ActiveDeviceJob {
    sites: Arc<SitesConnectionsService>,
    active: Arc<ActiveDeviceService>,
    clients: Arc<SiteClients>,
}

impl ActiveDeviceJob {
    pub fn new(
        sites: Arc<SitesConnectionsService>,
        active: Arc<ActiveDeviceService>,
        clients: Arc<SiteClients>,
    ) -> Self {
        Self {
            sites,
            active,
            clients,
        }
    }

    async fn refresh(&self) -> Result<(), CoreError> {
        let Some(device) = self.active.get()? else {
            return Ok(());
        };
        let Some(site) = self.sites.get_active()? else {
            return Ok(());
        };

        let client = self.clients.for_site(&site)?;
        let raw = client
            .get_device(&device.id)
            .await
            .map_err(|e| CoreError::remote(&site, e))?;
        if raw.id != device.id {
            warn!(expected = %device.id, got = %raw.id, "device poll returned another device");
            return Ok(());
        }

        let selected = self.active.get()?.is_some_and(|d| d.id == device.id);
        let same_site = self.sites.get_active()?.is_some_and(|s| s.id == site.id);
        if !selected || !same_site {
            debug!(device_id = %device.id, "selection changed during poll, discarding result");
            return Ok(());
        }

        self.active.update_device(Some(device_on_site(raw, &site)))?;
        Ok(())
    }
}

impl PollJob for ActiveDeviceJob {
    fn name(&self) -> &'static str {
        "active-device"
    }

    fn has_target(&self) -> bool {
        matches!(self.active.get(), Ok(Some(_))) && matches!(self.sites.get_active(), Ok(Some(_)))
    }

    async fn poll_once(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "active device poll failed");
        }
    }
}
