// ── Application context ──
//
// Owns every service. Built once at startup with the stores the host
// provides; tests build one per case over in-memory stores.

use std::sync::Arc;

use crate::client::SiteClients;
use crate::config::CoreConfig;
use crate::packager::BlueprintPackager;
use crate::repository::SiteRepository;
use crate::service::{
    ActiveDeviceEvent, ActiveDeviceJob, ActiveDeviceService, DevicesOnSiteJob,
    DevicesOnSiteService, Poller, SiteEvent, SitesConnectionsService,
};
use crate::source::LocalFs;
use crate::store::{SecretStore, StateStore};

pub struct AppContext {
    config: CoreConfig,
    state: Arc<dyn StateStore>,
    repository: Arc<SiteRepository>,
    devices: Arc<DevicesOnSiteService>,
    sites: Arc<SitesConnectionsService>,
    clients: Arc<SiteClients>,
    packager: BlueprintPackager<LocalFs>,
}

impl AppContext {
    pub fn new(
        config: CoreConfig,
        state: Arc<dyn StateStore>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let repository = Arc::new(SiteRepository::new(Arc::clone(&state), secrets));
        let active = Arc::new(ActiveDeviceService::new(Arc::clone(&state)));
        let devices = Arc::new(DevicesOnSiteService::new(Arc::clone(&state), active));
        let sites = Arc::new(SitesConnectionsService::new(
            Arc::clone(&repository),
            Arc::clone(&devices),
        ));
        let clients = Arc::new(SiteClients::new(
            Arc::clone(&repository),
            config.transport(),
            config.cloud_url.clone(),
        ));

        Self {
            config,
            state,
            repository,
            devices,
            sites,
            clients,
            packager: BlueprintPackager::new(LocalFs),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    pub fn repository(&self) -> &Arc<SiteRepository> {
        &self.repository
    }

    pub fn sites(&self) -> &Arc<SitesConnectionsService> {
        &self.sites
    }

    pub fn devices(&self) -> &Arc<DevicesOnSiteService> {
        &self.devices
    }

    pub fn active_device(&self) -> &Arc<ActiveDeviceService> {
        self.devices.active_device()
    }

    pub fn clients(&self) -> &Arc<SiteClients> {
        &self.clients
    }

    pub fn packager(&self) -> &BlueprintPackager<LocalFs> {
        &self.packager
    }

    /// Start both pollers and wire them to the selection events.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_pollers(&self) -> Pollers {
        let interval = self.config.poll_interval;

        let devices = Poller::new(
            DevicesOnSiteJob::new(
                Arc::clone(&self.sites),
                Arc::clone(&self.devices),
                Arc::clone(&self.clients),
            ),
            interval,
        );
        devices.restart_on(self.sites.subscribe(), |event| {
            matches!(event, SiteEvent::ActiveSiteChanged(_))
        });

        let active_device = Poller::new(
            ActiveDeviceJob::new(
                Arc::clone(&self.sites),
                Arc::clone(self.active_device()),
                Arc::clone(&self.clients),
            ),
            interval,
        );
        active_device.restart_on(self.active_device().subscribe(), |event| {
            matches!(event, ActiveDeviceEvent::Selected(_))
        });

        devices.start();
        active_device.start();
        Pollers {
            devices,
            active_device,
        }
    }
}

/// Handles to the running pollers.
pub struct Pollers {
    pub devices: Arc<Poller<DevicesOnSiteJob>>,
    pub active_device: Arc<Poller<ActiveDeviceJob>>,
}

impl Pollers {
    pub async fn shutdown(&self) {
        self.devices.shutdown().await;
        self.active_device.shutdown().await;
    }
}
