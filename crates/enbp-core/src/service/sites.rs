// ── Site connections ──
//
// Connect / disconnect / remove over the `SiteRepository`, keeping at most
// one site active. Every mutation is persisted before its event is sent,
// so subscribers re-querying the service observe the new state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::Site;
use crate::repository::SiteRepository;

use super::EVENT_CHANNEL_SIZE;
use super::devices::DevicesOnSiteService;

/// Change notification from [`SitesConnectionsService`].
#[derive(Debug, Clone, PartialEq)]
pub enum SiteEvent {
    /// The stored site list changed.
    SitesChanged,
    /// The active site changed (`None` after a disconnect).
    ActiveSiteChanged(Option<Site>),
}

pub struct SitesConnectionsService {
    repository: Arc<SiteRepository>,
    devices: Arc<DevicesOnSiteService>,
    events: broadcast::Sender<SiteEvent>,
}

impl SitesConnectionsService {
    pub fn new(repository: Arc<SiteRepository>, devices: Arc<DevicesOnSiteService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            repository,
            devices,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SiteEvent> {
        self.events.subscribe()
    }

    pub fn repository(&self) -> &Arc<SiteRepository> {
        &self.repository
    }

    fn emit(&self, event: SiteEvent) {
        debug!(?event, "site event");
        let _ = self.events.send(event);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_all(&self) -> Result<Vec<Site>, CoreError> {
        self.repository.get_all()
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Site>, CoreError> {
        self.repository.get_by_id(id)
    }

    pub fn get_active(&self) -> Result<Option<Site>, CoreError> {
        self.repository.get_active()
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn add(&self, site: Site) -> Result<(), CoreError> {
        self.repository.add(site)?;
        self.emit(SiteEvent::SitesChanged);
        Ok(())
    }

    /// Make `id` the active site.
    ///
    /// No-op (and no event) when it is already active or unknown. Switching
    /// away from another site drops that site's device caches first.
    pub fn connect_by_id(&self, id: &str) -> Result<Option<Site>, CoreError> {
        let Some(target) = self.repository.get_by_id(id)? else {
            debug!(site_id = id, "connect ignored: unknown site");
            return Ok(None);
        };
        if target.is_active {
            return Ok(Some(target));
        }

        if self.repository.get_active()?.is_some() {
            self.devices.clear()?;
        }

        let site = self.repository.activate(id)?;
        info!(site_id = %site.id, site = %site.name, "site connected");
        self.emit(SiteEvent::SitesChanged);
        self.emit(SiteEvent::ActiveSiteChanged(Some(site.clone())));
        Ok(Some(site))
    }

    /// Disconnect `id` if it is the active site, clearing its device caches.
    pub fn disconnect_by_id(&self, id: &str) -> Result<bool, CoreError> {
        if !self.repository.deactivate(id)? {
            return Ok(false);
        }
        info!(site_id = id, "site disconnected");
        self.emit(SiteEvent::SitesChanged);
        self.emit(SiteEvent::ActiveSiteChanged(None));
        self.devices.clear()?;
        Ok(true)
    }

    /// Forget a site (and its gateway token).
    ///
    /// Always emits `SitesChanged`, even when `id` matched nothing.
    pub fn remove_by_id(&self, id: &str) -> Result<Option<Site>, CoreError> {
        let removed = self.repository.remove(id)?;
        self.emit(SiteEvent::SitesChanged);
        if removed.as_ref().is_some_and(|site| site.is_active) {
            self.emit(SiteEvent::ActiveSiteChanged(None));
            self.devices.clear()?;
        }
        Ok(removed)
    }

    /// Forget every site and token.
    pub fn remove_all(&self) -> Result<Vec<Site>, CoreError> {
        let removed = self.repository.remove_all()?;
        self.emit(SiteEvent::SitesChanged);
        if removed.iter().any(|s| s.is_active) {
            self.emit(SiteEvent::ActiveSiteChanged(None));
        }
        self.devices.clear()?;
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Device;
    use crate::service::devices::ActiveDeviceService;
    use crate::store::{MemorySecretStore, MemoryStateStore, StateStore};
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    struct Fixture {
        sites: SitesConnectionsService,
        devices: Arc<DevicesOnSiteService>,
    }

    fn fixture() -> Fixture {
        let state: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let repo = Arc::new(SiteRepository::new(
            state.clone(),
            Arc::new(MemorySecretStore::default()),
        ));
        let active = Arc::new(ActiveDeviceService::new(state.clone()));
        let devices = Arc::new(DevicesOnSiteService::new(state, active));
        Fixture {
            sites: SitesConnectionsService::new(repo, devices.clone()),
            devices,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SiteEvent>) -> Vec<SiteEvent> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => return out,
                Err(e) => panic!("unexpected receive error: {e}"),
            }
        }
    }

    #[test]
    fn connect_twice_emits_once() {
        let f = fixture();
        f.sites.add(Site::cloud("c1", "Plant", false)).unwrap();
        let mut rx = f.sites.subscribe();

        let site = f.sites.connect_by_id("c1").unwrap().unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                SiteEvent::SitesChanged,
                SiteEvent::ActiveSiteChanged(Some(site.clone()))
            ]
        );

        assert_eq!(f.sites.connect_by_id("c1").unwrap(), Some(site));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn connect_unknown_is_noop() {
        let f = fixture();
        let mut rx = f.sites.subscribe();
        assert_eq!(f.sites.connect_by_id("ghost").unwrap(), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn switching_sites_keeps_one_active_and_drops_devices() {
        let f = fixture();
        f.sites.add(Site::cloud("c1", "A", false)).unwrap();
        f.sites.add(Site::gateway("g1", "B", "http://gw", false)).unwrap();
        f.sites.connect_by_id("c1").unwrap();
        f.devices.replace_all(vec![Device::new("d1", "Pump")]).unwrap();
        f.devices.connect_by_id("d1").unwrap();

        f.sites.connect_by_id("g1").unwrap();

        let active: Vec<_> = f
            .sites
            .get_all()
            .unwrap()
            .into_iter()
            .filter(|s| s.is_active)
            .map(|s| s.id)
            .collect();
        assert_eq!(active, vec!["g1".to_owned()]);
        assert!(f.devices.get_all().unwrap().is_empty());
        assert_eq!(f.devices.active_device().get().unwrap(), None);
    }

    #[test]
    fn disconnect_only_acts_on_active_site() {
        let f = fixture();
        f.sites.add(Site::cloud("c1", "A", false)).unwrap();
        f.sites.add(Site::cloud("c2", "B", false)).unwrap();
        f.sites.connect_by_id("c1").unwrap();
        let mut rx = f.sites.subscribe();

        assert!(!f.sites.disconnect_by_id("c2").unwrap());
        assert!(drain(&mut rx).is_empty());

        assert!(f.sites.disconnect_by_id("c1").unwrap());
        assert_eq!(
            drain(&mut rx),
            vec![SiteEvent::SitesChanged, SiteEvent::ActiveSiteChanged(None)]
        );
        assert_eq!(f.sites.get_active().unwrap(), None);
    }

    #[test]
    fn removing_active_site_disconnects() {
        let f = fixture();
        f.sites.add(Site::cloud("c1", "A", false)).unwrap();
        f.sites.connect_by_id("c1").unwrap();
        let mut rx = f.sites.subscribe();

        let removed = f.sites.remove_by_id("c1").unwrap().unwrap();
        assert_eq!(removed.id, "c1");
        assert_eq!(
            drain(&mut rx),
            vec![SiteEvent::SitesChanged, SiteEvent::ActiveSiteChanged(None)]
        );
        assert!(f.sites.get_all().unwrap().is_empty());
    }

    #[test]
    fn removing_unknown_site_still_notifies() {
        let f = fixture();
        f.sites.add(Site::cloud("c1", "A", false)).unwrap();
        f.sites.connect_by_id("c1").unwrap();
        let mut rx = f.sites.subscribe();

        assert_eq!(f.sites.remove_by_id("ghost").unwrap(), None);
        assert_eq!(drain(&mut rx), vec![SiteEvent::SitesChanged]);
        assert_eq!(f.sites.get_active().unwrap().unwrap().id, "c1");
    }
}
