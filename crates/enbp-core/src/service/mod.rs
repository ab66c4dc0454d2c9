// ── Connection & synchronization services ──
//
// Explicitly constructed (see `AppContext`); nothing here is global.

pub mod devices;
pub mod polling;
pub mod sites;

pub use devices::{ActiveDeviceEvent, ActiveDeviceService, DevicesOnSiteService};
pub use polling::{ActiveDeviceJob, DevicesOnSiteJob, PollJob, Poller};
pub use sites::{SiteEvent, SitesConnectionsService};

const EVENT_CHANNEL_SIZE: usize = 64;
