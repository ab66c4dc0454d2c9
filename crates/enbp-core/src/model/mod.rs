// ── Domain model ──

pub mod device;
pub mod site;

pub use device::{ConnectivityStatus, Device};
pub use site::{CLOUD_API_URL, Site, SiteKind, normalize_gateway_address};
