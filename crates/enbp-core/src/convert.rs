// ── API → domain conversion ──
//
// Bridges raw `enbp_api` responses into domain types. Remote payloads
// never carry the local selection flag; site back-references are attached
// here when the caller knows the owning site.

use chrono::{DateTime, Utc};
use enbp_api::types::DeviceResponse;
use serde_json::Map;

use crate::model::{ConnectivityStatus, Device, Site};

impl From<DeviceResponse> for Device {
    fn from(raw: DeviceResponse) -> Self {
        let connectivity_status = ConnectivityStatus::from_remote(raw.status());
        let updated_at = raw.updated_at.as_deref().and_then(parse_timestamp);

        Self {
            id: raw.id,
            name: raw.name,
            connectivity_status,
            site_id: raw.site_id,
            blueprint_id: raw.blueprint_id,
            slug: raw.slug,
            device_type: raw.device_type,
            authorized_role: raw.authorized_role,
            updated_at,
            is_active: None,
            site: None,
            extra: raw.extra.into_iter().collect::<Map<_, _>>(),
        }
    }
}

/// Convert a device fetched from `site`, attaching the back-reference.
pub fn device_on_site(raw: DeviceResponse, site: &Site) -> Device {
    let mut device = Device::from(raw);
    if device.site_id.is_none() {
        device.site_id = Some(site.id.clone());
    }
    device.site = Some(site.clone());
    device
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| tracing::debug!(value = raw, error = %e, "unparseable device timestamp"))
        .ok()
}
