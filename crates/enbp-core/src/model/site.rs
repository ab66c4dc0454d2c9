// ── Site domain type ──

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed address of the Enapter Cloud API.
pub const CLOUD_API_URL: &str = "https://api.enapter.com";

/// Hosts that are cloud staging stacks; their addresses are kept verbatim.
const STAGING_HOST_MARKER: &str = "stagings.enapter";

/// Site type discriminant, serialized as `"cloud"` / `"gateway"`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SiteKind {
    Cloud,
    Gateway,
}

/// A remote endpoint that owns devices.
///
/// Immutable value: changing the active flag yields a new instance via
/// [`Site::with_is_active`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SiteKind,
    pub name: String,
    pub address: String,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
}

impl Site {
    /// A cloud site. The address is always [`CLOUD_API_URL`].
    pub fn cloud(id: impl Into<String>, name: impl Into<String>, is_active: bool) -> Self {
        Self {
            id: id.into(),
            kind: SiteKind::Cloud,
            name: name.into(),
            address: CLOUD_API_URL.into(),
            is_active,
        }
    }

    /// A gateway site. The address is normalized to end in `/api`.
    pub fn gateway(
        id: impl Into<String>,
        name: impl Into<String>,
        address: &str,
        is_active: bool,
    ) -> Self {
        Self {
            id: id.into(),
            kind: SiteKind::Gateway,
            name: name.into(),
            address: normalize_gateway_address(address),
            is_active,
        }
    }

    pub fn with_is_active(&self, is_active: bool) -> Self {
        Self {
            is_active,
            ..self.clone()
        }
    }

    pub fn is_cloud(&self) -> bool {
        self.kind == SiteKind::Cloud
    }

    pub fn is_gateway(&self) -> bool {
        self.kind == SiteKind::Gateway
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn to_json(&self) -> String {
        // A struct of strings and a bool always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a persisted site. Malformed input or an unknown `type`
    /// yields `None` and a warning; this never fails the caller.
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(raw) {
            Ok(site) if site.is_cloud() => Some(Self::cloud(site.id, site.name, site.is_active)),
            Ok(site) => Some(site),
            Err(e) => {
                warn!(error = %e, "failed to deserialize stored site");
                None
            }
        }
    }
}

/// Append the `/api` segment gateways serve the v3 API under.
///
/// Staging hosts are left untouched, as are addresses that already end
/// in `/api`.
pub fn normalize_gateway_address(address: &str) -> String {
    if address.contains(STAGING_HOST_MARKER) || address.ends_with("/api") {
        address.to_owned()
    } else if address.ends_with('/') {
        format!("{address}api")
    } else {
        format!("{address}/api")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gateway_address_normalization() {
        assert_eq!(
            normalize_gateway_address("http://example.com"),
            "http://example.com/api"
        );
        assert_eq!(
            normalize_gateway_address("http://example.com/"),
            "http://example.com/api"
        );
        assert_eq!(
            normalize_gateway_address("http://example.com/api"),
            "http://example.com/api"
        );
        assert_eq!(
            normalize_gateway_address("https://gw.stagings.enapter.com"),
            "https://gw.stagings.enapter.com"
        );
        assert_eq!(
            normalize_gateway_address("https://gw.stagings.enapter.com/"),
            "https://gw.stagings.enapter.com/"
        );
    }

    #[test]
    fn gateway_constructor_normalizes() {
        let site = Site::gateway("g1", "Lab", "http://192.168.1.5", false);
        assert_eq!(site.address, "http://192.168.1.5/api");
        assert!(site.is_gateway());
    }

    #[test]
    fn with_is_active_returns_new_value() {
        let site = Site::cloud("c1", "Plant", false);
        let active = site.with_is_active(true);
        assert!(!site.is_active);
        assert!(active.is_active);
        assert_eq!(active.id, site.id);
    }

    #[test]
    fn json_shape() {
        let site = Site::gateway("g1", "Lab", "http://gw", true);
        let value: serde_json::Value = serde_json::from_str(&site.to_json()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "g1",
                "type": "gateway",
                "name": "Lab",
                "address": "http://gw/api",
                "isActive": true
            })
        );
        assert_eq!(Site::from_json(&site.to_json()), Some(site));
    }

    #[test]
    fn cloud_address_is_fixed_on_decode() {
        let raw = r#"{"id":"c1","type":"cloud","name":"P","address":"http://evil","isActive":false}"#;
        let site = Site::from_json(raw).unwrap();
        assert_eq!(site.address, CLOUD_API_URL);
    }

    #[test]
    fn from_json_never_fails() {
        assert_eq!(Site::from_json("not json"), None);
        assert_eq!(Site::from_json("{}"), None);
        assert_eq!(
            Site::from_json(r#"{"id":"x","type":"satellite","name":"n","address":"a"}"#),
            None
        );
        assert_eq!(Site::from_json("null"), None);
    }
}
