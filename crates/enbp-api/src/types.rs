//! Response and request types for the Enapter v3 HTTP API.
//!
//! Field names are snake_case on the wire. Devices keep unknown fields in
//! `extra` so nothing returned by the server is silently dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Sites ────────────────────────────────────────────────────────────

/// Site summary, from `GET /v3/sites`, `GET /v3/sites/{id}` and the
/// gateway-local `GET /v3/site`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteEnvelope {
    pub site: SiteResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SitesEnvelope {
    #[serde(default)]
    pub sites: Vec<SiteResponse>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Nested connectivity block returned with `?expand=connectivity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectivity {
    #[serde(default)]
    pub status: Option<String>,
}

/// Device record as returned by the device endpoints.
///
/// Older gateways report a flat `connectivity_status`; newer ones nest it
/// under `connectivity.status`. Both are kept; callers prefer the nested one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub blueprint_id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub authorized_role: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub connectivity: Option<Connectivity>,
    #[serde(default)]
    pub connectivity_status: Option<String>,
    /// Catch-all for additional fields not modeled above.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DeviceResponse {
    /// Connectivity status from whichever shape the server sent.
    pub fn status(&self) -> Option<&str> {
        self.connectivity
            .as_ref()
            .and_then(|c| c.status.as_deref())
            .or(self.connectivity_status.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesEnvelope {
    #[serde(default)]
    pub devices: Vec<DeviceResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceEnvelope {
    pub device: DeviceResponse,
}

// ── Blueprints ───────────────────────────────────────────────────────

/// Blueprint reference returned by `POST /v3/blueprints/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlueprintEnvelope {
    pub blueprint: BlueprintRef,
}

/// Body of `POST /v3/devices/{id}/assign_blueprint`.
#[derive(Debug, Serialize)]
pub(crate) struct AssignBlueprintRequest<'a> {
    pub blueprint_id: &'a str,
}

// ── Errors ───────────────────────────────────────────────────────────

/// Error body shape. The API returns `{"errors": [{"message": ...}]}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorItem {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn into_message(self) -> Option<String> {
        self.errors
            .into_iter()
            .find_map(|e| e.message)
            .or(self.message)
    }
}
