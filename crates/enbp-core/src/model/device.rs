// ── Device domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::site::Site;

/// Device connectivity as last reported by the site.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectivityStatus {
    Online,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ConnectivityStatus {
    pub fn from_remote(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("online") => Self::Online,
            Some("offline") => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// A device on a site.
///
/// Optional fields model "known / not known": a poll result that omits a
/// field leaves the locally known value in place when merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connectivity_status: ConnectivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Local selection flag; never sent by the remote.
    #[serde(rename = "isActive", default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Client-side back-reference to the owning site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
    /// Fields not modeled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connectivity_status: ConnectivityStatus::Unknown,
            site_id: None,
            blueprint_id: None,
            slug: None,
            device_type: None,
            authorized_role: None,
            updated_at: None,
            is_active: None,
            site: None,
            extra: Map::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(false)
    }

    pub fn is_online(&self) -> bool {
        self.connectivity_status == ConnectivityStatus::Online
    }

    pub fn with_is_active(&self, is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..self.clone()
        }
    }

    /// Overlay `candidate` onto `self`. Fields the candidate carries win;
    /// fields it leaves unset keep their current value.
    pub fn merged_with(&self, candidate: &Self) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(candidate.extra.clone());

        Self {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            connectivity_status: candidate.connectivity_status,
            site_id: candidate.site_id.clone().or_else(|| self.site_id.clone()),
            blueprint_id: candidate
                .blueprint_id
                .clone()
                .or_else(|| self.blueprint_id.clone()),
            slug: candidate.slug.clone().or_else(|| self.slug.clone()),
            device_type: candidate
                .device_type
                .clone()
                .or_else(|| self.device_type.clone()),
            authorized_role: candidate
                .authorized_role
                .clone()
                .or_else(|| self.authorized_role.clone()),
            updated_at: candidate.updated_at.or(self.updated_at),
            is_active: candidate.is_active.or(self.is_active),
            site: candidate.site.clone().or_else(|| self.site.clone()),
            extra,
        }
    }
}
