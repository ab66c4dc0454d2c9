// ── Core error types ──
//
// User-facing errors from enbp-core. Consumers never see HTTP status codes
// directly: `CoreError::remote` classifies an `enbp_api::Error` against the
// site it came from, and `From<enbp_api::Error>` covers calls without one.

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::model::{Site, SiteKind};
use crate::packager::PackageError;
use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote errors (site-scoped) ──────────────────────────────────
    #[error("Unauthorized on site {site}. Check the API token. Site ID: {site_id}")]
    Unauthorized { site: String, site_id: String },

    #[error("Site {site} is unreachable: {reason}. Site ID: {site_id}")]
    Unreachable {
        site: String,
        site_id: String,
        reason: String,
    },

    #[error("Site {site} not found. Site ID: {site_id}")]
    SiteNotFound { site: String, site_id: String },

    #[error("Site {site} reports a different ID ({remote_id}). Site ID: {site_id}")]
    SiteIdMismatch {
        site: String,
        site_id: String,
        remote_id: String,
    },

    // ── Remote errors (generic) ──────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    #[error("No active site")]
    NoActiveSite,

    #[error("No active device")]
    NoActiveDevice,

    #[error("Invalid site address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("Site {site_id} is a {actual} site, but a {expected} site was required")]
    SiteTypeMismatch {
        site_id: String,
        expected: SiteKind,
        actual: SiteKind,
    },

    #[error("No API token stored for site {site}")]
    TokenNotFound { site: String },

    // ── Blueprints ───────────────────────────────────────────────────
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("Failed to zip blueprint {manifest}")]
    PackagingFailed { manifest: String },

    #[error(
        "Blueprint {blueprint_id} was uploaded but could not be assigned to device {device_id}: {reason}"
    )]
    AssignFailed {
        blueprint_id: String,
        device_id: String,
        reason: String,
    },

    // ── Infrastructure ───────────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Classify a failed call against `site`, so the message names it.
    pub fn remote(site: &Site, err: enbp_api::Error) -> Self {
        Self::remote_named(&site.name, &site.id, err)
    }

    /// Like [`remote`](Self::remote), for sites not yet persisted.
    pub fn remote_named(name: &str, id: &str, err: enbp_api::Error) -> Self {
        let site = name.to_owned();
        let site_id = id.to_owned();
        match err {
            enbp_api::Error::Unauthorized | enbp_api::Error::Forbidden { .. } => {
                Self::Unauthorized { site, site_id }
            }
            ref e if e.is_not_found() => Self::SiteNotFound { site, site_id },
            ref e if e.is_unreachable() => Self::Unreachable {
                site,
                site_id,
                reason: e.to_string(),
            },
            other => other.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::AuthenticationFailed { .. } | Self::TokenNotFound { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::SiteNotFound { .. }
                | Self::NoActiveSite
                | Self::NoActiveDevice
        )
    }

    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::ConnectionFailed { .. } | Self::SiteIdMismatch { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<enbp_api::Error> for CoreError {
    fn from(err: enbp_api::Error) -> Self {
        match err {
            enbp_api::Error::Unauthorized => Self::AuthenticationFailed {
                message: "API token rejected".into(),
            },
            enbp_api::Error::Forbidden { message } | enbp_api::Error::InvalidToken { message } => {
                Self::AuthenticationFailed { message }
            }
            enbp_api::Error::NotFound { path } => Self::NotFound {
                entity_type: "Resource",
                identifier: path,
            },
            enbp_api::Error::Transport(ref e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            enbp_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            enbp_api::Error::Tls(reason) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            enbp_api::Error::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            enbp_api::Error::Deserialization { message, .. } => Self::Api {
                message: format!("Unexpected response: {message}"),
                status: None,
            },
        }
    }
}
