// ── Runtime configuration ──
//
// Describes how to reach sites and how often to poll. The CLI builds a
// `CoreConfig` from its config file; core never reads files itself.

use std::path::PathBuf;
use std::time::Duration;

use enbp_api::{TlsMode, TransportConfig};

use crate::model::CLOUD_API_URL;
use crate::service::polling::DEFAULT_POLL_INTERVAL;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Gateways ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL for cloud sites.
    pub cloud_url: String,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Refresh period of the device pollers.
    pub poll_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cloud_url: CLOUD_API_URL.into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CoreConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
