// ── Client-for-site resolution ──

use std::sync::Arc;

use enbp_api::{ApiClient, TransportConfig};

use crate::error::CoreError;
use crate::model::{Site, SiteKind};
use crate::repository::SiteRepository;

/// Builds an authenticated [`ApiClient`] for a stored site.
///
/// Cloud sites talk to the configured cloud URL (the stored address is the
/// production constant); gateway sites talk to their own address.
pub struct SiteClients {
    repository: Arc<SiteRepository>,
    transport: TransportConfig,
    cloud_url: String,
}

impl SiteClients {
    pub fn new(
        repository: Arc<SiteRepository>,
        transport: TransportConfig,
        cloud_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            transport,
            cloud_url: cloud_url.into(),
        }
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn cloud_url(&self) -> &str {
        &self.cloud_url
    }

    /// Base URL requests for `site` go to.
    pub fn base_url_for<'a>(&'a self, site: &'a Site) -> &'a str {
        match site.kind {
            SiteKind::Cloud => &self.cloud_url,
            SiteKind::Gateway => &site.address,
        }
    }

    /// Client authenticated with the token stored for `site`.
    pub fn for_site(&self, site: &Site) -> Result<ApiClient, CoreError> {
        let token = self.repository.api_token_for(site)?;
        Ok(ApiClient::new(
            self.base_url_for(site),
            &token,
            &self.transport,
        )?)
    }
}
