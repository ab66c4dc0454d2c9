// Async HTTP client for the Enapter v3 API.
//
// Cloud base:   https://api.enapter.com/
// Gateway base: http://<gateway>/api/
// Auth:         X-Enapter-Auth-Token header

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{
    AssignBlueprintRequest, BlueprintEnvelope, DeviceEnvelope, DeviceResponse, DevicesEnvelope,
    ErrorResponse, SiteEnvelope, SiteResponse, SitesEnvelope,
};

/// Header carrying the per-site API token.
pub const AUTH_HEADER: &str = "X-Enapter-Auth-Token";

const ZIP_CONTENT_TYPE: &str = "application/zip";

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one Enapter API endpoint (cloud or a single gateway).
///
/// Cheap to clone; the underlying `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, API token, and transport config.
    ///
    /// Injects `X-Enapter-Auth-Token` as a default header on every request.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut token_value =
            HeaderValue::from_str(token.expose_secret()).map_err(|e| Error::InvalidToken {
                message: format!("invalid token header value: {e}"),
            })?;
        token_value.set_sensitive(true);
        headers.insert(AUTH_HEADER, token_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base path ends with `/` so relative joins keep every
    /// segment (`http://gw/api` + `v3/site` = `http://gw/api/v3/site`).
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The normalized base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        content_type: &'static str,
        body: Bytes,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} ({} bytes)", body.len());

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Unauthorized;
        }

        let path = resp.url().path().to_owned();
        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        match status {
            reqwest::StatusCode::FORBIDDEN => Error::Forbidden { message },
            reqwest::StatusCode::NOT_FOUND => Error::NotFound { path },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Sites ────────────────────────────────────────────────────────

    /// List sites visible to the token, optionally filtered by name.
    pub async fn list_sites(&self, name: Option<&str>) -> Result<Vec<SiteResponse>, Error> {
        let env: SitesEnvelope = self
            .get_with_params("v3/sites", &[("name", name.unwrap_or_default())])
            .await?;
        Ok(env.sites)
    }

    /// Fetch one cloud site by id.
    pub async fn get_site(&self, site_id: &str) -> Result<SiteResponse, Error> {
        let env: SiteEnvelope = self.get(&format!("v3/sites/{site_id}")).await?;
        Ok(env.site)
    }

    /// Fetch the site a gateway belongs to (gateway-local endpoint).
    pub async fn get_gateway_site(&self) -> Result<SiteResponse, Error> {
        let env: SiteEnvelope = self.get("v3/site").await?;
        Ok(env.site)
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// List devices on a site, with connectivity expanded.
    ///
    /// A response without a `devices` array yields an empty list.
    pub async fn list_site_devices(&self, site_id: &str) -> Result<Vec<DeviceResponse>, Error> {
        let env: DevicesEnvelope = self
            .get_with_params(
                &format!("v3/sites/{site_id}/devices"),
                &[("expand", "connectivity")],
            )
            .await?;
        Ok(env.devices)
    }

    /// Fetch a single device, with connectivity expanded.
    pub async fn get_device(&self, device_id: &str) -> Result<DeviceResponse, Error> {
        let env: DeviceEnvelope = self
            .get_with_params(
                &format!("v3/devices/{device_id}"),
                &[("expand", "connectivity")],
            )
            .await?;
        Ok(env.device)
    }

    /// Cheap authenticated request used to verify a site's token and
    /// reachability. The body is ignored.
    pub async fn check_connection(&self) -> Result<(), Error> {
        let url = self.url("v3/devices")?;
        debug!("GET {url} (connection check)");

        let resp = self.http.get(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Blueprints ───────────────────────────────────────────────────

    /// Upload a zipped blueprint; returns the new blueprint id.
    pub async fn upload_blueprint(&self, archive: Bytes) -> Result<String, Error> {
        let env: BlueprintEnvelope = self
            .post_bytes("v3/blueprints/upload", ZIP_CONTENT_TYPE, archive)
            .await?;
        Ok(env.blueprint.id)
    }

    /// Assign an uploaded blueprint to a device.
    pub async fn assign_blueprint(&self, device_id: &str, blueprint_id: &str) -> Result<(), Error> {
        self.post_no_response(
            &format!("v3/devices/{device_id}/assign_blueprint"),
            &AssignBlueprintRequest { blueprint_id },
        )
        .await
    }
}
