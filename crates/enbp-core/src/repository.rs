// ── Site repository ──
//
// Persists the known sites as an array of JSON strings and the credentials
// in the secret store. The cloud token is shared by every cloud site;
// gateway tokens are keyed by site id.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Site, SiteKind};
use crate::store::{self, SecretStore, StateStore};

pub const SITES_KEY: &str = "Enapter.Storage.Sites.Connections";
pub const CLOUD_TOKEN_KEY: &str = "enapter.secrets.cloudApiToken";
const GATEWAY_TOKEN_PREFIX: &str = "enapter.secrets.gatewaysApiTokens";

pub fn gateway_token_key(site_id: &str) -> String {
    format!("{GATEWAY_TOKEN_PREFIX}.{site_id}")
}

pub struct SiteRepository {
    state: Arc<dyn StateStore>,
    secrets: Arc<dyn SecretStore>,
}

impl SiteRepository {
    pub fn new(state: Arc<dyn StateStore>, secrets: Arc<dyn SecretStore>) -> Self {
        Self { state, secrets }
    }

    // ── Site list ────────────────────────────────────────────────────

    /// Stored order; unreadable entries are dropped with a warning.
    fn load(&self) -> Result<Vec<Site>, CoreError> {
        let raw: Vec<String> = store::get_json(&*self.state, SITES_KEY)?.unwrap_or_default();
        Ok(raw.iter().filter_map(|s| Site::from_json(s)).collect())
    }

    fn save(&self, sites: &[Site]) -> Result<(), CoreError> {
        let raw: Vec<String> = sites.iter().map(Site::to_json).collect();
        store::set_json(&*self.state, SITES_KEY, &raw)?;
        Ok(())
    }

    /// All sites: cloud before gateway, then by name.
    pub fn get_all(&self) -> Result<Vec<Site>, CoreError> {
        let mut sites = self.load()?;
        sites.sort_by(|a, b| {
            a.is_gateway()
                .cmp(&b.is_gateway())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(sites)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Site>, CoreError> {
        Ok(self.load()?.into_iter().find(|s| s.id == id))
    }

    pub fn get_active(&self) -> Result<Option<Site>, CoreError> {
        Ok(self.load()?.into_iter().find(|s| s.is_active))
    }

    /// Append a site. A site with the same id is replaced in place.
    pub fn add(&self, site: Site) -> Result<(), CoreError> {
        let mut sites = self.load()?;
        if let Some(existing) = sites.iter_mut().find(|s| s.id == site.id) {
            debug!(site_id = %site.id, "replacing stored site");
            *existing = site;
        } else {
            sites.push(site);
        }
        self.save(&sites)
    }

    /// Remove a site and its gateway token. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Result<Option<Site>, CoreError> {
        let mut sites = self.load()?;
        let Some(pos) = sites.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = sites.remove(pos);
        self.save(&sites)?;
        if removed.is_gateway() {
            self.secrets.delete(&gateway_token_key(&removed.id))?;
        }
        Ok(Some(removed))
    }

    /// Remove every site and every stored token.
    pub fn remove_all(&self) -> Result<Vec<Site>, CoreError> {
        let sites = self.load()?;
        self.save(&[])?;
        for site in sites.iter().filter(|s| s.is_gateway()) {
            self.secrets.delete(&gateway_token_key(&site.id))?;
        }
        self.secrets.delete(CLOUD_TOKEN_KEY)?;
        Ok(sites)
    }

    /// Mark `id` active and every other site inactive.
    pub fn activate(&self, id: &str) -> Result<Site, CoreError> {
        let sites: Vec<Site> = self
            .load()?
            .iter()
            .map(|s| s.with_is_active(s.id == id))
            .collect();
        self.save(&sites)?;
        sites
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "Site",
                identifier: id.into(),
            })
    }

    /// Clear the active flag on `id`. Returns `false` if it was not active.
    pub fn deactivate(&self, id: &str) -> Result<bool, CoreError> {
        let mut sites = self.load()?;
        let Some(site) = sites.iter_mut().find(|s| s.id == id && s.is_active) else {
            return Ok(false);
        };
        *site = site.with_is_active(false);
        self.save(&sites)?;
        Ok(true)
    }

    // ── Credentials ──────────────────────────────────────────────────

    pub fn cloud_token(&self) -> Result<Option<SecretString>, CoreError> {
        Ok(self.secrets.get(CLOUD_TOKEN_KEY)?)
    }

    pub fn set_cloud_token(&self, token: &SecretString) -> Result<(), CoreError> {
        Ok(self.secrets.set(CLOUD_TOKEN_KEY, token)?)
    }

    pub fn delete_cloud_token(&self) -> Result<(), CoreError> {
        Ok(self.secrets.delete(CLOUD_TOKEN_KEY)?)
    }

    pub fn is_cloud_token_set(&self) -> Result<bool, CoreError> {
        Ok(self.cloud_token()?.is_some())
    }

    pub fn gateway_token(&self, site: &Site) -> Result<Option<SecretString>, CoreError> {
        require_kind(site, SiteKind::Gateway)?;
        Ok(self.secrets.get(&gateway_token_key(&site.id))?)
    }

    pub fn set_gateway_token(&self, site: &Site, token: &SecretString) -> Result<(), CoreError> {
        require_kind(site, SiteKind::Gateway)?;
        Ok(self.secrets.set(&gateway_token_key(&site.id), token)?)
    }

    pub fn delete_gateway_token(&self, site: &Site) -> Result<(), CoreError> {
        require_kind(site, SiteKind::Gateway)?;
        Ok(self.secrets.delete(&gateway_token_key(&site.id))?)
    }

    /// The cloud token, requested on behalf of `site`.
    pub fn cloud_token_for(&self, site: &Site) -> Result<Option<SecretString>, CoreError> {
        require_kind(site, SiteKind::Cloud)?;
        self.cloud_token()
    }

    /// Whichever token authenticates `site`.
    pub fn api_token_for(&self, site: &Site) -> Result<SecretString, CoreError> {
        let token = match site.kind {
            SiteKind::Cloud => self.cloud_token_for(site)?,
            SiteKind::Gateway => self.gateway_token(site)?,
        };
        token.ok_or_else(|| CoreError::TokenNotFound {
            site: site.name.clone(),
        })
    }
}

fn require_kind(site: &Site, expected: SiteKind) -> Result<(), CoreError> {
    if site.kind == expected {
        Ok(())
    } else {
        Err(CoreError::SiteTypeMismatch {
            site_id: site.id.clone(),
            expected,
            actual: site.kind,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemorySecretStore, MemoryStateStore};
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn repo() -> (SiteRepository, Arc<MemoryStateStore>, Arc<MemorySecretStore>) {
        let state = Arc::new(MemoryStateStore::default());
        let secrets = Arc::new(MemorySecretStore::default());
        let repo = SiteRepository::new(state.clone(), secrets.clone());
        (repo, state, secrets)
    }

    fn token(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn get_all_sorts_cloud_first_then_by_name() {
        let (repo, _, _) = repo();
        repo.add(Site::gateway("g2", "Beta", "http://b", false)).unwrap();
        repo.add(Site::cloud("c2", "Zulu", false)).unwrap();
        repo.add(Site::gateway("g1", "Alpha", "http://a", false)).unwrap();
        repo.add(Site::cloud("c1", "Mike", false)).unwrap();

        let names: Vec<_> = repo.get_all().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Mike", "Zulu", "Alpha", "Beta"]);
    }

    #[test]
    fn activate_leaves_exactly_one_active() {
        let (repo, _, _) = repo();
        repo.add(Site::cloud("c1", "A", true)).unwrap();
        repo.add(Site::gateway("g1", "B", "http://b", false)).unwrap();
        repo.add(Site::gateway("g2", "C", "http://c", true)).unwrap();

        for id in ["g1", "c1", "g2", "g2"] {
            let site = repo.activate(id).unwrap();
            assert!(site.is_active);
            let active: Vec<_> = repo
                .get_all()
                .unwrap()
                .into_iter()
                .filter(|s| s.is_active)
                .map(|s| s.id)
                .collect();
            assert_eq!(active, vec![id.to_owned()]);
        }
    }

    #[test]
    fn activate_unknown_id_is_not_found() {
        let (repo, _, _) = repo();
        repo.add(Site::cloud("c1", "A", true)).unwrap();
        let err = repo.activate("nope").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity_type: "Site", .. }));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let (repo, _, _) = repo();
        repo.add(Site::cloud("c1", "A", false)).unwrap();
        assert_eq!(repo.remove("zzz").unwrap(), None);
        assert_eq!(repo.get_all().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_entries_are_skipped() {
        let (repo, state, _) = repo();
        let good = Site::cloud("c1", "A", false);
        state
            .set(
                SITES_KEY,
                serde_json::json!([good.to_json(), "{broken", r#"{"type":"moon"}"#]),
            )
            .unwrap();
        assert_eq!(repo.get_all().unwrap(), vec![good]);
    }

    #[test]
    fn tokens_are_scoped_by_site_type() {
        let (repo, _, secrets) = repo();
        let cloud = Site::cloud("c1", "Cloud", false);
        let gw = Site::gateway("g1", "Gw", "http://gw", false);

        assert!(matches!(
            repo.gateway_token(&cloud),
            Err(CoreError::SiteTypeMismatch { .. })
        ));
        assert!(matches!(
            repo.set_gateway_token(&cloud, &token("x")),
            Err(CoreError::SiteTypeMismatch { .. })
        ));
        assert!(matches!(
            repo.cloud_token_for(&gw),
            Err(CoreError::SiteTypeMismatch { .. })
        ));

        repo.set_gateway_token(&gw, &token("gw-secret")).unwrap();
        repo.set_cloud_token(&token("cloud-secret")).unwrap();
        assert_eq!(
            secrets.keys(),
            vec![
                "enapter.secrets.cloudApiToken".to_owned(),
                "enapter.secrets.gatewaysApiTokens.g1".to_owned(),
            ]
        );
        assert_eq!(repo.api_token_for(&gw).unwrap().expose_secret(), "gw-secret");
        assert_eq!(repo.api_token_for(&cloud).unwrap().expose_secret(), "cloud-secret");
    }

    #[test]
    fn missing_token_is_reported() {
        let (repo, _, _) = repo();
        let gw = Site::gateway("g1", "Gw", "http://gw", false);
        assert!(matches!(
            repo.api_token_for(&gw),
            Err(CoreError::TokenNotFound { .. })
        ));
    }

    #[test]
    fn removing_gateway_drops_its_token() {
        let (repo, _, secrets) = repo();
        let gw = Site::gateway("g1", "Gw", "http://gw", false);
        repo.add(gw.clone()).unwrap();
        repo.set_gateway_token(&gw, &token("t")).unwrap();

        repo.remove("g1").unwrap();
        assert!(secrets.keys().is_empty());
    }
}
