use std::collections::BTreeSet;

use quill_types::{AdminRecord, EventKind};

use crate::error::EngineResult;

/// Per-site administrator directory.
pub trait AdminStore: Send + Sync {
    /// Shared secret of the site.
    fn key(&self, site_id: &str) -> EngineResult<String>;

    /// Ids of the site's administrators.
    fn admins(&self, site_id: &str) -> EngineResult<Vec<String>>;

    /// Email of the site's administrator.
    fn email(&self, site_id: &str) -> EngineResult<String>;

    /// Whether the site accepts comments.
    fn enabled(&self, site_id: &str) -> EngineResult<bool>;

    /// Notification of a comment lifecycle event.
    fn on_event(&self, site_id: &str, event: EventKind) -> EngineResult<()>;
}

/// Admin directory with the same settings for every site.
///
/// An empty site allow-list enables every site.
#[derive(Clone, Debug, Default)]
pub struct StaticAdminStore {
    key: String,
    admins: Vec<String>,
    email: String,
    sites: BTreeSet<String>,
}

impl StaticAdminStore {
    pub fn new(key: impl Into<String>, admins: Vec<String>, email: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            admins,
            email: email.into(),
            sites: BTreeSet::new(),
        }
    }

    /// Restrict the enabled sites to `sites`.
    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    /// Full record of a site.
    pub fn record(&self, site_id: &str) -> AdminRecord {
        AdminRecord {
            site_id: site_id.to_string(),
            admin_ids: self.admins.clone(),
            email: self.email.clone(),
            enabled: self.is_enabled(site_id),
            key: self.key.clone(),
        }
    }

    fn is_enabled(&self, site_id: &str) -> bool {
        self.sites.is_empty() || self.sites.contains(site_id)
    }
}

impl AdminStore for StaticAdminStore {
    fn key(&self, _site_id: &str) -> EngineResult<String> {
        Ok(self.key.clone())
    }

    fn admins(&self, _site_id: &str) -> EngineResult<Vec<String>> {
        Ok(self.admins.clone())
    }

    fn email(&self, _site_id: &str) -> EngineResult<String> {
        Ok(self.email.clone())
    }

    fn enabled(&self, site_id: &str) -> EngineResult<bool> {
        Ok(self.is_enabled(site_id))
    }

    fn on_event(&self, site_id: &str, event: EventKind) -> EngineResult<()> {
        tracing::debug!(site = %site_id, %event, "admin event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_store_answers_for_every_site() {
        let store = StaticAdminStore::new("secret", vec!["a1".into(), "a2".into()], "admin@example.com");
        assert_eq!(store.key("any").unwrap(), "secret");
        assert_eq!(store.admins("other").unwrap(), vec!["a1", "a2"]);
        assert_eq!(store.email("any").unwrap(), "admin@example.com");
        assert!(store.enabled("whatever").unwrap());
        store.on_event("any", EventKind::Vote).unwrap();
    }

    #[test]
    fn allow_list_limits_enabled_sites() {
        let store = StaticAdminStore::new("k", vec![], "").with_sites(["radio-t"]);
        assert!(store.enabled("radio-t").unwrap());
        assert!(!store.enabled("blog").unwrap());

        let record = store.record("blog");
        assert_eq!(record.site_id, "blog");
        assert!(!record.enabled);
        assert_eq!(record.key, "k");
    }
}
