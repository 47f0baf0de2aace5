//! `quill.toml` settings. Every section and field has a default, so an empty
//! file (or no file) is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use quill_image::ImageServiceConfig;
use quill_protocol::{BasicAuth, DEFAULT_PATH};
use quill_server::{RateLimitConfig, ServerConfig};
use quill_store::{DiskEngineConfig, StaticAdminStore};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub server: ServerSection,
    pub store: StoreSection,
    pub image: ImageSection,
    pub admin: AdminSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: SocketAddr,
    pub path: String,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub auth: Option<BasicAuth>,
    pub rate_limit: RateLimitSection,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            path: DEFAULT_PATH.to_string(),
            request_timeout_secs: 5,
            shutdown_timeout_secs: 10,
            auth: None,
            rate_limit: RateLimitSection::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub requests_per_second: f64,
    pub burst: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            requests_per_second: defaults.requests_per_second,
            burst: defaults.burst,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Disk,
    Memory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: Backend,
    pub path: PathBuf,
    pub sites: Vec<String>,
    /// Posts older than this are read-only; 0 disables.
    pub read_only_age_days: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::Disk,
            path: PathBuf::from("var/db"),
            sites: vec!["quill".to_string()],
            read_only_age_days: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSection {
    pub path: PathBuf,
    pub image_api: String,
    pub ttl_secs: u64,
    pub max_size: usize,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ImageSection {
    fn default() -> Self {
        let defaults = ImageServiceConfig::default();
        Self {
            path: PathBuf::from("var/pictures.db"),
            image_api: defaults.image_api,
            ttl_secs: defaults.ttl.as_secs(),
            max_size: defaults.max_size,
            max_width: defaults.max_width,
            max_height: defaults.max_height,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    pub key: String,
    pub admins: Vec<String>,
    pub email: String,
    /// Enabled sites; empty enables all.
    pub sites: Vec<String>,
}

impl QuillConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("can't read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("can't parse config {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn server_config(&self) -> ServerConfig {
        let s = &self.server;
        ServerConfig {
            bind_addr: s.bind_addr,
            path: s.path.clone(),
            auth: s.auth.clone(),
            rate_limit: RateLimitConfig {
                requests_per_second: s.rate_limit.requests_per_second,
                burst: s.rate_limit.burst,
            },
            request_timeout: Duration::from_secs(s.request_timeout_secs),
            shutdown_timeout: Duration::from_secs(s.shutdown_timeout_secs),
        }
    }

    pub fn read_only_age(&self) -> Option<Duration> {
        match self.store.read_only_age_days {
            0 => None,
            days => Some(Duration::from_secs(days * 24 * 60 * 60)),
        }
    }

    pub fn disk_engine_config(&self) -> DiskEngineConfig {
        DiskEngineConfig {
            path: self.store.path.clone(),
            sites: self.store.sites.clone(),
            read_only_age: self.read_only_age(),
        }
    }

    pub fn image_service_config(&self) -> ImageServiceConfig {
        let i = &self.image;
        ImageServiceConfig {
            image_api: i.image_api.clone(),
            ttl: Duration::from_secs(i.ttl_secs),
            max_size: i.max_size,
            max_width: i.max_width,
            max_height: i.max_height,
        }
    }

    pub fn admin_store(&self) -> StaticAdminStore {
        let a = &self.admin;
        StaticAdminStore::new(a.key.clone(), a.admins.clone(), a.email.clone())
            .with_sites(a.sites.iter().cloned())
    }

    /// Endpoint URL clients use to reach the configured server.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}{}", self.server.bind_addr, self.server.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
bind_addr = "0.0.0.0:9000"
path = "/rpc"
request_timeout_secs = 3
[server.auth]
user = "quill"
password = "secret"
[server.rate_limit]
requests_per_second = 20.0
burst = 40

[store]
backend = "memory"
path = "/srv/quill/db"
sites = ["radio-t", "blog"]
read_only_age_days = 30

[image]
ttl_secs = 60

[admin]
key = "k"
admins = ["github_1234"]
email = "admin@example.com"
"#;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = QuillConfig::parse("").unwrap();
        assert_eq!(config, QuillConfig::default());

        let server = config.server_config();
        assert_eq!(server.path, "/v1/rpc");
        assert_eq!(server.request_timeout, Duration::from_secs(5));
        assert_eq!(server.rate_limit, RateLimitConfig::default());
        assert_eq!(config.read_only_age(), None);
        assert_eq!(config.endpoint_url(), "http://127.0.0.1:8090/v1/rpc");
    }

    #[test]
    fn sample_file_maps_to_library_configs() {
        let config = QuillConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.store.backend, Backend::Memory);

        let server = config.server_config();
        assert_eq!(server.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(server.auth, Some(BasicAuth::new("quill", "secret")));
        assert_eq!(server.request_timeout, Duration::from_secs(3));
        assert_eq!(server.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(server.rate_limit.burst, 40);

        let disk = config.disk_engine_config();
        assert_eq!(disk.sites, vec!["radio-t", "blog"]);
        assert_eq!(disk.read_only_age, Some(Duration::from_secs(30 * 86400)));

        let images = config.image_service_config();
        assert_eq!(images.ttl, Duration::from_secs(60));
        assert_eq!(images.max_size, 5_000_000);

        let admin = config.admin_store().record("radio-t");
        assert_eq!(admin.admin_ids, vec!["github_1234"]);
        assert!(admin.enabled);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = QuillConfig::parse("[store]\nbackend = \"mongo\"").unwrap_err();
        assert!(err.to_string().contains("unknown variant"), "{err}");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = QuillConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, QuillConfig::default());
    }
}
