//! Configuration loading.
//!
//! Settings are merged from three sources, later ones overriding earlier:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file (`campaign-recs.toml` in the working directory, or an
//!    explicit path)
//! 3. Environment variables prefixed `CAMPAIGN_RECS_`, with `__` separating
//!    nested keys (e.g. `CAMPAIGN_RECS_CACHE__TTL_SECS=60`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sources::similarity::USER_EMBEDDING_LIMIT;
use store_client::ClientTimeouts;

pub const ENV_PREFIX: &str = "CAMPAIGN_RECS_";
pub const DEFAULT_CONFIG_FILE: &str = "campaign-recs.toml";

/// Where the three stores live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory stores loaded from `data_dir`
    Local,
    /// Remote store services over gRPC
    Grpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub data_dir: PathBuf,
    pub vector_index_addr: String,
    pub graph_store_addr: String,
    pub analytics_store_addr: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Stored embeddings averaged per user when resolving their vector
    pub user_embedding_limit: usize,
}

impl BackendSettings {
    pub fn timeouts(&self) -> ClientTimeouts {
        ClientTimeouts::from_millis(self.connect_timeout_ms, self.request_timeout_ms)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            data_dir: PathBuf::from("data/campaigns"),
            vector_index_addr: "http://localhost:50061".to_string(),
            graph_store_addr: "http://localhost:50061".to_string(),
            analytics_store_addr: "http://localhost:50061".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
            user_embedding_limit: USER_EMBEDDING_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3_600,
            max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Share one computation between identical concurrent requests
    pub single_flight: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 20,
            single_flight: true,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub cache: CacheSettings,
    pub service: ServiceSettings,
    /// Default `tracing` filter; `RUST_LOG` takes precedence
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            cache: CacheSettings::default(),
            service: ServiceSettings::default(),
            log_filter: "info,server=debug,sources=info,pipeline=info".to_string(),
        }
    }
}

impl Settings {
    /// Merge defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; without one, `campaign-recs.toml` is
    /// used only if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(path)?;
        let settings: Settings = figment.extract().context("Failed to extract configuration")?;
        settings.validate()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                info!("Loading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    info!("Loading configuration from {}", default_path.display());
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.max_top_k == 0 {
            bail!("service.max_top_k must be at least 1");
        }
        if self.service.default_top_k == 0 || self.service.default_top_k > self.service.max_top_k {
            bail!(
                "service.default_top_k must be between 1 and {}, got {}",
                self.service.max_top_k,
                self.service.default_top_k
            );
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs cannot be 0 when the cache is enabled");
        }
        if self.backend.connect_timeout_ms == 0 || self.backend.request_timeout_ms == 0 {
            bail!("backend timeouts must be positive");
        }
        if self.backend.user_embedding_limit == 0 {
            bail!("backend.user_embedding_limit must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend.kind, BackendKind::Local);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(settings.service.default_top_k, 5);
        assert_eq!(settings.service.max_top_k, 20);
        assert!(settings.service.single_flight);
        assert_eq!(settings.backend.user_embedding_limit, 1000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                    [backend]
                    kind = "grpc"
                    vector_index_addr = "http://vectors:50061"

                    [cache]
                    ttl_secs = 60
                "#,
            )?;
            jail.set_env("CAMPAIGN_RECS_CACHE__TTL_SECS", "30");
            jail.set_env("CAMPAIGN_RECS_SERVICE__SINGLE_FLIGHT", "false");
            jail.set_env("CAMPAIGN_RECS_BACKEND__USER_EMBEDDING_LIMIT", "250");

            let settings = Settings::load(None).map_err(|e| e.to_string())?;
            assert_eq!(settings.backend.kind, BackendKind::Grpc);
            assert_eq!(settings.backend.vector_index_addr, "http://vectors:50061");
            // Untouched keys keep their defaults
            assert_eq!(settings.backend.graph_store_addr, "http://localhost:50061");
            assert_eq!(settings.cache.ttl_secs, 30);
            assert!(!settings.service.single_flight);
            assert_eq!(settings.backend.user_embedding_limit, 250);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let result = Settings::load(Some(Path::new("nope.toml")));
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_top_k_bounds_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("CAMPAIGN_RECS_SERVICE__DEFAULT_TOP_K", "25");
            let err = Settings::load(None).unwrap_err();
            assert!(err.to_string().contains("default_top_k"));
            Ok(())
        });
    }

    #[test]
    fn test_zero_embedding_limit_rejected() {
        let mut settings = Settings::default();
        settings.backend.user_embedding_limit = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("user_embedding_limit"));
    }
}
