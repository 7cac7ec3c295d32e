use crate::api::{ClientConfig, RetryPolicy};
use crate::sync::DEFAULT_PAGE_SIZE;
use crate::workspace::Owner;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "CATALOG_API_BASE_URL";
pub const ENV_AUDIENCE_SCOPE: &str = "CATALOG_AUDIENCE_SCOPE";

pub const AUDIENCE_SCOPES: [&str; 3] = ["public", "partner", "enterprise"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CatalogConfig {
    pub database: Option<String>,
    pub api_base_url: Option<String>,
    pub audience_scope: Option<String>,
    pub tenant_mode: Option<String>,
    pub page_size: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub base_backoff_ms: Option<u64>,
    /// Default owner for workspace commands
    pub user_id: Option<String>,
    pub org_id: Option<String>,
}

impl CatalogConfig {
    /// Apply `CATALOG_*` overrides from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(scope) = lookup(ENV_AUDIENCE_SCOPE).filter(|v| !v.trim().is_empty()) {
            self.audience_scope = Some(scope);
        }
    }

    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(scope) = &self.audience_scope {
            if !AUDIENCE_SCOPES.contains(&scope.as_str()) {
                anyhow::bail!(
                    "invalid audience_scope '{}' (expected one of {})",
                    scope,
                    AUDIENCE_SCOPES.join(", ")
                );
            }
        }
        if self.page_size == Some(0) {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.max_attempts == Some(0) {
            anyhow::bail!("max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn database_path(&self, base: &Path) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn owner(&self) -> Option<Owner> {
        let user = self.user_id.as_ref().filter(|u| !u.trim().is_empty())?;
        let owner = Owner::user(user.clone());
        Some(match &self.org_id {
            Some(org) => owner.with_org(org.clone()),
            None => owner,
        })
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        let mut retry = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts {
            retry = retry.with_max_attempts(attempts);
        }
        if let Some(ms) = self.base_backoff_ms {
            retry = retry.with_base_backoff_ms(ms);
        }
        ClientConfig {
            base_url: self.api_base_url.clone().unwrap_or(defaults.base_url),
            tenant_mode: self.tenant_mode.clone().unwrap_or(defaults.tenant_mode),
            audience_scope: self.audience_scope.clone().unwrap_or(defaults.audience_scope),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            retry,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("catalog-cache.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".catalog-cache").join("catalog.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CatalogConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CatalogConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CatalogConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog-cache.toml");
        let config = CatalogConfig {
            api_base_url: Some("https://catalog.test".into()),
            page_size: Some(250),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.page_size(), 250);
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_BASE_URL, "https://override.test"),
            (ENV_AUDIENCE_SCOPE, ""),
        ]);
        let mut config = CatalogConfig {
            api_base_url: Some("https://file.test".into()),
            audience_scope: Some("partner".into()),
            ..Default::default()
        };
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url.as_deref(), Some("https://override.test"));
        assert_eq!(config.audience_scope.as_deref(), Some("partner"));
    }

    #[test]
    fn test_client_config_defaults_and_overrides() {
        let config = CatalogConfig {
            audience_scope: Some("enterprise".into()),
            request_timeout_secs: Some(5),
            max_attempts: Some(5),
            ..Default::default()
        };
        let client = config.to_client_config();
        assert_eq!(client.audience_scope, "enterprise");
        assert_eq!(client.tenant_mode, "universal");
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert_eq!(client.retry.max_attempts, 5);
        assert_eq!(client.retry.base_backoff_ms, 1_000);
    }

    #[test]
    fn test_validate_rejects_unknown_scope() {
        let config = CatalogConfig {
            audience_scope: Some("internal".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(CatalogConfig::default().validate().is_ok());
    }

    #[test]
    fn test_database_path_and_owner() {
        let base = Path::new("/work");
        let config = CatalogConfig::default();
        assert_eq!(config.database_path(base), PathBuf::from("/work/.catalog-cache/catalog.db"));
        assert!(config.owner().is_none());

        let config = CatalogConfig {
            user_id: Some("u-1".into()),
            org_id: Some("org-1".into()),
            ..Default::default()
        };
        assert_eq!(config.owner(), Some(Owner::user("u-1").with_org("org-1")));
    }
}
