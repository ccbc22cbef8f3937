//! 配置文件的读写与校验

use crate::config::{Config, ConfigError, ConfigResult};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// `${VAR}` 或 `${VAR:-default}`
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

/// 持有当前配置及其文件路径
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// 读取配置文件；文件不存在时写出一份默认配置
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = match tokio::fs::try_exists(path).await? {
            true => Self::read_file(path).await?,
            false => {
                info!("No config at {:?}, writing defaults", path);
                let config = Config::default();
                Self::write_file(path, &config).await?;
                config
            }
        };

        Ok(Self::new(config, path.to_path_buf()))
    }

    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前配置的副本
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn save(&self) -> ConfigResult<()> {
        let config = self.snapshot().await;
        Self::write_file(&self.path, &config).await
    }

    /// 在副本上修改，校验通过后替换并落盘；校验失败时内存中的配置保持不变
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut candidate = self.snapshot().await;
        f(&mut candidate);
        Self::validate(&candidate)?;

        Self::write_file(&self.path, &candidate).await?;
        *self.config.write().await = candidate;
        Ok(())
    }

    pub fn validate(config: &Config) -> ConfigResult<()> {
        let base_url = config.backend.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Validation(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "backend.base_url must start with http:// or https://, got {}",
                base_url
            )));
        }
        if config.backend.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "backend.timeout_seconds must be at least 1".to_string(),
            ));
        }
        if config.trial.threshold == 0 {
            return Err(ConfigError::Validation(
                "trial.threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn read_file(path: &Path) -> ConfigResult<Config> {
        debug!("Reading config {:?}", path);
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&expand_env_vars(&raw)?)?;
        Self::validate(&config)?;
        Ok(config)
    }

    async fn write_file(path: &Path, config: &Config) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let body = serde_json::to_string_pretty(config)?;
        tokio::fs::write(path, body).await?;
        info!("Wrote config {:?}", path);
        Ok(())
    }
}

/// 替换文本中的环境变量引用；没有默认值且变量未设置时报错
pub(crate) fn expand_env_vars(raw: &str) -> ConfigResult<String> {
    let pattern =
        Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;

    let mut missing = None;
    let expanded = pattern.replace_all(raw, |caps: &Captures| {
        let name = &caps[1];
        match (std::env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::EnvVarNotFound(name)),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gets_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(manager.snapshot().await, Config::default());
        assert_eq!(manager.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_update_writes_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let manager = ConfigManager::load(&path).await.unwrap();
        manager
            .update(|c| c.backend.base_url = "http://127.0.0.1:4000".to_string())
            .await
            .unwrap();

        let reopened = ConfigManager::load(&path).await.unwrap();
        assert_eq!(
            reopened.snapshot().await.backend.base_url,
            "http://127.0.0.1:4000"
        );
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_config_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let manager = ConfigManager::load(&path).await.unwrap();
        let result = manager.update(|c| c.trial.threshold = 0).await;
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        assert_eq!(manager.snapshot().await.trial.threshold, 5);
    }

    #[tokio::test]
    async fn test_load_expands_env_and_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.backend.base_url = "${BISHOP_TEST_BASE_URL:-http://fallback.test}".to_string();
        tokio::fs::write(&path, serde_json::to_string(&config).unwrap())
            .await
            .unwrap();

        let manager = ConfigManager::load(&path).await.unwrap();
        assert_eq!(
            manager.snapshot().await.backend.base_url,
            "http://fallback.test"
        );

        config.backend.base_url = "gopher://old.test".to_string();
        tokio::fs::write(&path, serde_json::to_string(&config).unwrap())
            .await
            .unwrap();
        assert!(ConfigManager::load(&path).await.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("BISHOP_TEST_BACKEND", "http://example.test");

        let raw = r#"{"base_url": "${BISHOP_TEST_BACKEND}", "dir": "${BISHOP_UNSET_VAR:-/tmp/logs}", "empty": "${BISHOP_UNSET_VAR:-}"}"#;
        let expanded = expand_env_vars(raw).unwrap();
        assert_eq!(
            expanded,
            r#"{"base_url": "http://example.test", "dir": "/tmp/logs", "empty": ""}"#
        );

        assert!(matches!(
            expand_env_vars(r#"{"base_url": "${BISHOP_DEFINITELY_UNSET}"}"#),
            Err(ConfigError::EnvVarNotFound(name)) if name == "BISHOP_DEFINITELY_UNSET"
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(ConfigManager::validate(&config).is_ok());

        config.backend.timeout_seconds = 0;
        assert!(ConfigManager::validate(&config).is_err());

        config.backend.timeout_seconds = 30;
        config.backend.base_url = "  ".to_string();
        assert!(ConfigManager::validate(&config).is_err());
    }
}
