use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `~/.bishop/config.json` 的内容。缺失的段落使用默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub backend: BackendConfig,
    pub trial: TrialConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: BackendConfig::default(),
            trial: TrialConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 按点分键读取，例如 `backend.base_url`
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "version" => self.version.clone(),
            "backend.base_url" => self.backend.base_url.clone(),
            "backend.timeout_seconds" => self.backend.timeout_seconds.to_string(),
            "trial.threshold" => self.trial.threshold.to_string(),
            "storage.state_file" => self.storage.state_file.clone()?,
            "logging.level" => self.logging.level.to_string(),
            "logging.dir" => self.logging.dir.clone()?,
            "logging.max_files" => self.logging.max_files.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// 按点分键写入，数值字段会先解析；`version` 只读
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "backend.base_url" => self.backend.base_url = value.trim_end_matches('/').to_string(),
            "backend.timeout_seconds" => self.backend.timeout_seconds = parse_number(key, value)?,
            "trial.threshold" => self.trial.threshold = parse_number(key, value)?,
            "storage.state_file" => self.storage.state_file = Some(value.to_string()),
            "logging.level" => self.logging.level = value.parse()?,
            "logging.dir" => self.logging.dir = Some(value.to_string()),
            "logging.max_files" => self.logging.max_files = parse_number(key, value)?,
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{} expects a number, got {:?}", key, value)))
}

/// 后端 API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// 三个 `/api/ai/*` 接口共用的根地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sms-bot.harvely.com".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// 匿名试用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialConfig {
    /// 未登录时允许发送的消息数
    pub threshold: u32,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// 键值状态文件；None 时落到 ~/.bishop/state.json
    pub state_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: Some("~/.bishop/state.json".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown log level {:?}",
                    other
                )))
            }
        };
        Ok(level)
    }
}

/// 日志只写文件，终端留给界面
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    pub dir: Option<String>,
    /// 保留的滚动日志文件数
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_files() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            dir: Some("~/.bishop/logs".to_string()),
            max_files: default_max_files(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Validation(String),

    #[error("unknown config key: {0}")]
    KeyNotFound(String),

    #[error("environment variable {0} is not set and has no default")]
    EnvVarNotFound(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "https://sms-bot.harvely.com");
        assert_eq!(config.backend.timeout_seconds, 60);
        assert_eq!(config.trial.threshold, 5);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_get_and_set_value() {
        let mut config = Config::default();

        config.set_value("trial.threshold", "3").unwrap();
        assert_eq!(config.get_value("trial.threshold").as_deref(), Some("3"));

        config
            .set_value("backend.base_url", "http://localhost:9000/")
            .unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:9000");

        config.set_value("logging.level", "WARNING").unwrap();
        assert_eq!(config.get_value("logging.level").as_deref(), Some("warn"));

        config.storage.state_file = None;
        assert_eq!(config.get_value("storage.state_file"), None);
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut config = Config::default();

        assert!(matches!(
            config.set_value("trial.threshold", "many"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            config.set_value("version", "9.9.9"),
            Err(ConfigError::KeyNotFound(_))
        ));
        assert!(config.get_value("server.port").is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"trial": {"threshold": 8}, "logging": {"dir": null}}"#)
                .unwrap();
        assert_eq!(config.trial.threshold, 8);
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.max_files, 5);
        assert_eq!(config.logging.dir, None);
    }
}
