//! Bishop 配置
//!
//! `~/.bishop/config.json` 的类型定义、读写与校验。

pub mod config;
pub mod manager;

pub use config::{
    BackendConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, StorageConfig,
    TrialConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// `~/.bishop`
pub fn bishop_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bishop"))
}

/// 本地状态文件（网页版 localStorage 的替代）
pub fn default_state_path() -> Option<PathBuf> {
    bishop_dir().map(|dir| dir.join("state.json"))
}

pub fn default_log_dir() -> Option<PathBuf> {
    bishop_dir().map(|dir| dir.join("logs"))
}

/// 把开头的 `~/` 展开为用户主目录，其他路径原样返回
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_under_bishop_dir() {
        let root = bishop_dir().unwrap();
        assert!(root.ends_with(".bishop"));
        assert_eq!(default_state_path().unwrap(), root.join("state.json"));
        assert_eq!(default_log_dir().unwrap(), root.join("logs"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.bishop/state.json").unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".bishop/state.json"));

        assert_eq!(
            expand_tilde("/tmp/state.json").unwrap(),
            PathBuf::from("/tmp/state.json")
        );
    }
}
