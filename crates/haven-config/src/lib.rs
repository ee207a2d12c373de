pub mod config;
pub mod manager;

pub use config::{
    AuthSettings, ChatConfig, Config, ConfigError, ConfigResult, HistoryPolicyKind, LlmConfig,
    LogLevel, LoggingConfig, MoodConfig, ServerConfig, StorageConfig, StorageType,
    DEFAULT_DIRECTIVE,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 Haven 配置目录路径
pub fn haven_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".haven"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    haven_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认数据目录
pub fn default_data_dir() -> Option<PathBuf> {
    haven_dir().map(|dir| dir.join("data"))
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haven_dir() {
        let dir = haven_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().to_string_lossy().contains(".haven"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.haven/config.json");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".haven/config.json"));

        let untouched = expand_tilde("/var/lib/haven");
        assert_eq!(untouched, PathBuf::from("/var/lib/haven"));
    }
}
