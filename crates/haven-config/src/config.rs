use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 默认系统指令
pub const DEFAULT_DIRECTIVE: &str = "You are a friendly and supportive AI companion who enjoys meaningful conversations. Your role is to:

1. Engage in natural, flowing conversations
2. Listen actively and respond thoughtfully
3. Share general life insights and perspectives
4. Maintain a warm, friendly tone

Conversation Guidelines:
- Keep the conversation natural and flowing
- Ask thoughtful follow-up questions
- Build on previous responses
- Focus on meaningful dialogue

Only suggest professional help if the user expresses thoughts of self-harm or crisis.";

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub mood: MoodConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            chat: ChatConfig::default(),
            mood: MoodConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "cors"] => Some(self.server.cors.to_string()),
            ["llm", "base_url"] => Some(self.llm.base_url.clone()),
            ["llm", "model"] => Some(self.llm.model.clone()),
            ["llm", "timeout_seconds"] => Some(self.llm.timeout_seconds.to_string()),
            ["chat", "history_policy"] => Some(self.chat.history_policy.to_string()),
            ["chat", "max_turns"] => Some(self.chat.max_turns.to_string()),
            ["chat", "history_limit"] => Some(self.chat.history_limit.to_string()),
            ["mood", "timezone"] => Some(self.mood.timezone.clone()),
            ["mood", "window_days"] => Some(self.mood.window_days.to_string()),
            ["storage", "type"] => Some(format!("{:?}", self.storage.storage_type).to_lowercase()),
            ["storage", "path"] => self.storage.path.clone(),
            ["logging", "level"] => Some(format!("{:?}", self.logging.level).to_lowercase()),
            _ => None,
        }
    }

    /// 设置配置值
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "port"] => {
                self.server.port = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid port number: {}", value))
                })?;
            }
            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "cors"] => {
                self.server.cors = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            ["llm", "base_url"] => {
                self.llm.base_url = value.to_string();
            }
            ["llm", "model"] => {
                self.llm.model = value.to_string();
            }
            ["llm", "timeout_seconds"] => {
                self.llm.timeout_seconds = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["chat", "history_policy"] => {
                self.chat.history_policy = value.parse()?;
            }
            ["chat", "max_turns"] => {
                self.chat.max_turns = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["chat", "history_limit"] => {
                self.chat.history_limit = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["mood", "timezone"] => {
                self.mood.timezone = value.to_string();
            }
            ["mood", "window_days"] => {
                self.mood.window_days = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["storage", "type"] => {
                self.storage.storage_type = value.parse()?;
            }
            ["storage", "path"] => {
                self.storage.path = Some(value.to_string());
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

/// Server 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors: true,
        }
    }
}

/// LLM 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub auth: AuthSettings,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            auth: AuthSettings::ApiKey {
                env: "OPENAI_API_KEY".to_string(),
            },
            temperature: 0.8,
            max_tokens: 250,
            timeout_seconds: 30,
            headers: None,
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum AuthSettings {
    /// API Key authentication - reads from environment variable
    ApiKey { env: String },
    /// Bearer token authentication - reads from environment variable
    Bearer { env: String },
    /// No authentication
    None,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::None
    }
}

impl AuthSettings {
    /// Get API key from environment if applicable
    pub fn get_api_key(&self) -> Option<String> {
        match self {
            Self::ApiKey { env } => std::env::var(env).ok(),
            _ => None,
        }
    }

    /// Get bearer token from environment if applicable
    pub fn get_bearer_token(&self) -> Option<String> {
        match self {
            Self::Bearer { env } => std::env::var(env).ok(),
            _ => None,
        }
    }
}

/// 对话历史策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicyKind {
    /// 每次从消息账本重建固定窗口
    Bounded,
    /// 会话期间在内存中累积全部轮次，直到显式清除
    Persistent,
}

impl Default for HistoryPolicyKind {
    fn default() -> Self {
        Self::Bounded
    }
}

impl std::fmt::Display for HistoryPolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryPolicyKind::Bounded => write!(f, "bounded"),
            HistoryPolicyKind::Persistent => write!(f, "persistent"),
        }
    }
}

impl std::str::FromStr for HistoryPolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "bounded" => Ok(HistoryPolicyKind::Bounded),
            "persistent" => Ok(HistoryPolicyKind::Persistent),
            _ => Err(ConfigError::Validation(format!(
                "Invalid history policy: {}",
                s
            ))),
        }
    }
}

/// Chat 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub history_policy: HistoryPolicyKind,
    /// 发送给 LLM 的最大轮次数（不含系统指令）
    pub max_turns: usize,
    /// GET /chat/history 返回的消息数
    pub history_limit: usize,
    pub max_message_chars: usize,
    /// None 表示不注入系统指令
    pub directive: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_policy: HistoryPolicyKind::Bounded,
            max_turns: 5,
            history_limit: 50,
            max_message_chars: 4000,
            directive: Some(DEFAULT_DIRECTIVE.to_string()),
        }
    }
}

/// Mood 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MoodConfig {
    /// "utc" 或固定偏移，例如 "+05:30"
    pub timezone: String,
    pub window_days: u32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            timezone: "utc".to_string(),
            window_days: 30,
        }
    }
}

/// Storage 类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Memory,
    Jsonl,
}

impl Default for StorageType {
    fn default() -> Self {
        Self::Jsonl
    }
}

impl std::str::FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "jsonl" => Ok(StorageType::Jsonl),
            _ => Err(ConfigError::Validation(format!("Invalid storage type: {}", s))),
        }
    }
}

/// Storage 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Jsonl,
            path: Some("~/.haven/data".to_string()),
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// 输出 JSON 格式日志
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
        }
    }
}

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
