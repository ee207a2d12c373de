use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use haven_config::{Config, ConfigManager};
use haven_core::SystemClock;
use haven_llm::{ClientConfig, LlmClient, OpenAiClient};
use haven_server::{init_logging, run_server, AppState, ServerOptions};

#[derive(Parser, Debug, Clone)]
#[command(name = "haven-server")]
#[command(about = "Haven wellbeing companion HTTP server")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Server port (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Listen host (overrides config)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// LLM API base URL (overrides config)
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// LLM model name (overrides config)
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// LLM API key (overrides the key read from the configured env var)
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Conversation history policy: bounded | persistent (overrides config)
    #[arg(long, env = "HAVEN_HISTORY_POLICY")]
    history_policy: Option<String>,

    /// Storage backend: memory | jsonl (overrides config)
    #[arg(long, env = "HAVEN_STORAGE")]
    storage: Option<String>,

    /// Data directory for the file ledgers (overrides config)
    #[arg(long, env = "HAVEN_DATA_DIR")]
    data_dir: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "HAVEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, default_value = "false")]
    log_json: bool,

    /// Config file path (default: ~/.haven/config.json)
    #[arg(long, env = "HAVEN_CONFIG")]
    config: Option<String>,
}

impl Cli {
    /// CLI 参数覆盖配置文件
    fn apply_overrides(&self, config: &mut Config) -> haven_config::ConfigResult<()> {
        let overrides = [
            ("server.port", self.port.map(|p| p.to_string())),
            ("server.host", self.host.clone()),
            ("llm.base_url", self.llm_base_url.clone()),
            ("llm.model", self.model.clone()),
            ("chat.history_policy", self.history_policy.clone()),
            ("storage.type", self.storage.clone()),
            ("storage.path", self.data_dir.clone()),
            ("logging.level", self.log_level.clone()),
        ];

        for (key, value) in overrides {
            if let Some(value) = value {
                config.set_value(key, &value)?;
            }
        }

        if self.debug {
            config.set_value("logging.level", "debug")?;
        }
        if self.log_json {
            config.logging.json = true;
        }
        Ok(())
    }
}

/// 根据配置创建 LLM 客户端
fn build_llm_client(config: &Config, cli_api_key: Option<String>) -> anyhow::Result<OpenAiClient> {
    let llm = &config.llm;
    let mut client_config = ClientConfig::new(llm.base_url.clone())
        .with_model(llm.model.clone())
        .with_sampling(llm.temperature, llm.max_tokens)
        .with_timeout(Duration::from_secs(llm.timeout_seconds))
        .with_headers(llm.headers.clone().unwrap_or_default());

    if let Some(key) = cli_api_key.or_else(|| llm.auth.get_api_key()) {
        client_config = client_config.with_api_key(key);
    } else if let Some(token) = llm.auth.get_bearer_token() {
        client_config = client_config.with_bearer_token(token);
    } else {
        tracing::warn!("No LLM credentials configured, requests will be sent without authentication");
    }

    Ok(OpenAiClient::new(client_config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path = match cli.config.as_deref() {
        Some(path) => haven_config::expand_tilde(path),
        None => match haven_config::default_config_path() {
            Some(path) => path,
            None => {
                eprintln!("Could not find home directory, pass --config explicitly");
                std::process::exit(1);
            }
        },
    };

    // 加载配置
    let config_manager = match ConfigManager::load(&config_path).await {
        Ok(cm) => cm,
        Err(e) => {
            eprintln!("Failed to load config from {:?}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config_manager
        .apply(|config| cli.apply_overrides(config))
        .await
    {
        eprintln!("Invalid command line override: {}", e);
        std::process::exit(1);
    }

    let config = config_manager.snapshot().await;

    // 初始化日志
    let log_level = format!("{:?}", config.logging.level).to_lowercase();
    init_logging(&log_level, config.logging.json)?;
    tracing::info!("Config loaded from {:?}", config_manager.path());
    for key in ["llm.model", "chat.history_policy", "mood.timezone", "storage.type"] {
        if let Some(value) = config.get_value(key) {
            tracing::info!("  {} = {}", key, value);
        }
    }

    let llm: Arc<dyn LlmClient> = Arc::new(build_llm_client(&config, cli.api_key.clone())?);

    // 账本初始化失败是致命错误
    let state = match AppState::from_config(&config, llm, Arc::new(SystemClock)).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize storage: {:#}", e);
            std::process::exit(1);
        }
    };

    let options = ServerOptions {
        host: config.server.host.clone(),
        port: config.server.port,
        cors: config.server.cors,
    };

    run_server(state, options).await
}
