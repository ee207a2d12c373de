//! 应用状态 - 在 main.rs 中创建并共享给所有 handler

use std::path::PathBuf;
use std::sync::Arc;

use haven_config::{Config, HistoryPolicyKind, StorageType};
use haven_core::Clock;
use haven_llm::LlmClient;
use haven_mood::{
    InMemoryMoodLedger, JsonFileMoodLedger, MoodLedger, MoodService, MoodTemporalPolicy,
    TimezonePolicy,
};
use haven_session::{
    ConversationContextStore, HistoryPolicy, InMemoryMessageLedger, InMemorySessionStore,
    JsonlMessageLedger, MessageLedger,
};
use tracing::info;

use crate::chat_service::{ChatService, ChatSettings};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub moods: Arc<MoodService>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(chat: Arc<ChatService>, moods: Arc<MoodService>) -> Self {
        Self { chat, moods }
    }

    /// 根据配置组装所有组件
    ///
    /// 账本目录无法创建或读取时返回错误，调用方应终止进程。
    pub async fn from_config(
        config: &Config,
        llm: Arc<dyn LlmClient>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let (message_ledger, mood_ledger) = build_ledgers(config).await?;
        Self::assemble(config, message_ledger, mood_ledger, llm, clock)
    }

    /// 使用给定账本组装组件
    pub fn assemble(
        config: &Config,
        message_ledger: Arc<dyn MessageLedger>,
        mood_ledger: Arc<dyn MoodLedger>,
        llm: Arc<dyn LlmClient>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let policy = match config.chat.history_policy {
            HistoryPolicyKind::Bounded => HistoryPolicy::Bounded,
            HistoryPolicyKind::Persistent => HistoryPolicy::Persistent,
        };
        let context = Arc::new(
            ConversationContextStore::new(
                policy,
                Arc::new(InMemorySessionStore::new()),
                message_ledger.clone(),
                clock.clone(),
            )
            .with_directive(config.chat.directive.clone()),
        );
        let chat = ChatService::new(
            context,
            message_ledger,
            llm,
            clock.clone(),
            ChatSettings::from_config(config),
        );

        let timezone: TimezonePolicy = config
            .mood
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid mood timezone: {}", e))?;
        let moods = MoodService::new(
            mood_ledger.clone(),
            MoodTemporalPolicy::new(mood_ledger, timezone),
            clock,
            config.mood.window_days,
        );

        info!(
            "App state ready (history policy: {}, timezone: {}, window: {} days)",
            config.chat.history_policy, timezone, config.mood.window_days
        );

        Ok(Self::new(Arc::new(chat), Arc::new(moods)))
    }
}

/// 按存储配置创建消息账本与情绪账本
async fn build_ledgers(
    config: &Config,
) -> anyhow::Result<(Arc<dyn MessageLedger>, Arc<dyn MoodLedger>)> {
    match config.storage.storage_type {
        StorageType::Memory => {
            info!("Using in-memory ledgers");
            Ok((
                Arc::new(InMemoryMessageLedger::new()),
                Arc::new(InMemoryMoodLedger::new()),
            ))
        }
        StorageType::Jsonl => {
            let path = config
                .storage
                .path
                .as_deref()
                .map(haven_config::expand_tilde)
                .or_else(haven_config::default_data_dir)
                .unwrap_or_else(|| PathBuf::from("./haven_data"));

            let messages = JsonlMessageLedger::new(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open message ledger at {:?}: {}", path, e))?;
            let moods = JsonFileMoodLedger::new(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open mood ledger at {:?}: {}", path, e))?;

            Ok((Arc::new(messages), Arc::new(moods)))
        }
    }
}
