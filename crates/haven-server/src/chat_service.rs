//! 对话交换编排
//!
//! 一次交换：账本写入用户消息 → 追加上下文 → 截取窗口 → 带超时调用 LLM → 写入回复。
//! 同一用户的交换由按键互斥串行化，不同用户互不阻塞。

use std::sync::Arc;
use std::time::Duration;

use haven_config::Config;
use haven_core::{Clock, KeyedLocks};
use haven_llm::LlmClient;
use haven_session::{ConversationContextStore, MessageLedger, MessageRecord};
use tracing::{debug, error, info, warn};

use crate::error::AppError;

/// 对话参数
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// 每次调用发送的最大非指令轮次数
    pub max_turns: usize,
    /// 历史接口返回的最大记录数
    pub history_limit: usize,
    /// 单条消息最大字符数
    pub max_message_chars: usize,
    /// LLM 调用超时
    pub llm_timeout: Duration,
}

impl ChatSettings {
    /// 从配置构建
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_turns: config.chat.max_turns,
            history_limit: config.chat.history_limit,
            max_message_chars: config.chat.max_message_chars,
            llm_timeout: Duration::from_secs(config.llm.timeout_seconds),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_turns: 5,
            history_limit: 50,
            max_message_chars: 4000,
            llm_timeout: Duration::from_secs(30),
        }
    }
}

/// 对话服务
pub struct ChatService {
    context: Arc<ConversationContextStore>,
    ledger: Arc<dyn MessageLedger>,
    llm: Arc<dyn LlmClient>,
    clock: Arc<dyn Clock>,
    exchange_locks: KeyedLocks<String>,
    settings: ChatSettings,
}

impl ChatService {
    /// 创建对话服务
    pub fn new(
        context: Arc<ConversationContextStore>,
        ledger: Arc<dyn MessageLedger>,
        llm: Arc<dyn LlmClient>,
        clock: Arc<dyn Clock>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            context,
            ledger,
            llm,
            clock,
            exchange_locks: KeyedLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    fn validate_message<'a>(&self, message: &'a str) -> Result<&'a str, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("message", "message must not be empty"));
        }
        if message.chars().count() > self.settings.max_message_chars {
            return Err(AppError::validation(
                "message",
                format!(
                    "message must be at most {} characters",
                    self.settings.max_message_chars
                ),
            ));
        }
        Ok(message)
    }

    /// 处理一次对话交换，返回助手回复
    pub async fn send(&self, user: &str, message: &str) -> Result<String, AppError> {
        let message = self.validate_message(message)?;

        let _exchange = self.exchange_locks.lock(user.to_string()).await;

        let record = MessageRecord::from_user(user, message, self.clock.now());
        self.ledger.append(&record).await?;

        let ticket = self.context.append_user_turn(user, message)?;
        let turns = self
            .context
            .windowed_turns(user, self.settings.max_turns)
            .await?;

        debug!(
            "Calling {} with {} turns for {}",
            self.llm.provider_id(),
            turns.len(),
            user
        );

        let reply = match tokio::time::timeout(
            self.settings.llm_timeout,
            self.llm.generate_reply(&turns),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!("LLM call failed for {}: {}", user, e);
                return Err(AppError::Upstream(e.to_string()));
            }
            Err(_) => {
                warn!(
                    "LLM call for {} timed out after {:?}",
                    user, self.settings.llm_timeout
                );
                return Err(AppError::UpstreamTimeout(
                    self.settings.llm_timeout.as_secs(),
                ));
            }
        };

        let recorded_at = self.clock.now();
        let reply_record = MessageRecord::from_assistant(user, reply.as_str(), recorded_at);
        self.ledger.append(&reply_record).await?;

        let kept = self
            .context
            .append_assistant_turn_for(user, &reply, ticket, recorded_at);
        info!("Chat exchange completed for {} (context kept: {})", user, kept);

        Ok(reply)
    }

    /// 最近的消息记录，按时间正序
    pub async fn history(&self, user: &str) -> Result<Vec<MessageRecord>, AppError> {
        Ok(self
            .ledger
            .recent(user, self.settings.history_limit, None)
            .await?)
    }

    /// 清除会话上下文（不影响账本）
    pub fn clear(&self, user: &str) {
        self.context.clear(user);
    }
}
