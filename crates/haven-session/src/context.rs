//! # Conversation Context Store
//!
//! 维护每个用户发送给 LLM 的有序轮次列表，负责窗口截取与清除。
//!
//! 两种历史策略：
//!
//! - **Bounded**：每次从消息账本重新读取最近的记录，内存中不保存轮次内容
//! - **Persistent**：会话生命周期内在内存中保留全部轮次，窗口从中截取
//!
//! 清除会话时递增用户的代数并记录清除水位线。清除之前发起、清除之后才完成的
//! 助手回复不会重新进入窗口。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use haven_core::{Clock, Turn};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::ledger::MessageLedger;
use crate::store::SessionStore;
use crate::types::ConversationSession;

/// 历史策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// 每次从账本读取固定大小的滑动窗口
    #[default]
    Bounded,
    /// 在内存中保留全部轮次直到清除
    Persistent,
}

/// 追加用户轮次时观察到的会话代数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    generation: u64,
}

impl TurnTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// 会话上下文存储
pub struct ConversationContextStore {
    policy: HistoryPolicy,
    directive: Option<String>,
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<dyn MessageLedger>,
    clock: Arc<dyn Clock>,
    /// 用户代数，会话删除后仍保留
    generations: DashMap<String, u64>,
    /// 清除水位线，早于或等于该时间的账本记录不进入窗口
    watermarks: DashMap<String, DateTime<Utc>>,
}

impl ConversationContextStore {
    /// 创建上下文存储
    pub fn new(
        policy: HistoryPolicy,
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<dyn MessageLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy,
            directive: None,
            sessions,
            ledger,
            clock,
            generations: DashMap::new(),
            watermarks: DashMap::new(),
        }
    }

    /// 设置系统指令
    pub fn with_directive(mut self, directive: Option<String>) -> Self {
        self.directive = directive.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// 活跃会话数量
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn current_generation(&self, user: &str) -> u64 {
        self.generations.get(user).map(|g| *g).unwrap_or(0)
    }

    fn watermark(&self, user: &str) -> Option<DateTime<Utc>> {
        self.watermarks.get(user).map(|w| *w)
    }

    fn raise_watermark(&self, user: &str, to: DateTime<Utc>) {
        self.watermarks
            .entry(user.to_string())
            .and_modify(|w| {
                if *w < to {
                    *w = to;
                }
            })
            .or_insert(to);
    }

    fn directive_turn(&self) -> Option<Turn> {
        self.directive.as_deref().map(Turn::system)
    }

    /// 追加用户轮次，会话不存在时创建（并插入指令）
    pub fn append_user_turn(&self, user: &str, content: &str) -> StorageResult<TurnTicket> {
        if content.trim().is_empty() {
            return Err(StorageError::invalid_input("message content is empty"));
        }

        let now = self.clock.now();
        let init = || {
            ConversationSession::new(
                user,
                self.directive.as_deref(),
                self.current_generation(user),
                now,
            )
        };

        let policy = self.policy;
        let mut generation = 0;
        self.sessions
            .modify(user, &init, &mut |session: &mut ConversationSession| {
                match policy {
                    HistoryPolicy::Persistent => session.push(Turn::user(content), now),
                    HistoryPolicy::Bounded => session.updated_at = now,
                }
                generation = session.generation;
            });

        debug!("Appended user turn for {} (generation {})", user, generation);
        Ok(TurnTicket { generation })
    }

    /// 获取窗口内的轮次：指令（如有）加上最近 `max_turns` 条非指令轮次，按时间正序
    pub async fn windowed_turns(&self, user: &str, max_turns: usize) -> StorageResult<Vec<Turn>> {
        let mut turns: Vec<Turn> = self.directive_turn().into_iter().collect();

        match self.policy {
            HistoryPolicy::Persistent => {
                if let Some(session) = self.sessions.load(user) {
                    let dialogue = session.dialogue();
                    let skip = dialogue.len().saturating_sub(max_turns);
                    turns.extend(dialogue[skip..].iter().cloned());
                }
            }
            HistoryPolicy::Bounded => {
                if max_turns > 0 {
                    let records = self
                        .ledger
                        .recent(user, max_turns, self.watermark(user))
                        .await?;
                    turns.extend(records.iter().map(|r| r.to_turn()));
                }
            }
        }

        Ok(turns)
    }

    /// 追加助手轮次
    pub fn append_assistant_turn(&self, user: &str, content: &str) {
        let ticket = TurnTicket {
            generation: self.current_generation(user),
        };
        self.append_assistant_turn_for(user, content, ticket, self.clock.now());
    }

    /// 仅当票据仍然有效（期间没有清除）时追加助手轮次，返回是否保留
    ///
    /// Bounded 策略下票据过期时，水位线提升到 `recorded_at`，
    /// 使清除后才写入账本的回复不会出现在窗口中。
    pub fn append_assistant_turn_for(
        &self,
        user: &str,
        content: &str,
        ticket: TurnTicket,
        recorded_at: DateTime<Utc>,
    ) -> bool {
        if self.current_generation(user) != ticket.generation {
            if self.policy == HistoryPolicy::Bounded {
                self.raise_watermark(user, recorded_at);
            }
            info!(
                "Discarding assistant turn for {}: session cleared during exchange",
                user
            );
            return false;
        }

        match self.policy {
            HistoryPolicy::Bounded => true,
            HistoryPolicy::Persistent => {
                let now = self.clock.now();
                let init = || {
                    ConversationSession::new(
                        user,
                        self.directive.as_deref(),
                        self.current_generation(user),
                        now,
                    )
                };
                let mut kept = false;
                self.sessions
                    .modify(user, &init, &mut |session: &mut ConversationSession| {
                        if session.generation == ticket.generation {
                            session.push(Turn::assistant(content), now);
                            kept = true;
                        }
                    });
                kept
            }
        }
    }

    /// 清除用户会话（幂等）
    pub fn clear(&self, user: &str) {
        let generation = {
            let mut entry = self.generations.entry(user.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.raise_watermark(user, self.clock.now());
        let existed = self.sessions.remove(user);

        info!(
            "Cleared session for {} (generation {}, existed: {})",
            user, generation, existed
        );
    }
}
