//! # Haven Session Types
//!
//! 消息记录与会话结构。

use chrono::{DateTime, Utc};
use haven_core::Turn;
use serde::{Deserialize, Serialize};

/// 账本中的一条消息记录（写入后不可修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub user: String,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// 创建用户消息记录
    pub fn from_user(
        user: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user.into(),
            content: content.into(),
            is_user: true,
            created_at,
        }
    }

    /// 创建助手回复记录
    pub fn from_assistant(
        user: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user.into(),
            content: content.into(),
            is_user: false,
            created_at,
        }
    }

    /// 转换为 LLM 输入轮次
    pub fn to_turn(&self) -> Turn {
        if self.is_user {
            Turn::user(self.content.clone())
        } else {
            Turn::assistant(self.content.clone())
        }
    }
}

/// 单个用户的活跃会话
///
/// `turns[0]` 在配置了指令时始终是该指令，且每个会话只插入一次。
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub user: String,
    pub turns: Vec<Turn>,
    /// 会话创建时所属的代数，清除后递增
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// 创建新会话，指令（如有）作为第一条轮次
    pub fn new(
        user: impl Into<String>,
        directive: Option<&str>,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let turns = directive.map(|d| vec![Turn::system(d)]).unwrap_or_default();
        Self {
            user: user.into(),
            turns,
            generation,
            created_at: now,
            updated_at: now,
        }
    }

    /// 追加轮次
    pub fn push(&mut self, turn: Turn, now: DateTime<Utc>) {
        self.turns.push(turn);
        self.updated_at = now;
    }

    /// 指令轮次
    pub fn directive(&self) -> Option<&Turn> {
        self.turns.first().filter(|t| t.is_system())
    }

    /// 非指令轮次
    pub fn dialogue(&self) -> &[Turn] {
        match self.directive() {
            Some(_) => &self.turns[1..],
            None => &self.turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::Role;

    #[test]
    fn test_message_record_json_is_camel_case() {
        let record = MessageRecord::from_user("u1", "hi", Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["isUser"], true);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("is_user").is_none());
    }

    #[test]
    fn test_session_directive_is_first_and_not_dialogue() {
        let now = Utc::now();
        let mut session = ConversationSession::new("u1", Some("be kind"), 0, now);
        session.push(Turn::user("hi"), now);

        assert_eq!(session.directive().map(|t| t.role), Some(Role::System));
        assert_eq!(session.dialogue(), &[Turn::user("hi")]);

        let bare = ConversationSession::new("u2", None, 0, now);
        assert!(bare.directive().is_none());
        assert!(bare.dialogue().is_empty());
    }
}
