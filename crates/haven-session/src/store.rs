//! # Session Store
//!
//! 活跃会话的存储抽象。会话是临时数据，进程重启即丢失。

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::types::ConversationSession;

/// 会话存储 trait
///
/// 所有操作都是同步的短临界区，不能跨越 `.await` 持有。
pub trait SessionStore: Send + Sync {
    /// 获取会话快照
    fn load(&self, user: &str) -> Option<ConversationSession>;

    /// 原子地获取或创建会话并修改
    fn modify(
        &self,
        user: &str,
        init: &dyn Fn() -> ConversationSession,
        f: &mut dyn FnMut(&mut ConversationSession),
    );

    /// 删除会话，返回是否存在
    fn remove(&self, user: &str) -> bool;

    /// 活跃会话数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 内存会话存储
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, RwLock<ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, user: &str) -> Option<ConversationSession> {
        self.sessions.get(user).map(|entry| entry.read().clone())
    }

    fn modify(
        &self,
        user: &str,
        init: &dyn Fn() -> ConversationSession,
        f: &mut dyn FnMut(&mut ConversationSession),
    ) {
        let entry = self
            .sessions
            .entry(user.to_string())
            .or_insert_with(|| RwLock::new(init()));
        let mut session = entry.write();
        f(&mut session);
    }

    fn remove(&self, user: &str) -> bool {
        self.sessions.remove(user).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
