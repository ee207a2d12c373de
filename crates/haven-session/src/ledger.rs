//! # Message Ledger
//!
//! 只追加的消息账本 trait，以及内存实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::StorageResult;
use crate::types::MessageRecord;

/// 消息账本 trait
///
/// 记录写入后不可修改；查询结果按时间正序（最旧在前）返回。
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// 追加一条消息记录
    async fn append(&self, record: &MessageRecord) -> StorageResult<()>;

    /// 获取用户最近的 `limit` 条记录
    ///
    /// 如果给定 `after`，只考虑 `created_at` 严格晚于该时间的记录。
    async fn recent(
        &self,
        user: &str,
        limit: usize,
        after: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<MessageRecord>>;
}

/// 从按追加顺序排列的记录中取最近的 `limit` 条
pub(crate) fn take_recent<'a, I>(
    records: I,
    limit: usize,
    after: Option<DateTime<Utc>>,
) -> Vec<MessageRecord>
where
    I: IntoIterator<Item = &'a MessageRecord>,
{
    let mut selected: Vec<MessageRecord> = records
        .into_iter()
        .filter(|r| after.map_or(true, |after| r.created_at > after))
        .cloned()
        .collect();
    // 追加顺序即时间顺序，稳定排序只修正时钟回拨的情况
    selected.sort_by_key(|r| r.created_at);
    let skip = selected.len().saturating_sub(limit);
    selected.split_off(skip)
}

/// 内存消息账本
#[derive(Debug, Default)]
pub struct InMemoryMessageLedger {
    records: DashMap<String, Vec<MessageRecord>>,
}

impl InMemoryMessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用户的记录总数
    pub fn count(&self, user: &str) -> usize {
        self.records.get(user).map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MessageLedger for InMemoryMessageLedger {
    async fn append(&self, record: &MessageRecord) -> StorageResult<()> {
        self.records
            .entry(record.user.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn recent(
        &self,
        user: &str,
        limit: usize,
        after: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<MessageRecord>> {
        Ok(self
            .records
            .get(user)
            .map(|records| take_recent(records.iter(), limit, after))
            .unwrap_or_default())
    }
}
