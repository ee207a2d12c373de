//! # JsonlMessageLedger Implementation
//!
//! 基于 JSONL 文件的消息账本，每个用户一个文件，追加写入。
//!
//! 存储结构:
//! ```text
//! <base_path>/
//! └── messages/
//!     ├── <user>.jsonl
//!     └── ...
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haven_core::{file_safe_name, KeyedLocks};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::ledger::{take_recent, MessageLedger};
use crate::types::MessageRecord;

/// JSONL 消息账本
pub struct JsonlMessageLedger {
    messages_path: PathBuf,
    /// 每个用户文件一把写锁
    file_locks: KeyedLocks<String>,
}

impl JsonlMessageLedger {
    /// 创建账本，目录不存在时自动创建
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path_str = base_path.into().to_string_lossy().to_string();
        let base_path = PathBuf::from(shellexpand::tilde(&base_path_str).as_ref());
        let messages_path = base_path.join("messages");

        fs::create_dir_all(&messages_path).await?;

        info!("JsonlMessageLedger initialized at {:?}", messages_path);

        Ok(Self {
            messages_path,
            file_locks: KeyedLocks::new(),
        })
    }

    /// 获取用户文件路径
    fn user_file_path(&self, user: &str) -> PathBuf {
        self.messages_path
            .join(format!("{}.jsonl", file_safe_name(user)))
    }

    /// 从文件加载用户的全部记录
    async fn load_records(&self, user: &str) -> StorageResult<Vec<MessageRecord>> {
        let path = self.user_file_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut records = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MessageRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Failed to parse message line in {:?}: {}", path, e);
                }
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl MessageLedger for JsonlMessageLedger {
    async fn append(&self, record: &MessageRecord) -> StorageResult<()> {
        let path = self.user_file_path(&record.user);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.file_locks.lock(record.user.clone()).await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended message {} for user {}", record.id, record.user);
        Ok(())
    }

    async fn recent(
        &self,
        user: &str,
        limit: usize,
        after: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<MessageRecord>> {
        let records = {
            let _guard = self.file_locks.lock(user.to_string()).await;
            self.load_records(user).await?
        };
        Ok(take_recent(records.iter(), limit, after))
    }
}
