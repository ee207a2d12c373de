//! # Haven Session
//!
//! Haven 对话上下文管理。
//!
//! ## 功能特性
//!
//! - **消息账本**：只追加的消息记录（`MessageLedger`），提供内存与 JSONL 两种实现
//! - **会话存储**：活跃会话的内存缓存（`SessionStore`）
//! - **上下文窗口**：`ConversationContextStore` 为每次 LLM 调用生成有序、定长的轮次列表
//! - **清除语义**：清除后进行中的回复不会重新进入窗口
//!
//! ## 存储结构
//!
//! ```text
//! <base_path>/
//! └── messages/
//!     ├── <user>.jsonl      # 消息记录（追加写入）
//!     └── ...
//! ```

pub mod context;
pub mod error;
pub mod jsonl_ledger;
pub mod ledger;
pub mod store;
pub mod types;

// 重新导出主要类型
pub use context::{ConversationContextStore, HistoryPolicy, TurnTicket};
pub use error::{StorageError, StorageResult};
pub use jsonl_ledger::JsonlMessageLedger;
pub use ledger::{InMemoryMessageLedger, MessageLedger};
pub use store::{InMemorySessionStore, SessionStore};
pub use types::{ConversationSession, MessageRecord};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
