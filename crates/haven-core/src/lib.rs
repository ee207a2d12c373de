//! # Haven Core
//!
//! Haven 各个 crate 共享的基础设施：
//!
//! - **时钟抽象**：`Clock` trait，生产环境使用 `SystemClock`，测试中使用可手动推进的 `ManualClock`
//! - **对话轮次**：`Role` / `Turn`，会话上下文与 LLM 客户端之间传递的消息结构
//! - **文件命名**：`file_safe_name`，把用户标识转换为不会越出目录的文件名
//! - **按键互斥**：`KeyedLocks`，为同一个键（用户、用户+日期）串行化读-改-写序列，不同键互不阻塞

pub mod clock;
pub mod locks;
pub mod naming;
pub mod turn;

pub use clock::{Clock, ManualClock, SystemClock};
pub use locks::{KeyedGuard, KeyedLocks};
pub use naming::file_safe_name;
pub use turn::{Role, Turn};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
