//! # Keyed Locks
//!
//! 按键的异步互斥表。持有某个键的守卫期间，同一键的其他获取者会等待；
//! 不同键之间完全独立。守卫释放后，如果没有其他任务引用该键，表项会被清理。

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// 按键互斥表
pub struct KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn clone(&self) -> Self {
        Self {
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<K> fmt::Debug for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("active_keys", &self.locks.len())
            .finish()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// 创建空的互斥表
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// 获取指定键的互斥锁，返回的守卫释放时解锁
    ///
    /// 等待期间被取消（例如客户端断开）时，表项同样会被清理。
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        // 克隆必须在 shard 锁内完成，与 Drop 中的 remove_if 互斥
        let mutex = {
            let entry = self.locks.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };

        let mut pending = PendingEntry {
            key: Some(key),
            locks: Arc::clone(&self.locks),
        };
        // lock_owned 的 future 持有 Arc，取消时先于 pending 析构
        let guard = mutex.lock_owned().await;
        trace!(active_keys = self.locks.len(), "keyed lock acquired");

        KeyedGuard {
            key: pending.key.take(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// 当前表中的键数量（持有中或等待中）
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }
}

/// 按键互斥守卫
pub struct KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    key: Option<K>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> fmt::Debug for KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedGuard")
            .field("held", &self.guard.is_some())
            .finish()
    }
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // 先释放互斥锁，再判断是否还有其他引用
        drop(self.guard.take());
        if let Some(key) = self.key.take() {
            prune(&self.locks, &key);
        }
    }
}

/// 等待阶段的清理守卫，获取成功后被解除
struct PendingEntry<K>
where
    K: Eq + Hash + Clone,
{
    key: Option<K>,
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Drop for PendingEntry<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            prune(&self.locks, &key);
        }
    }
}

/// 只剩表本身引用时移除表项
fn prune<K>(locks: &DashMap<K, Arc<Mutex<()>>>, key: &K)
where
    K: Eq + Hash + Clone,
{
    locks.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
}
