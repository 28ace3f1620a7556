//! 累计流量统计
//!
//! 会话期间单调累加；每次变更后同步写穿到持久化层。
//! 写入失败只记日志，内存中的值仍是本会话的权威状态。

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::event::{DomainEvent, TransferPhase};
use crate::persist::SessionStore;
use super::TransferDirection;

/// 会话统计快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStats {
    pub total_sent: u64,
    pub total_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// 统计累加器
///
/// 只有两类事件会改变状态:
/// - `TransferUpdate(complete)`: 对应方向计数 +1
/// - 载荷上的显式字节增量: 累加到对应方向的字节数
///
/// 例外: `ServerReady` 携带的绝对计数直接覆盖本地计数
/// （计数 last-writer-wins，字节数只增不覆盖）。
pub struct StatsAccumulator {
    stats: SessionStats,
    store: Arc<dyn SessionStore>,
}

impl StatsAccumulator {
    /// 从持久化层恢复上次的快照；读取失败从零开始
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let stats = store.load().unwrap_or_else(|e| {
            warn!("failed to load session stats, starting fresh: {e}");
            SessionStats::default()
        });
        Self { stats, store }
    }

    pub fn snapshot(&self) -> SessionStats {
        self.stats
    }

    /// 应用一个事件
    ///
    /// `direction` 是当前模式的记账方向，由调度器给出。
    pub fn apply(&mut self, event: &DomainEvent, direction: TransferDirection) -> SessionStats {
        let mutated = match event {
            DomainEvent::TransferUpdate {
                phase,
                bytes_delta,
                ..
            } => {
                let mut changed = false;
                if *phase == TransferPhase::Complete {
                    // 饱和加法: 敌对的超大增量不应让引擎崩溃
                    match direction {
                        TransferDirection::Sent => {
                            self.stats.total_sent = self.stats.total_sent.saturating_add(1);
                        }
                        TransferDirection::Received => {
                            self.stats.total_received =
                                self.stats.total_received.saturating_add(1);
                        }
                    }
                    changed = true;
                }
                if let Some(delta) = bytes_delta {
                    self.add_bytes(*delta, direction);
                    changed = true;
                }
                changed
            }
            DomainEvent::ServerReady {
                total_sent,
                total_received,
                bytes_delta,
                ..
            } => {
                if let Some(count) = total_sent {
                    self.stats.total_sent = *count;
                }
                if let Some(count) = total_received {
                    self.stats.total_received = *count;
                }
                if let Some(delta) = bytes_delta {
                    self.add_bytes(*delta, direction);
                }
                total_sent.is_some() || total_received.is_some() || bytes_delta.is_some()
            }
            _ => false,
        };

        if mutated {
            // 写穿：整份快照落盘，失败不回滚
            if let Err(e) = self.store.save(&self.stats) {
                warn!("failed to persist session stats: {e}");
            }
        }
        self.stats
    }

    fn add_bytes(&mut self, delta: u64, direction: TransferDirection) {
        match direction {
            TransferDirection::Sent => {
                self.stats.bytes_sent = self.stats.bytes_sent.saturating_add(delta);
            }
            TransferDirection::Received => {
                self.stats.bytes_received = self.stats.bytes_received.saturating_add(delta);
            }
        }
    }
}
