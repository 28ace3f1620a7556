//! 通知队列
//!
//! 有界的用户通知窗口：最多同时可见 3 条，超出时静默挤掉最旧的一条。
//! 每条通知从创建起计时，到期自动移除，互不影响。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// 可见通知上限（滑动窗口）
pub const MAX_VISIBLE: usize = 3;

/// 默认展示时长
pub const DEFAULT_TTL: Duration = Duration::from_secs(4);

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
    Info,
}

/// 单条通知
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotifyKind,
    pub message: String,
    pub created_at: Instant,
}

/// 通知队列
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::with_capacity(MAX_VISIBLE + 1),
            ttl,
        }
    }

    /// 推入一条通知，返回其 id
    pub fn push(&mut self, kind: NotifyKind, message: impl Into<String>) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at: Instant::now(),
        };
        let id = notification.id;
        self.items.push_back(notification);
        while self.items.len() > MAX_VISIBLE {
            self.items.pop_front();
        }
        id
    }

    /// 推入通知，但相同文本已在队列中时跳过
    ///
    /// 去重只发生在调用方选择使用本方法的场合，不是队列级不变式。
    pub fn push_unique(&mut self, kind: NotifyKind, message: impl Into<String>) -> Option<Uuid> {
        let message = message.into();
        if self.items.iter().any(|n| n.message == message) {
            return None;
        }
        Some(self.push(kind, message))
    }

    /// 用户主动关闭某条通知
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// 移除已到期的通知；每条独立计时
    pub fn prune_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items
            .retain(|n| now.duration_since(n.created_at) < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_three_most_recent() {
        let mut queue = NotificationQueue::default();
        for i in 0..5 {
            queue.push(NotifyKind::Info, format!("msg {i}"));
        }
        assert_eq!(queue.len(), 3);
        let messages: Vec<_> = queue.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_dismiss_by_id() {
        let mut queue = NotificationQueue::default();
        let keep = queue.push(NotifyKind::Success, "keep");
        let drop = queue.push(NotifyKind::Error, "drop");

        assert!(queue.dismiss(drop));
        assert!(!queue.dismiss(drop));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().id, keep);
    }

    #[test]
    fn test_expiry_is_per_item() {
        let mut queue = NotificationQueue::new(Duration::from_secs(4));
        queue.push(NotifyKind::Info, "old");

        let later = Instant::now() + Duration::from_secs(5);
        queue.prune_expired(later);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_unique_skips_pending_duplicate() {
        let mut queue = NotificationQueue::default();
        assert!(queue.push_unique(NotifyKind::Error, "boom").is_some());
        assert!(queue.push_unique(NotifyKind::Error, "boom").is_none());
        assert_eq!(queue.len(), 1);

        // 原通知消失后允许再次出现
        queue.prune_expired(Instant::now() + Duration::from_secs(5));
        assert!(queue.push_unique(NotifyKind::Error, "boom").is_some());
    }
}
