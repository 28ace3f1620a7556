//! 会话模块
//!
//! 包含:
//! - 连接/传输生命周期状态机
//! - 累计流量统计
//! - 传输历史条目定义

pub mod lifecycle;
pub mod stats;

pub use lifecycle::{LifecycleStateMachine, LinkState, SideEffect};
pub use stats::{SessionStats, StatsAccumulator};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 工作模式
///
/// 同一时刻只有一个模式处于激活状态；忙碌时切换会被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// 接收端：监听并接收文件
    #[default]
    Receive,
    /// 发送端：向对端推送文件
    Send,
    /// 拦截代理：旁路观察流量
    Intercept,
}

impl SessionMode {
    /// 该模式下完成的传输记账方向
    pub fn direction(&self) -> TransferDirection {
        match self {
            SessionMode::Send => TransferDirection::Sent,
            SessionMode::Receive | SessionMode::Intercept => TransferDirection::Received,
        }
    }

    /// 写入历史条目的协议标签
    pub fn protocol(&self) -> &'static str {
        match self {
            SessionMode::Receive | SessionMode::Send => "tcp",
            SessionMode::Intercept => "proxy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionMode::Receive => "receive",
            SessionMode::Send => "send",
            SessionMode::Intercept => "intercept",
        }
    }
}

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Sent,
    Received,
}

/// 传输结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    Success,
    Cancelled,
    Error,
}

/// 传输历史条目
///
/// 每次完成/取消的传输生成一条，之后不可变；
/// 只能整体追加到持久化列表或整体清空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub size: u64,
    pub direction: TransferDirection,
    pub status: TransferOutcome,
    pub protocol: String,
}

impl TransferHistoryItem {
    pub fn new(
        filename: impl Into<String>,
        size: u64,
        direction: TransferDirection,
        status: TransferOutcome,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            filename: filename.into(),
            size,
            direction,
            status,
            protocol: protocol.into(),
        }
    }
}
