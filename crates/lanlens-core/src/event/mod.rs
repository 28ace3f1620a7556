//! 领域事件模块
//!
//! 外部进程推送的每一行消息经分类后成为 [`DomainEvent`]。
//! 无法识别的输入一律降级为 `PlainText`，分类过程永不失败。

pub mod classifier;

pub use classifier::classify;

use serde::{Deserialize, Serialize};

/// 传输阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPhase {
    Start,
    Progress,
    Complete,
}

/// 抓包记录
///
/// 由抓包探针以 JSON 形式推送。所有字段带默认值，
/// 以容忍不同版本探针发来的部分记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRecord {
    pub timestamp: String,
    pub src: String,
    pub dst: String,
    pub protocol: String,
    pub length: u64,
    pub info: String,
    pub flags: Option<String>,
    pub seq: Option<u64>,
    pub ack: Option<u64>,
}

/// 分类后的领域事件
///
/// 每条原始消息至少产生一个事件；数组载荷按原始顺序展开为多个。
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// 外部进程就绪，开始监听
    ///
    /// 载荷可携带绝对的累计次数（用于恢复会话），
    /// 出现时直接覆盖本地计数；字节数只接受增量。
    ServerReady {
        port: u16,
        total_sent: Option<u64>,
        total_received: Option<u64>,
        bytes_delta: Option<u64>,
    },
    /// 传输进度更新
    TransferUpdate {
        phase: TransferPhase,
        filename: String,
        current: Option<u64>,
        total: Option<u64>,
        /// 自上次更新以来新增的字节数（增量，非绝对值）
        bytes_delta: Option<u64>,
    },
    /// 抓包记录（通常走独立通道，也可能内联在文本流中）
    Capture(CaptureRecord),
    /// 外部进程上报的错误
    Error { message: String },
    /// 未识别的纯文本行，原样保留给原始日志视图
    PlainText { text: String },
}
