//! 消息分类器
//!
//! 把外部进程的一行文本变成一个或多个 [`DomainEvent`]：
//! 1. 先尝试按 JSON 解码；失败即为纯文本，不是错误
//! 2. 顶层数组按元素顺序逐个分类
//! 3. 解码成功但缺少已知 `type` 判别字段的值同样降级为纯文本
//!
//! 本模块不向外抛任何错误。

use serde::Deserialize;
use serde_json::Value;

use super::{CaptureRecord, DomainEvent, TransferPhase};

/// 线上结构化载荷
///
/// 与外部进程约定的消息格式，`type` 字段为判别符。
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WirePayload {
    #[serde(rename = "SERVER_READY", rename_all = "camelCase")]
    ServerReady {
        port: u16,
        #[serde(default)]
        total_sent: Option<u64>,
        #[serde(default)]
        total_received: Option<u64>,
        #[serde(default)]
        bytes_delta: Option<u64>,
    },
    #[serde(rename = "TRANSFER_UPDATE", rename_all = "camelCase")]
    TransferUpdate {
        status: TransferPhase,
        filename: String,
        #[serde(default)]
        current: Option<u64>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        bytes_delta: Option<u64>,
    },
    #[serde(rename = "ERROR")]
    Error { message: String },
    #[serde(rename = "CAPTURE")]
    Capture {
        #[serde(flatten)]
        record: CaptureRecord,
    },
}

impl From<WirePayload> for DomainEvent {
    fn from(payload: WirePayload) -> Self {
        match payload {
            WirePayload::ServerReady {
                port,
                total_sent,
                total_received,
                bytes_delta,
            } => DomainEvent::ServerReady {
                port,
                total_sent,
                total_received,
                bytes_delta,
            },
            WirePayload::TransferUpdate {
                status,
                filename,
                current,
                total,
                bytes_delta,
            } => DomainEvent::TransferUpdate {
                phase: status,
                filename,
                current,
                total,
                bytes_delta,
            },
            WirePayload::Error { message } => DomainEvent::Error { message },
            WirePayload::Capture { record } => DomainEvent::Capture(record),
        }
    }
}

/// 对一行原始消息分类
///
/// 返回值保证非空：无法识别时至少包含一个 `PlainText`。
pub fn classify(line: &str) -> Vec<DomainEvent> {
    let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
        return vec![plain(line)];
    };

    match value {
        Value::Array(items) if !items.is_empty() => {
            items.into_iter().map(classify_value).collect()
        }
        // 空数组没有可展开的元素，整行保留为纯文本
        Value::Array(_) => vec![plain(line)],
        other => match try_structured(other) {
            Some(event) => vec![event],
            None => vec![plain(line)],
        },
    }
}

/// 分类数组中的单个元素
///
/// 元素无法识别时，以该元素自身的 JSON 文本作为纯文本保留。
fn classify_value(value: Value) -> DomainEvent {
    let fallback = value.to_string();
    match try_structured(value) {
        Some(event) => event,
        None => DomainEvent::PlainText { text: fallback },
    }
}

fn try_structured(value: Value) -> Option<DomainEvent> {
    serde_json::from_value::<WirePayload>(value)
        .ok()
        .map(DomainEvent::from)
}

fn plain(line: &str) -> DomainEvent {
    DomainEvent::PlainText {
        text: line.to_string(),
    }
}
