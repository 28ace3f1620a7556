//! 引擎错误类型

use thiserror::Error;

/// 核心引擎的可预期失败
///
/// 畸形输入不在此列——分类器把它降级为纯文本，不报错。
#[derive(Debug, Error)]
pub enum EngineError {
    /// 会话忙碌（监听中或传输中）时拒绝切换模式
    #[error("session is busy ({state}), stop it before switching mode")]
    ModeBusy { state: &'static str },

    /// 持久化 I/O 失败
    #[error("persistence i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// 持久化数据编解码失败
    #[error("persistence encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
