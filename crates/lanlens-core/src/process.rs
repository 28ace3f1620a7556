//! 外部进程协作接口
//!
//! 引擎只消费外部传输/抓包进程的输出流，不负责启动它。
//! 对外的两个调用: 请求停止（即发即忘）与枚举局域网对端。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 局域网对端信息
///
/// 仅用于填充目标配置界面，不参与流重建。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl PeerInfo {
    /// 展示用标签：有主机名用主机名，否则用地址
    pub fn label(&self) -> String {
        match &self.hostname {
            Some(name) => format!("{name} ({}:{})", self.address, self.port),
            None => format!("{}:{}", self.address, self.port),
        }
    }
}

/// 外部传输/抓包进程的控制面
#[async_trait]
pub trait TransferProcess: Send + Sync {
    /// 请求外部进程停止
    ///
    /// 调用方即发即忘：失败只记日志，不重试，不阻塞流处理。
    async fn stop(&self) -> anyhow::Result<()>;

    /// 枚举局域网对端（地址 + 端口 + 可选主机名）
    async fn scan_peers(&self) -> anyhow::Result<Vec<PeerInfo>>;
}
