//! 外部进程驱动
//!
//! 启动传输/抓包进程，把它的标准输出逐行转发给引擎订阅，
//! 并实现停止/对端枚举两个控制面调用。

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};

use lanlens_core::{PeerInfo, TransferProcess};

/// 被监视的外部进程
pub struct ChildProcess {
    program: String,
    child: Mutex<Option<Child>>,
}

impl ChildProcess {
    /// 启动命令并返回其标准输出的行通道
    ///
    /// 子进程退出（或被 kill）后通道关闭，订阅随之自然结束。
    pub fn spawn(command: &[String]) -> Result<(Arc<Self>, mpsc::Receiver<String>)> {
        let (program, args) = command.split_first().context("empty watch command")?;
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn '{program}'"))?;
        let stdout = child.stdout.take().context("child stdout unavailable")?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        let process = Arc::new(Self {
            program: program.clone(),
            child: Mutex::new(Some(child)),
        });
        Ok((process, rx))
    }
}

#[async_trait]
impl TransferProcess for ChildProcess {
    async fn stop(&self) -> Result<()> {
        if let Some(mut child) = self.child.lock().await.take() {
            child.kill().await.context("failed to kill child process")?;
        }
        Ok(())
    }

    async fn scan_peers(&self) -> Result<Vec<PeerInfo>> {
        scan_peers_once(&self.program).await
    }
}

/// 单次对端枚举: 调用外部程序的 `--peers` 并解析 JSON 数组
pub async fn scan_peers_once(program: &str) -> Result<Vec<PeerInfo>> {
    let output = Command::new(program)
        .arg("--peers")
        .output()
        .await
        .with_context(|| format!("failed to run '{program} --peers'"))?;
    if !output.status.success() {
        anyhow::bail!("'{program} --peers' exited with {}", output.status);
    }
    serde_json::from_slice(&output.stdout).context("invalid peer list payload")
}

/// 把本进程的标准输入作为消息流（调试用）
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}
