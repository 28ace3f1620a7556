//! Lanlens CLI
//!
//! 命令行前端: 启动（或接上）外部传输/抓包进程，
//! 把它的输出流喂给会话引擎，结束时打印会话摘要。

mod child;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use lanlens_core::{
    AppSettings, CaptureRecord, EngineCommand, JsonFileStore, SessionEngine, SessionMode,
    SessionStore, Subscription, TransferProcess,
};

#[derive(Parser)]
#[command(name = "lanlens", version, about = "局域网传输/抓包会话监视器")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Receive,
    Send,
    Intercept,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Receive => SessionMode::Receive,
            ModeArg::Send => SessionMode::Send,
            ModeArg::Intercept => SessionMode::Intercept,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 监视外部进程的消息流（不给命令则读标准输入）
    Watch {
        /// 工作模式
        #[arg(short, long, value_enum, default_value = "receive")]
        mode: ModeArg,
        /// 要启动的外部命令及参数
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// 查看累计统计
    Stats,
    /// 查看传输历史
    History {
        /// 清空历史
        #[arg(long)]
        clear: bool,
    },
    /// 枚举局域网对端
    Peers {
        /// 提供 `--peers` 输出的外部程序
        program: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（lanlens-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lanlens_core=debug")),
        )
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Watch { mode, command } => watch(mode.into(), command).await,
        Commands::Stats => {
            let stats = JsonFileStore::new().load()?;
            println!("📊 会话统计");
            println!("   已发送: {} 次 / {} 字节", stats.total_sent, stats.bytes_sent);
            println!(
                "   已接收: {} 次 / {} 字节",
                stats.total_received, stats.bytes_received
            );
            Ok(())
        }
        Commands::History { clear } => {
            let store = JsonFileStore::new();
            if clear {
                store.clear_history()?;
                println!("🗑️  历史已清空");
                return Ok(());
            }
            let history = store.load_history()?;
            if history.is_empty() {
                println!("   暂无传输历史");
            }
            for item in history {
                println!(
                    "   {} {:?} {} ({} 字节, {:?}, {})",
                    item.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    item.direction,
                    item.filename,
                    item.size,
                    item.status,
                    item.protocol,
                );
            }
            Ok(())
        }
        Commands::Peers { program } => {
            println!("🔍 枚举对端...");
            let peers = child::scan_peers_once(&program).await?;
            if peers.is_empty() {
                println!("   未发现对端");
            }
            for (i, peer) in peers.iter().enumerate() {
                println!("   {}. {}", i + 1, peer.label());
            }
            Ok(())
        }
    }
}

async fn watch(mode: SessionMode, command: Vec<String>) -> Result<()> {
    let settings = AppSettings::load();
    let store = Arc::new(JsonFileStore::new());
    let mut engine = SessionEngine::new(&settings, store);
    engine.switch_mode(mode)?;

    // CLI 没有旁路抓包通道；发送端立即丢弃即视为通道关闭
    let (_record_tx, record_rx) = mpsc::channel::<CaptureRecord>(1);
    drop(_record_tx);

    let (process, line_rx): (Option<Arc<dyn TransferProcess>>, _) = if command.is_empty() {
        println!("📥 从标准输入读取消息流 (Ctrl-D 结束)");
        (None, child::stdin_lines())
    } else {
        println!("🚀 启动: {}", command.join(" "));
        let (process, rx) = child::ChildProcess::spawn(&command)?;
        (Some(process), rx)
    };

    let subscription = Subscription::spawn(engine, line_rx, record_rx, process);

    // Ctrl-C 触发硬停止；子进程被 kill 后输出流关闭，订阅自然结束
    let commands = subscription.commands();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping session");
            let _ = commands.send(EngineCommand::Stop).await;
        }
    });

    let engine = subscription.join().await?;
    print_summary(&engine);
    Ok(())
}

fn print_summary(engine: &SessionEngine) {
    let stats = engine.stats();
    println!();
    println!("📊 会话结束 ({})", engine.lifecycle().state().name());
    println!("   已发送: {} 次 / {} 字节", stats.total_sent, stats.bytes_sent);
    println!(
        "   已接收: {} 次 / {} 字节",
        stats.total_received, stats.bytes_received
    );
    println!(
        "   原始日志: {} 行 / {} 页, 抓包记录: {} 条",
        engine.raw_log().len(),
        engine.raw_log().total_pages(),
        engine.capture().len(),
    );
    for notification in engine.notifications().iter() {
        println!("   🔔 {}", notification.message);
    }
}
