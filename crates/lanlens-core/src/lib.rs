//! Lanlens Core Library
//!
//! 局域网传输/抓包工具的会话状态引擎。消费外部进程推送的
//! 行分隔状态消息流，分类后并行维护四份面向 UI 的状态:
//! 连接/传输生命周期、累计流量统计、有界通知队列、分页抓包视图。
//!
//! # 模块
//!
//! - **event**: 消息分类器与领域事件定义
//! - **session**: 生命周期状态机、流量统计、传输历史
//! - **notify**: 有界自动过期的通知队列
//! - **capture**: 原始日志缓冲（分页 + 尾随）与抓包记录表
//! - **dispatch**: 调度器，单订阅、按序扇出
//! - **persist**: 统计/历史的整值持久化边界
//! - **process**: 外部进程控制面（停止、对端枚举）
//!
//! # 使用示例
//!
//! ```ignore
//! use lanlens_core::{AppSettings, JsonFileStore, SessionEngine, Subscription};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! // 1. 装配引擎
//! let settings = AppSettings::load();
//! let engine = SessionEngine::new(&settings, Arc::new(JsonFileStore::new()));
//!
//! // 2. 接上外部进程的两条通道并订阅
//! let (line_tx, line_rx) = mpsc::channel(256);
//! let (record_tx, record_rx) = mpsc::channel(256);
//! let subscription = Subscription::spawn(engine, line_rx, record_rx, None);
//!
//! // 3. 外部进程的每行输出推给 line_tx ...
//!
//! // 4. 拆除订阅，取回引擎做最终检视
//! let engine = subscription.shutdown().await?;
//! println!("received {} files", engine.stats().total_received);
//! ```

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod notify;
pub mod persist;
pub mod process;
pub mod session;

// Event re-exports
pub use event::{classify, CaptureRecord, DomainEvent, TransferPhase};

// Session re-exports
pub use session::{
    LifecycleStateMachine, LinkState, SessionMode, SessionStats, StatsAccumulator,
    TransferDirection, TransferHistoryItem, TransferOutcome,
};

// Notification re-exports
pub use notify::{Notification, NotificationQueue, NotifyKind};

// Capture re-exports
pub use capture::{CaptureTable, LogBuffer, ViewMode, PAGE_SIZE};

// Dispatch re-exports
pub use dispatch::{EngineCommand, SessionEngine, Subscription};

// Persistence / collaborator re-exports
pub use config::AppSettings;
pub use error::EngineError;
pub use persist::{JsonFileStore, MemoryStore, SessionStore};
pub use process::{PeerInfo, TransferProcess};
