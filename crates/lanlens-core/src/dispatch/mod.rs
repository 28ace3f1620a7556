//! 调度器
//!
//! [`SessionEngine`] 持有每个组件的唯一实例，对每条入站消息做一次分类，
//! 并把产生的事件按固定顺序同步分发完毕，才处理下一条:
//!
//! 1. 原始日志缓冲（整行追加，结构化与否都收）
//! 2. 生命周期状态机
//! 3. 统计累加器
//! 4. 状态机副作用（历史条目、通知）
//! 5. 抓包记录表
//!
//! 数组载荷展开后逐元素走同一路径，保持数组顺序。
//! [`Subscription`] 是流的唯一订阅者，顺序消费，支持显式拆除。

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::capture::{CaptureTable, LogBuffer, ViewMode};
use crate::config::AppSettings;
use crate::error::EngineError;
use crate::event::{classify, CaptureRecord, DomainEvent};
use crate::notify::{NotificationQueue, NotifyKind};
use crate::persist::SessionStore;
use crate::process::TransferProcess;
use crate::session::{
    LifecycleStateMachine, SessionMode, SessionStats, SideEffect, StatsAccumulator,
    TransferHistoryItem,
};

/// 会话状态引擎
///
/// 单线程、同步、每个字段只通过自身契约变更；
/// 并发由外层的 [`Subscription`] 串行化，引擎内部无锁。
pub struct SessionEngine {
    lifecycle: LifecycleStateMachine,
    stats: StatsAccumulator,
    notifications: NotificationQueue,
    raw_log: LogBuffer,
    capture: CaptureTable,
    view: ViewMode,
    store: Arc<dyn SessionStore>,
}

impl SessionEngine {
    pub fn new(settings: &AppSettings, store: Arc<dyn SessionStore>) -> Self {
        Self {
            lifecycle: LifecycleStateMachine::new(SessionMode::default()),
            stats: StatsAccumulator::new(store.clone()),
            notifications: NotificationQueue::new(settings.notification_ttl()),
            raw_log: LogBuffer::new(settings.raw_log_capacity),
            capture: CaptureTable::new(settings.capture_capacity, settings.drop_while_paused),
            view: ViewMode::default(),
            store,
        }
    }

    /// 处理一行入站消息
    ///
    /// 不做去重：同一行重复投递会重复记账，这是约定行为。
    pub fn handle_line(&mut self, line: &str) {
        self.raw_log.push(line);
        for event in classify(line) {
            self.deliver(&event);
        }
    }

    /// 处理旁路通道直接送达的抓包记录
    pub fn handle_record(&mut self, record: CaptureRecord) {
        self.capture.push(record);
    }

    fn deliver(&mut self, event: &DomainEvent) {
        let effects = self.lifecycle.on_event(event);
        self.stats.apply(event, self.lifecycle.mode().direction());
        self.run_effects(effects);
        if let DomainEvent::Capture(record) = event {
            self.capture.push(record.clone());
        }
    }

    fn run_effects(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::Notify { kind, message } => {
                    // 错误通知按文本去重，避免同一故障刷屏
                    if kind == NotifyKind::Error {
                        self.notifications.push_unique(kind, message);
                    } else {
                        self.notifications.push(kind, message);
                    }
                }
                SideEffect::RecordHistory(item) => {
                    if let Err(e) = self.store.append_history(&item) {
                        warn!("failed to persist history item: {e}");
                    }
                }
            }
        }
    }

    /// 显式停止：硬取消，不等待在途传输
    pub fn stop(&mut self) {
        let effects = self.lifecycle.stop();
        self.run_effects(effects);
    }

    /// 切换工作模式；忙碌时返回 [`EngineError::ModeBusy`]
    pub fn switch_mode(&mut self, mode: SessionMode) -> Result<(), EngineError> {
        self.lifecycle.switch_mode(mode)
    }

    /// 周期性维护：目前只负责通知过期
    pub fn tick(&mut self, now: Instant) {
        self.notifications.prune_expired(now);
    }

    pub fn dismiss_notification(&mut self, id: Uuid) -> bool {
        self.notifications.dismiss(id)
    }

    /// 切换展示模式；不触碰任何缓冲区
    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn lifecycle(&self) -> &LifecycleStateMachine {
        &self.lifecycle
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn raw_log(&self) -> &LogBuffer {
        &self.raw_log
    }

    pub fn raw_log_mut(&mut self) -> &mut LogBuffer {
        &mut self.raw_log
    }

    pub fn capture(&self) -> &CaptureTable {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut CaptureTable {
        &mut self.capture
    }

    pub fn history(&self) -> Result<Vec<TransferHistoryItem>, EngineError> {
        self.store.load_history()
    }

    pub fn clear_history(&self) -> Result<(), EngineError> {
        self.store.clear_history()
    }
}

/// 订阅者可下发的控制命令，与流消息在同一队列中顺序处理
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// 硬停止当前会话，并请求外部进程退出
    Stop,
    SwitchMode(SessionMode),
    /// 结束订阅任务
    Shutdown,
}

/// 消息流的唯一订阅
///
/// 持有引擎与两条入站通道（文本行 + 旁路抓包记录），
/// 在单个任务里逐条处理，处理完一条才取下一条。
/// 拆除是显式的: [`Subscription::shutdown`] 归还引擎供最终检视。
pub struct Subscription {
    commands: mpsc::Sender<EngineCommand>,
    task: JoinHandle<SessionEngine>,
}

impl Subscription {
    pub fn spawn(
        mut engine: SessionEngine,
        mut lines: mpsc::Receiver<String>,
        mut records: mpsc::Receiver<CaptureRecord>,
        process: Option<Arc<dyn TransferProcess>>,
    ) -> Self {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<EngineCommand>(16);

        let task = tokio::spawn(async move {
            let mut lines_open = true;
            let mut records_open = true;
            // 静默流上也要驱动通知过期，不能只依赖消息到达
            let mut maintenance = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = maintenance.tick() => {}
                    cmd = cmd_rx.recv() => match cmd {
                        Some(EngineCommand::Stop) => {
                            engine.stop();
                            if let Some(process) = process.clone() {
                                // 即发即忘: 失败记日志，不重试
                                tokio::spawn(async move {
                                    if let Err(e) = process.stop().await {
                                        warn!("stop request to external process failed: {e:#}");
                                    }
                                });
                            }
                        }
                        Some(EngineCommand::SwitchMode(mode)) => {
                            if let Err(e) = engine.switch_mode(mode) {
                                warn!("{e}");
                            }
                        }
                        Some(EngineCommand::Shutdown) | None => break,
                    },
                    line = lines.recv(), if lines_open => match line {
                        Some(line) => engine.handle_line(&line),
                        None => lines_open = false,
                    },
                    record = records.recv(), if records_open => match record {
                        Some(record) => engine.handle_record(record),
                        None => records_open = false,
                    },
                }
                engine.tick(Instant::now());
                if !lines_open && !records_open {
                    break;
                }
            }
            // 退出路径（Shutdown/通道关闭）也收一次尾
            engine.tick(Instant::now());
            engine
        });

        Self {
            commands: cmd_tx,
            task,
        }
    }

    /// 控制命令发送端，可克隆给驱动方
    pub fn commands(&self) -> mpsc::Sender<EngineCommand> {
        self.commands.clone()
    }

    /// 停止会话（命令入队，与流消息保序）
    pub async fn stop(&self) {
        let _ = self.commands.send(EngineCommand::Stop).await;
    }

    /// 等待流自然结束（两条入站通道都关闭）并取回引擎
    pub async fn join(self) -> anyhow::Result<SessionEngine> {
        Ok(self.task.await?)
    }

    /// 拆除订阅并取回引擎
    pub async fn shutdown(self) -> anyhow::Result<SessionEngine> {
        // 任务可能已随流结束自行退出，发送失败无需处理
        let _ = self.commands.send(EngineCommand::Shutdown).await;
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use crate::session::LinkState;

    fn engine_with(store: Arc<MemoryStore>) -> SessionEngine {
        SessionEngine::new(&AppSettings::default(), store)
    }

    #[test]
    fn test_fan_out_order_single_line() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with(store.clone());

        engine.handle_line(r#"{"type":"SERVER_READY","port":9000}"#);
        engine.handle_line(r#"{"type":"TRANSFER_UPDATE","status":"start","filename":"a.bin","total":100}"#);
        engine.handle_line(r#"{"type":"TRANSFER_UPDATE","status":"complete","filename":"a.bin"}"#);

        // 每行都进原始日志；事件同时驱动了状态机、统计与历史
        assert_eq!(engine.raw_log().len(), 3);
        assert_eq!(engine.lifecycle().state(), LinkState::Listening);
        assert_eq!(engine.stats().total_received, 1);
        assert_eq!(store.load_history().unwrap().len(), 1);
    }

    #[test]
    fn test_plain_text_only_reaches_raw_log() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with(store.clone());

        engine.handle_line("SERVER_READY on port 9000");

        assert_eq!(engine.raw_log().len(), 1);
        assert_eq!(engine.lifecycle().state(), LinkState::Offline);
        assert_eq!(engine.stats(), SessionStats::default());
        assert!(engine.notifications().is_empty());
    }

    #[test]
    fn test_view_switch_does_not_touch_buffers() {
        let mut engine = engine_with(Arc::new(MemoryStore::default()));
        engine.handle_line("a line");
        engine.handle_record(CaptureRecord::default());

        engine.set_view(ViewMode::Raw);
        engine.set_view(ViewMode::Table);

        assert_eq!(engine.raw_log().len(), 1);
        assert_eq!(engine.capture().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_sequential_consumption() {
        let store = Arc::new(MemoryStore::default());
        let engine = engine_with(store.clone());

        let (line_tx, line_rx) = mpsc::channel(64);
        let (_record_tx, record_rx) = mpsc::channel(64);
        let subscription = Subscription::spawn(engine, line_rx, record_rx, None);

        line_tx
            .send(r#"{"type":"SERVER_READY","port":9000}"#.to_string())
            .await
            .unwrap();
        for _ in 0..3 {
            line_tx
                .send(
                    r#"[{"type":"TRANSFER_UPDATE","status":"start","filename":"f"},{"type":"TRANSFER_UPDATE","status":"complete","filename":"f"}]"#
                        .to_string(),
                )
                .await
                .unwrap();
        }
        drop(line_tx);
        drop(_record_tx);

        let engine = subscription.shutdown().await.unwrap();
        assert_eq!(engine.stats().total_received, 3);
        assert_eq!(store.load_history().unwrap().len(), 3);
        assert_eq!(engine.raw_log().len(), 4);
    }

    /// 流静默时通知也会按 TTL 过期，不依赖后续消息到达
    #[tokio::test]
    async fn test_notifications_expire_on_quiet_stream() {
        let settings = AppSettings {
            notification_ttl_secs: 1,
            ..AppSettings::default()
        };
        let engine = SessionEngine::new(&settings, Arc::new(MemoryStore::default()));
        let (line_tx, line_rx) = mpsc::channel(8);
        let (record_tx, record_rx) = mpsc::channel(8);
        let subscription = Subscription::spawn(engine, line_rx, record_rx, None);

        line_tx
            .send(r#"{"type":"ERROR","message":"boom"}"#.to_string())
            .await
            .unwrap();

        // TTL 之后保持静默，没有任何新消息驱动引擎
        tokio::time::sleep(Duration::from_millis(2500)).await;
        drop(line_tx);
        drop(record_tx);

        let engine = subscription.join().await.unwrap();
        assert!(engine.notifications().is_empty());
        assert_eq!(engine.lifecycle().state(), LinkState::Errored);
    }

    #[tokio::test]
    async fn test_subscription_stop_command() {
        let engine = engine_with(Arc::new(MemoryStore::default()));
        let (line_tx, line_rx) = mpsc::channel(8);
        let (_record_tx, record_rx) = mpsc::channel(8);
        let subscription = Subscription::spawn(engine, line_rx, record_rx, None);

        line_tx
            .send(r#"{"type":"SERVER_READY","port":9000}"#.to_string())
            .await
            .unwrap();
        // 等待消息被消费后再下发停止命令，避免与流消息竞争
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        subscription.stop().await;

        let engine = subscription.shutdown().await.unwrap();
        assert_eq!(engine.lifecycle().state(), LinkState::Offline);
        assert!(!engine.lifecycle().is_busy());
    }
}
