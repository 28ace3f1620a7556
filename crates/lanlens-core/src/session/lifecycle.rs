//! 连接/传输生命周期状态机
//!
//! 状态: `Offline → Listening → Active → Offline|Errored`
//!
//! 状态机本身不触碰其它组件的存储，转移产生的副作用
//! （通知、历史条目）以 [`SideEffect`] 列表形式返回，由调度器执行。

use log::debug;

use crate::error::EngineError;
use crate::event::{DomainEvent, TransferPhase};
use crate::notify::NotifyKind;
use super::{SessionMode, TransferHistoryItem, TransferOutcome};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Offline,
    /// 接收端/代理已就绪，等待连接
    Listening,
    /// 传输进行中
    Active,
    Errored,
}

impl LinkState {
    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Offline => "offline",
            LinkState::Listening => "listening",
            LinkState::Active => "active",
            LinkState::Errored => "errored",
        }
    }
}

/// 状态转移产生的副作用，由调度器按序执行
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Notify { kind: NotifyKind, message: String },
    RecordHistory(TransferHistoryItem),
}

/// 生命周期状态机
#[derive(Debug, Default)]
pub struct LifecycleStateMachine {
    mode: SessionMode,
    state: LinkState,
    busy: bool,
    /// 当前传输的文件名与最近一次上报的大小，用于生成历史条目
    current_file: Option<String>,
    current_size: u64,
}

impl LifecycleStateMachine {
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// 忙碌标志：对外可见，用于 UI 阻止模式切换
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// 切换工作模式
    ///
    /// 监听中或传输中必须先显式停止，不允许静默排队切换。
    pub fn switch_mode(&mut self, mode: SessionMode) -> Result<(), EngineError> {
        if self.busy || matches!(self.state, LinkState::Listening | LinkState::Active) {
            return Err(EngineError::ModeBusy {
                state: self.state.name(),
            });
        }
        debug!("mode switch: {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;
        self.state = LinkState::Offline;
        Ok(())
    }

    /// 处理一个分类后的事件，返回待执行的副作用
    pub fn on_event(&mut self, event: &DomainEvent) -> Vec<SideEffect> {
        match event {
            DomainEvent::ServerReady { port, .. } => {
                self.state = LinkState::Listening;
                self.busy = true;
                vec![SideEffect::Notify {
                    kind: NotifyKind::Info,
                    message: format!("已就绪，监听端口 {port}"),
                }]
            }
            DomainEvent::TransferUpdate {
                phase: TransferPhase::Start,
                filename,
                total,
                ..
            } => {
                self.state = LinkState::Active;
                self.busy = true;
                self.current_file = Some(filename.clone());
                self.current_size = total.unwrap_or(0);
                vec![]
            }
            DomainEvent::TransferUpdate {
                phase: TransferPhase::Progress,
                current,
                total,
                ..
            } => {
                // 进度消息可能乱序或迟到，只刷新已知大小，不强行改状态
                if let Some(total) = total {
                    self.current_size = *total;
                } else if let Some(current) = current {
                    self.current_size = self.current_size.max(*current);
                }
                vec![]
            }
            DomainEvent::TransferUpdate {
                phase: TransferPhase::Complete,
                filename,
                current,
                total,
                ..
            } => self.complete_transfer(filename, total.or(*current)),
            DomainEvent::Error { message } => {
                self.state = LinkState::Errored;
                self.busy = false;
                self.current_file = None;
                vec![SideEffect::Notify {
                    kind: NotifyKind::Error,
                    message: message.clone(),
                }]
            }
            DomainEvent::Capture(_) | DomainEvent::PlainText { .. } => vec![],
        }
    }

    /// 显式停止：无条件回到 `Offline`，正在进行的传输按取消记账
    pub fn stop(&mut self) -> Vec<SideEffect> {
        let mut effects = Vec::new();
        if self.state == LinkState::Active {
            if let Some(filename) = self.current_file.take() {
                effects.push(SideEffect::RecordHistory(TransferHistoryItem::new(
                    filename,
                    self.current_size,
                    self.mode.direction(),
                    TransferOutcome::Cancelled,
                    self.mode.protocol(),
                )));
            }
        }
        self.state = LinkState::Offline;
        self.busy = false;
        self.current_file = None;
        self.current_size = 0;
        effects
    }

    fn complete_transfer(&mut self, filename: &str, size: Option<u64>) -> Vec<SideEffect> {
        // 接收端/代理回到监听态继续接收，发送端回到离线
        match self.mode {
            SessionMode::Receive | SessionMode::Intercept => {
                self.state = LinkState::Listening;
            }
            SessionMode::Send => {
                self.state = LinkState::Offline;
                self.busy = false;
            }
        }
        let size = size.unwrap_or(self.current_size);
        self.current_file = None;
        self.current_size = 0;
        vec![
            SideEffect::RecordHistory(TransferHistoryItem::new(
                filename,
                size,
                self.mode.direction(),
                TransferOutcome::Success,
                self.mode.protocol(),
            )),
            SideEffect::Notify {
                kind: NotifyKind::Success,
                message: format!("传输完成: {filename}"),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TransferDirection;

    fn ready() -> DomainEvent {
        DomainEvent::ServerReady {
            port: 9000,
            total_sent: None,
            total_received: None,
            bytes_delta: None,
        }
    }

    fn update(phase: TransferPhase) -> DomainEvent {
        DomainEvent::TransferUpdate {
            phase,
            filename: "photo.jpg".to_string(),
            current: None,
            total: Some(2048),
            bytes_delta: None,
        }
    }

    #[test]
    fn test_receiver_round_trip() {
        let mut machine = LifecycleStateMachine::new(SessionMode::Receive);

        machine.on_event(&ready());
        assert_eq!(machine.state(), LinkState::Listening);
        assert!(machine.is_busy());

        machine.on_event(&update(TransferPhase::Start));
        assert_eq!(machine.state(), LinkState::Active);

        let effects = machine.on_event(&update(TransferPhase::Complete));
        // 接收端完成后回到监听态，继续接收下一个文件
        assert_eq!(machine.state(), LinkState::Listening);
        assert!(machine.is_busy());

        let history: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                SideEffect::RecordHistory(item) => Some(item),
                SideEffect::Notify { .. } => None,
            })
            .collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].direction, TransferDirection::Received);
        assert_eq!(history[0].status, TransferOutcome::Success);
        assert_eq!(history[0].size, 2048);
    }

    #[test]
    fn test_sender_goes_offline_after_complete() {
        let mut machine = LifecycleStateMachine::new(SessionMode::Send);
        machine.on_event(&update(TransferPhase::Start));
        machine.on_event(&update(TransferPhase::Complete));
        assert_eq!(machine.state(), LinkState::Offline);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_error_from_any_state() {
        for warmup in [None, Some(ready()), Some(update(TransferPhase::Start))] {
            let mut machine = LifecycleStateMachine::new(SessionMode::Receive);
            if let Some(event) = warmup {
                machine.on_event(&event);
            }
            let effects = machine.on_event(&DomainEvent::Error {
                message: "boom".to_string(),
            });
            assert_eq!(machine.state(), LinkState::Errored);
            assert!(!machine.is_busy());
            assert_eq!(
                effects,
                vec![SideEffect::Notify {
                    kind: NotifyKind::Error,
                    message: "boom".to_string(),
                }]
            );
        }
    }

    #[test]
    fn test_switch_blocked_while_busy() {
        let mut machine = LifecycleStateMachine::new(SessionMode::Receive);
        machine.on_event(&ready());

        let err = machine.switch_mode(SessionMode::Send).unwrap_err();
        assert!(matches!(err, EngineError::ModeBusy { state: "listening" }));

        // 停止后切换立即生效
        machine.stop();
        machine.switch_mode(SessionMode::Send).unwrap();
        assert_eq!(machine.mode(), SessionMode::Send);
        assert_eq!(machine.state(), LinkState::Offline);
    }

    #[test]
    fn test_stop_cancels_in_flight_transfer() {
        let mut machine = LifecycleStateMachine::new(SessionMode::Receive);
        machine.on_event(&ready());
        machine.on_event(&update(TransferPhase::Start));

        let effects = machine.stop();
        assert_eq!(machine.state(), LinkState::Offline);
        assert!(!machine.is_busy());
        match effects.as_slice() {
            [SideEffect::RecordHistory(item)] => {
                assert_eq!(item.status, TransferOutcome::Cancelled);
                assert_eq!(item.filename, "photo.jpg");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }
}
