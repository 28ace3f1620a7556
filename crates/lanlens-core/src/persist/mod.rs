//! 持久化边界
//!
//! 统计快照与传输历史的整值读写，无部分更新、无事务。
//! 引擎对写入失败的策略是记日志继续跑，内存状态保持权威。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::EngineError;
use crate::session::{SessionStats, TransferHistoryItem};

/// 会话持久化接口
///
/// `load`/`save` 针对统计快照整体；历史列表只允许追加和整体清空。
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<SessionStats, EngineError>;
    fn save(&self, stats: &SessionStats) -> Result<(), EngineError>;
    fn append_history(&self, item: &TransferHistoryItem) -> Result<(), EngineError>;
    fn load_history(&self) -> Result<Vec<TransferHistoryItem>, EngineError>;
    fn clear_history(&self) -> Result<(), EngineError>;
}

/// 基于 JSON 文件的存储
///
/// 数据放在平台数据目录下的 `lanlens/`，统计与历史各一个文件。
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lanlens");
        Self { dir }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join("stats.json")
    }

    fn history_path(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), EngineError> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content)?;
        debug!("persisted {:?}", path);
        Ok(())
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Result<SessionStats, EngineError> {
        let path = self.stats_path();
        if !path.exists() {
            return Ok(SessionStats::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, stats: &SessionStats) -> Result<(), EngineError> {
        self.write_json(&self.stats_path(), stats)
    }

    fn append_history(&self, item: &TransferHistoryItem) -> Result<(), EngineError> {
        // 整值语义：读出整个列表，追加后整体写回
        let mut history = self.load_history()?;
        history.push(item.clone());
        self.write_json(&self.history_path(), &history)
    }

    fn load_history(&self) -> Result<Vec<TransferHistoryItem>, EngineError> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn clear_history(&self) -> Result<(), EngineError> {
        let path = self.history_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// 内存存储
///
/// 用于测试和不落盘的临时会话。
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    stats: SessionStats,
    history: Vec<TransferHistoryItem>,
    save_count: usize,
}

impl MemoryStore {
    /// 统计快照被写入的次数（写穿行为的观测点）
    pub fn save_count(&self) -> usize {
        self.inner.lock().expect("memory store poisoned").save_count
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<SessionStats, EngineError> {
        Ok(self.inner.lock().expect("memory store poisoned").stats)
    }

    fn save(&self, stats: &SessionStats) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.stats = *stats;
        inner.save_count += 1;
        Ok(())
    }

    fn append_history(&self, item: &TransferHistoryItem) -> Result<(), EngineError> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .history
            .push(item.clone());
        Ok(())
    }

    fn load_history(&self) -> Result<Vec<TransferHistoryItem>, EngineError> {
        Ok(self
            .inner
            .lock()
            .expect("memory store poisoned")
            .history
            .clone())
    }

    fn clear_history(&self) -> Result<(), EngineError> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .history
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{TransferDirection, TransferOutcome};

    fn item(filename: &str) -> TransferHistoryItem {
        TransferHistoryItem::new(
            filename,
            1024,
            TransferDirection::Received,
            TransferOutcome::Success,
            "tcp",
        )
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::with_dir(dir.path());

        // 缺失文件等价于零值
        assert_eq!(store.load().unwrap(), SessionStats::default());

        let stats = SessionStats {
            total_sent: 2,
            bytes_sent: 4096,
            ..SessionStats::default()
        };
        store.save(&stats).unwrap();
        assert_eq!(store.load().unwrap(), stats);
    }

    #[test]
    fn test_file_store_history_append_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::with_dir(dir.path());

        store.append_history(&item("a.bin")).unwrap();
        store.append_history(&item("b.bin")).unwrap();

        let history = store.load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].filename, "a.bin");
        assert_eq!(history[1].filename, "b.bin");

        store.clear_history().unwrap();
        assert!(store.load_history().unwrap().is_empty());
    }
}
