//! 抓包记录表
//!
//! 只接收结构化抓包记录。暂停期间到达的记录默认直接丢弃
//! （不缓存、恢复后不补放），该行为可通过配置改为暂停期间照常入表。
//! 清空是独立于暂停的显式操作。

use std::collections::VecDeque;

use crate::event::CaptureRecord;

/// 默认保留记录数上限
pub const DEFAULT_CAPACITY: usize = 10_000;

/// 抓包记录缓冲
#[derive(Debug)]
pub struct CaptureTable {
    records: VecDeque<CaptureRecord>,
    capacity: usize,
    paused: bool,
    /// true: 暂停期间丢弃记录；false: 暂停只冻结视图，记录照常入表
    drop_while_paused: bool,
}

impl Default for CaptureTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, true)
    }
}

impl CaptureTable {
    pub fn new(capacity: usize, drop_while_paused: bool) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
            paused: false,
            drop_while_paused,
        }
    }

    /// 追加一条记录；返回是否实际入表
    pub fn push(&mut self, record: CaptureRecord) -> bool {
        if self.paused && self.drop_while_paused {
            return false;
        }
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
