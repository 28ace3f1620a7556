//! 原始日志缓冲与分页视图
//!
//! 追加语义 + 尾随规则: 每追加一行，若读者停在（或越过）追加前的
//! 最后一页，就把读者推进到追加后的最后一页；手动翻离尾部的读者
//! 停在原页不动。该规则对每一次追加都成立，不只针对批量。
//!
//! 保留量由环形容量限制；淘汰最旧行时不移动读者。

use std::collections::VecDeque;

/// 每页行数
pub const PAGE_SIZE: usize = 50;

/// 默认保留行数上限
pub const DEFAULT_CAPACITY: usize = 10_000;

/// 原始日志缓冲
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    /// 当前页，1 起始；空缓冲时停在第 1 页
    page: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(PAGE_SIZE),
            page: 1,
        }
    }

    /// 追加一行并应用尾随规则
    pub fn push(&mut self, line: impl Into<String>) {
        let prev_pages = Self::pages_for(self.lines.len());
        self.lines.push_back(line.into());
        let new_pages = Self::pages_for(self.lines.len());

        if self.page >= prev_pages {
            self.page = new_pages.max(1);
        }

        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
        self.page = self.page.min(self.total_pages().max(1));
    }

    /// 手动翻页；越界值收敛到首/末页
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        Self::pages_for(self.lines.len())
    }

    /// 当前页的行
    pub fn page_lines(&self) -> impl Iterator<Item = &str> {
        let start = (self.page - 1) * PAGE_SIZE;
        self.lines
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.page = 1;
    }

    fn pages_for(count: usize) -> usize {
        count.div_ceil(PAGE_SIZE)
    }
}
