//! 抓包/日志缓冲模块
//!
//! 同一条输入流喂养两个互不依赖的缓冲区:
//! - 原始日志缓冲: 每一行（无论是否结构化）都追加，按页读取
//! - 抓包记录表: 只收结构化抓包记录，支持暂停/清空
//!
//! 展示模式只是在两者之上做选择，切换不会修改任何缓冲区。

pub mod log_buffer;
pub mod table;

pub use log_buffer::{LogBuffer, PAGE_SIZE};
pub use table::CaptureTable;

/// 展示模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// 结构化抓包表格
    #[default]
    Table,
    /// 原始日志
    Raw,
}
