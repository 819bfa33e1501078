//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 数据源读取或解析失败
    #[error("source error: {0}")]
    Source(#[from] ContractError),

    /// 行数不是 item 行数的整数倍
    #[error(
        "the number of lines read ({lines}) was not a multiple of {lines_per_item}, which indicates a malformed item stream"
    )]
    LineCountMismatch {
        /// 已读行数
        lines: u64,
        /// 每个 item 的行数
        lines_per_item: usize,
    },

    /// 扫描到的 item 数与数据集声明的不一致
    #[error("incorrect number of read items: {actual}, expected: {expected}")]
    ItemCountMismatch {
        /// 实际扫描数
        actual: u64,
        /// 声明总数
        expected: u64,
    },

    /// 数据流缺少 dataset size 标记，无法校验 item 总数
    #[error("read {items} items but the stream carried no dataset size, the input may be truncated")]
    MissingDatasetSize {
        /// 实际扫描数
        items: u64,
    },

    /// 批次队列在扫描结束前被关闭
    #[error("batch queue closed before scanning finished")]
    QueueClosed,
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
