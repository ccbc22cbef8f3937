//! # Storage Error Types
//!
//! 定义本地状态存储相关的错误类型。

use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 存储结果类型
pub type StorageResult<T> = Result<T, StorageError>;
