use crate::sessions::{ManagerError, StorageError};
use thiserror::Error;

/// 启动/环境错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("工作目录不可用: {0}")]
    WorkDir(#[from] std::io::Error),

    #[error("存储初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("会话引擎错误: {0}")]
    Sessions(#[from] ManagerError),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
