use super::super::storage::StorageError;
use super::super::traits::SessionError;
use shared::session::{CommandError, CommandErrorCode, FailureKind, PayloadError};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Rejected by an action handler
    #[error(transparent)]
    Session(SessionError),

    /// Rejected before any storage access
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Duplicate command: {0}")]
    DuplicateCommand(String),
}

impl From<SessionError> for ManagerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => ManagerError::Storage(e),
            other => ManagerError::Session(other),
        }
    }
}

impl ManagerError {
    pub fn code(&self) -> CommandErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::Session(e) => e.code(),
            ManagerError::Payload(PayloadError::UnknownAction(_)) => CommandErrorCode::UnknownAction,
            ManagerError::Payload(PayloadError::MissingParameter { .. }) => {
                CommandErrorCode::MissingParameter
            }
            ManagerError::Payload(PayloadError::InvalidParameter { .. }) => {
                CommandErrorCode::InvalidParameter
            }
            ManagerError::TableNotFound(_) => CommandErrorCode::TableNotFound,
            ManagerError::OrderNotFound(_) => CommandErrorCode::OrderNotFound,
            ManagerError::InvalidTable(_) => CommandErrorCode::InvalidParameter,
            ManagerError::DuplicateCommand(_) => CommandErrorCode::DuplicateCommand,
        }
    }

    /// Failure class: NotFound / InvalidTransition / Conflict / PersistenceFailure
    pub fn kind(&self) -> FailureKind {
        self.code().kind()
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    // 先按枚举变体精确匹配
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::DanglingSession(_) => return CommandErrorCode::StorageCorrupted,
        StorageError::StaleOpenSession { .. } => return CommandErrorCode::SystemBusy,
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        if let ManagerError::Storage(e) = &err {
            tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
        }
        let message = err.to_string();
        let error = CommandError::new(code, message);
        match err {
            ManagerError::Session(SessionError::ReservationConflict {
                table_id,
                existing,
                requested,
            }) => error
                .with_detail("table_id", table_id)
                .with_detail("existing_time", existing)
                .with_detail("requested_time", requested),
            ManagerError::Session(SessionError::TableInService { table_id, status })
            | ManagerError::Session(SessionError::DestinationNotFree { table_id, status }) => error
                .with_detail("table_id", table_id)
                .with_detail("status", status.as_str()),
            _ => error,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
