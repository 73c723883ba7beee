//! Command response and error types

use super::event::EffectSummary;
use crate::error::{ErrorCategory, ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Rows changed (absent for duplicates and failures)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectSummary>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, effect: EffectSummary) -> Self {
        Self {
            command_id,
            success: true,
            effect: Some(effect),
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            effect: None,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            effect: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    /// Range of the unified numeric code (table, system, ...)
    pub category: ErrorCategory,
    pub message: String,
    /// Structured context (e.g. the two reservation times of a conflict)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.error_code().category(),
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.code.kind()
    }
}

/// Failure taxonomy reported to callers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    NotFound,
    InvalidTransition,
    Conflict,
    PersistenceFailure,
    /// Rejected before any lookup (unknown action, missing params)
    InvalidRequest,
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    TableNotFound,
    SessionNotFound,
    ReservationNotFound,
    OrderNotFound,
    NoMergeFound,
    InvalidTransition,
    VenueMismatch,
    TableInService,
    DestinationNotFree,
    ReservationConflict,
    ReservationBlocked,
    TableMerged,
    UnknownAction,
    MissingParameter,
    InvalidParameter,
    DuplicateCommand,
    InternalError,
    // Storage errors (maps to ErrorCode 94xx)
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    pub fn kind(&self) -> FailureKind {
        use CommandErrorCode::*;
        match self {
            TableNotFound | SessionNotFound | ReservationNotFound | OrderNotFound
            | NoMergeFound => FailureKind::NotFound,
            InvalidTransition | VenueMismatch => FailureKind::InvalidTransition,
            TableInService | DestinationNotFree | ReservationConflict | ReservationBlocked
            | TableMerged | DuplicateCommand => FailureKind::Conflict,
            UnknownAction | MissingParameter | InvalidParameter => FailureKind::InvalidRequest,
            InternalError | StorageFull | OutOfMemory | StorageCorrupted | SystemBusy => {
                FailureKind::PersistenceFailure
            }
        }
    }

    /// Unified numeric code
    pub fn error_code(&self) -> ErrorCode {
        use CommandErrorCode::*;
        match self {
            TableNotFound => ErrorCode::TableNotFound,
            SessionNotFound => ErrorCode::SessionNotFound,
            ReservationNotFound => ErrorCode::ReservationNotFound,
            OrderNotFound => ErrorCode::OrderNotFound,
            NoMergeFound => ErrorCode::NoMergeFound,
            InvalidTransition => ErrorCode::InvalidTableTransition,
            VenueMismatch => ErrorCode::VenueMismatch,
            TableInService | DestinationNotFree => ErrorCode::TableOccupied,
            ReservationConflict | ReservationBlocked => ErrorCode::ReservationConflict,
            TableMerged => ErrorCode::TableMerged,
            UnknownAction => ErrorCode::InvalidRequest,
            MissingParameter => ErrorCode::RequiredField,
            InvalidParameter => ErrorCode::ValidationFailed,
            DuplicateCommand => ErrorCode::InvalidRequest,
            InternalError => ErrorCode::InternalError,
            StorageFull => ErrorCode::StorageFull,
            OutOfMemory => ErrorCode::OutOfMemory,
            StorageCorrupted => ErrorCode::StorageCorrupted,
            SystemBusy => ErrorCode::SystemBusy,
        }
    }
}
