//! Shared types for the table session engine
//!
//! Common types used by the engine and its callers: table/session/reservation
//! models, the command/event/response envelope, and unified error codes.

pub mod error;
pub mod models;
pub mod session;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ErrorCategory, ErrorCode};
pub use session::{
    ActionParams, CommandError, CommandErrorCode, CommandResponse, EffectSummary, FailureKind,
    TableAction, TableCommand, TableCommandPayload, TableEvent,
};
