//! Table Session Command/Event Module
//!
//! - Commands: requests from callers to change a table's session or topology
//! - Events: committed effects, broadcast to subscribers
//! - Responses: success with the changed rows, or a typed error

pub mod command;
pub mod event;
pub mod types;

// Re-exports
pub use command::{
    ActionParams, MAX_RESERVATION_MINUTES, PayloadError, TableAction, TableCommand,
    TableCommandPayload,
};
pub use event::{EffectSummary, TableEvent};
pub use types::*;
