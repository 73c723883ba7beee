//! 桌台会话引擎
//!
//! Tracks what is happening at each physical table and mutates table
//! topology (merge, unmerge, move) while keeping sessions, reservations and
//! order status consistent.
//!
//! - [`SessionsManager`] - entry point, one redb write transaction per action
//! - [`SessionStorage`] - redb tables for tables, sessions, reservations, orders
//! - [`actions`] - one handler per action
//!
//! For every table there is exactly one session with `closed_at = None`.
//! Closing a session and opening the table's next FREE session always happen
//! in the same transaction.

pub mod actions;
pub mod bridge;
pub mod manager;
pub mod storage;
pub mod traits;

pub use bridge::OrderStatusBridge;
pub use manager::{
    DEFAULT_RESERVATION_MINUTES, InvariantViolation, ManagerError, ManagerResult, SessionsManager,
};
pub use storage::{SessionStorage, StorageError, StorageResult};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
