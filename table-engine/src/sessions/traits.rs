//! Command handler seam and the per-transaction context handed to it
//!
//! Every action runs against a [`CommandContext`] that wraps the single redb
//! write transaction of the command. Handlers read and write only through the
//! context, so nothing they do is visible until the manager commits.

use redb::WriteTransaction;
use shared::models::{DiningTable, Reservation, SessionStatus, TableSession};
use shared::session::{CommandErrorCode, EffectSummary, TableAction};
use shared::util::format_millis;
use thiserror::Error;

use super::storage::{SessionStorage, StorageError};

/// Handler-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("No open session for table {0}")]
    SessionNotFound(i64),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(i64),

    #[error("Order {order_id} is not open on table {table_id}")]
    OrderNotOnTable { table_id: i64, order_id: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("No merge found for table {0}")]
    NoMergeFound(i64),

    #[error("Cannot {action} table {table_id} while {status}")]
    InvalidTransition {
        action: TableAction,
        table_id: i64,
        status: SessionStatus,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Tables {first} and {second} belong to different venues")]
    VenueMismatch { first: i64, second: i64 },

    #[error("Table {table_id} is in service ({status})")]
    TableInService { table_id: i64, status: SessionStatus },

    #[error("Destination table {table_id} is not free ({status})")]
    DestinationNotFree { table_id: i64, status: SessionStatus },

    #[error(
        "Reservation conflict on table {table_id}: existing {} vs requested {}",
        fmt_time(.existing),
        fmt_time(.requested)
    )]
    ReservationConflict {
        table_id: i64,
        existing: i64,
        requested: i64,
    },

    #[error("Table {0} holds a reservation without a time")]
    ReservationBlocked(i64),

    #[error("Table {0} is already merged")]
    TableMerged(i64),

    #[error("Merge rejected: {0}")]
    MergeConflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

fn fmt_time(millis: &i64) -> String {
    format_millis(*millis)
}

impl SessionError {
    /// Error code reported to callers
    pub fn code(&self) -> CommandErrorCode {
        match self {
            SessionError::TableNotFound(_) => CommandErrorCode::TableNotFound,
            SessionError::SessionNotFound(_) => CommandErrorCode::SessionNotFound,
            SessionError::ReservationNotFound(_) => CommandErrorCode::ReservationNotFound,
            SessionError::OrderNotOnTable { .. } | SessionError::OrderNotFound(_) => {
                CommandErrorCode::OrderNotFound
            }
            SessionError::NoMergeFound(_) => CommandErrorCode::NoMergeFound,
            SessionError::InvalidTransition { .. } | SessionError::InvalidOperation(_) => {
                CommandErrorCode::InvalidTransition
            }
            SessionError::VenueMismatch { .. } => CommandErrorCode::VenueMismatch,
            SessionError::TableInService { .. } => CommandErrorCode::TableInService,
            SessionError::DestinationNotFree { .. } => CommandErrorCode::DestinationNotFree,
            SessionError::ReservationConflict { .. } => CommandErrorCode::ReservationConflict,
            SessionError::ReservationBlocked(_) => CommandErrorCode::ReservationBlocked,
            SessionError::TableMerged(_) | SessionError::MergeConflict(_) => {
                CommandErrorCode::TableMerged
            }
            SessionError::Storage(_) => CommandErrorCode::InternalError,
        }
    }
}

/// Command metadata extracted from the envelope
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client timestamp (Unix millis)
    pub timestamp: i64,
}

/// Command handler trait
///
/// Implementations validate preconditions against the current state and
/// write the new state through the context. Returning `Err` leaves the
/// transaction uncommitted.
pub trait CommandHandler {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError>;
}

/// Per-command view of the store, bound to one write transaction
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a SessionStorage,
    /// Server time of this command (Unix millis)
    now: i64,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a SessionStorage, now: i64) -> Self {
        Self { txn, storage, now }
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub(crate) fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub(crate) fn storage(&self) -> &'a SessionStorage {
        self.storage
    }

    // ========== Tables ==========

    pub fn load_table(&self, table_id: i64) -> Result<DiningTable, SessionError> {
        self.storage
            .get_table_txn(self.txn, table_id)?
            .ok_or(SessionError::TableNotFound(table_id))
    }

    pub fn save_table(&self, table: &DiningTable) -> Result<(), SessionError> {
        Ok(self.storage.store_table(self.txn, table)?)
    }

    /// Follow a secondary's merge link to its primary (single hop)
    pub fn resolve_primary(&self, table_id: i64) -> Result<DiningTable, SessionError> {
        let table = self.load_table(table_id)?;
        match table.merged_into {
            Some(primary_id) => self.load_table(primary_id),
            None => Ok(table),
        }
    }

    /// Tables currently merged into `primary_id`, ordered by id
    pub fn secondaries_of(&self, primary_id: i64) -> Result<Vec<DiningTable>, SessionError> {
        Ok(self.storage.secondaries_of_txn(self.txn, primary_id)?)
    }

    /// Recompute a primary's displayed capacity from its own seats plus
    /// those of every table merged into it.
    pub fn recompute_capacity(&self, primary: &mut DiningTable) -> Result<(), SessionError> {
        let merged_seats: i32 = self
            .secondaries_of(primary.id)?
            .iter()
            .map(|t| t.seat_count)
            .sum();
        primary.capacity = primary.seat_count + merged_seats;
        self.save_table(primary)
    }

    // ========== Sessions ==========

    pub fn find_open_session(&self, table_id: i64) -> Result<Option<TableSession>, SessionError> {
        Ok(self.storage.get_open_session_txn(self.txn, table_id)?)
    }

    pub fn load_open_session(&self, table_id: i64) -> Result<TableSession, SessionError> {
        self.find_open_session(table_id)?
            .ok_or(SessionError::SessionNotFound(table_id))
    }

    /// Write back a modified open session.
    ///
    /// The table's open-session pointer must still name this session.
    pub fn update_session(&self, session: &TableSession) -> Result<(), SessionError> {
        self.storage.swap_open_session(
            self.txn,
            session.table_id,
            Some(session.id),
            Some(session.id),
        )?;
        self.storage.store_session(self.txn, session)?;
        Ok(())
    }

    /// Create a FREE session for the table and make it the open one.
    ///
    /// `expected` is the session the pointer must currently name (`None` when
    /// the table has no open session).
    pub fn open_free_session(
        &self,
        table: &DiningTable,
        expected: Option<i64>,
    ) -> Result<TableSession, SessionError> {
        let id = self.storage.next_session_id(self.txn)?;
        let session = TableSession::free(id, table.id, table.venue_id, self.now);
        self.storage.store_session(self.txn, &session)?;
        self.storage
            .swap_open_session(self.txn, table.id, expected, Some(id))?;
        Ok(session)
    }

    /// Close `session` and open the table's next FREE session in its place.
    ///
    /// Returns the new session.
    pub fn close_and_replace(
        &self,
        session: &TableSession,
        table: &DiningTable,
    ) -> Result<TableSession, SessionError> {
        let mut closed = session.clone();
        closed.status = SessionStatus::Closed;
        closed.closed_at = Some(self.now);
        self.storage.store_session(self.txn, &closed)?;
        self.open_free_session(table, Some(session.id))
    }

    // ========== Reservations ==========

    pub fn load_reservation(&self, reservation_id: i64) -> Result<Reservation, SessionError> {
        self.storage
            .get_reservation_txn(self.txn, reservation_id)?
            .ok_or(SessionError::ReservationNotFound(reservation_id))
    }

    pub fn latest_booked_reservation(
        &self,
        table_id: i64,
    ) -> Result<Option<Reservation>, SessionError> {
        Ok(self
            .storage
            .latest_booked_reservation_txn(self.txn, table_id)?)
    }

    pub fn next_reservation_id(&self) -> Result<i64, SessionError> {
        Ok(self.storage.next_reservation_id(self.txn)?)
    }

    pub fn save_reservation(&self, reservation: &Reservation) -> Result<(), SessionError> {
        Ok(self.storage.store_reservation(self.txn, reservation)?)
    }

    /// Hand a reservation over to another table
    pub fn relocate_reservation(
        &self,
        reservation: &mut Reservation,
        destination: &DiningTable,
    ) -> Result<(), SessionError> {
        let from = reservation.table_id;
        reservation.table_id = destination.id;
        reservation.venue_id = destination.venue_id;
        reservation.updated_at = self.now;
        Ok(self
            .storage
            .relocate_reservation(self.txn, reservation, from)?)
    }
}
