//! redb-based storage layer for table sessions
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `dining_tables` | `table_id` | `DiningTable` | Table registry |
//! | `sessions` | `session_id` | `TableSession` | Open and closed sessions |
//! | `open_sessions` | `table_id` | `session_id` | One open session per table |
//! | `table_sessions` | `(table_id, session_id)` | `()` | Per-table history index |
//! | `reservations` | `reservation_id` | `Reservation` | Reservation ledger |
//! | `table_reservations` | `(table_id, reservation_id)` | `()` | Per-table ledger index |
//! | `order_status` | `order_id` | `OrderStatusRecord` | Order status bridge |
//! | `table_events` | `sequence` | `TableEvent` | Committed effects (append-only) |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | name | `u64` | Id and sequence allocation |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time; `begin_write` blocks
//! until the previous writer commits or aborts. Every read-modify-write of a
//! table's open session therefore happens under that lock, and the
//! `open_sessions` index is only ever replaced through [`SessionStorage::swap_open_session`],
//! which checks the expected current session id.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{DiningTable, OrderStatusRecord, Reservation, ReservationStatus, TableSession};
use shared::session::TableEvent;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table registry: key = table_id, value = JSON-serialized DiningTable
const TABLES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("dining_tables");

/// All sessions: key = session_id, value = JSON-serialized TableSession
const SESSIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("sessions");

/// Open session witness: key = table_id, value = session_id
const OPEN_SESSIONS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("open_sessions");

/// Session history index: key = (table_id, session_id)
const TABLE_SESSIONS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("table_sessions");

/// Reservation ledger: key = reservation_id, value = JSON-serialized Reservation
const RESERVATIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("reservations");

/// Reservation index: key = (table_id, reservation_id)
const TABLE_RESERVATIONS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("table_reservations");

/// Order status bridge: key = order_id, value = JSON-serialized OrderStatusRecord
const ORDER_STATUS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_status");

/// Event log: key = sequence, value = JSON-serialized TableEvent
const EVENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("table_events");

/// Table for tracking processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Counters: key = counter name, value = last allocated value
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";
const TABLE_ID_KEY: &str = "table_id";
const SESSION_ID_KEY: &str = "session_id";
const RESERVATION_ID_KEY: &str = "reservation_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compare-and-swap on the open-session index failed
    #[error("Stale open session for table {table_id}: expected {expected:?}, found {actual:?}")]
    StaleOpenSession {
        table_id: i64,
        expected: Option<i64>,
        actual: Option<i64>,
    },

    #[error("Session {0} referenced by index but missing")]
    DanglingSession(i64),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn to_bytes<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn read_json<T, R>(table: &R, key: i64) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<i64, &'static [u8]>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

/// Session storage backed by redb
#[derive(Clone)]
pub struct SessionStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}

impl SessionStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: a commit is
    /// persistent once `commit()` returns, and the file is always consistent
    /// (copy-on-write with atomic pointer swap).
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(OPEN_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(TABLE_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(TABLE_RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(ORDER_STATUS_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// Blocks while another write transaction is alive.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counters ==========

    fn next_counter(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    /// Allocate a table id (within transaction)
    pub fn next_table_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Ok(self.next_counter(txn, TABLE_ID_KEY)? as i64)
    }

    /// Allocate a session id (within transaction)
    pub fn next_session_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Ok(self.next_counter(txn, SESSION_ID_KEY)? as i64)
    }

    /// Allocate a reservation id (within transaction)
    pub fn next_reservation_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Ok(self.next_counter(txn, RESERVATION_ID_KEY)? as i64)
    }

    /// Increment and return the event sequence number
    pub fn next_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.next_counter(txn, SEQUENCE_KEY)
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    // ========== Table Registry ==========

    pub fn store_table(&self, txn: &WriteTransaction, table: &DiningTable) -> StorageResult<()> {
        let bytes = to_bytes(table)?;
        let mut t = txn.open_table(TABLES_TABLE)?;
        t.insert(table.id, bytes.as_slice())?;
        Ok(())
    }

    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Option<DiningTable>> {
        let t = txn.open_table(TABLES_TABLE)?;
        read_json(&t, table_id)
    }

    pub fn get_table(&self, table_id: i64) -> StorageResult<Option<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(TABLES_TABLE)?;
        read_json(&t, table_id)
    }

    /// All registered tables, ordered by id
    pub fn list_tables(&self) -> StorageResult<Vec<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(TABLES_TABLE)?;
        let mut tables = Vec::with_capacity(t.len()? as usize);
        for entry in t.iter()? {
            let (_, value) = entry?;
            tables.push(serde_json::from_slice(value.value())?);
        }
        Ok(tables)
    }

    /// Tables whose `merged_into` points at `primary_id`, ordered by id
    pub fn secondaries_of_txn(
        &self,
        txn: &WriteTransaction,
        primary_id: i64,
    ) -> StorageResult<Vec<DiningTable>> {
        let t = txn.open_table(TABLES_TABLE)?;
        let mut secondaries = Vec::new();
        for entry in t.iter()? {
            let (_, value) = entry?;
            let table: DiningTable = serde_json::from_slice(value.value())?;
            if table.merged_into == Some(primary_id) {
                secondaries.push(table);
            }
        }
        Ok(secondaries)
    }

    // ========== Sessions ==========

    /// Insert or overwrite a session row and index it under its table
    pub fn store_session(&self, txn: &WriteTransaction, session: &TableSession) -> StorageResult<()> {
        let bytes = to_bytes(session)?;
        {
            let mut t = txn.open_table(SESSIONS_TABLE)?;
            t.insert(session.id, bytes.as_slice())?;
        }
        let mut index = txn.open_table(TABLE_SESSIONS_TABLE)?;
        index.insert((session.table_id, session.id), ())?;
        Ok(())
    }

    pub fn get_session_txn(
        &self,
        txn: &WriteTransaction,
        session_id: i64,
    ) -> StorageResult<Option<TableSession>> {
        let t = txn.open_table(SESSIONS_TABLE)?;
        read_json(&t, session_id)
    }

    pub fn get_session(&self, session_id: i64) -> StorageResult<Option<TableSession>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(SESSIONS_TABLE)?;
        read_json(&t, session_id)
    }

    /// Id of the table's open session, per the witness index
    pub fn open_session_id_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Option<i64>> {
        let t = txn.open_table(OPEN_SESSIONS_TABLE)?;
        Ok(t.get(table_id)?.map(|guard| guard.value()))
    }

    pub fn get_open_session_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Option<TableSession>> {
        let Some(session_id) = self.open_session_id_txn(txn, table_id)? else {
            return Ok(None);
        };
        self.get_session_txn(txn, session_id)?
            .map(Some)
            .ok_or(StorageError::DanglingSession(session_id))
    }

    pub fn get_open_session(&self, table_id: i64) -> StorageResult<Option<TableSession>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OPEN_SESSIONS_TABLE)?;
        let Some(session_id) = index.get(table_id)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let sessions = read_txn.open_table(SESSIONS_TABLE)?;
        read_json::<TableSession, _>(&sessions, session_id)?
            .map(Some)
            .ok_or(StorageError::DanglingSession(session_id))
    }

    /// Compare-and-swap the table's open session pointer.
    ///
    /// Fails with [`StorageError::StaleOpenSession`] when the current pointer
    /// is not `expected`. `new = None` removes the pointer.
    pub fn swap_open_session(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
        expected: Option<i64>,
        new: Option<i64>,
    ) -> StorageResult<()> {
        let mut t = txn.open_table(OPEN_SESSIONS_TABLE)?;
        let actual = t.get(table_id)?.map(|guard| guard.value());
        if actual != expected {
            return Err(StorageError::StaleOpenSession {
                table_id,
                expected,
                actual,
            });
        }
        match new {
            Some(session_id) => {
                t.insert(table_id, session_id)?;
            }
            None => {
                t.remove(table_id)?;
            }
        }
        Ok(())
    }

    /// Every session ever recorded for a table, oldest first
    pub fn sessions_for_table(&self, table_id: i64) -> StorageResult<Vec<TableSession>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_SESSIONS_TABLE)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE)?;
        let mut result = Vec::new();
        for entry in index.range((table_id, i64::MIN)..=(table_id, i64::MAX))? {
            let (key, _) = entry?;
            let (_, session_id) = key.value();
            if let Some(session) = read_json::<TableSession, _>(&sessions, session_id)? {
                result.push(session);
            }
        }
        Ok(result)
    }

    /// Number of session rows with `closed_at = None` for a table.
    ///
    /// Scans the rows themselves rather than the witness index.
    pub fn count_open_sessions(&self, table_id: i64) -> StorageResult<usize> {
        Ok(self
            .sessions_for_table(table_id)?
            .iter()
            .filter(|s| s.is_open())
            .count())
    }

    // ========== Reservation Ledger ==========

    pub fn store_reservation(
        &self,
        txn: &WriteTransaction,
        reservation: &Reservation,
    ) -> StorageResult<()> {
        let bytes = to_bytes(reservation)?;
        {
            let mut t = txn.open_table(RESERVATIONS_TABLE)?;
            t.insert(reservation.id, bytes.as_slice())?;
        }
        let mut index = txn.open_table(TABLE_RESERVATIONS_TABLE)?;
        index.insert((reservation.table_id, reservation.id), ())?;
        Ok(())
    }

    /// Re-key a reservation onto another table, moving its index entry
    pub fn relocate_reservation(
        &self,
        txn: &WriteTransaction,
        reservation: &Reservation,
        from_table_id: i64,
    ) -> StorageResult<()> {
        {
            let mut index = txn.open_table(TABLE_RESERVATIONS_TABLE)?;
            index.remove((from_table_id, reservation.id))?;
        }
        self.store_reservation(txn, reservation)
    }

    pub fn get_reservation_txn(
        &self,
        txn: &WriteTransaction,
        reservation_id: i64,
    ) -> StorageResult<Option<Reservation>> {
        let t = txn.open_table(RESERVATIONS_TABLE)?;
        read_json(&t, reservation_id)
    }

    pub fn get_reservation(&self, reservation_id: i64) -> StorageResult<Option<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(RESERVATIONS_TABLE)?;
        read_json(&t, reservation_id)
    }

    /// Most recent BOOKED reservation on a table (highest id)
    pub fn latest_booked_reservation_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
    ) -> StorageResult<Option<Reservation>> {
        let ids: Vec<i64> = {
            let index = txn.open_table(TABLE_RESERVATIONS_TABLE)?;
            let mut ids = Vec::new();
            for entry in index.range((table_id, i64::MIN)..=(table_id, i64::MAX))? {
                let (key, _) = entry?;
                ids.push(key.value().1);
            }
            ids
        };
        let t = txn.open_table(RESERVATIONS_TABLE)?;
        for id in ids.into_iter().rev() {
            if let Some(reservation) = read_json::<Reservation, _>(&t, id)?
                && reservation.status == ReservationStatus::Booked
            {
                return Ok(Some(reservation));
            }
        }
        Ok(None)
    }

    /// Ledger entries for a table, oldest first
    pub fn reservations_for_table(&self, table_id: i64) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_RESERVATIONS_TABLE)?;
        let t = read_txn.open_table(RESERVATIONS_TABLE)?;
        let mut result = Vec::new();
        for entry in index.range((table_id, i64::MIN)..=(table_id, i64::MAX))? {
            let (key, _) = entry?;
            if let Some(reservation) = read_json::<Reservation, _>(&t, key.value().1)? {
                result.push(reservation);
            }
        }
        Ok(result)
    }

    // ========== Order Status Bridge ==========

    pub fn store_order(&self, txn: &WriteTransaction, record: &OrderStatusRecord) -> StorageResult<()> {
        let bytes = to_bytes(record)?;
        let mut t = txn.open_table(ORDER_STATUS_TABLE)?;
        t.insert(record.order_id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<OrderStatusRecord>> {
        let t = txn.open_table(ORDER_STATUS_TABLE)?;
        match t.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderStatusRecord>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(ORDER_STATUS_TABLE)?;
        match t.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Events ==========

    pub fn store_event(&self, txn: &WriteTransaction, event: &TableEvent) -> StorageResult<()> {
        let bytes = to_bytes(event)?;
        let mut t = txn.open_table(EVENTS_TABLE)?;
        t.insert(event.sequence, bytes.as_slice())?;
        Ok(())
    }

    /// Events with sequence strictly greater than `since`
    pub fn events_since(&self, since: u64) -> StorageResult<Vec<TableEvent>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in t.range((since + 1)..)? {
            let (_, value) = entry?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    // ========== Idempotency ==========

    /// Check if a command has been processed (read-only)
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    pub fn mark_command_processed(&self, txn: &WriteTransaction, command_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }
}
