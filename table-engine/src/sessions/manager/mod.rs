//! SessionsManager - the table session transition engine
//!
//! This module handles:
//! - Action name + params parsing (before any storage access)
//! - Merge delegation (secondary table ids resolve to their primary)
//! - Running one action handler inside one redb write transaction
//! - Event persistence and broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Payload validation
//!     ├─ 2. Idempotency check (command_id)
//!     ├─ 3. Begin write transaction (serializes writers)
//!     ├─ 4. Create CommandContext
//!     ├─ 5. Resolve merged table to primary
//!     ├─ 6. Convert payload to action and execute
//!     ├─ 7. Persist event, mark command processed
//!     ├─ 8. Commit transaction
//!     ├─ 9. Broadcast event
//!     └─ 10. Return response
//! ```
//!
//! A handler error drops the transaction uncommitted, so a rejected or
//! failed action leaves no trace in the store.

mod audit;
mod error;
pub use audit::InvariantViolation;
pub use error::*;

use super::actions::CommandAction;
use super::storage::{SessionStorage, StorageError, StorageResult};
use super::traits::{CommandContext, CommandHandler, CommandMetadata};
use shared::models::{
    DiningTable, DiningTableCreate, OrderStatusRecord, PaymentStatus, Reservation, TableSession,
};
use shared::session::{
    ActionParams, CommandError, CommandResponse, EffectSummary, TableCommand, TableCommandPayload,
    TableEvent,
};
use shared::util::now_millis;
use std::path::Path;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Default booking length when a reservation names none
pub const DEFAULT_RESERVATION_MINUTES: i64 = 90;

/// Operator recorded for actions applied through [`SessionsManager::apply`]
const SYSTEM_OPERATOR_ID: &str = "system";
const SYSTEM_OPERATOR_NAME: &str = "System";

enum Outcome {
    Applied(TableEvent),
    Duplicate,
}

/// SessionsManager for table actions
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Subscribers use it to detect restarts and trigger a full resync.
pub struct SessionsManager {
    storage: SessionStorage,
    event_tx: broadcast::Sender<TableEvent>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    default_reservation_minutes: i64,
}

impl std::fmt::Debug for SessionsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionsManager")
            .field("storage", &"<SessionStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .field("default_reservation_minutes", &self.default_reservation_minutes)
            .finish()
    }
}

impl SessionsManager {
    /// Open (or create) the session store at the given path
    pub fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let storage = SessionStorage::open(db_path)?;
        Ok(Self::with_storage(storage))
    }

    /// Create a SessionsManager with an existing storage
    pub fn with_storage(storage: SessionStorage) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "SessionsManager started with new epoch");
        Self {
            storage,
            event_tx,
            epoch,
            default_reservation_minutes: DEFAULT_RESERVATION_MINUTES,
        }
    }

    pub fn with_default_reservation_minutes(mut self, minutes: i64) -> Self {
        self.default_reservation_minutes = minutes;
        self
    }

    /// Get the server epoch (unique ID for this instance)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to committed events
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.event_tx.subscribe()
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Apply `action` to `table_id`
    ///
    /// Unknown actions and missing parameters are rejected before the store
    /// is touched.
    pub fn apply(
        &self,
        table_id: i64,
        action: &str,
        params: ActionParams,
    ) -> ManagerResult<EffectSummary> {
        let payload = TableCommandPayload::from_params(action, params)?;
        let cmd = TableCommand::new(SYSTEM_OPERATOR_ID, SYSTEM_OPERATOR_NAME, table_id, payload);
        let command_id = cmd.command_id.clone();
        match self.process_command(&cmd)? {
            Outcome::Applied(event) => {
                let effect = event.effect.clone();
                self.broadcast(event);
                Ok(effect)
            }
            Outcome::Duplicate => Err(ManagerError::DuplicateCommand(command_id)),
        }
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: TableCommand) -> CommandResponse {
        match self.process_command(&cmd) {
            Ok(Outcome::Applied(event)) => {
                let effect = event.effect.clone();
                self.broadcast(event);
                CommandResponse::success(cmd.command_id, effect)
            }
            Ok(Outcome::Duplicate) => CommandResponse::duplicate(cmd.command_id),
            Err(err) => {
                let error: CommandError = err.into();
                tracing::debug!(
                    command_id = %cmd.command_id,
                    code = ?error.code,
                    category = error.category.name(),
                    message = %error.message,
                    "Command rejected"
                );
                CommandResponse::error(cmd.command_id, error)
            }
        }
    }

    fn broadcast(&self, event: TableEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Event broadcast failed: no active receivers");
        }
    }

    fn process_command(&self, cmd: &TableCommand) -> ManagerResult<Outcome> {
        tracing::debug!(command_id = %cmd.command_id, table_id = cmd.table_id, payload = ?cmd.payload, "Processing command");

        // 1. Shape validation
        cmd.payload.validate()?;

        // 2. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok(Outcome::Duplicate);
        }

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self.storage.is_command_processed_txn(&txn, &cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command (race)");
            return Ok(Outcome::Duplicate);
        }

        let now = now_millis();
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 4-6. Resolve + execute
        let effect = {
            let mut ctx = CommandContext::new(&txn, &self.storage, now);
            let action_kind = cmd.payload.action();
            let table_id = if action_kind.resolves_through_merge() {
                let primary = ctx.resolve_primary(cmd.table_id)?;
                if primary.id != cmd.table_id {
                    tracing::debug!(
                        table_id = cmd.table_id,
                        primary_table_id = primary.id,
                        action = %action_kind,
                        "Resolved merged table to primary"
                    );
                }
                primary.id
            } else {
                cmd.table_id
            };
            let action =
                CommandAction::from_payload(table_id, &cmd.payload, self.default_reservation_minutes);
            action.execute(&mut ctx, &metadata)?
        };

        // 7. Persist event
        let sequence = self.storage.next_sequence(&txn)?;
        let event = TableEvent {
            sequence,
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: now,
            client_timestamp: Some(cmd.timestamp),
            table_id: cmd.table_id,
            effect,
        };
        self.storage.store_event(&txn, &event)?;
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 8. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            command_id = %cmd.command_id,
            action = %event.effect.action,
            table_id = event.effect.table_id,
            status = %event.effect.status,
            sequence,
            "Command processed successfully"
        );
        Ok(Outcome::Applied(event))
    }

    // ========== Venue Setup ==========

    /// Register a table together with its initial FREE session
    pub fn register_table(&self, create: DiningTableCreate) -> ManagerResult<DiningTable> {
        if create.label.trim().is_empty() {
            return Err(ManagerError::InvalidTable("label must not be empty".into()));
        }
        if create.seat_count <= 0 {
            return Err(ManagerError::InvalidTable(format!(
                "seat_count must be positive, got {}",
                create.seat_count
            )));
        }

        let txn = self.storage.begin_write()?;
        let now = now_millis();
        let table = DiningTable {
            id: self.storage.next_table_id(&txn)?,
            venue_id: create.venue_id,
            label: create.label,
            seat_count: create.seat_count,
            capacity: create.seat_count,
            merged_into: None,
            created_at: now,
        };
        self.storage.store_table(&txn, &table)?;
        let session = {
            let ctx = CommandContext::new(&txn, &self.storage, now);
            ctx.open_free_session(&table, None)?
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            table_id = table.id,
            venue_id = table.venue_id,
            label = %table.label,
            session_id = session.id,
            "Table registered"
        );
        Ok(table)
    }

    /// Record a payment status change coming from the payment pipeline
    pub fn update_payment_status(&self, order_id: &str, status: PaymentStatus) -> ManagerResult<()> {
        let txn = self.storage.begin_write()?;
        let mut record = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))?;
        record.payment_status = status;
        record.updated_at = now_millis();
        self.storage.store_order(&txn, &record)?;
        txn.commit().map_err(StorageError::from)?;
        tracing::debug!(order_id, payment_status = ?status, "Payment status updated");
        Ok(())
    }

    // ========== Public Query Methods ==========

    pub fn get_table(&self, table_id: i64) -> ManagerResult<Option<DiningTable>> {
        Ok(self.storage.get_table(table_id)?)
    }

    /// Tables of a venue, ordered by id
    pub fn list_tables(&self, venue_id: i64) -> ManagerResult<Vec<DiningTable>> {
        Ok(self
            .storage
            .list_tables()?
            .into_iter()
            .filter(|t| t.venue_id == venue_id)
            .collect())
    }

    /// The live session serving a table
    ///
    /// For a merged secondary this is the primary's open session.
    pub fn open_session(&self, table_id: i64) -> ManagerResult<Option<TableSession>> {
        let table = self
            .storage
            .get_table(table_id)?
            .ok_or(ManagerError::TableNotFound(table_id))?;
        let serving = table.merged_into.unwrap_or(table.id);
        Ok(self.storage.get_open_session(serving)?)
    }

    /// Every session of a table, oldest first
    pub fn session_history(&self, table_id: i64) -> ManagerResult<Vec<TableSession>> {
        Ok(self.storage.sessions_for_table(table_id)?)
    }

    pub fn reservations_for_table(&self, table_id: i64) -> ManagerResult<Vec<Reservation>> {
        Ok(self.storage.reservations_for_table(table_id)?)
    }

    pub fn get_order(&self, order_id: &str) -> ManagerResult<Option<OrderStatusRecord>> {
        Ok(self.storage.get_order(order_id)?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn events_since(&self, since_sequence: u64) -> ManagerResult<Vec<TableEvent>> {
        Ok(self.storage.events_since(since_sequence)?)
    }
}

// Make SessionsManager Clone-able (storage and sender are shared handles)
impl Clone for SessionsManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
            default_reservation_minutes: self.default_reservation_minutes,
        }
    }
}

#[cfg(test)]
mod tests;
