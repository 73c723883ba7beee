//! MoveTable command handler
//!
//! Moves an in-progress session from a source table to a FREE destination.
//! The destination's open session takes over the source session's state, the
//! source session is closed and the source gets a fresh FREE session. A
//! RESERVED session takes its live booking along to the destination.
//!
//! Re-pointing the order's `table_id` is best-effort: a failure is logged and
//! the move still commits.

use tracing::{info, warn};

use crate::sessions::bridge::OrderStatusBridge;
use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{DiningTable, SessionStatus};
use shared::session::{EffectSummary, TableAction};

/// MoveTable action
#[derive(Debug, Clone)]
pub struct MoveTableAction {
    pub source_table_id: i64,
    pub destination_table_id: i64,
}

impl MoveTableAction {
    /// Merged tables share one session; moving one half would split it.
    fn ensure_unmerged(&self, ctx: &CommandContext<'_>, table: &DiningTable) -> Result<(), SessionError> {
        if let Some(primary) = table.merged_into {
            return Err(SessionError::InvalidOperation(format!(
                "table {} is merged into {}, unmerge before moving",
                table.id, primary
            )));
        }
        if !ctx.secondaries_of(table.id)?.is_empty() {
            return Err(SessionError::InvalidOperation(format!(
                "table {} has merged tables, unmerge before moving",
                table.id
            )));
        }
        Ok(())
    }
}

impl CommandHandler for MoveTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        if self.source_table_id == self.destination_table_id {
            return Err(SessionError::InvalidOperation(format!(
                "cannot move table {} onto itself",
                self.source_table_id
            )));
        }

        // 1. Load both tables
        let source = ctx.load_table(self.source_table_id)?;
        let destination = ctx.load_table(self.destination_table_id)?;
        if source.venue_id != destination.venue_id {
            return Err(SessionError::VenueMismatch {
                first: source.id,
                second: destination.id,
            });
        }
        self.ensure_unmerged(ctx, &source)?;
        self.ensure_unmerged(ctx, &destination)?;

        // 2. Source must have something to move
        let from = ctx.load_open_session(source.id)?;
        if matches!(from.status, SessionStatus::Free | SessionStatus::Merged) {
            return Err(SessionError::InvalidTransition {
                action: TableAction::MoveTable,
                table_id: source.id,
                status: from.status,
            });
        }

        // 3. Destination must be empty
        let mut to = ctx.load_open_session(destination.id)?;
        if to.status != SessionStatus::Free {
            return Err(SessionError::DestinationNotFree {
                table_id: destination.id,
                status: to.status,
            });
        }

        // 4. Close source, give it its next FREE session
        let source_next = ctx.close_and_replace(&from, &source)?;

        // 5. Destination takes over the session state, keeping its own identity
        to.status = from.status;
        to.order_id = from.order_id.clone();
        to.customer_name = from.customer_name.clone();
        to.guest_count = from.guest_count;
        to.reservation_time = from.reservation_time;
        to.reservation_duration_minutes = from.reservation_duration_minutes;
        to.opened_at = from.opened_at;
        ctx.update_session(&to)?;

        // 6. A pending booking follows the guests
        let mut moved_reservation = None;
        if from.status == SessionStatus::Reserved
            && let Some(mut reservation) = ctx.latest_booked_reservation(source.id)?
        {
            ctx.relocate_reservation(&mut reservation, &destination)?;
            moved_reservation = Some(reservation.id);
        }

        // 7. Re-point the order (best-effort)
        let mut repointed_order = None;
        if let Some(order_id) = &from.order_id {
            match ctx.set_order_table_id(order_id, destination.id) {
                Ok(()) => repointed_order = Some(order_id.clone()),
                Err(e) => {
                    warn!(
                        order_id = %order_id,
                        source_table_id = source.id,
                        destination_table_id = destination.id,
                        error = %e,
                        "Failed to re-point order after move, continuing"
                    );
                }
            }
        }

        info!(
            source_table_id = source.id,
            destination_table_id = destination.id,
            closed_session_id = from.id,
            destination_session_id = to.id,
            status = %to.status,
            "Table moved"
        );

        let mut effect = EffectSummary::new(TableAction::MoveTable, source.id, source_next.status);
        effect.closed_session_id = Some(from.id);
        effect.new_session_id = Some(source_next.id);
        effect.updated_session_id = Some(to.id);
        effect.updated_order_id = repointed_order;
        effect.related_table_id = Some(destination.id);
        effect.reservation_id = moved_reservation;
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::actions::test_support::{create_test_metadata, put_session, seed_table};
    use crate::sessions::storage::SessionStorage;

    fn moving(from: i64, to: i64) -> MoveTableAction {
        MoveTableAction {
            source_table_id: from,
            destination_table_id: to,
        }
    }

    #[test]
    fn test_move_ordering_session() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut a = seed_table(&storage, &txn, 1, 1, 4);
        let b = seed_table(&storage, &txn, 2, 1, 4);
        a.status = SessionStatus::Ordering;
        a.order_id = Some("O2".into());
        a.guest_count = Some(3);
        put_session(&storage, &txn, &a);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        ctx.attach_order("O2", 1).unwrap();

        let effect = moving(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap();

        assert_eq!(effect.closed_session_id, Some(a.id));
        assert_eq!(effect.updated_session_id, Some(b.id));
        assert_eq!(effect.updated_order_id.as_deref(), Some("O2"));

        let dest = ctx.load_open_session(2).unwrap();
        assert_eq!(dest.id, b.id);
        assert_eq!(dest.status, SessionStatus::Ordering);
        assert_eq!(dest.order_id.as_deref(), Some("O2"));
        assert_eq!(dest.guest_count, Some(3));

        let src = ctx.load_open_session(1).unwrap();
        assert_eq!(src.status, SessionStatus::Free);
        assert_eq!(Some(src.id), effect.new_session_id);

        assert_eq!(storage.get_order_txn(&txn, "O2").unwrap().unwrap().table_id, 2);
    }

    #[test]
    fn test_move_succeeds_when_order_record_missing() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut a = seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 1, 4);
        a.status = SessionStatus::Served;
        a.order_id = Some("ghost".into());
        put_session(&storage, &txn, &a);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = moving(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap();
        assert_eq!(effect.updated_order_id, None);
        assert_eq!(
            ctx.load_open_session(2).unwrap().order_id.as_deref(),
            Some("ghost")
        );
    }

    #[test]
    fn test_move_free_table_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = moving(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                status: SessionStatus::Free,
                ..
            }
        ));
    }

    #[test]
    fn test_move_to_busy_destination_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut a = seed_table(&storage, &txn, 1, 1, 4);
        let mut b = seed_table(&storage, &txn, 2, 1, 4);
        a.status = SessionStatus::Occupied;
        b.status = SessionStatus::Reserved;
        put_session(&storage, &txn, &a);
        put_session(&storage, &txn, &b);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = moving(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::DestinationNotFree { table_id: 2, .. }
        ));
        assert_eq!(ctx.load_open_session(1).unwrap().id, a.id);
    }

    #[test]
    fn test_move_onto_itself_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = moving(1, 1).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidOperation(_)));
    }

    #[test]
    fn test_move_merged_table_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut a = seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 1, 4);
        seed_table(&storage, &txn, 3, 1, 4);
        a.status = SessionStatus::Occupied;
        put_session(&storage, &txn, &a);
        let mut secondary = storage.get_table_txn(&txn, 3).unwrap().unwrap();
        secondary.merged_into = Some(1);
        storage.store_table(&txn, &secondary).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = moving(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidOperation(_)));
    }
}
