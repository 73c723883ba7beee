//! ReserveTable command handler
//!
//! Books a table for a customer. The open session is the authority for
//! conflict checks; the reservation ledger keeps the booked record.
//!
//! While the session is RESERVED a new booking reschedules the live ledger
//! entry; otherwise a new ledger entry is created.
//!
//! Conflict rules against the current open session:
//! - in service (ORDERING .. AWAITING_BILL): rejected
//! - RESERVED without a time: rejected
//! - RESERVED at a time less than [`RESERVATION_CONFLICT_WINDOW_MS`] away: rejected
//!   (exactly the window apart is accepted)

use tracing::info;

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{Reservation, ReservationStatus, SessionStatus};
use shared::session::{EffectSummary, TableAction};
use shared::util::{checked_minutes_to_millis, minutes_to_millis};

/// Two bookings of one table must start at least this far apart (30 min)
pub const RESERVATION_CONFLICT_WINDOW_MS: i64 = minutes_to_millis(30);

/// ReserveTable action
#[derive(Debug, Clone)]
pub struct ReserveTableAction {
    pub table_id: i64,
    pub customer_name: String,
    /// Unix millis
    pub reservation_time: i64,
    pub duration_minutes: i64,
}

impl ReserveTableAction {
    fn check_conflict(&self, status: SessionStatus, existing: Option<i64>) -> Result<(), SessionError> {
        match status {
            status if status.is_in_service() => Err(SessionError::TableInService {
                table_id: self.table_id,
                status,
            }),
            SessionStatus::Reserved => match existing {
                None => Err(SessionError::ReservationBlocked(self.table_id)),
                Some(existing)
                    if existing.abs_diff(self.reservation_time)
                        < RESERVATION_CONFLICT_WINDOW_MS.unsigned_abs() =>
                {
                    Err(SessionError::ReservationConflict {
                        table_id: self.table_id,
                        existing,
                        requested: self.reservation_time,
                    })
                }
                Some(_) => Ok(()),
            },
            SessionStatus::Merged | SessionStatus::Closed => Err(SessionError::InvalidTransition {
                action: TableAction::ReserveTable,
                table_id: self.table_id,
                status,
            }),
            _ => Ok(()),
        }
    }

    fn end_time(&self) -> Result<i64, SessionError> {
        checked_minutes_to_millis(self.duration_minutes)
            .and_then(|duration| self.reservation_time.checked_add(duration))
            .ok_or_else(|| {
                SessionError::InvalidOperation(format!(
                    "reservation at {} for {} minutes is out of range",
                    self.reservation_time, self.duration_minutes
                ))
            })
    }
}

impl CommandHandler for ReserveTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let table = ctx.load_table(self.table_id)?;
        let mut session = ctx.load_open_session(table.id)?;

        // 1. Conflict check against the live session
        self.check_conflict(session.status, session.reservation_time)?;

        // 2. Reschedule the live booking, or record a new one
        let end_time = self.end_time()?;
        let live = if session.status == SessionStatus::Reserved {
            ctx.latest_booked_reservation(table.id)?
        } else {
            None
        };
        let reservation = match live {
            Some(mut existing) => {
                existing.customer_name = self.customer_name.clone();
                existing.start_time = self.reservation_time;
                existing.end_time = end_time;
                existing.updated_at = ctx.now();
                existing
            }
            None => Reservation {
                id: ctx.next_reservation_id()?,
                table_id: table.id,
                venue_id: table.venue_id,
                customer_name: self.customer_name.clone(),
                start_time: self.reservation_time,
                end_time,
                status: ReservationStatus::Booked,
                created_at: ctx.now(),
                updated_at: ctx.now(),
            },
        };
        ctx.save_reservation(&reservation)?;

        // 3. Mirror onto the open session
        session.status = SessionStatus::Reserved;
        session.customer_name = Some(self.customer_name.clone());
        session.reservation_time = Some(self.reservation_time);
        session.reservation_duration_minutes = Some(self.duration_minutes);
        ctx.update_session(&session)?;

        info!(
            table_id = table.id,
            session_id = session.id,
            reservation_id = reservation.id,
            customer = %self.customer_name,
            reservation_time = self.reservation_time,
            "Table reserved"
        );

        let mut effect = EffectSummary::new(TableAction::ReserveTable, table.id, session.status);
        effect.updated_session_id = Some(session.id);
        effect.reservation_id = Some(reservation.id);
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::actions::test_support::{create_test_metadata, put_session, seed_table};
    use crate::sessions::storage::SessionStorage;

    const T0: i64 = 1_700_000_000_000;

    fn reserve(name: &str, at: i64) -> ReserveTableAction {
        ReserveTableAction {
            table_id: 1,
            customer_name: name.to_string(),
            reservation_time: at,
            duration_minutes: 90,
        }
    }

    #[test]
    fn test_reserve_free_table() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = reserve("Alice", T0)
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();
        assert_eq!(effect.status, SessionStatus::Reserved);

        let session = ctx.load_open_session(1).unwrap();
        assert_eq!(session.customer_name.as_deref(), Some("Alice"));
        assert_eq!(session.reservation_time, Some(T0));
        assert_eq!(session.reservation_duration_minutes, Some(90));

        let reservation = ctx.load_reservation(effect.reservation_id.unwrap()).unwrap();
        assert_eq!(reservation.status, ReservationStatus::Booked);
        assert_eq!(reservation.end_time, T0 + minutes_to_millis(90));
    }

    #[test]
    fn test_conflict_window_boundaries() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        let first = reserve("Alice", T0).execute(&mut ctx, &metadata).unwrap();

        let err = reserve("Bob", T0 + minutes_to_millis(29))
            .execute(&mut ctx, &metadata)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::ReservationConflict { existing: T0, .. }
        ));

        // Earlier side of the window conflicts too
        assert!(
            reserve("Bob", T0 - minutes_to_millis(10))
                .execute(&mut ctx, &metadata)
                .is_err()
        );

        // Exactly the window apart is accepted and updates the booking in place
        let second = reserve("Bob", T0 + RESERVATION_CONFLICT_WINDOW_MS)
            .execute(&mut ctx, &metadata)
            .unwrap();
        assert_eq!(second.reservation_id, first.reservation_id);
        let reservation = ctx.load_reservation(second.reservation_id.unwrap()).unwrap();
        assert_eq!(reservation.customer_name, "Bob");
    }

    #[test]
    fn test_reserved_without_time_blocks() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = seed_table(&storage, &txn, 1, 1, 4);
        session.status = SessionStatus::Reserved;
        put_session(&storage, &txn, &session);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = reserve("Bob", T0 + minutes_to_millis(600))
            .execute(&mut ctx, &create_test_metadata())
            .unwrap_err();
        assert!(matches!(err, SessionError::ReservationBlocked(1)));
    }

    #[test]
    fn test_in_service_table_cannot_be_booked() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = seed_table(&storage, &txn, 1, 1, 4);
        session.status = SessionStatus::AwaitingBill;
        put_session(&storage, &txn, &session);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = reserve("Bob", T0)
            .execute(&mut ctx, &create_test_metadata())
            .unwrap_err();
        assert!(matches!(err, SessionError::TableInService { .. }));
    }

    #[test]
    fn test_oversized_booking_is_rejected_without_overflow() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        let mut long = reserve("Alice", T0);
        long.duration_minutes = i64::MAX / 1000;
        assert!(matches!(
            long.execute(&mut ctx, &metadata),
            Err(SessionError::InvalidOperation(_))
        ));

        let late = reserve("Alice", i64::MAX - 1000);
        assert!(matches!(
            late.execute(&mut ctx, &metadata),
            Err(SessionError::InvalidOperation(_))
        ));

        // nothing was written
        assert_eq!(ctx.load_open_session(1).unwrap().status, SessionStatus::Free);
        assert!(ctx.latest_booked_reservation(1).unwrap().is_none());
    }

    #[test]
    fn test_conflict_check_handles_extreme_times() {
        let action = reserve("Bob", T0);
        assert!(action.check_conflict(SessionStatus::Reserved, Some(i64::MIN)).is_ok());

        let action = reserve("Bob", i64::MIN);
        assert!(action.check_conflict(SessionStatus::Reserved, Some(i64::MAX)).is_ok());
    }

    #[test]
    fn test_new_booking_after_seated_guests_keeps_history() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        let first = reserve("Alice", T0).execute(&mut ctx, &metadata).unwrap();

        // guests arrived: the session is no longer RESERVED
        let mut session = ctx.load_open_session(1).unwrap();
        session.status = SessionStatus::Occupied;
        ctx.update_session(&session).unwrap();

        let second = reserve("Bob", T0 + minutes_to_millis(24 * 60))
            .execute(&mut ctx, &metadata)
            .unwrap();
        assert_ne!(second.reservation_id, first.reservation_id);

        let alice = ctx.load_reservation(first.reservation_id.unwrap()).unwrap();
        assert_eq!(alice.customer_name, "Alice");
        assert_eq!(alice.start_time, T0);
    }
}
