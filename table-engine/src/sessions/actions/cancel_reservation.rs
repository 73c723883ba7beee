//! CancelReservation command handler
//!
//! Flips a booked reservation to CANCELLED. A RESERVED open session is closed
//! and replaced by a FREE one, the same way close_table cycles a session.

use tracing::info;

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{ReservationStatus, SessionStatus};
use shared::session::{EffectSummary, TableAction};

/// CancelReservation action
#[derive(Debug, Clone)]
pub struct CancelReservationAction {
    pub table_id: i64,
    pub reservation_id: i64,
}

impl CommandHandler for CancelReservationAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let table = ctx.load_table(self.table_id)?;
        let session = ctx.load_open_session(table.id)?;

        // 1. Reservation must be a live booking of this table
        let mut reservation = ctx.load_reservation(self.reservation_id)?;
        if reservation.table_id != table.id {
            return Err(SessionError::ReservationNotFound(self.reservation_id));
        }
        if reservation.status != ReservationStatus::Booked {
            return Err(SessionError::InvalidOperation(format!(
                "reservation {} is no longer booked ({:?})",
                self.reservation_id, reservation.status
            )));
        }

        reservation.status = ReservationStatus::Cancelled;
        reservation.updated_at = ctx.now();
        ctx.save_reservation(&reservation)?;

        // 2. Release the table if it is still only booked
        let mut effect = EffectSummary::new(TableAction::CancelReservation, table.id, session.status);
        effect.reservation_id = Some(reservation.id);
        if session.status == SessionStatus::Reserved {
            let next = ctx.close_and_replace(&session, &table)?;
            effect.status = next.status;
            effect.closed_session_id = Some(session.id);
            effect.new_session_id = Some(next.id);
        }

        info!(
            table_id = table.id,
            reservation_id = reservation.id,
            released = effect.new_session_id.is_some(),
            "Reservation cancelled"
        );

        Ok(effect)
    }
}
