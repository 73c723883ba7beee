//! OccupyTable command handler
//!
//! Seats guests at a table. With an order id the session goes to ORDERING,
//! otherwise to OCCUPIED. Seating a RESERVED table marks its booking SEATED.

use tracing::info;

use crate::sessions::bridge::OrderStatusBridge;
use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{ReservationStatus, SessionStatus};
use shared::session::{EffectSummary, TableAction};

/// OccupyTable action
#[derive(Debug, Clone)]
pub struct OccupyTableAction {
    pub table_id: i64,
    pub order_id: Option<String>,
    pub customer_name: Option<String>,
    pub guest_count: Option<i32>,
}

impl CommandHandler for OccupyTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let table = ctx.load_table(self.table_id)?;

        // 1. Current open session, or a fresh one if the table has none
        let (mut session, created) = match ctx.find_open_session(table.id)? {
            Some(session) => (session, false),
            None => (ctx.open_free_session(&table, None)?, true),
        };

        // 2. Only a table without guests in service can be (re)occupied
        match session.status {
            SessionStatus::Free | SessionStatus::Occupied | SessionStatus::Reserved => {}
            status if status.is_in_service() => {
                return Err(SessionError::TableInService {
                    table_id: table.id,
                    status,
                });
            }
            status => {
                return Err(SessionError::InvalidTransition {
                    action: TableAction::OccupyTable,
                    table_id: table.id,
                    status,
                });
            }
        }

        // 3. A booking that the guests just took is consumed
        let mut seated_reservation = None;
        if session.status == SessionStatus::Reserved
            && let Some(mut reservation) = ctx.latest_booked_reservation(table.id)?
        {
            reservation.status = ReservationStatus::Seated;
            reservation.updated_at = ctx.now();
            ctx.save_reservation(&reservation)?;
            seated_reservation = Some(reservation.id);
        }

        // 4. Apply
        session.status = if self.order_id.is_some() {
            SessionStatus::Ordering
        } else {
            SessionStatus::Occupied
        };
        if let Some(order_id) = &self.order_id {
            session.order_id = Some(order_id.clone());
            ctx.attach_order(order_id, table.id)?;
        }
        if let Some(name) = &self.customer_name {
            session.customer_name = Some(name.clone());
        }
        if let Some(guests) = self.guest_count {
            session.guest_count = Some(guests);
        }
        ctx.update_session(&session)?;

        info!(
            table_id = table.id,
            session_id = session.id,
            order_id = ?self.order_id,
            status = %session.status,
            "Table occupied"
        );

        let mut effect = EffectSummary::new(TableAction::OccupyTable, table.id, session.status);
        if created {
            effect.new_session_id = Some(session.id);
        } else {
            effect.updated_session_id = Some(session.id);
        }
        effect.updated_order_id = self.order_id.clone();
        effect.reservation_id = seated_reservation;
        Ok(effect)
    }
}
