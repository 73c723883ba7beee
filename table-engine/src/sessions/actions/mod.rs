//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific table action.

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::session::{EffectSummary, TableCommandPayload};

mod cancel_reservation;
mod close_table;
mod kitchen_status;
mod mark_awaiting_bill;
mod merge_table;
mod move_table;
mod occupy_table;
pub mod reserve_table;
mod unmerge_table;

pub use cancel_reservation::CancelReservationAction;
pub use close_table::CloseTableAction;
pub use kitchen_status::{KitchenStage, KitchenStatusAction};
pub use mark_awaiting_bill::MarkAwaitingBillAction;
pub use merge_table::MergeTableAction;
pub use move_table::MoveTableAction;
pub use occupy_table::OccupyTableAction;
pub use reserve_table::{RESERVATION_CONFLICT_WINDOW_MS, ReserveTableAction};
pub use unmerge_table::UnmergeTableAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    OccupyTable(OccupyTableAction),
    KitchenStatus(KitchenStatusAction),
    MarkAwaitingBill(MarkAwaitingBillAction),
    CloseTable(CloseTableAction),
    ReserveTable(ReserveTableAction),
    CancelReservation(CancelReservationAction),
    MoveTable(MoveTableAction),
    MergeTable(MergeTableAction),
    UnmergeTable(UnmergeTableAction),
}

/// Manual implementation of CommandHandler for CommandAction
impl CommandHandler for CommandAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        match self {
            CommandAction::OccupyTable(action) => action.execute(ctx, metadata),
            CommandAction::KitchenStatus(action) => action.execute(ctx, metadata),
            CommandAction::MarkAwaitingBill(action) => action.execute(ctx, metadata),
            CommandAction::CloseTable(action) => action.execute(ctx, metadata),
            CommandAction::ReserveTable(action) => action.execute(ctx, metadata),
            CommandAction::CancelReservation(action) => action.execute(ctx, metadata),
            CommandAction::MoveTable(action) => action.execute(ctx, metadata),
            CommandAction::MergeTable(action) => action.execute(ctx, metadata),
            CommandAction::UnmergeTable(action) => action.execute(ctx, metadata),
        }
    }
}

impl CommandAction {
    /// Build the action for `table_id`
    ///
    /// This is the ONLY place with a match on TableCommandPayload.
    /// `table_id` has already been resolved to the primary where the action
    /// delegates through merges.
    pub fn from_payload(
        table_id: i64,
        payload: &TableCommandPayload,
        default_reservation_minutes: i64,
    ) -> Self {
        match payload {
            TableCommandPayload::OccupyTable {
                order_id,
                customer_name,
                guest_count,
            } => CommandAction::OccupyTable(OccupyTableAction {
                table_id,
                order_id: order_id.clone(),
                customer_name: customer_name.clone(),
                guest_count: *guest_count,
            }),
            TableCommandPayload::StartPreparing { order_id } => {
                CommandAction::KitchenStatus(KitchenStatusAction {
                    table_id,
                    order_id: order_id.clone(),
                    stage: KitchenStage::Preparing,
                })
            }
            TableCommandPayload::MarkReady { order_id } => {
                CommandAction::KitchenStatus(KitchenStatusAction {
                    table_id,
                    order_id: order_id.clone(),
                    stage: KitchenStage::Ready,
                })
            }
            TableCommandPayload::MarkServed { order_id } => {
                CommandAction::KitchenStatus(KitchenStatusAction {
                    table_id,
                    order_id: order_id.clone(),
                    stage: KitchenStage::Served,
                })
            }
            TableCommandPayload::MarkAwaitingBill => {
                CommandAction::MarkAwaitingBill(MarkAwaitingBillAction { table_id })
            }
            TableCommandPayload::CloseTable => {
                CommandAction::CloseTable(CloseTableAction { table_id })
            }
            TableCommandPayload::ReserveTable {
                customer_name,
                reservation_time,
                duration_minutes,
            } => CommandAction::ReserveTable(ReserveTableAction {
                table_id,
                customer_name: customer_name.clone(),
                reservation_time: *reservation_time,
                duration_minutes: duration_minutes.unwrap_or(default_reservation_minutes),
            }),
            TableCommandPayload::CancelReservation { reservation_id } => {
                CommandAction::CancelReservation(CancelReservationAction {
                    table_id,
                    reservation_id: *reservation_id,
                })
            }
            TableCommandPayload::MoveTable {
                destination_table_id,
            } => CommandAction::MoveTable(MoveTableAction {
                source_table_id: table_id,
                destination_table_id: *destination_table_id,
            }),
            TableCommandPayload::MergeTable { secondary_table_id } => {
                CommandAction::MergeTable(MergeTableAction {
                    primary_table_id: table_id,
                    secondary_table_id: *secondary_table_id,
                })
            }
            TableCommandPayload::UnmergeTable => {
                CommandAction::UnmergeTable(UnmergeTableAction { table_id })
            }
        }
    }
}
