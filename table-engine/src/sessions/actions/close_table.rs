//! CloseTable command handler
//!
//! Completes a paid order, closes the open session and opens the table's
//! next FREE session in the same transaction.

use tracing::{info, warn};

use crate::sessions::bridge::OrderStatusBridge;
use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{OrderStatus, PaymentStatus, SessionStatus};
use shared::session::{EffectSummary, TableAction};

/// CloseTable action
#[derive(Debug, Clone)]
pub struct CloseTableAction {
    pub table_id: i64,
}

impl CommandHandler for CloseTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let table = ctx.load_table(self.table_id)?;
        let session = ctx.load_open_session(table.id)?;

        if session.status == SessionStatus::Merged {
            return Err(SessionError::InvalidTransition {
                action: TableAction::CloseTable,
                table_id: table.id,
                status: session.status,
            });
        }

        // 1. Complete the order first when it has been paid
        let mut completed_order = None;
        if let Some(order_id) = &session.order_id {
            match ctx.order_payment_status(order_id)? {
                Some(PaymentStatus::Paid) => {
                    ctx.set_order_status(order_id, OrderStatus::Completed)?;
                    completed_order = Some(order_id.clone());
                }
                Some(_) => {}
                None => {
                    warn!(
                        table_id = table.id,
                        order_id = %order_id,
                        "Order status record missing on close, treating as unpaid"
                    );
                }
            }
        }

        // 2. Close + reopen
        let next = ctx.close_and_replace(&session, &table)?;

        info!(
            table_id = table.id,
            closed_session_id = session.id,
            new_session_id = next.id,
            completed_order = ?completed_order,
            "Table closed"
        );

        let mut effect = EffectSummary::new(TableAction::CloseTable, table.id, next.status);
        effect.closed_session_id = Some(session.id);
        effect.new_session_id = Some(next.id);
        effect.updated_order_id = completed_order;
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::actions::test_support::{create_test_metadata, put_session, seed_table};
    use crate::sessions::storage::SessionStorage;
    use shared::models::OrderStatusRecord;

    fn seat_order(storage: &SessionStorage, txn: &redb::WriteTransaction, payment: PaymentStatus) -> i64 {
        let mut session = seed_table(storage, txn, 1, 1, 4);
        session.status = SessionStatus::AwaitingBill;
        session.order_id = Some("O1".into());
        put_session(storage, txn, &session);
        storage
            .store_order(
                txn,
                &OrderStatusRecord {
                    order_id: "O1".into(),
                    order_status: OrderStatus::Served,
                    payment_status: payment,
                    table_id: 1,
                    updated_at: 0,
                },
            )
            .unwrap();
        session.id
    }

    #[test]
    fn test_close_paid_order_completes_it() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let old_id = seat_order(&storage, &txn, PaymentStatus::Paid);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = CloseTableAction { table_id: 1 }
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();

        assert_eq!(effect.status, SessionStatus::Free);
        assert_eq!(effect.closed_session_id, Some(old_id));
        assert_eq!(effect.updated_order_id.as_deref(), Some("O1"));

        let order = storage.get_order_txn(&txn, "O1").unwrap().unwrap();
        assert_eq!(order.order_status, OrderStatus::Completed);

        let open = ctx.load_open_session(1).unwrap();
        assert_eq!(Some(open.id), effect.new_session_id);
        assert_eq!(open.status, SessionStatus::Free);
        assert_eq!(open.order_id, None);
    }

    #[test]
    fn test_close_unpaid_order_leaves_status() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seat_order(&storage, &txn, PaymentStatus::Partial);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = CloseTableAction { table_id: 1 }
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();
        assert_eq!(effect.updated_order_id, None);

        let order = storage.get_order_txn(&txn, "O1").unwrap().unwrap();
        assert_eq!(order.order_status, OrderStatus::Served);
    }

    #[test]
    fn test_close_with_unknown_order_still_closes() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = seed_table(&storage, &txn, 1, 1, 4);
        session.status = SessionStatus::Ordering;
        session.order_id = Some("ghost".into());
        put_session(&storage, &txn, &session);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = CloseTableAction { table_id: 1 }
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();
        assert_eq!(effect.closed_session_id, Some(session.id));
        let closed = storage.get_session_txn(&txn, session.id).unwrap().unwrap();
        assert!(!closed.is_open());
        assert_eq!(
            Some(ctx.load_open_session(1).unwrap().id),
            effect.new_session_id
        );
    }

    #[test]
    fn test_close_free_table_cycles_session() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let seeded = seed_table(&storage, &txn, 1, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let effect = CloseTableAction { table_id: 1 }
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();
        assert_eq!(effect.closed_session_id, Some(seeded.id));
        assert_ne!(effect.new_session_id, Some(seeded.id));
    }
}
