//! Order Status Bridge
//!
//! The engine touches only three fields of an order: `order_status`,
//! `payment_status` (read) and `table_id`. The records live in the
//! `order_status` table and are written inside the command's transaction.

use shared::models::{OrderStatus, OrderStatusRecord, PaymentStatus};

use super::traits::{CommandContext, SessionError};

/// Narrow read/write interface onto an order's status fields
pub trait OrderStatusBridge {
    fn set_order_status(&mut self, order_id: &str, status: OrderStatus) -> Result<(), SessionError>;

    /// `None` when the order is unknown
    fn order_payment_status(&self, order_id: &str) -> Result<Option<PaymentStatus>, SessionError>;

    fn set_order_table_id(&mut self, order_id: &str, table_id: i64) -> Result<(), SessionError>;

    /// Register an order seated at a table, or re-point an existing one
    fn attach_order(&mut self, order_id: &str, table_id: i64) -> Result<(), SessionError>;
}

impl CommandContext<'_> {
    fn load_order(&self, order_id: &str) -> Result<OrderStatusRecord, SessionError> {
        self.storage()
            .get_order_txn(self.txn(), order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))
    }
}

impl OrderStatusBridge for CommandContext<'_> {
    fn set_order_status(&mut self, order_id: &str, status: OrderStatus) -> Result<(), SessionError> {
        let mut record = self.load_order(order_id)?;
        record.order_status = status;
        record.updated_at = self.now();
        Ok(self.storage().store_order(self.txn(), &record)?)
    }

    fn order_payment_status(&self, order_id: &str) -> Result<Option<PaymentStatus>, SessionError> {
        Ok(self
            .storage()
            .get_order_txn(self.txn(), order_id)?
            .map(|r| r.payment_status))
    }

    fn set_order_table_id(&mut self, order_id: &str, table_id: i64) -> Result<(), SessionError> {
        let mut record = self.load_order(order_id)?;
        record.table_id = table_id;
        record.updated_at = self.now();
        Ok(self.storage().store_order(self.txn(), &record)?)
    }

    fn attach_order(&mut self, order_id: &str, table_id: i64) -> Result<(), SessionError> {
        let record = match self.storage().get_order_txn(self.txn(), order_id)? {
            Some(mut existing) => {
                existing.table_id = table_id;
                existing.updated_at = self.now();
                existing
            }
            None => OrderStatusRecord {
                order_id: order_id.to_string(),
                order_status: OrderStatus::Pending,
                payment_status: PaymentStatus::Unpaid,
                table_id,
                updated_at: self.now(),
            },
        };
        Ok(self.storage().store_order(self.txn(), &record)?)
    }
}
