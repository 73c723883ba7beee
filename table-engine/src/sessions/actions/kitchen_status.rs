//! Kitchen progress handlers: start_preparing, mark_ready, mark_served
//!
//! All three move the order and the table's open session to the same stage.
//! The open session must carry the given order.

use tracing::info;

use crate::sessions::bridge::OrderStatusBridge;
use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::{OrderStatus, SessionStatus};
use shared::session::{EffectSummary, TableAction};

/// Kitchen stage reached by the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenStage {
    Preparing,
    Ready,
    Served,
}

impl KitchenStage {
    pub fn action(&self) -> TableAction {
        match self {
            KitchenStage::Preparing => TableAction::StartPreparing,
            KitchenStage::Ready => TableAction::MarkReady,
            KitchenStage::Served => TableAction::MarkServed,
        }
    }

    fn session_status(&self) -> SessionStatus {
        match self {
            KitchenStage::Preparing => SessionStatus::InPrep,
            KitchenStage::Ready => SessionStatus::Ready,
            KitchenStage::Served => SessionStatus::Served,
        }
    }

    fn order_status(&self) -> OrderStatus {
        match self {
            KitchenStage::Preparing => OrderStatus::InPrep,
            KitchenStage::Ready => OrderStatus::Ready,
            KitchenStage::Served => OrderStatus::Served,
        }
    }
}

/// StartPreparing / MarkReady / MarkServed action
#[derive(Debug, Clone)]
pub struct KitchenStatusAction {
    pub table_id: i64,
    pub order_id: String,
    pub stage: KitchenStage,
}

impl CommandHandler for KitchenStatusAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let mut session = ctx.load_open_session(self.table_id)?;
        if session.order_id.as_deref() != Some(self.order_id.as_str()) {
            return Err(SessionError::OrderNotOnTable {
                table_id: self.table_id,
                order_id: self.order_id.clone(),
            });
        }

        ctx.set_order_status(&self.order_id, self.stage.order_status())?;
        session.status = self.stage.session_status();
        ctx.update_session(&session)?;

        info!(
            table_id = self.table_id,
            session_id = session.id,
            order_id = %self.order_id,
            status = %session.status,
            "Kitchen status advanced"
        );

        let mut effect = EffectSummary::new(self.stage.action(), self.table_id, session.status);
        effect.updated_session_id = Some(session.id);
        effect.updated_order_id = Some(self.order_id.clone());
        Ok(effect)
    }
}
