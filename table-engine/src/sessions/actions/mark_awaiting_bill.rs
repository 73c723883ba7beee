//! MarkAwaitingBill command handler

use tracing::info;

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::SessionStatus;
use shared::session::{EffectSummary, TableAction};

/// MarkAwaitingBill action
#[derive(Debug, Clone)]
pub struct MarkAwaitingBillAction {
    pub table_id: i64,
}

impl CommandHandler for MarkAwaitingBillAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let mut session = ctx.load_open_session(self.table_id)?;

        // Nothing to bill on an empty or merely booked table
        if matches!(
            session.status,
            SessionStatus::Free | SessionStatus::Reserved | SessionStatus::Merged
        ) {
            return Err(SessionError::InvalidTransition {
                action: TableAction::MarkAwaitingBill,
                table_id: self.table_id,
                status: session.status,
            });
        }

        session.status = SessionStatus::AwaitingBill;
        ctx.update_session(&session)?;

        info!(table_id = self.table_id, session_id = session.id, "Table awaiting bill");

        let mut effect =
            EffectSummary::new(TableAction::MarkAwaitingBill, self.table_id, session.status);
        effect.updated_session_id = Some(session.id);
        Ok(effect)
    }
}
