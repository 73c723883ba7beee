//! UnmergeTable command handler
//!
//! Reverses one merge link. Called on a secondary it unlinks that table;
//! called on a primary it releases the secondary with the smallest id.

use tracing::info;

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::SessionStatus;
use shared::session::{EffectSummary, TableAction};

/// UnmergeTable action
#[derive(Debug, Clone)]
pub struct UnmergeTableAction {
    pub table_id: i64,
}

impl CommandHandler for UnmergeTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        let table = ctx.load_table(self.table_id)?;

        // 1. Find the link to reverse
        let (mut secondary, mut primary) = match table.merged_into {
            Some(primary_id) => {
                let primary = ctx.load_table(primary_id)?;
                (table, primary)
            }
            None => {
                let first = ctx.secondaries_of(table.id)?.into_iter().next();
                match first {
                    Some(secondary) => (secondary, table),
                    None => return Err(SessionError::NoMergeFound(self.table_id)),
                }
            }
        };

        // 2. Unlink, restore base seats, recompute the primary
        secondary.merged_into = None;
        secondary.capacity = secondary.seat_count;
        ctx.save_table(&secondary)?;
        ctx.recompute_capacity(&mut primary)?;

        // 3. Give the secondary its own FREE session back
        let (closed_session_id, next) = match ctx.find_open_session(secondary.id)? {
            Some(parked) => (Some(parked.id), ctx.close_and_replace(&parked, &secondary)?),
            None => (None, ctx.open_free_session(&secondary, None)?),
        };

        info!(
            primary_table_id = primary.id,
            secondary_table_id = secondary.id,
            capacity = primary.capacity,
            "Tables unmerged"
        );

        let mut effect = EffectSummary::new(TableAction::UnmergeTable, secondary.id, SessionStatus::Free);
        effect.closed_session_id = closed_session_id;
        effect.new_session_id = Some(next.id);
        effect.related_table_id = Some(primary.id);
        Ok(effect)
    }
}
