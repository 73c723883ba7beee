//! MergeTable command handler
//!
//! Makes `secondary` a secondary of `primary`: the secondary's merge link is
//! set, the primary's capacity absorbs the secondary's seats and the
//! secondary's open session is parked as MERGED. Merges are one level deep.

use tracing::info;

use crate::sessions::traits::{CommandContext, CommandHandler, CommandMetadata, SessionError};
use shared::models::SessionStatus;
use shared::session::{EffectSummary, TableAction};

/// MergeTable action
#[derive(Debug, Clone)]
pub struct MergeTableAction {
    pub primary_table_id: i64,
    pub secondary_table_id: i64,
}

impl CommandHandler for MergeTableAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<EffectSummary, SessionError> {
        if self.primary_table_id == self.secondary_table_id {
            return Err(SessionError::InvalidOperation(format!(
                "cannot merge table {} into itself",
                self.primary_table_id
            )));
        }

        // 1. Load both tables
        let mut primary = ctx.load_table(self.primary_table_id)?;
        let mut secondary = ctx.load_table(self.secondary_table_id)?;
        if primary.venue_id != secondary.venue_id {
            return Err(SessionError::VenueMismatch {
                first: primary.id,
                second: secondary.id,
            });
        }

        // 2. Topology checks (single-level merges only)
        if secondary.is_secondary() {
            return Err(SessionError::TableMerged(secondary.id));
        }
        if let Some(target) = primary.merged_into {
            return Err(SessionError::MergeConflict(format!(
                "table {} is itself merged into {}",
                primary.id, target
            )));
        }
        if !ctx.secondaries_of(secondary.id)?.is_empty() {
            return Err(SessionError::MergeConflict(format!(
                "table {} has tables merged into it",
                secondary.id
            )));
        }

        // 3. Session checks
        let primary_session = ctx.load_open_session(primary.id)?;
        let mut secondary_session = ctx.load_open_session(secondary.id)?;
        if secondary_session.status != SessionStatus::Free {
            return Err(SessionError::TableInService {
                table_id: secondary.id,
                status: secondary_session.status,
            });
        }

        // 4. Link + capacity, in the same transaction
        secondary.merged_into = Some(primary.id);
        ctx.save_table(&secondary)?;
        ctx.recompute_capacity(&mut primary)?;

        // 5. Park the secondary's session
        secondary_session.status = SessionStatus::Merged;
        ctx.update_session(&secondary_session)?;

        info!(
            primary_table_id = primary.id,
            secondary_table_id = secondary.id,
            capacity = primary.capacity,
            "Tables merged"
        );

        let mut effect =
            EffectSummary::new(TableAction::MergeTable, primary.id, primary_session.status);
        effect.updated_session_id = Some(secondary_session.id);
        effect.related_table_id = Some(secondary.id);
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::actions::test_support::{create_test_metadata, put_session, seed_table};
    use crate::sessions::storage::SessionStorage;

    fn merge(primary: i64, secondary: i64) -> MergeTableAction {
        MergeTableAction {
            primary_table_id: primary,
            secondary_table_id: secondary,
        }
    }

    #[test]
    fn test_merge_links_and_folds_capacity() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let secondary_session = seed_table(&storage, &txn, 2, 1, 2);
        seed_table(&storage, &txn, 3, 1, 6);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        let effect = merge(1, 2).execute(&mut ctx, &metadata).unwrap();
        assert_eq!(effect.related_table_id, Some(2));
        assert_eq!(effect.updated_session_id, Some(secondary_session.id));
        assert_eq!(ctx.load_table(1).unwrap().capacity, 6);
        assert_eq!(ctx.load_table(2).unwrap().merged_into, Some(1));
        assert_eq!(
            ctx.load_open_session(2).unwrap().status,
            SessionStatus::Merged
        );

        merge(1, 3).execute(&mut ctx, &metadata).unwrap();
        assert_eq!(ctx.load_table(1).unwrap().capacity, 12);
    }

    #[test]
    fn test_merge_already_merged_secondary_conflicts() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 1, 4);
        seed_table(&storage, &txn, 3, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        merge(1, 2).execute(&mut ctx, &metadata).unwrap();
        let err = merge(3, 2).execute(&mut ctx, &metadata).unwrap_err();
        assert!(matches!(err, SessionError::TableMerged(2)));
        assert_eq!(ctx.load_table(3).unwrap().capacity, 4);
    }

    #[test]
    fn test_no_chains() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 1, 4);
        seed_table(&storage, &txn, 3, 1, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);
        let metadata = create_test_metadata();

        merge(1, 2).execute(&mut ctx, &metadata).unwrap();
        // into a secondary
        assert!(matches!(
            merge(2, 3).execute(&mut ctx, &metadata),
            Err(SessionError::MergeConflict(_))
        ));
        // a primary as secondary
        assert!(matches!(
            merge(3, 1).execute(&mut ctx, &metadata),
            Err(SessionError::MergeConflict(_))
        ));
    }

    #[test]
    fn test_merge_busy_secondary_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        let mut busy = seed_table(&storage, &txn, 2, 1, 4);
        busy.status = SessionStatus::Ordering;
        put_session(&storage, &txn, &busy);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = merge(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(err, SessionError::TableInService { table_id: 2, .. }));
        assert_eq!(ctx.load_table(2).unwrap().merged_into, None);
    }

    #[test]
    fn test_merge_across_venues_rejected() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_table(&storage, &txn, 1, 1, 4);
        seed_table(&storage, &txn, 2, 9, 4);
        let mut ctx = CommandContext::new(&txn, &storage, 1000);

        let err = merge(1, 2).execute(&mut ctx, &create_test_metadata()).unwrap_err();
        assert!(matches!(err, SessionError::VenueMismatch { .. }));
    }
}
