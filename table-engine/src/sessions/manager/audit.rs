//! Startup audit: open-session repair and invariant checks

use std::collections::HashMap;
use std::fmt;

use super::{ManagerResult, SessionsManager};
use crate::sessions::storage::StorageError;
use crate::sessions::traits::CommandContext;
use shared::util::now_millis;

/// A broken store invariant found by [`SessionsManager::check_invariants`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Number of session rows with `closed_at = None` is not exactly one
    OpenSessionCount { table_id: i64, count: usize },
    /// `merged_into` points at the table itself
    SelfMerge { table_id: i64 },
    /// `merged_into` points at an unknown table
    MissingPrimary { table_id: i64, merged_into: i64 },
    /// `merged_into` points at a table that is itself merged
    MergeChain { table_id: i64, merged_into: i64 },
    /// Displayed capacity disagrees with own seats plus merged seats
    CapacityMismatch {
        table_id: i64,
        expected: i32,
        actual: i32,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::OpenSessionCount { table_id, count } => {
                write!(f, "table {table_id} has {count} open sessions")
            }
            InvariantViolation::SelfMerge { table_id } => {
                write!(f, "table {table_id} is merged into itself")
            }
            InvariantViolation::MissingPrimary {
                table_id,
                merged_into,
            } => write!(f, "table {table_id} is merged into unknown table {merged_into}"),
            InvariantViolation::MergeChain {
                table_id,
                merged_into,
            } => write!(
                f,
                "table {table_id} is merged into {merged_into}, which is itself merged"
            ),
            InvariantViolation::CapacityMismatch {
                table_id,
                expected,
                actual,
            } => write!(
                f,
                "table {table_id} capacity is {actual}, expected {expected}"
            ),
        }
    }
}

impl SessionsManager {
    /// Give every registered table without a live open session a FREE one.
    ///
    /// Returns the number of tables repaired.
    pub fn repair_open_sessions(&self) -> ManagerResult<usize> {
        let tables = self.storage.list_tables()?;
        let txn = self.storage.begin_write()?;
        let mut repaired = 0;
        {
            let ctx = CommandContext::new(&txn, &self.storage, now_millis());
            for table in &tables {
                let pointer = self.storage.open_session_id_txn(&txn, table.id)?;
                let live = match pointer {
                    Some(id) => self
                        .storage
                        .get_session_txn(&txn, id)?
                        .is_some_and(|s| s.is_open()),
                    None => false,
                };
                if live {
                    continue;
                }
                let session = ctx.open_free_session(table, pointer)?;
                tracing::warn!(
                    table_id = table.id,
                    stale_session_id = ?pointer,
                    session_id = session.id,
                    "Table had no live open session, FREE session created"
                );
                repaired += 1;
            }
        }
        if repaired > 0 {
            txn.commit().map_err(StorageError::from)?;
        }
        Ok(repaired)
    }

    /// Check the one-open-session and merge-topology invariants for every table
    pub fn check_invariants(&self) -> ManagerResult<Vec<InvariantViolation>> {
        let tables = self.storage.list_tables()?;
        let by_id: HashMap<i64, _> = tables.iter().map(|t| (t.id, t)).collect();
        let mut merged_seats: HashMap<i64, i32> = HashMap::new();
        let mut violations = Vec::new();

        for table in &tables {
            let count = self.storage.count_open_sessions(table.id)?;
            if count != 1 {
                violations.push(InvariantViolation::OpenSessionCount {
                    table_id: table.id,
                    count,
                });
            }

            let Some(primary_id) = table.merged_into else {
                continue;
            };
            if primary_id == table.id {
                violations.push(InvariantViolation::SelfMerge { table_id: table.id });
                continue;
            }
            match by_id.get(&primary_id) {
                None => violations.push(InvariantViolation::MissingPrimary {
                    table_id: table.id,
                    merged_into: primary_id,
                }),
                Some(primary) if primary.is_secondary() => {
                    violations.push(InvariantViolation::MergeChain {
                        table_id: table.id,
                        merged_into: primary_id,
                    })
                }
                Some(_) => *merged_seats.entry(primary_id).or_default() += table.seat_count,
            }
        }

        for table in &tables {
            let expected = if table.is_secondary() {
                table.seat_count
            } else {
                table.seat_count + merged_seats.get(&table.id).copied().unwrap_or(0)
            };
            if table.capacity != expected {
                violations.push(InvariantViolation::CapacityMismatch {
                    table_id: table.id,
                    expected,
                    actual: table.capacity,
                });
            }
        }

        if !violations.is_empty() {
            tracing::error!(count = violations.len(), "Session store invariants violated");
        }
        Ok(violations)
    }
}
