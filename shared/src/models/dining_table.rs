//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity (桌台)
///
/// `seat_count` is the table's own base seating; `capacity` is what is
/// displayed, i.e. the base plus the seats of every table merged into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub venue_id: i64,
    pub label: String,
    pub seat_count: i32,
    pub capacity: i32,
    /// Primary table this one is merged into (its session lives there)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<i64>,
    pub created_at: i64,
}

impl DiningTable {
    /// True when this table is a merge secondary
    pub fn is_secondary(&self) -> bool {
        self.merged_into.is_some()
    }
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub venue_id: i64,
    pub label: String,
    pub seat_count: i32,
}
