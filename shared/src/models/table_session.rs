//! Table Session Model

use serde::{Deserialize, Serialize};

/// Session status (桌台状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Free,
    Occupied,
    Ordering,
    InPrep,
    Ready,
    Served,
    AwaitingBill,
    Reserved,
    /// Transient: the row is closed and superseded by a fresh FREE session
    Closed,
    /// Merge secondary: state queries delegate to the primary's session
    Merged,
}

impl SessionStatus {
    /// Statuses during which the table is mid-service and cannot be booked
    pub fn is_in_service(&self) -> bool {
        matches!(
            self,
            SessionStatus::Ordering
                | SessionStatus::InPrep
                | SessionStatus::Ready
                | SessionStatus::Served
                | SessionStatus::AwaitingBill
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Free => "FREE",
            SessionStatus::Occupied => "OCCUPIED",
            SessionStatus::Ordering => "ORDERING",
            SessionStatus::InPrep => "IN_PREP",
            SessionStatus::Ready => "READY",
            SessionStatus::Served => "SERVED",
            SessionStatus::AwaitingBill => "AWAITING_BILL",
            SessionStatus::Reserved => "RESERVED",
            SessionStatus::Closed => "CLOSED",
            SessionStatus::Merged => "MERGED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One continuous period of use of a table
///
/// Open while `closed_at` is `None`. Closed rows are kept as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSession {
    pub id: i64,
    pub table_id: i64,
    pub venue_id: i64,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<i32>,
    /// Reservation start (Unix millis), mirrored from the ledger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_duration_minutes: Option<i64>,
    pub opened_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl TableSession {
    /// A fresh FREE session for a table
    pub fn free(id: i64, table_id: i64, venue_id: i64, opened_at: i64) -> Self {
        Self {
            id,
            table_id,
            venue_id,
            status: SessionStatus::Free,
            order_id: None,
            customer_name: None,
            guest_count: None,
            reservation_time: None,
            reservation_duration_minutes: None,
            opened_at,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}
