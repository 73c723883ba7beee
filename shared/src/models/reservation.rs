//! Reservation Model

use serde::{Deserialize, Serialize};

/// Reservation status (预订状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Booked,
    /// Guests arrived and took the table
    Seated,
    Cancelled,
}

/// Booked occupancy intent, kept independently of session lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub table_id: i64,
    pub venue_id: i64,
    pub customer_name: String,
    /// Unix millis
    pub start_time: i64,
    /// Unix millis
    pub end_time: i64,
    pub status: ReservationStatus,
    pub created_at: i64,
    pub updated_at: i64,
}
