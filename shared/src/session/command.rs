//! Table commands - requests to change a table's session or topology

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::util::MAX_TIMESTAMP_MILLIS;

/// Longest booking a single reservation may hold (one day)
pub const MAX_RESERVATION_MINUTES: i64 = 24 * 60;

/// Action names accepted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    OccupyTable,
    StartPreparing,
    MarkReady,
    MarkServed,
    MarkAwaitingBill,
    CloseTable,
    ReserveTable,
    CancelReservation,
    MoveTable,
    MergeTable,
    UnmergeTable,
}

impl TableAction {
    pub const ALL: [TableAction; 11] = [
        TableAction::OccupyTable,
        TableAction::StartPreparing,
        TableAction::MarkReady,
        TableAction::MarkServed,
        TableAction::MarkAwaitingBill,
        TableAction::CloseTable,
        TableAction::ReserveTable,
        TableAction::CancelReservation,
        TableAction::MoveTable,
        TableAction::MergeTable,
        TableAction::UnmergeTable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableAction::OccupyTable => "occupy_table",
            TableAction::StartPreparing => "start_preparing",
            TableAction::MarkReady => "mark_ready",
            TableAction::MarkServed => "mark_served",
            TableAction::MarkAwaitingBill => "mark_awaiting_bill",
            TableAction::CloseTable => "close_table",
            TableAction::ReserveTable => "reserve_table",
            TableAction::CancelReservation => "cancel_reservation",
            TableAction::MoveTable => "move_table",
            TableAction::MergeTable => "merge_table",
            TableAction::UnmergeTable => "unmerge_table",
        }
    }

    /// Whether a secondary table id is resolved to its primary before the
    /// action runs. Topology actions work on the table they are given.
    pub fn resolves_through_merge(&self) -> bool {
        !matches!(
            self,
            TableAction::MoveTable | TableAction::MergeTable | TableAction::UnmergeTable
        )
    }
}

impl std::fmt::Display for TableAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableAction {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PayloadError::UnknownAction(s.to_string()))
    }
}

/// Errors raised while turning an action name + params into a payload.
/// Raised before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{action} requires parameter `{field}`")]
    MissingParameter {
        action: TableAction,
        field: &'static str,
    },

    #[error("{action}: invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        action: TableAction,
        field: &'static str,
        reason: String,
    },
}

/// Untyped action parameters as they arrive from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<i32>,
    /// Unix millis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_table_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_table_id: Option<i64>,
}

impl ActionParams {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn reservation(customer_name: impl Into<String>, reservation_time: i64) -> Self {
        Self {
            customer_name: Some(customer_name.into()),
            reservation_time: Some(reservation_time),
            ..Self::default()
        }
    }

    pub fn cancel(reservation_id: i64) -> Self {
        Self {
            reservation_id: Some(reservation_id),
            ..Self::default()
        }
    }

    pub fn destination(table_id: i64) -> Self {
        Self {
            destination_table_id: Some(table_id),
            ..Self::default()
        }
    }

    pub fn secondary(table_id: i64) -> Self {
        Self {
            secondary_table_id: Some(table_id),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_guests(mut self, guest_count: i32) -> Self {
        self.guest_count = Some(guest_count);
        self
    }
}

/// Typed command payload, one variant per action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableCommandPayload {
    OccupyTable {
        #[serde(default)]
        order_id: Option<String>,
        #[serde(default)]
        customer_name: Option<String>,
        #[serde(default)]
        guest_count: Option<i32>,
    },
    StartPreparing {
        order_id: String,
    },
    MarkReady {
        order_id: String,
    },
    MarkServed {
        order_id: String,
    },
    MarkAwaitingBill,
    CloseTable,
    ReserveTable {
        customer_name: String,
        reservation_time: i64,
        #[serde(default)]
        duration_minutes: Option<i64>,
    },
    CancelReservation {
        reservation_id: i64,
    },
    MoveTable {
        destination_table_id: i64,
    },
    MergeTable {
        secondary_table_id: i64,
    },
    UnmergeTable,
}

impl TableCommandPayload {
    pub fn action(&self) -> TableAction {
        match self {
            TableCommandPayload::OccupyTable { .. } => TableAction::OccupyTable,
            TableCommandPayload::StartPreparing { .. } => TableAction::StartPreparing,
            TableCommandPayload::MarkReady { .. } => TableAction::MarkReady,
            TableCommandPayload::MarkServed { .. } => TableAction::MarkServed,
            TableCommandPayload::MarkAwaitingBill => TableAction::MarkAwaitingBill,
            TableCommandPayload::CloseTable => TableAction::CloseTable,
            TableCommandPayload::ReserveTable { .. } => TableAction::ReserveTable,
            TableCommandPayload::CancelReservation { .. } => TableAction::CancelReservation,
            TableCommandPayload::MoveTable { .. } => TableAction::MoveTable,
            TableCommandPayload::MergeTable { .. } => TableAction::MergeTable,
            TableCommandPayload::UnmergeTable => TableAction::UnmergeTable,
        }
    }

    /// Build a typed payload from an action name and loose params.
    pub fn from_params(action: &str, params: ActionParams) -> Result<Self, PayloadError> {
        let action: TableAction = action.parse()?;
        let payload = match action {
            TableAction::OccupyTable => TableCommandPayload::OccupyTable {
                order_id: params.order_id.filter(|o| !o.trim().is_empty()),
                customer_name: params.customer_name.filter(|c| !c.trim().is_empty()),
                guest_count: params.guest_count,
            },
            TableAction::StartPreparing => TableCommandPayload::StartPreparing {
                order_id: required_text(action, "order_id", params.order_id)?,
            },
            TableAction::MarkReady => TableCommandPayload::MarkReady {
                order_id: required_text(action, "order_id", params.order_id)?,
            },
            TableAction::MarkServed => TableCommandPayload::MarkServed {
                order_id: required_text(action, "order_id", params.order_id)?,
            },
            TableAction::MarkAwaitingBill => TableCommandPayload::MarkAwaitingBill,
            TableAction::CloseTable => TableCommandPayload::CloseTable,
            TableAction::ReserveTable => TableCommandPayload::ReserveTable {
                customer_name: required_text(action, "customer_name", params.customer_name)?,
                reservation_time: required(action, "reservation_time", params.reservation_time)?,
                duration_minutes: params.duration_minutes,
            },
            TableAction::CancelReservation => TableCommandPayload::CancelReservation {
                reservation_id: required(action, "reservation_id", params.reservation_id)?,
            },
            TableAction::MoveTable => TableCommandPayload::MoveTable {
                destination_table_id: required(
                    action,
                    "destination_table_id",
                    params.destination_table_id,
                )?,
            },
            TableAction::MergeTable => TableCommandPayload::MergeTable {
                secondary_table_id: required(
                    action,
                    "secondary_table_id",
                    params.secondary_table_id,
                )?,
            },
            TableAction::UnmergeTable => TableCommandPayload::UnmergeTable,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Shape checks that need no stored state
    pub fn validate(&self) -> Result<(), PayloadError> {
        let action = self.action();
        match self {
            TableCommandPayload::OccupyTable {
                guest_count: Some(n),
                ..
            } if *n < 0 => Err(PayloadError::InvalidParameter {
                action,
                field: "guest_count",
                reason: format!("must not be negative, got {n}"),
            }),
            TableCommandPayload::StartPreparing { order_id }
            | TableCommandPayload::MarkReady { order_id }
            | TableCommandPayload::MarkServed { order_id }
                if order_id.trim().is_empty() =>
            {
                Err(PayloadError::MissingParameter {
                    action,
                    field: "order_id",
                })
            }
            TableCommandPayload::ReserveTable { customer_name, .. }
                if customer_name.trim().is_empty() =>
            {
                Err(PayloadError::MissingParameter {
                    action,
                    field: "customer_name",
                })
            }
            TableCommandPayload::ReserveTable {
                duration_minutes: Some(d),
                ..
            } if *d <= 0 || *d > MAX_RESERVATION_MINUTES => Err(PayloadError::InvalidParameter {
                action,
                field: "duration_minutes",
                reason: format!("must be between 1 and {MAX_RESERVATION_MINUTES}, got {d}"),
            }),
            TableCommandPayload::ReserveTable {
                reservation_time, ..
            } if !(0..=MAX_TIMESTAMP_MILLIS).contains(reservation_time) => {
                Err(PayloadError::InvalidParameter {
                    action,
                    field: "reservation_time",
                    reason: format!("out of range: {reservation_time}"),
                })
            }
            _ => Ok(()),
        }
    }
}

fn required<T>(action: TableAction, field: &'static str, value: Option<T>) -> Result<T, PayloadError> {
    value.ok_or(PayloadError::MissingParameter { action, field })
}

fn required_text(
    action: TableAction,
    field: &'static str,
    value: Option<String>,
) -> Result<String, PayloadError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PayloadError::MissingParameter { action, field }),
    }
}

/// Table command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCommand {
    /// Client-generated id, used for idempotency
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client timestamp (Unix millis)
    pub timestamp: i64,
    /// Table the action is addressed to (the primary for merge)
    pub table_id: i64,
    pub payload: TableCommandPayload,
}

impl TableCommand {
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        table_id: i64,
        payload: TableCommandPayload,
    ) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            timestamp: crate::util::now_millis(),
            table_id,
            payload,
        }
    }
}
