//! Table events - committed effects, broadcast after each transition

use super::command::TableAction;
use crate::models::SessionStatus;
use serde::{Deserialize, Serialize};

/// Which rows a committed action changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSummary {
    pub action: TableAction,
    /// Table the action finally operated on (primary, when resolved through a merge)
    pub table_id: i64,
    /// Status of that table's open session after the action
    pub status: SessionStatus,
    /// Open session updated in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_session_id: Option<i64>,
    /// Fresh session created to replace the closed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<i64>,
    /// Other table touched: move destination, merge/unmerge counterpart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_table_id: Option<i64>,
}

impl EffectSummary {
    pub fn new(action: TableAction, table_id: i64, status: SessionStatus) -> Self {
        Self {
            action,
            table_id,
            status,
            updated_session_id: None,
            closed_session_id: None,
            new_session_id: None,
            updated_order_id: None,
            reservation_id: None,
            related_table_id: None,
        }
    }
}

/// Table event - immutable record of a committed transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEvent {
    /// Global sequence number
    pub sequence: u64,
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Server timestamp (Unix millis)
    pub timestamp: i64,
    /// Client timestamp, preserved for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Table the command was addressed to
    pub table_id: i64,
    pub effect: EffectSummary,
}
