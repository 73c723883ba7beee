use super::*;
use shared::models::{OrderStatus, SessionStatus};
use shared::session::{CommandErrorCode, FailureKind};
use shared::util::minutes_to_millis;

mod test_flows;

const T0: i64 = 1_700_000_000_000;

fn create_test_manager() -> SessionsManager {
    let storage = SessionStorage::open_in_memory().unwrap();
    SessionsManager::with_storage(storage)
}

fn add_table(manager: &SessionsManager, label: &str, seats: i32) -> i64 {
    add_venue_table(manager, 1, label, seats)
}

fn add_venue_table(manager: &SessionsManager, venue_id: i64, label: &str, seats: i32) -> i64 {
    manager
        .register_table(DiningTableCreate {
            venue_id,
            label: label.to_string(),
            seat_count: seats,
        })
        .unwrap()
        .id
}

fn status_of(manager: &SessionsManager, table_id: i64) -> SessionStatus {
    manager.open_session(table_id).unwrap().unwrap().status
}

fn assert_healthy(manager: &SessionsManager) {
    let violations = manager.check_invariants().unwrap();
    assert!(violations.is_empty(), "invariants violated: {violations:?}");
}
