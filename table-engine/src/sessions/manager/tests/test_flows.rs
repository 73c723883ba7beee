use super::*;

// ========================================================================
// Service lifecycle
// ========================================================================

#[test]
fn test_full_service_cycle_completes_paid_order() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);
    assert_eq!(status_of(&manager, t), SessionStatus::Free);
    let first_session = manager.open_session(t).unwrap().unwrap().id;

    let effect = manager
        .apply(t, "occupy_table", ActionParams::order("O1"))
        .unwrap();
    assert_eq!(effect.status, SessionStatus::Ordering);

    manager
        .apply(t, "start_preparing", ActionParams::order("O1"))
        .unwrap();
    assert_eq!(status_of(&manager, t), SessionStatus::InPrep);
    assert_eq!(
        manager.get_order("O1").unwrap().unwrap().order_status,
        OrderStatus::InPrep
    );

    manager.apply(t, "mark_ready", ActionParams::order("O1")).unwrap();
    assert_eq!(status_of(&manager, t), SessionStatus::Ready);
    assert_eq!(
        manager.get_order("O1").unwrap().unwrap().order_status,
        OrderStatus::Ready
    );

    manager.update_payment_status("O1", PaymentStatus::Paid).unwrap();
    let effect = manager.apply(t, "close_table", ActionParams::none()).unwrap();

    assert_eq!(effect.closed_session_id, Some(first_session));
    assert_eq!(effect.updated_order_id.as_deref(), Some("O1"));
    assert_eq!(
        manager.get_order("O1").unwrap().unwrap().order_status,
        OrderStatus::Completed
    );

    let open = manager.open_session(t).unwrap().unwrap();
    assert_eq!(open.status, SessionStatus::Free);
    assert_eq!(Some(open.id), effect.new_session_id);

    let history = manager.session_history(t).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].closed_at.is_some());
    assert_healthy(&manager);
}

#[test]
fn test_close_unpaid_order_does_not_complete() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);
    manager
        .apply(t, "occupy_table", ActionParams::order("O1"))
        .unwrap();
    manager
        .apply(t, "mark_awaiting_bill", ActionParams::none())
        .unwrap();

    let effect = manager.apply(t, "close_table", ActionParams::none()).unwrap();
    assert_eq!(effect.updated_order_id, None);
    assert_eq!(
        manager.get_order("O1").unwrap().unwrap().order_status,
        OrderStatus::Pending
    );
    assert_eq!(status_of(&manager, t), SessionStatus::Free);
}

#[test]
fn test_kitchen_action_with_wrong_order_is_not_found() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);
    manager
        .apply(t, "occupy_table", ActionParams::order("O1"))
        .unwrap();

    let err = manager
        .apply(t, "mark_served", ActionParams::order("O9"))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_eq!(status_of(&manager, t), SessionStatus::Ordering);
}

#[test]
fn test_mark_awaiting_bill_on_free_table_is_invalid() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);

    let err = manager
        .apply(t, "mark_awaiting_bill", ActionParams::none())
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidTransition);
}

// ========================================================================
// Move
// ========================================================================

#[test]
fn test_move_carries_session_and_order() {
    let manager = create_test_manager();
    let a = add_table(&manager, "A1", 4);
    let b = add_table(&manager, "B1", 4);
    let b_session = manager.open_session(b).unwrap().unwrap().id;
    manager
        .apply(a, "occupy_table", ActionParams::order("O2"))
        .unwrap();
    let a_session = manager.open_session(a).unwrap().unwrap().id;

    let effect = manager
        .apply(a, "move_table", ActionParams::destination(b))
        .unwrap();

    assert_eq!(effect.closed_session_id, Some(a_session));
    assert_eq!(effect.related_table_id, Some(b));

    let dest = manager.open_session(b).unwrap().unwrap();
    assert_eq!(dest.id, b_session);
    assert_eq!(dest.status, SessionStatus::Ordering);
    assert_eq!(dest.order_id.as_deref(), Some("O2"));
    assert_eq!(manager.get_order("O2").unwrap().unwrap().table_id, b);

    let src = manager.open_session(a).unwrap().unwrap();
    assert_eq!(src.status, SessionStatus::Free);
    assert_healthy(&manager);
}

#[test]
fn test_move_rejections_leave_state_unchanged() {
    let manager = create_test_manager();
    let a = add_table(&manager, "A1", 4);
    let b = add_table(&manager, "B1", 4);

    // nothing to move
    let err = manager
        .apply(a, "move_table", ActionParams::destination(b))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidTransition);

    // destination busy
    manager.apply(a, "occupy_table", ActionParams::none()).unwrap();
    manager
        .apply(b, "occupy_table", ActionParams::order("O3"))
        .unwrap();
    let err = manager
        .apply(a, "move_table", ActionParams::destination(b))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conflict);
    assert_eq!(status_of(&manager, a), SessionStatus::Occupied);
    assert_eq!(status_of(&manager, b), SessionStatus::Ordering);

    // unknown destination
    let err = manager
        .apply(a, "move_table", ActionParams::destination(999))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_healthy(&manager);
}

// ========================================================================
// Reservations
// ========================================================================

#[test]
fn test_reservation_conflict_and_cancel() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);

    let alice = manager
        .apply(t, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap();
    assert_eq!(alice.status, SessionStatus::Reserved);
    let alice_id = alice.reservation_id.unwrap();

    let bob_time = T0 + minutes_to_millis(10);
    let err = manager
        .apply(t, "reserve_table", ActionParams::reservation("Bob", bob_time))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conflict);
    let command_error: shared::session::CommandError = err.into();
    assert_eq!(command_error.code, CommandErrorCode::ReservationConflict);
    let details = command_error.details.unwrap();
    assert_eq!(details["existing_time"], serde_json::json!(T0));
    assert_eq!(details["requested_time"], serde_json::json!(bob_time));

    manager
        .apply(t, "cancel_reservation", ActionParams::cancel(alice_id))
        .unwrap();
    assert_eq!(status_of(&manager, t), SessionStatus::Free);

    let bob = manager
        .apply(t, "reserve_table", ActionParams::reservation("Bob", bob_time))
        .unwrap();
    assert_ne!(bob.reservation_id, Some(alice_id));

    let ledger = manager.reservations_for_table(t).unwrap();
    assert_eq!(ledger.len(), 2);
    assert_healthy(&manager);
}

#[test]
fn test_conflict_window_boundary() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);
    manager
        .apply(t, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap();

    let err = manager
        .apply(
            t,
            "reserve_table",
            ActionParams::reservation("Bob", T0 + minutes_to_millis(29)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conflict);

    manager
        .apply(
            t,
            "reserve_table",
            ActionParams::reservation("Bob", T0 + minutes_to_millis(31)),
        )
        .unwrap();
    let session = manager.open_session(t).unwrap().unwrap();
    assert_eq!(session.customer_name.as_deref(), Some("Bob"));
    assert_eq!(session.reservation_time, Some(T0 + minutes_to_millis(31)));
}

#[test]
fn test_reservation_uses_configured_default_duration() {
    let manager = create_test_manager().with_default_reservation_minutes(45);
    let t = add_table(&manager, "A1", 4);

    let effect = manager
        .apply(t, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap();
    let ledger = manager.reservations_for_table(t).unwrap();
    assert_eq!(ledger[0].id, effect.reservation_id.unwrap());
    assert_eq!(ledger[0].end_time, T0 + minutes_to_millis(45));

    let t2 = add_table(&manager, "A2", 4);
    manager
        .apply(
            t2,
            "reserve_table",
            ActionParams::reservation("Carol", T0).with_duration(120),
        )
        .unwrap();
    let session = manager.open_session(t2).unwrap().unwrap();
    assert_eq!(session.reservation_duration_minutes, Some(120));
}

#[test]
fn test_in_service_table_cannot_be_reserved() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);
    manager
        .apply(t, "occupy_table", ActionParams::order("O1"))
        .unwrap();

    let err = manager
        .apply(t, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap_err();
    assert_eq!(err.code(), CommandErrorCode::TableInService);
    assert!(manager.reservations_for_table(t).unwrap().is_empty());
}

#[test]
fn test_out_of_range_reservation_rejected_before_lookup() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);

    let err = manager
        .apply(
            t,
            "reserve_table",
            ActionParams::reservation("Alice", T0).with_duration(i64::MAX / 1000),
        )
        .unwrap_err();
    assert_eq!(err.code(), CommandErrorCode::InvalidParameter);
    assert_eq!(err.kind(), FailureKind::InvalidRequest);

    let err = manager
        .apply(
            t,
            "reserve_table",
            ActionParams::reservation("Alice", i64::MAX - 1000),
        )
        .unwrap_err();
    assert_eq!(err.code(), CommandErrorCode::InvalidParameter);

    assert_eq!(status_of(&manager, t), SessionStatus::Free);
    assert!(manager.reservations_for_table(t).unwrap().is_empty());
    assert_eq!(manager.get_current_sequence().unwrap(), 0);
}

#[test]
fn test_moved_booking_is_cancelled_on_destination() {
    let manager = create_test_manager();
    let a = add_table(&manager, "A1", 4);
    let b = add_table(&manager, "B1", 4);

    let booked = manager
        .apply(a, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap();
    let rid = booked.reservation_id.unwrap();

    let moved = manager
        .apply(a, "move_table", ActionParams::destination(b))
        .unwrap();
    assert_eq!(moved.reservation_id, Some(rid));
    assert_eq!(status_of(&manager, b), SessionStatus::Reserved);
    assert!(manager.reservations_for_table(a).unwrap().is_empty());
    assert_eq!(manager.reservations_for_table(b).unwrap()[0].id, rid);

    // the booking now belongs to B
    let err = manager
        .apply(a, "cancel_reservation", ActionParams::cancel(rid))
        .unwrap_err();
    assert_eq!(err.code(), CommandErrorCode::ReservationNotFound);

    let cancelled = manager
        .apply(b, "cancel_reservation", ActionParams::cancel(rid))
        .unwrap();
    assert_eq!(cancelled.status, SessionStatus::Free);
    assert_eq!(status_of(&manager, a), SessionStatus::Free);
    assert_eq!(status_of(&manager, b), SessionStatus::Free);
    assert_healthy(&manager);
}

#[test]
fn test_rebooking_after_a_seated_reservation_keeps_the_ledger() {
    let manager = create_test_manager();
    let t = add_table(&manager, "A1", 4);

    let alice = manager
        .apply(t, "reserve_table", ActionParams::reservation("Alice", T0))
        .unwrap();
    manager
        .apply(t, "occupy_table", ActionParams::order("O1"))
        .unwrap();
    manager.apply(t, "close_table", ActionParams::none()).unwrap();

    let bob = manager
        .apply(
            t,
            "reserve_table",
            ActionParams::reservation("Bob", T0 + minutes_to_millis(24 * 60)),
        )
        .unwrap();
    assert_ne!(bob.reservation_id, alice.reservation_id);

    let ledger = manager.reservations_for_table(t).unwrap();
    let rows: Vec<_> = ledger
        .iter()
        .map(|r| (r.customer_name.as_str(), r.status))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Alice", shared::models::ReservationStatus::Seated),
            ("Bob", shared::models::ReservationStatus::Booked),
        ]
    );

    // a consumed booking cannot be cancelled
    let err = manager
        .apply(
            t,
            "cancel_reservation",
            ActionParams::cancel(alice.reservation_id.unwrap()),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidTransition);
    assert_eq!(status_of(&manager, t), SessionStatus::Reserved);
}
