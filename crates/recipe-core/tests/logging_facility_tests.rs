#![allow(clippy::unwrap_used, clippy::expect_used)]

use recipe_core::errors::{ExError, ExErrorKind, RecipeError};
use recipe_core::logging_facility::test_capture::init_test_capture;
use recipe_core::{log_op_end, log_op_error, log_op_start};
use recipe_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, entity = "Recipe");

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("end event");
    assert_eq!(end.field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = RecipeError::NotFound {
        entity: "Recipe",
        id: "99".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();

    assert_eq!(error_events.len(), 1);
    assert_eq!(error_events[0].field("err_code"), Some("ERR_NOT_FOUND"));
    assert_eq!(error_events[0].field("err_kind"), Some("NotFound"));
}

#[test]
fn test_log_op_error_accepts_ex_error() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_4";

    let err = ExError::new(ExErrorKind::Transient).with_message("database is locked");
    log_op_error!(op_name, err, duration_ms = 1, attempt = 2);

    let count = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.field("attempt") == Some("2")
    });
    assert_eq!(count, 1);
}
