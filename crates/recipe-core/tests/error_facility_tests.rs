use recipe_core::errors::{ExError, ExErrorKind, RecipeError};

#[test]
fn test_not_found_carries_entity_and_id() {
    let err = RecipeError::NotFound {
        entity: "Category",
        id: "17".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.entity(), Some("Category"));
    assert_eq!(ex_err.entity_id(), Some("17"));
}

#[test]
fn test_invalid_state_is_distinct_from_not_found() {
    let err = RecipeError::InvalidState {
        entity: "Recipe",
        id: "-1".to_string(),
        state: "Deleted".to_string(),
        reason: "cannot add children to a deleted recipe".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidState);
    assert_ne!(ex_err.kind(), ExErrorKind::NotFound);
    assert!(ex_err.message().contains("deleted recipe"));
}

#[test]
fn test_invalid_decimal_message_keeps_input() {
    let err = "1.234".parse::<recipe_core::Decimal>().unwrap_err();
    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidDecimal);
    assert!(ex_err.message().contains("1.234"));
}

#[test]
fn test_not_tracked_code() {
    let ex_err: ExError = RecipeError::NotTracked { entity: "Recipe" }.into();
    assert_eq!(ex_err.code(), "ERR_NOT_TRACKED");
}
