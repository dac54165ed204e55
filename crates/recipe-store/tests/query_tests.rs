// Query builder, projections and command logging

mod common;

use recipe_core::errors::ExErrorKind;
use recipe_core::logging_facility::init_test_capture;
use recipe_core::model::Category;
use recipe_store::context::Filter;
use recipe_store::schema::{category, recipe};
use recipe_store::seed::import_seed_file;
use recipe_store::{RecipeContext, StoreConfig};

fn seeded() -> RecipeContext {
    let mut ctx = common::context();
    import_seed_file(&mut ctx, &common::fixture("salmon_seed.yaml")).unwrap();
    ctx
}

fn titles(ctx: &mut RecipeContext, filter: Filter) -> Vec<String> {
    ctx.recipes()
        .filter(filter)
        .order_by(recipe::TITLE)
        .to_list()
        .unwrap()
        .iter()
        .map(|r| r.borrow().title.clone())
        .collect()
}

#[test]
fn test_contains_and_starts_with() {
    let mut ctx = seeded();
    assert_eq!(
        titles(&mut ctx, Filter::contains(recipe::TITLE, "salmon")),
        vec!["Grilled Salmon with Dill", "Salmon Patties"]
    );
    assert_eq!(
        titles(&mut ctx, Filter::starts_with(recipe::TITLE, "Beef")),
        vec!["Beef Stew"]
    );
}

#[test]
fn test_contains_matches_wildcards_literally() {
    let mut ctx = common::context();
    ctx.add_category(Category::new("100% Whole Grain"));
    ctx.add_category(Category::new("1000 Island"));
    ctx.save_changes().unwrap();

    let found = ctx
        .categories()
        .filter(Filter::contains(category::DESCRIPTION, "100%"))
        .count()
        .unwrap();
    assert_eq!(found, 1);
}

#[test]
fn test_in_filter_and_paging() {
    let mut ctx = seeded();
    let page: Vec<String> = ctx
        .recipes()
        .order_by_descending(recipe::TITLE)
        .skip(1)
        .take(1)
        .to_list()
        .unwrap()
        .iter()
        .map(|r| r.borrow().title.clone())
        .collect();
    assert_eq!(page, vec!["Grilled Salmon with Dill"]);

    let measures = ctx
        .recipes()
        .filter(Filter::is_in(
            recipe::SERVING_MEASURE,
            ["Patties".to_string(), "Quarts".to_string()],
        ))
        .count()
        .unwrap();
    assert_eq!(measures, 2);
}

#[test]
fn test_count_and_any() {
    let mut ctx = seeded();
    assert_eq!(ctx.recipes().count().unwrap(), 3);
    assert_eq!(ctx.recipes().take(2).count().unwrap(), 2);
    assert!(ctx.categories().any().unwrap());
    assert!(!ctx
        .recipes()
        .filter(Filter::is_null(recipe::SERVING_MEASURE))
        .any()
        .unwrap());
}

#[test]
fn test_unknown_column_rejected() {
    let mut ctx = seeded();
    let err = ctx
        .recipes()
        .order_by("Cuisine")
        .to_list()
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_project_summaries() {
    let mut ctx = seeded();
    let before = ctx.query_count();
    let summaries = ctx
        .recipes()
        .filter(Filter::eq(recipe::TITLE, "Salmon Patties".to_string()))
        .project_summaries()
        .unwrap();
    assert_eq!(ctx.query_count() - before, 4);

    let patties = &summaries[0];
    assert_eq!(patties.serves.as_deref(), Some("6.00 Patties"));
    assert_eq!(patties.categories, vec!["Quick", "Seafood"]);
    assert_eq!(patties.ingredients[0], "14.75 oz: canned salmon");
    assert_eq!(patties.directions.len(), 3);
    assert!(!ctx.has_changes());
}

#[test]
fn test_tag_appears_as_leading_comment_in_log() {
    let capture = init_test_capture();
    let mut ctx = seeded();
    let session = ctx.session_id().to_string();

    ctx.recipes()
        .tag_with("salmon lookup for the weekly menu")
        .filter(Filter::contains(recipe::TITLE, "salmon"))
        .to_list()
        .unwrap();

    let commands = capture.commands_for_session(&session);
    let tagged = commands
        .iter()
        .find(|sql| sql.contains("weekly menu"))
        .expect("tagged command logged");
    assert!(tagged.starts_with("-- salmon lookup for the weekly menu SELECT"));
}

#[test]
fn test_parameters_redacted_unless_sensitive_logging() {
    let capture = init_test_capture();

    let mut quiet = common::context();
    quiet.categories().filter(Filter::eq(category::ID, 99)).to_list().unwrap();
    let quiet_session = quiet.session_id().to_string();

    let mut loud =
        RecipeContext::open(StoreConfig::in_memory().with_sensitive_data_logging(true)).unwrap();
    loud.categories().filter(Filter::eq(category::ID, 99)).to_list().unwrap();
    let loud_session = loud.session_id().to_string();

    let params_of = |session: &str| -> Vec<String> {
        capture
            .events()
            .into_iter()
            .filter(|e| e.event.as_deref() == Some("command") && e.field("session_id") == Some(session))
            .filter_map(|e| e.field("params").map(str::to_string))
            .collect()
    };
    assert_eq!(params_of(&quiet_session), vec!["?"]);
    assert_eq!(params_of(&loud_session), vec!["99"]);
}
