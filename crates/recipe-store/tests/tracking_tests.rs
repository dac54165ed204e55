// Identity map, eager and lazy loading, cascading removal

mod common;

use std::rc::Rc;

use recipe_core::errors::ExErrorKind;
use recipe_core::model::{Category, Direction, Ingredient, Recipe};
use recipe_store::context::Filter;
use recipe_store::schema::{direction, ingredient, recipe, recipe_category};
use recipe_store::seed::import_seed_file;
use recipe_store::{EntityState, RecipeContext};

/// Seeded shared store plus the name to open more sessions on it
fn seeded_store() -> (RecipeContext, String) {
    let name = common::unique_name("tracking");
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    import_seed_file(&mut ctx, &common::fixture("salmon_seed.yaml")).unwrap();
    (ctx, name)
}

fn ingredient_lines(lines: &[recipe_store::Tracked<Ingredient>]) -> Vec<String> {
    lines.iter().map(|i| i.borrow().display_line()).collect()
}

fn direction_lines(lines: &[recipe_store::Tracked<Direction>]) -> Vec<String> {
    lines
        .iter()
        .map(|d| d.borrow().description.clone().unwrap_or_default())
        .collect()
}

#[test]
fn test_find_twice_returns_same_instance_with_one_query() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let id = ctx.recipes().first().unwrap().unwrap().borrow().id;
    ctx.detach_all();

    let before = ctx.query_count();
    let a = ctx.find_recipe(id).unwrap().unwrap();
    let b = ctx.find_recipe(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(ctx.query_count() - before, 1);
}

#[test]
fn test_query_does_not_overwrite_local_edits() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let stew = ctx
        .recipes()
        .filter(Filter::eq(recipe::TITLE, "Beef Stew".to_string()))
        .first()
        .unwrap()
        .unwrap();
    stew.borrow_mut().title = "Irish Stew".to_string();

    let again = ctx
        .recipes()
        .filter(Filter::eq(recipe::ID, stew.borrow().id))
        .to_list()
        .unwrap();
    assert!(Rc::ptr_eq(&stew, &again[0]));
    assert_eq!(again[0].borrow().title, "Irish Stew");
    assert_eq!(ctx.entry_state(&stew), EntityState::Modified);
}

#[test]
fn test_no_tracking_returns_fresh_instances() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let a = ctx.recipes().no_tracking().first().unwrap().unwrap();
    let b = ctx.recipes().no_tracking().first().unwrap().unwrap();
    assert!(!Rc::ptr_eq(&a, &b));
    assert_eq!(ctx.entry_state(&a), EntityState::Detached);
    assert!(!ctx.has_changes());
}

#[test]
fn test_eager_and_lazy_loading_return_same_data() {
    let (_seed, name) = seeded_store();

    let mut eager = RecipeContext::in_memory_named(&name).unwrap();
    let before = eager.query_count();
    let graphs = eager
        .recipes()
        .order_by(recipe::TITLE)
        .include_ingredients()
        .include_directions()
        .load_graphs()
        .unwrap();
    assert_eq!(eager.query_count() - before, 3);
    assert_eq!(graphs.len(), 3);

    let mut lazy = RecipeContext::in_memory_named(&name).unwrap();
    let before = lazy.query_count();
    let recipes = lazy.recipes().order_by(recipe::TITLE).to_list().unwrap();
    for (recipe, graph) in recipes.iter().zip(&graphs) {
        let ingredients = lazy.ingredients_of(recipe).unwrap();
        let directions = lazy.directions_of(recipe).unwrap();
        assert_eq!(recipe.borrow().title, graph.recipe.borrow().title);
        assert_eq!(ingredient_lines(&ingredients), ingredient_lines(&graph.ingredients));
        assert_eq!(direction_lines(&directions), direction_lines(&graph.directions));
    }
    assert_eq!(lazy.query_count() - before, 1 + 2 * recipes.len());

    // Second access is served from the session
    let before = lazy.query_count();
    lazy.ingredients_of(&recipes[0]).unwrap();
    lazy.directions_of(&recipes[0]).unwrap();
    assert_eq!(lazy.query_count(), before);
}

#[test]
fn test_eager_load_marks_navigations_loaded() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let graphs = ctx
        .recipes()
        .include_categories()
        .load_graphs()
        .unwrap();

    let before = ctx.query_count();
    for graph in &graphs {
        let categories = ctx.categories_of(&graph.recipe).unwrap();
        assert_eq!(categories.len(), graph.categories.len());
        for (a, b) in categories.iter().zip(&graph.categories) {
            assert!(Rc::ptr_eq(a, b));
        }
    }
    assert_eq!(ctx.query_count(), before);
}

#[test]
fn test_load_recipe_with_children_orders_children() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let id = ctx
        .recipes()
        .filter(Filter::starts_with(recipe::TITLE, "Grilled"))
        .first()
        .unwrap()
        .unwrap()
        .borrow()
        .id;

    let graph = ctx.load_recipe_with_children(id).unwrap();
    let orders: Vec<Option<i32>> = graph.ingredients.iter().map(|i| i.borrow().sort_order).collect();
    assert_eq!(orders, vec![Some(1), Some(2), Some(3), Some(4)]);
    let lines: Vec<i64> = graph.directions.iter().map(|d| d.borrow().line_number).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
    let categories: Vec<String> = graph
        .categories
        .iter()
        .filter_map(|c| c.borrow().description.clone())
        .collect();
    assert_eq!(categories, vec!["Main Dishes", "Seafood"]);
}

#[test]
fn test_load_missing_recipe_is_not_found() {
    let mut ctx = common::context();
    let err = ctx.load_recipe_with_children(4242).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_delete_recipe_leaves_no_orphans() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let graph = {
        let id = ctx
            .recipes()
            .filter(Filter::eq(recipe::TITLE, "Salmon Patties".to_string()))
            .first()
            .unwrap()
            .unwrap()
            .borrow()
            .id;
        ctx.load_recipe_with_children(id).unwrap()
    };
    let id = graph.recipe.borrow().id;

    ctx.remove_recipe(&graph.recipe).unwrap();
    for line in &graph.ingredients {
        assert_eq!(ctx.entry_state(line), EntityState::Deleted);
    }
    ctx.save_changes().unwrap();

    let mut check = RecipeContext::in_memory_named(&name).unwrap();
    assert!(check.find_recipe(id).unwrap().is_none());
    let orphans = check
        .ingredients()
        .filter(Filter::eq(ingredient::RECIPE_ID, id))
        .count()
        .unwrap()
        + check
            .directions()
            .filter(Filter::eq(direction::RECIPE_ID, id))
            .count()
            .unwrap()
        + check
            .recipe_categories()
            .filter(Filter::eq(recipe_category::RECIPE_ID, id))
            .count()
            .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_store_cascade_removes_unloaded_children() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let stew = ctx
        .recipes()
        .filter(Filter::eq(recipe::TITLE, "Beef Stew".to_string()))
        .first()
        .unwrap()
        .unwrap();
    let id = stew.borrow().id;

    ctx.remove_recipe(&stew).unwrap();
    let report = ctx.save_changes().unwrap();
    assert_eq!(report.deleted, 1);

    let remaining = ctx
        .ingredients()
        .filter(Filter::eq(ingredient::RECIPE_ID, id))
        .any()
        .unwrap();
    assert!(!remaining);
}

#[test]
fn test_children_of_unsaved_recipe_served_without_query() {
    let mut ctx = common::context();
    let recipe = ctx.add_recipe(Recipe::new("Toast"));
    ctx.add_ingredient(&recipe, Ingredient::new(1, "2", "sl", "bread"))
        .unwrap();
    let breakfast = ctx.add_category(Category::new("Breakfast"));
    ctx.link_category(&recipe, &breakfast).unwrap();

    let before = ctx.query_count();
    assert_eq!(ctx.ingredients_of(&recipe).unwrap().len(), 1);
    assert_eq!(ctx.categories_of(&recipe).unwrap().len(), 1);
    assert!(ctx.directions_of(&recipe).unwrap().is_empty());
    assert_eq!(ctx.query_count(), before);
}

#[test]
fn test_removed_recipe_rejects_new_children() {
    let mut ctx = common::context();
    let recipe = ctx.add_recipe(Recipe::new("Gone"));
    ctx.save_changes().unwrap();
    ctx.remove_recipe(&recipe).unwrap();

    let err = ctx
        .add_direction(&recipe, Direction::new(1, "too late"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidState);
}

#[test]
fn test_edit_children_of_saved_recipe() {
    let (_seed, name) = seeded_store();
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let patties = ctx
        .recipes()
        .filter(Filter::eq(recipe::TITLE, "Salmon Patties".to_string()))
        .first()
        .unwrap()
        .unwrap();

    let graph = ctx.graph_of(&patties).unwrap();
    assert_eq!(graph.ingredients.len(), 3);
    let (crumbs, last_step) = (
        Rc::clone(&graph.ingredients[2]),
        Rc::clone(&graph.directions[2]),
    );
    ctx.remove_ingredient(&crumbs).unwrap();
    ctx.remove_direction(&last_step).unwrap();
    ctx.unlink_category(&patties, &graph.categories[0]).unwrap();
    let report = ctx.save_changes().unwrap();
    assert_eq!(report.deleted, 3);

    let mut check = RecipeContext::in_memory_named(&name).unwrap();
    assert!(check.find_ingredient(crumbs.borrow().id).unwrap().is_none());
    assert!(check.find_direction(last_step.borrow().id).unwrap().is_none());
    let first_step = check
        .find_direction(graph.directions[0].borrow().id)
        .unwrap()
        .unwrap();
    assert_eq!(first_step.borrow().line_number, 1);

    let reloaded = check.load_recipe_with_children(patties.borrow().id).unwrap();
    assert_eq!(reloaded.ingredients.len(), 2);
    assert_eq!(reloaded.directions.len(), 2);
    assert_eq!(reloaded.categories.len(), 1);
}

#[test]
fn test_unlink_missing_link_is_not_found() {
    let mut ctx = common::context();
    let recipe = ctx.add_recipe(Recipe::new("Plain Rice"));
    let sides = ctx.add_category(Category::new("Sides"));
    let err = ctx.unlink_category(&recipe, &sides).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_relink_after_unlink_restores_stored_link() {
    let name = common::unique_name("relink");
    let mut ctx = RecipeContext::in_memory_named(&name).unwrap();
    let recipe = ctx.add_recipe(Recipe::new("Clam Chowder"));
    let soups = ctx.add_category(Category::new("Soups"));
    let link = ctx.link_category(&recipe, &soups).unwrap();
    ctx.save_changes().unwrap();

    ctx.unlink_category(&recipe, &soups).unwrap();
    assert_eq!(ctx.entry_state(&link), EntityState::Deleted);

    let relinked = ctx.link_category(&recipe, &soups).unwrap();
    assert!(Rc::ptr_eq(&link, &relinked));
    assert_eq!(ctx.entry_state(&relinked), EntityState::Unchanged);
    assert!(!ctx.has_changes());

    // A live link still rejects a second one
    let err = ctx.link_category(&recipe, &soups).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidState);

    let report = ctx.save_changes().unwrap();
    assert_eq!(report.total(), 0);

    let mut check = RecipeContext::in_memory_named(&name).unwrap();
    let stored = check
        .recipe_categories()
        .filter(Filter::eq(recipe_category::RECIPE_ID, recipe.borrow().id))
        .count()
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn test_eager_loading_spans_many_recipes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.db");
    let cs = recipe_store::ConnectionString::file(path.to_string_lossy().to_string());
    let mut ctx = RecipeContext::open(recipe_store::StoreConfig::new(cs)).unwrap();

    let recipes = 40_000;
    let mut conn = rusqlite::Connection::open(&path).unwrap();
    let tx = conn.transaction().unwrap();
    for n in 1..=recipes {
        tx.execute(
            "INSERT INTO Recipe (Id, Title) VALUES (?1, ?2)",
            rusqlite::params![n, format!("Recipe {:05}", n)],
        )
        .unwrap();
    }
    tx.execute(
        "INSERT INTO Ingredient (SortOrder, Units, UnitType, Description, RecipeId)
         VALUES (1, '2', 'c', 'flour', ?1), (1, '1', 'ea', 'egg', 1)",
        [recipes],
    )
    .unwrap();
    tx.commit().unwrap();

    let before = ctx.query_count();
    let graphs = ctx
        .recipes()
        .order_by(recipe::ID)
        .no_tracking()
        .include_ingredients()
        .load_graphs()
        .unwrap();
    assert_eq!(graphs.len(), recipes as usize);
    assert!(ctx.query_count() - before > 2);

    let first = &graphs[0];
    assert_eq!(ingredient_lines(&first.ingredients), vec!["1 ea: egg"]);
    let last = &graphs[graphs.len() - 1];
    assert_eq!(last.recipe.borrow().title, "Recipe 40000");
    assert_eq!(ingredient_lines(&last.ingredients), vec!["2 c: flour"]);
    assert!(graphs[1..graphs.len() - 1]
        .iter()
        .all(|g| g.ingredients.is_empty()));
}
