//! CLI integration tests
//!
//! Each test runs the `recipebook` binary against a database file in a
//! fresh temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../recipe-store/tests/fixtures")
        .join(name)
}

fn recipebook(db_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_recipebook"))
        .env_remove("RECIPEBOOK_CONNECTION")
        .arg("--database")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn seeded(temp_dir: &TempDir) -> PathBuf {
    let db_path = temp_dir.path().join("recipes.db");
    let seed = fixture("salmon_seed.yaml");
    let output = recipebook(&db_path, &["seed", "import", seed.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "seed import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    db_path
}

#[test]
fn test_migrate_reports_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recipes.db");

    let output = recipebook(&db_path, &["migrate"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("001_initial_schema"));
    assert!(text.contains("002_stored_procedures"));

    // Second run applies nothing
    let output = recipebook(&db_path, &["migrate"]);
    assert!(stdout(&output).starts_with("Applied 0 migration(s)"));
}

#[test]
fn test_seed_import_then_list() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = seeded(&temp_dir);

    let output = recipebook(&db_path, &["recipes", "list"]);
    assert!(output.status.success());
    let titles: Vec<String> = stdout(&output)
        .lines()
        .map(|l| l.trim_start().split_once("  ").map(|(_, t)| t.to_string()).unwrap_or_default())
        .collect();
    assert_eq!(
        titles,
        vec!["Beef Stew", "Grilled Salmon with Dill", "Salmon Patties"]
    );

    let output = recipebook(&db_path, &["recipes", "list", "--take", "1", "--details"]);
    let text = stdout(&output);
    assert!(text.starts_with("Beef Stew"));
    assert!(text.contains("Serves: 1.50 Quarts"));
    assert!(!text.contains("Salmon"));
}

#[test]
fn test_search_and_show_json() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = seeded(&temp_dir);

    let output = recipebook(&db_path, &["search", "salmon", "--ordered"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("Grilled Salmon with Dill"));
    assert!(lines[1].ends_with("Salmon Patties"));

    let id = lines[1].split_whitespace().next().unwrap();
    let output = recipebook(&db_path, &["recipes", "show", id, "--json"]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["title"], "Salmon Patties");
    assert_eq!(summary["serves"], "6.00 Patties");
    assert_eq!(summary["ingredients"][0], "14.75 oz: canned salmon");
    assert_eq!(summary["directions"].as_array().unwrap().len(), 3);
}

#[test]
fn test_categories_add_list_remove() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recipes.db");

    let output = recipebook(&db_path, &["categories", "add", "Desserts"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Added category"));
    recipebook(&db_path, &["categories", "add", "Breads"]);

    let output = recipebook(&db_path, &["categories", "list"]);
    let listed = stdout(&output);
    let lines: Vec<&str> = listed.lines().collect();
    assert!(lines[0].ends_with("Breads"));
    assert!(lines[1].ends_with("Desserts"));

    let id = lines[0].split_whitespace().next().unwrap();
    let output = recipebook(&db_path, &["categories", "remove", id]);
    assert!(output.status.success());

    let output = recipebook(&db_path, &["categories", "list"]);
    assert_eq!(stdout(&output).lines().count(), 1);
}

#[test]
fn test_errors_exit_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recipes.db");

    let output = recipebook(&db_path, &["recipes", "show", "4242"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));

    let output = recipebook(&db_path, &["categories", "remove", "4242"]);
    assert!(!output.status.success());
}

#[test]
fn test_seed_directory_imports_in_name_order() {
    let temp_dir = TempDir::new().unwrap();
    let seeds = temp_dir.path().join("seeds");
    std::fs::create_dir_all(&seeds).unwrap();
    std::fs::write(
        seeds.join("01_categories.yaml"),
        "schema_version: 0\ncategories: [Soups]\n",
    )
    .unwrap();
    std::fs::write(
        seeds.join("02_recipes.yaml"),
        "schema_version: 0\nrecipes:\n  - title: Tomato Soup\n    categories: [Soups]\n",
    )
    .unwrap();
    std::fs::write(seeds.join("notes.txt"), "ignored").unwrap();

    let db_path = temp_dir.path().join("recipes.db");
    let output = recipebook(&db_path, &["seed", "import", seeds.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).matches("Importing").count(), 2);

    let output = recipebook(&db_path, &["search", "Tomato"]);
    assert!(stdout(&output).contains("Tomato Soup"));
}
