use pretty_assertions::assert_eq;
use stmtbench::config::BenchConfig;
use stmtbench::prelude::*;

const FULL: &str = r#"
[database]
url = "mysql://db.internal:3307/sakila"
user = "bench"
password = "secret"

[benchmark]
iterations = 20000
cycle = 50
query = "actor-lookup"
cache_capacity = 100

[[variants]]
name = "jdbc style"
properties = "?useServerPrepStmts=true&cachePrepStmts=true&prepStmtCacheSqlLimit=2048"

[[variants]]
properties = "serverSidePrepare=false&clientCache=false"
"#;

#[test]
fn test_full_config() {
    let config = BenchConfig::from_toml(FULL).expect("Failed to parse config");

    assert_eq!(config.database.url, "mysql://db.internal:3307/sakila");
    assert_eq!(config.database.user, "bench");
    assert_eq!(config.database.password.as_deref(), Some("secret"));
    assert_eq!(config.benchmark.query, QueryPreset::ActorLookup);
    assert_eq!(config.benchmark.cache_capacity, 100);

    let plan = config.plan().unwrap();
    assert_eq!(plan.iterations, 20_000);
    assert_eq!(plan.cycle.length(), 50);
    assert_eq!(plan.query.sql(), "SELECT * FROM actor WHERE actor_id = ?");

    let variants = config.variants().unwrap();
    assert_eq!(
        variants,
        vec![
            ConfigVariant::new("jdbc style", true, true, Some(2048)),
            ConfigVariant::new("serverSidePrepare=false&clientCache=false", false, false, None),
        ]
    );
    assert_eq!(config.factory().base_address(), "mysql://db.internal:3307/sakila");
}

#[test]
fn test_custom_sql_overrides_preset() {
    let config = BenchConfig::from_toml(
        r#"
        [benchmark]
        query = "actor-lookup"
        sql = "SELECT title FROM film WHERE film_id = ?"
        "#,
    )
    .unwrap();
    assert_eq!(
        config.query().unwrap().sql(),
        "SELECT title FROM film WHERE film_id = ?"
    );
}

#[test]
fn test_invalid_configs() {
    let no_placeholder = BenchConfig::from_toml("[benchmark]\nsql = \"SELECT 1\"").unwrap();
    assert!(matches!(no_placeholder.plan(), Err(BenchError::Config(_))));

    let zero_cycle = BenchConfig::from_toml("[benchmark]\ncycle = 0").unwrap();
    assert!(matches!(zero_cycle.plan(), Err(BenchError::Config(_))));

    let duplicate = BenchConfig::from_toml(
        r#"
        [[variants]]
        name = "a"
        properties = "clientCache=true"
        [[variants]]
        name = "a"
        properties = "clientCache=false"
        "#,
    )
    .unwrap();
    assert!(matches!(duplicate.variants(), Err(BenchError::Config(_))));

    assert!(matches!(
        BenchConfig::from_toml("[benchmark]\nquery = \"everything\""),
        Err(BenchError::Config(_))
    ));
}

#[test]
fn test_load_explicit_path() {
    let path = std::env::temp_dir().join(format!("stmtbench-{}.toml", std::process::id()));
    std::fs::write(&path, FULL).unwrap();

    let (config, loaded_from) = BenchConfig::load(Some(path.as_path())).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded_from.as_deref(), Some(path.as_path()));
    assert_eq!(config.benchmark.iterations, 20_000);
}

#[test]
fn test_load_missing_path_is_config_error() {
    let path = std::env::temp_dir().join("stmtbench-does-not-exist.toml");
    assert!(matches!(
        BenchConfig::load(Some(path.as_path())),
        Err(BenchError::Config(_))
    ));
}
