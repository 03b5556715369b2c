//! End-to-end synchronization tests against in-memory SQLite.

mod common;

use schemasync::prelude::*;
use sqlx::Row;

fn user_table() -> TableDefinition {
    TableDefinition::new("user")
        .field(
            "userName",
            FieldDefinition::new("User name", FieldType::String)
                .max(100)
                .not_null()
                .indexed(),
        )
        .field("bio", FieldDefinition::new("Bio", FieldType::Text))
}

#[tokio::test]
async fn test_first_sync_creates_table_with_system_columns() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());

    let plan = syncer.sync(&user_table()).await.unwrap();
    assert!(plan.create_table);
    assert!(common::table_exists(&pool, "user").await);
    assert!(common::index_exists(&pool, "idx_user_name").await);

    let rows = sqlx::query("PRAGMA table_info(\"user\")")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
    for expected in ["id", "user_name", "bio", "created_at", "updated_at", "deleted_at", "state"] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool, SqliteDialect::new());
    let def = user_table();

    syncer.sync(&def).await.unwrap();
    let replan = syncer.plan(&def).await.unwrap();
    assert!(!replan.changed(), "second plan not empty: {replan:?}");

    // And a full second sync executes nothing either.
    let resync = syncer.sync(&def).await.unwrap();
    assert!(!resync.changed());
}

#[tokio::test]
async fn test_new_field_becomes_add_column() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());

    syncer.sync(&user_table()).await.unwrap();
    let extended = user_table().field(
        "nickName",
        FieldDefinition::new("Nick name", FieldType::String),
    );

    let plan = syncer.plan(&extended).await.unwrap();
    assert_eq!(plan.add_clauses.len(), 1);
    assert!(plan.add_clauses[0].starts_with("ADD COLUMN \"nick_name\""));
    assert!(plan.modify_clauses.is_empty());

    syncer.sync(&extended).await.unwrap();
    let replan = syncer.plan(&extended).await.unwrap();
    assert!(!replan.changed());
}

#[tokio::test]
async fn test_nullable_change_rebuilds_and_keeps_rows() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());

    let loose = TableDefinition::new("user").field(
        "userName",
        FieldDefinition::new("User name", FieldType::String),
    );
    syncer.sync(&loose).await.unwrap();
    sqlx::query("INSERT INTO \"user\" (\"user_name\") VALUES ('alice')")
        .execute(&pool)
        .await
        .unwrap();

    let strict = TableDefinition::new("user").field(
        "userName",
        FieldDefinition::new("User name", FieldType::String).not_null(),
    );
    let plan = syncer.plan(&strict).await.unwrap();
    // SQLite cannot ALTER COLUMN; the change must route into the
    // rebuild path, never into a direct ALTER.
    assert!(!plan.modify_clauses.is_empty());

    syncer.sync(&strict).await.unwrap();

    let (name,): (String,) = sqlx::query_as("SELECT \"user_name\" FROM \"user\"")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "alice");

    let rows = sqlx::query("PRAGMA table_info(\"user\")")
        .fetch_all(&pool)
        .await
        .unwrap();
    let user_name = rows
        .iter()
        .find(|r| r.get::<String, _>("name") == "user_name")
        .unwrap();
    assert_eq!(user_name.get::<i64, _>("notnull"), 1);

    let replan = syncer.plan(&strict).await.unwrap();
    assert!(!replan.changed(), "rebuild did not converge: {replan:?}");
}

#[tokio::test]
async fn test_default_change_rebuilds() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());

    let v1 = TableDefinition::new("job").field(
        "priority",
        FieldDefinition::new("Priority", FieldType::Number).not_null(),
    );
    syncer.sync(&v1).await.unwrap();

    let v2 = TableDefinition::new("job").field(
        "priority",
        FieldDefinition::new("Priority", FieldType::Number)
            .not_null()
            .default_value(serde_json::json!(5)),
    );
    let plan = syncer.plan(&v2).await.unwrap();
    assert!(plan.modify_clauses.is_empty());
    assert_eq!(plan.default_clauses.len(), 1);

    syncer.sync(&v2).await.unwrap();

    let rows = sqlx::query("PRAGMA table_info(\"job\")")
        .fetch_all(&pool)
        .await
        .unwrap();
    let priority = rows
        .iter()
        .find(|r| r.get::<String, _>("name") == "priority")
        .unwrap();
    assert_eq!(priority.get::<Option<String>, _>("dflt_value").as_deref(), Some("5"));

    let replan = syncer.plan(&v2).await.unwrap();
    assert!(!replan.changed());
}

#[tokio::test]
async fn test_index_symmetry() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());

    syncer.sync(&user_table()).await.unwrap();
    assert!(common::index_exists(&pool, "idx_user_name").await);

    // Withdraw the indexed flag: the single-column index is dropped.
    let unindexed = TableDefinition::new("user")
        .field(
            "userName",
            FieldDefinition::new("User name", FieldType::String)
                .max(100)
                .not_null(),
        )
        .field("bio", FieldDefinition::new("Bio", FieldType::Text));

    let plan = syncer.plan(&unindexed).await.unwrap();
    assert_eq!(plan.index_actions.len(), 1);
    assert_eq!(plan.index_actions[0].action, IndexOp::Drop);
    assert_eq!(plan.index_actions[0].index_name, "idx_user_name");

    syncer.sync(&unindexed).await.unwrap();
    assert!(!common::index_exists(&pool, "idx_user_name").await);

    let replan = syncer.plan(&unindexed).await.unwrap();
    assert!(!replan.changed());
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    common::init_tracing();
    let pool = common::create_pool().await;

    let live = TableSyncer::new(pool.clone(), SqliteDialect::new());
    live.sync(&user_table()).await.unwrap();
    let columns_before = common::column_count(&pool, "user").await;

    let extended = user_table().field(
        "nickName",
        FieldDefinition::new("Nick name", FieldType::String),
    );
    let dry = TableSyncer::new(pool.clone(), SqliteDialect::new())
        .options(SyncOptions::new().dry_run(true));
    let plan = dry.sync(&extended).await.unwrap();

    assert!(plan.changed());
    assert_eq!(common::column_count(&pool, "user").await, columns_before);

    // The change is still pending for a real run.
    let replan = live.plan(&extended).await.unwrap();
    assert!(replan.changed());
}

#[tokio::test]
async fn test_dry_run_on_missing_table_creates_nothing() {
    common::init_tracing();
    let pool = common::create_pool().await;
    let dry = TableSyncer::new(pool.clone(), SqliteDialect::new())
        .options(SyncOptions::new().dry_run(true));

    let plan = dry.sync(&user_table()).await.unwrap();
    assert!(plan.create_table);
    assert!(!common::table_exists(&pool, "user").await);
}

#[tokio::test]
async fn test_file_backed_database_survives_reconnect() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sync.db").display());

    {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        let syncer = TableSyncer::new(pool.clone(), SqliteDialect::new());
        syncer.sync(&user_table()).await.unwrap();
        pool.close().await;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    let syncer = TableSyncer::new(pool, SqliteDialect::new());
    let replan = syncer.plan(&user_table()).await.unwrap();
    assert!(!replan.changed());
}
