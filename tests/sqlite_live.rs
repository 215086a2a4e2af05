//! Live tests against in-memory SQLite databases: schema creation,
//! introspection, idempotent management and table rebuilds.

use sqlx::{Connection, SqliteConnection};

use squill::prelude::*;

async fn connect() -> SqliteConnection {
    SqliteConnection::connect(":memory:")
        .await
        .expect("Failed to open in-memory SQLite database")
}

fn widgets() -> Table {
    Table::new("widgets")
        .column(
            Column::new("widgets", "id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        )
        .column(Column::new("widgets", "name", LogicalType::Text).not_null())
        .column(Column::new("widgets", "sku", LogicalType::Text).length(32).not_null().unique())
}

async fn row_count(conn: &mut SqliteConnection, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(conn)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn test_create_and_introspect() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    assert!(manager.create_table_if_not_exists(&widgets()).await.unwrap());
    assert!(manager.table_exists("widgets").await.unwrap());

    let table = manager.get_table("widgets").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["id", "name", "sku"]);

    let id = table.get_column("id").unwrap();
    assert!(id.primary_key);
    assert!(id.auto_increment);

    let sku = table.get_column("sku").unwrap();
    assert!(sku.unique);
    assert!(!sku.nullable);
    assert_eq!(sku.type_desc.length, Some(32));
}

#[tokio::test]
async fn test_create_and_drop_are_idempotent() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    assert!(manager.create_table_if_not_exists(&widgets()).await.unwrap());
    assert!(!manager.create_table_if_not_exists(&widgets()).await.unwrap());

    assert!(manager.drop_table_if_exists("widgets").await.unwrap());
    assert!(!manager.drop_table_if_exists("widgets").await.unwrap());
}

#[tokio::test]
async fn test_add_column_then_check_preserves_rows() {
    let mut conn = connect().await;

    {
        let mut manager = SchemaManager::new(&mut conn);
        manager.create_table_if_not_exists(&widgets()).await.unwrap();
    }
    for (name, sku) in [("bolt", "B-1"), ("nut", "N-1"), ("washer", "W-1")] {
        sqlx::query("INSERT INTO widgets (name, sku) VALUES (?, ?)")
            .bind(name)
            .bind(sku)
            .execute(&mut conn)
            .await
            .unwrap();
    }

    {
        let mut manager = SchemaManager::new(&mut conn);
        // Nullable column without constraints: a direct ALTER TABLE.
        let price = Column::new("widgets", "price", LogicalType::Double);
        assert!(manager.add_column_if_not_exists(&price).await.unwrap());
        assert!(!manager.add_column_if_not_exists(&price).await.unwrap());

        // The check forces a rebuild; existing rows must survive it.
        let check = CheckConstraint::new("widgets", Some("price".into()), "price > 0");
        assert!(manager.add_check_if_not_exists(&check).await.unwrap());
        assert!(!manager.add_check_if_not_exists(&check).await.unwrap());
    }

    assert_eq!(row_count(&mut conn, "widgets").await, 3);

    // The unique constraint survived the rebuild.
    let duplicate = sqlx::query("INSERT INTO widgets (name, sku, price) VALUES ('bolt2', 'B-1', 1.0)")
        .execute(&mut conn)
        .await;
    assert!(duplicate.is_err());

    // So did the check.
    let negative = sqlx::query("INSERT INTO widgets (name, sku, price) VALUES ('scrap', 'S-1', -1.0)")
        .execute(&mut conn)
        .await;
    assert!(negative.is_err());

    sqlx::query("INSERT INTO widgets (name, sku, price) VALUES ('gear', 'G-1', 2.5)")
        .execute(&mut conn)
        .await
        .unwrap();
    assert_eq!(row_count(&mut conn, "widgets").await, 4);
}

#[tokio::test]
async fn test_foreign_key_actions_survive_introspection() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    let customers = Table::new("customers")
        .column(
            Column::new("customers", "id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        )
        .column(Column::new("customers", "name", LogicalType::Text).not_null());
    let orders = Table::new("orders")
        .column(
            Column::new("orders", "id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        )
        .column(
            Column::new("orders", "customer_id", LogicalType::BigInt)
                .not_null()
                .references(
                    ColumnReference::new("customers", "id")
                        .on_delete(ReferentialAction::Cascade),
                ),
        )
        .column(
            Column::new("orders", "shipper_id", LogicalType::BigInt)
                .references(ColumnReference::new("customers", "id")),
        );

    manager.create_table_if_not_exists(&customers).await.unwrap();
    manager.create_table_if_not_exists(&orders).await.unwrap();

    let table = manager.get_table("orders").await.unwrap().unwrap();
    // Default-named single-column foreign keys come back as column flags.
    assert!(table.foreign_keys.is_empty());

    let customer_id = table.get_column("customer_id").unwrap();
    let target = customer_id.references.as_ref().unwrap();
    assert_eq!(target.table, "customers");
    assert_eq!(target.column, "id");
    assert_eq!(target.on_delete, ReferentialAction::Cascade);
    assert_eq!(target.on_update, ReferentialAction::NoAction);

    let shipper_id = table.get_column("shipper_id").unwrap();
    let target = shipper_id.references.as_ref().unwrap();
    assert_eq!(target.on_delete, ReferentialAction::NoAction);
}

#[tokio::test]
async fn test_check_column_association() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    let people = Table::new("people")
        .column(
            Column::new("people", "id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        )
        .column(Column::new("people", "age", LogicalType::Integer))
        .check(CheckConstraint::new("people", None, "age > 0 AND age < 150"));
    manager.create_table_if_not_exists(&people).await.unwrap();

    let table = manager.get_table("people").await.unwrap().unwrap();
    assert_eq!(table.checks.len(), 1);
    // Exactly one column appears in the expression, so it is associated.
    assert_eq!(table.checks[0].column.as_deref(), Some("age"));

    let pairs = Table::new("pairs")
        .column(Column::new("pairs", "a", LogicalType::Integer))
        .column(Column::new("pairs", "b", LogicalType::Integer))
        .check(CheckConstraint::new("pairs", None, "a > b"));
    manager.create_table_if_not_exists(&pairs).await.unwrap();

    let table = manager.get_table("pairs").await.unwrap().unwrap();
    assert_eq!(table.checks.len(), 1);
    // Two candidate columns: the association is ambiguous and left unset.
    assert_eq!(table.checks[0].column, None);
}

#[tokio::test]
async fn test_recreate_preserves_rows_and_indexes() {
    let mut conn = connect().await;

    {
        let mut manager = SchemaManager::new(&mut conn);
        manager.create_table_if_not_exists(&widgets()).await.unwrap();
        let index = Index::new("widgets", vec![OrderedColumn::new("name")]);
        assert!(manager.create_index_if_not_exists(&index).await.unwrap());
    }
    sqlx::query("INSERT INTO widgets (name, sku) VALUES ('bolt', 'B-1')")
        .execute(&mut conn)
        .await
        .unwrap();

    // Rebuild with an extra column; rows and the explicit index survive.
    let mut desired = widgets();
    desired
        .columns
        .push(Column::new("widgets", "price", LogicalType::Double));
    recreate_table(&mut conn, &desired, false).await.unwrap();

    assert_eq!(row_count(&mut conn, "widgets").await, 1);

    let mut manager = SchemaManager::new(&mut conn);
    assert!(manager.index_exists("widgets", "ix_widgets_name").await.unwrap());
    let table = manager.get_table("widgets").await.unwrap().unwrap();
    assert!(table.get_column("price").is_some());
}

#[tokio::test]
async fn test_recreate_missing_table_fails_cleanly() {
    let mut conn = connect().await;
    let desired = widgets();
    let result = recreate_table(&mut conn, &desired, false).await;
    assert!(result.is_err());

    // Foreign key enforcement is back on after the failure.
    let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}

#[tokio::test]
async fn test_drop_unique_allows_duplicates() {
    let mut conn = connect().await;

    {
        let mut manager = SchemaManager::new(&mut conn);
        manager.create_table_if_not_exists(&widgets()).await.unwrap();
        assert!(manager.unique_exists("widgets", "uq_widgets_sku").await.unwrap());
        assert!(manager.drop_unique_if_exists("widgets", "uq_widgets_sku").await.unwrap());
        assert!(!manager.drop_unique_if_exists("widgets", "uq_widgets_sku").await.unwrap());
    }

    sqlx::query("INSERT INTO widgets (name, sku) VALUES ('bolt', 'B-1')")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO widgets (name, sku) VALUES ('bolt2', 'B-1')")
        .execute(&mut conn)
        .await
        .unwrap();
    assert_eq!(row_count(&mut conn, "widgets").await, 2);
}

#[tokio::test]
async fn test_drop_column_prunes_dependents() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    manager.create_table_if_not_exists(&widgets()).await.unwrap();
    assert!(manager.drop_column_if_exists("widgets", "sku").await.unwrap());
    assert!(!manager.drop_column_if_exists("widgets", "sku").await.unwrap());

    let table = manager.get_table("widgets").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["id", "name"]);
    assert!(table.uniques.is_empty());
}

#[tokio::test]
async fn test_drop_column_discards_its_indexes() {
    let mut conn = connect().await;

    {
        let mut manager = SchemaManager::new(&mut conn);
        let mut table = widgets();
        table
            .columns
            .push(Column::new("widgets", "color", LogicalType::Text));
        manager.create_table_if_not_exists(&table).await.unwrap();
        let on_color = Index::new("widgets", vec![OrderedColumn::new("color")]);
        assert!(manager.create_index_if_not_exists(&on_color).await.unwrap());
        let on_name = Index::new("widgets", vec![OrderedColumn::new("name")]);
        assert!(manager.create_index_if_not_exists(&on_name).await.unwrap());
    }
    sqlx::query("INSERT INTO widgets (name, sku, color) VALUES ('bolt', 'B-1', 'zinc')")
        .execute(&mut conn)
        .await
        .unwrap();

    let mut manager = SchemaManager::new(&mut conn);
    // The index forces the rebuild path; its index must not come back.
    assert!(manager.drop_column_if_exists("widgets", "color").await.unwrap());

    assert!(!manager.index_exists("widgets", "ix_widgets_color").await.unwrap());
    assert!(manager.index_exists("widgets", "ix_widgets_name").await.unwrap());

    let table = manager.get_table("widgets").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["id", "name", "sku"]);
    drop(manager);
    assert_eq!(row_count(&mut conn, "widgets").await, 1);
}

#[tokio::test]
async fn test_rename_and_wildcard_listing() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    manager.create_table_if_not_exists(&widgets()).await.unwrap();
    let gizmos = Table::new("gizmos")
        .column(Column::new("gizmos", "id", LogicalType::BigInt).primary_key());
    manager.create_table_if_not_exists(&gizmos).await.unwrap();

    let matched = manager.get_tables(Some("wid*")).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "widgets");

    let all = manager.get_tables(None).await.unwrap();
    assert_eq!(all.len(), 2);

    manager.rename_table("widgets", "doodads").await.unwrap();
    assert!(!manager.table_exists("widgets").await.unwrap());
    assert!(manager.table_exists("doodads").await.unwrap());

    manager.rename_column("doodads", "name", "label").await.unwrap();
    assert!(manager.column_exists("doodads", "label").await.unwrap());
    assert!(!manager.column_exists("doodads", "name").await.unwrap());
}

#[tokio::test]
async fn test_truncate_table() {
    let mut conn = connect().await;
    {
        let mut manager = SchemaManager::new(&mut conn);
        manager.create_table_if_not_exists(&widgets()).await.unwrap();
    }
    sqlx::query("INSERT INTO widgets (name, sku) VALUES ('bolt', 'B-1')")
        .execute(&mut conn)
        .await
        .unwrap();
    assert_eq!(row_count(&mut conn, "widgets").await, 1);

    let mut manager = SchemaManager::new(&mut conn);
    manager.truncate_table("widgets").await.unwrap();
    drop(manager);
    assert_eq!(row_count(&mut conn, "widgets").await, 0);
}

#[tokio::test]
async fn test_views() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    manager.create_table_if_not_exists(&widgets()).await.unwrap();

    let view = View::new("widget_names", "SELECT id, name FROM widgets");
    assert!(manager.create_view_if_not_exists(&view).await.unwrap());
    assert!(!manager.create_view_if_not_exists(&view).await.unwrap());
    assert!(manager.view_exists("widget_names").await.unwrap());

    // The stored CREATE VIEW text normalizes back to the bare query.
    let stored = manager.get_view("widget_names").await.unwrap().unwrap();
    assert_eq!(stored.definition, "SELECT id, name FROM widgets");

    assert!(manager.drop_view_if_exists("widget_names").await.unwrap());
    assert!(!manager.drop_view_if_exists("widget_names").await.unwrap());
}

#[tokio::test]
async fn test_default_constraint_round_trip() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    manager.create_table_if_not_exists(&widgets()).await.unwrap();

    let default = DefaultConstraint::new("widgets", "name", "'unnamed'");
    assert!(manager.add_default_if_not_exists(&default).await.unwrap());
    assert!(!manager.add_default_if_not_exists(&default).await.unwrap());

    sqlx::query("INSERT INTO widgets (sku) VALUES ('B-1')")
        .execute(&mut conn)
        .await
        .unwrap();
    let (name,): (String,) = sqlx::query_as("SELECT name FROM widgets WHERE sku = 'B-1'")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(name, "unnamed");

    let mut manager = SchemaManager::new(&mut conn);
    assert!(manager.drop_default_if_exists("widgets", "name").await.unwrap());
    assert!(!manager.drop_default_if_exists("widgets", "name").await.unwrap());
}

#[tokio::test]
async fn test_version_gated_capabilities() {
    let mut conn = connect().await;
    let mut manager = SchemaManager::new(&mut conn);

    let version = manager.server_version().await.unwrap();
    // The bundled SQLite is well past 3.35; DROP COLUMN runs directly.
    assert!(version.at_least(3, 35, 0));
}
