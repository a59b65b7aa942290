use super::*;
use crate::condition::{Condition, Function, Operand};
use crate::qb;
use crate::testing::{MockExecutor, column_row, row1};

const COLUMNS: &str = "[INFORMATION_SCHEMA].[COLUMNS]";
const PRIMARY_KEYS: &str = "KEY_COLUMN_USAGE";
const CONSTRAINTS: &str = "[sys].[objects]";

fn pk_constraint_row(name: &str, column: &str) -> Row {
    Row::from_pairs([
        ("name", Value::from(name)),
        ("column_name", Value::from(column)),
        ("type", Value::from("PK")),
    ])
}

fn orders_executor() -> MockExecutor {
    MockExecutor::new()
        .rows(
            PRIMARY_KEYS,
            vec![row1("field_name", "tenant_id"), row1("field_name", "id")],
        )
        .rows(
            COLUMNS,
            vec![
                column_row("tenant_id", "int", false, false),
                column_row("id", "int", false, true),
                column_row("name", "nvarchar(50)", true, false),
            ],
        )
}

#[test]
fn config_defaults() {
    let config = ConnectionConfig::default();
    assert!(config.default_schema.is_none());
    assert!(config.schema_cache_enabled);
    assert!(!config.logging_enabled);
    assert_eq!(config.max_sql_length, 200);
}

#[test]
fn config_builder() {
    let config = ConnectionConfig::new()
        .default_schema("sales")
        .no_schema_cache()
        .with_logging()
        .max_sql_length(64);
    assert_eq!(config.default_schema.as_deref(), Some("sales"));
    assert!(!config.schema_cache_enabled);
    assert!(config.logging_enabled);
    assert_eq!(config.max_sql_length, 64);
}

#[test]
fn truncates_on_char_boundaries() {
    assert_eq!(truncate_sql("SELECT 1", 100), "SELECT 1");
    assert_eq!(truncate_sql("SELECT 1", 6), "SELECT...");
    assert_eq!(truncate_sql("ééé", 2), "éé...");
}

#[tokio::test]
async fn default_schema_falls_back_to_dbo() {
    let conn = Connection::new(MockExecutor::new());
    assert_eq!(conn.default_schema().await.unwrap(), "dbo");

    let conn = Connection::new(MockExecutor::new().rows("SCHEMA_NAME()", vec![row1("", "app")]));
    assert_eq!(conn.default_schema().await.unwrap(), "app");

    let conn = Connection::with_config(MockExecutor::new(), ConnectionConfig::new().default_schema("sales"));
    assert_eq!(conn.default_schema().await.unwrap(), "sales");
    assert!(conn.executor().statements().is_empty());
}

#[tokio::test]
async fn version_drives_builders() {
    let greatest = Condition::Function(Function::greatest(vec![Operand::column("a"), Operand::column("b")]));

    let conn = Connection::new(MockExecutor::new().version("15.0.2000.5"));
    let qb = conn.query_builder().await.unwrap();
    assert_eq!(conn.server_version().await.unwrap().major, 15);
    let stmt = qb.build_condition(&greatest).unwrap();
    assert!(stmt.sql.starts_with("(SELECT MAX(value) FROM"), "{}", stmt.sql);

    let conn = Connection::new(MockExecutor::new().version("16.0.1000.6"));
    let qb = conn.query_builder().await.unwrap();
    assert!(qb.build_condition(&greatest).unwrap().sql.starts_with("GREATEST("));

    conn.reset_server_version();
    assert_eq!(conn.server_version().await.unwrap().major, 16);
}

#[tokio::test]
async fn missing_table_is_memoized() {
    let conn = Connection::new(MockExecutor::new());
    assert!(conn.get_table_schema("dbo.widgets").await.unwrap().is_none());
    assert!(conn.get_table_schema("widgets").await.unwrap().is_none());
    assert_eq!(conn.executor().count_matching(COLUMNS), 1);
    assert_eq!(
        conn.cache().get_table("dbo.widgets"),
        Some(CachedTable::NotFound)
    );

    conn.refresh_table_schema("widgets").await.unwrap();
    assert_eq!(conn.executor().count_matching(COLUMNS), 2);
}

#[tokio::test]
async fn cache_can_be_disabled() {
    let conn = Connection::with_config(orders_executor(), ConnectionConfig::new().no_schema_cache());
    conn.get_table_schema("orders").await.unwrap().unwrap();
    conn.get_table_schema("orders").await.unwrap().unwrap();
    assert_eq!(conn.executor().count_matching(COLUMNS), 2);
    assert!(conn.cache().get_table("dbo.orders").is_none());
}

#[tokio::test]
async fn insert_prefers_identity_then_supplied_values() {
    let exec = orders_executor().rows(
        "OUTPUT INSERTED",
        vec![Row::from_pairs([("tenant_id", 99_i64), ("id", 42_i64)])],
    );
    let conn = Connection::new(exec);

    let key = conn
        .insert(&qb::insert("orders").set("tenant_id", 7).set("name", "first"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        key,
        vec![
            ("tenant_id".to_string(), Value::Int(7)),
            ("id".to_string(), Value::Int(42)),
        ]
    );

    let (sql, params) = conn
        .executor()
        .statements()
        .into_iter()
        .find(|(sql, _)| sql.contains("OUTPUT INSERTED"))
        .unwrap();
    assert_eq!(
        sql,
        "SET NOCOUNT ON;DECLARE @temporary_inserted TABLE ([tenant_id] int NOT NULL, [id] int NOT NULL);\
         INSERT INTO [orders] ([tenant_id], [name]) OUTPUT INSERTED.[tenant_id],INSERTED.[id] INTO @temporary_inserted \
         VALUES (:qp0, :qp1);SELECT * FROM @temporary_inserted;"
    );
    assert_eq!(params.len(), 2);
}

#[tokio::test]
async fn insert_falls_back_to_default_then_returned_value() {
    let code = Row::from_pairs([
        ("column_name", Value::from("code")),
        ("is_nullable", Value::from("NO")),
        ("data_type", Value::from("nvarchar(10)")),
        ("column_default", Value::from("(N'AUTO')")),
        ("is_identity", Value::from(0_i64)),
        ("is_computed", Value::from(0_i64)),
    ]);
    let exec = MockExecutor::new()
        .rows(PRIMARY_KEYS, vec![row1("field_name", "code"), row1("field_name", "rev")])
        .rows(COLUMNS, vec![code, column_row("rev", "int", false, false)])
        .rows(
            "OUTPUT INSERTED",
            vec![Row::from_pairs([("code", Value::from("SRV")), ("rev", Value::from(3_i64))])],
        );
    let conn = Connection::new(exec);

    let key = conn.insert(&qb::insert("codes")).await.unwrap().unwrap();
    assert_eq!(
        key,
        vec![
            ("code".to_string(), Value::from("AUTO")),
            ("rev".to_string(), Value::Int(3)),
        ]
    );
}

#[tokio::test]
async fn insert_without_primary_key() {
    let exec = MockExecutor::new()
        .rows(COLUMNS, vec![column_row("message", "nvarchar(max)", true, false)])
        .affected("INSERT INTO [logs]", 1);
    let conn = Connection::new(exec);

    let key = conn.insert(&qb::insert("logs").set("message", "hi")).await.unwrap();
    assert_eq!(key, Some(vec![]));

    let conn = Connection::new(MockExecutor::new());
    let err = conn.insert(&qb::insert("ghosts").set("a", 1)).await.unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn upsert_uses_loaded_constraints() {
    let exec = MockExecutor::new()
        .rows(CONSTRAINTS, vec![pk_constraint_row("PK_users", "id")])
        .rows(
            COLUMNS,
            vec![
                column_row("id", "int", false, false),
                column_row("name", "nvarchar(50)", true, false),
            ],
        );
    let conn = Connection::new(exec);
    let insert = qb::insert("users").set("id", 1).set("name", "a");

    let stmt = conn.build_upsert(&insert, &UpsertUpdate::All).await.unwrap();
    assert_eq!(
        stmt.sql,
        "MERGE [users] WITH (HOLDLOCK) USING (VALUES (:qp0, :qp1)) AS [EXCLUDED] ([id], [name]) \
         ON ([users].[id]=[EXCLUDED].[id]) WHEN MATCHED THEN UPDATE SET [name]=[EXCLUDED].[name] \
         WHEN NOT MATCHED THEN INSERT ([id], [name]) VALUES ([EXCLUDED].[id], [EXCLUDED].[name]);"
    );

    let by_name = qb::insert("users").set("name", "a");
    let upsert = conn.build_upsert(&by_name, &UpsertUpdate::All).await.unwrap();
    let insert = conn.build_insert(&by_name).await.unwrap();
    assert_eq!(upsert, insert);

    conn.build_upsert(&by_name, &UpsertUpdate::All).await.unwrap();
    assert_eq!(conn.executor().count_matching(CONSTRAINTS), 1);
}

#[tokio::test]
async fn constraint_lookup_by_kind() {
    let exec = MockExecutor::new()
        .rows(CONSTRAINTS, vec![pk_constraint_row("PK_users", "id")])
        .rows(
            "[sys].[indexes]",
            vec![Row::from_pairs([
                ("name", Value::from("IX_users_name")),
                ("column_name", Value::from("name")),
                ("index_is_unique", Value::from(false)),
                ("index_is_primary", Value::from(false)),
            ])],
        );
    let conn = Connection::new(exec);

    let pk = conn.get_table_constraints("users", ConstraintKind::PrimaryKey).await.unwrap();
    assert_eq!(pk.len(), 1);
    assert_eq!(pk[0].column_names(), ["id".to_string()]);

    let indexes = conn.get_table_constraints("users", ConstraintKind::Index).await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].kind(), ConstraintKind::Index);
    assert_eq!(indexes[0].name(), "IX_users_name");
}

#[tokio::test]
async fn comment_on_missing_table_is_invalid_argument() {
    let conn = Connection::new(MockExecutor::new());
    let err = conn.build_add_comment_on_table("ghosts", "x").await.unwrap_err();
    assert!(err.is_invalid_argument());
    let err = conn
        .build_add_default_value("DF_x", "ghosts", "x", &DefaultValue::Literal(Value::Int(0)))
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn check_integrity_covers_base_tables() {
    let exec = MockExecutor::new().rows(
        "'BASE TABLE'",
        vec![row1("table_name", "orders"), row1("table_name", "people")],
    );
    let conn = Connection::new(exec);

    let stmt = conn.build_check_integrity(false, None).await.unwrap();
    assert_eq!(
        stmt.sql,
        "ALTER TABLE [dbo].[orders] NOCHECK CONSTRAINT ALL; ALTER TABLE [dbo].[people] NOCHECK CONSTRAINT ALL; "
    );
}

#[tokio::test]
async fn execution_passes_statements_through() {
    let exec = MockExecutor::new()
        .affected("DELETE FROM [users]", 3)
        .rows("SELECT COUNT(*)", vec![row1("n", 5_i64)]);
    let conn = Connection::with_config(exec, ConnectionConfig::new().with_logging());

    let delete = conn
        .build_delete(&qb::delete("users").and_where(Condition::eq("id", 1)))
        .await
        .unwrap();
    assert_eq!(delete.sql, "DELETE FROM [users] WHERE [id] = :qp0");
    assert_eq!(conn.execute(&delete).await.unwrap(), 3);

    let count = Statement::raw("SELECT COUNT(*) AS n FROM [users]");
    assert_eq!(conn.query_scalar(&count).await.unwrap(), Some(Value::Int(5)));
    assert_eq!(conn.query_all(&count).await.unwrap().len(), 1);
    assert!(conn.query_one(&count).await.unwrap().is_some());
}
