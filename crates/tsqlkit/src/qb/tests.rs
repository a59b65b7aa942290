use super::*;
use crate::condition::{Like, LikeMode, Operand, in_row};
use crate::ident::QualifiedName;
use crate::schema::{ColumnDescriptor, DefaultValue, KeyConstraint, TableConstraints, TableDescriptor};
use crate::value::Value;

const V2008: ServerVersion = ServerVersion::new(10, 50, 0, 0);
const V2019: ServerVersion = ServerVersion::new(15, 0, 2000, 5);
const V2022: ServerVersion = ServerVersion::new(16, 0, 1000, 6);

fn users_table() -> TableDescriptor {
    TableDescriptor::new(QualifiedName::parse("dbo.users"))
        .with_column(ColumnDescriptor::new("id", "int").not_null().auto_increment())
        .with_column(ColumnDescriptor::new("email", "nvarchar(255)").not_null())
        .with_column(ColumnDescriptor::new("name", "nvarchar(50)"))
        .with_primary_key(&["id"])
}

fn users_constraints() -> TableConstraints {
    TableConstraints {
        primary_key: Some(KeyConstraint {
            name: "PK_users".into(),
            column_names: vec!["id".into()],
        }),
        uniques: vec![KeyConstraint {
            name: "UQ_users_email".into(),
            column_names: vec!["email".into()],
        }],
        ..Default::default()
    }
}

fn render(cond: &Condition) -> Statement {
    QueryBuilder::new(V2019).build_condition(cond).unwrap()
}

// ==================== Conditions ====================

#[test]
fn composite_in_expands_per_row() {
    let cond = Condition::in_rows(
        vec!["id", "name"],
        vec![
            in_row(vec![("id", Value::from(1)), ("name", Value::from("a"))]),
            in_row(vec![("id", Value::from(2)), ("name", Value::Null)]),
        ],
    );
    let stmt = render(&cond);
    assert_eq!(
        stmt.sql,
        "(([id] = :qp0 AND [name] = :qp1) OR ([id] = :qp2 AND [name] IS NULL))"
    );
    assert_eq!(stmt.params.len(), 3);
    assert_eq!(stmt.params.get("qp1"), Some(&Value::from("a")));
}

#[test]
fn composite_not_in_flips_connectives() {
    let cond = Condition::not_in_rows(
        vec!["id", "name"],
        vec![in_row(vec![("id", Value::from(1)), ("name", Value::from("a"))])],
    );
    assert_eq!(render(&cond).sql, "(([id] != :qp0 OR [name] != :qp1))");
}

#[test]
fn composite_in_with_no_rows() {
    let cond = Condition::in_rows(vec!["id", "name"], vec![]);
    assert_eq!(render(&cond).sql, "()");
}

#[test]
fn composite_in_subquery_is_unsupported() {
    let cond = Condition::in_subquery(vec!["a", "b"], select("t"));
    let err = QueryBuilder::new(V2019).build_condition(&cond).unwrap_err();
    assert!(err.is_unsupported());

    let cond = Condition::in_subquery(vec!["user_id"], select("users").columns(&["id"]));
    assert_eq!(render(&cond).sql, "[user_id] IN (SELECT [id] FROM [users])");
}

#[test]
fn simple_in_variants() {
    assert_eq!(render(&Condition::in_list("id", vec![1, 2, 3])).sql, "[id] IN (:qp0, :qp1, :qp2)");
    assert_eq!(render(&Condition::in_list("id", vec![7])).sql, "[id] = :qp0");
    assert_eq!(render(&Condition::not_in("id", vec![7])).sql, "[id] <> :qp0");
    assert_eq!(
        render(&Condition::in_list("id", vec![Value::Int(1), Value::Null])).sql,
        "([id] = :qp0 OR [id] IS NULL)"
    );
    assert_eq!(render(&Condition::in_list("id", Vec::<i64>::new())).sql, "0=1");
    assert_eq!(render(&Condition::not_in("id", Vec::<i64>::new())).sql, "");
}

#[test]
fn groups_parenthesize_multiple_children() {
    let single = Condition::and(vec![Condition::eq("a", 1)]);
    assert_eq!(render(&single).sql, "[a] = :qp0");

    let many = Condition::and(vec![
        Condition::eq("a", 1),
        Condition::or(vec![Condition::is_null("b"), Condition::gt("c", 2)]),
        Condition::not_in("d", Vec::<i64>::new()),
    ]);
    assert_eq!(
        render(&many).sql,
        "([a] = :qp0) AND (([b] IS NULL) OR ([c] > :qp1))"
    );
}

#[test]
fn null_comparisons_and_raw_params() {
    assert_eq!(render(&Condition::eq("deleted_at", Value::Null)).sql, "[deleted_at] IS NULL");
    assert_eq!(render(&Condition::is_not_null("deleted_at")).sql, "[deleted_at] IS NOT NULL");

    let stmt = render(&Condition::raw_with("[age] > :min", vec![("min", 18)]));
    assert_eq!(stmt.sql, "[age] > :min");
    assert_eq!(stmt.params.get("min"), Some(&Value::Int(18)));

    let stmt = render(&Condition::not_between("age", 18, 65));
    assert_eq!(stmt.sql, "[age] NOT BETWEEN :qp0 AND :qp1");
}

#[test]
fn like_escapes_wildcards() {
    assert_eq!(like_pattern("50%_off", LikeMode::Contains), "%50[%][_]off%");
    assert_eq!(like_pattern("[a]\\b", LikeMode::StartsWith), "[[]a[]][\\]b%");
    assert_eq!(like_pattern("x%", LikeMode::Custom), "x%");

    let stmt = render(&Condition::like("name", "50%"));
    assert_eq!(stmt.sql, "[name] LIKE :qp0");
    assert_eq!(stmt.params.get("qp0"), Some(&Value::from("%50[%]%")));

    let any = Condition::Like(
        Like::new("name", vec![Operand::value("a"), Operand::value("b")])
            .any()
            .mode(LikeMode::EndsWith),
    );
    let stmt = render(&any);
    assert_eq!(stmt.sql, "[name] LIKE :qp0 OR [name] LIKE :qp1");
    assert_eq!(stmt.params.get("qp1"), Some(&Value::from("%b")));
}

#[test]
fn raw_params_cannot_rebind_generated_placeholders() {
    let cond = Condition::and(vec![
        Condition::eq("a", 1),
        Condition::raw_with("[b] = :qp0", vec![("qp0", 5)]),
    ]);
    let err = QueryBuilder::new(V2019).build_condition(&cond).unwrap_err();
    assert!(err.is_invalid_argument());

    let cond = Condition::and(vec![
        Condition::raw_with("[a] > :min", vec![("min", 1)]),
        Condition::raw_with("[b] > :min", vec![("min", 2)]),
    ]);
    let err = QueryBuilder::new(V2019).build_condition(&cond).unwrap_err();
    assert!(err.is_invalid_argument());

    let cond = Condition::and(vec![
        Condition::raw_with("[a] > :min", vec![("min", 1)]),
        Condition::raw_with("[b] > :min", vec![("min", 1)]),
    ]);
    assert_eq!(render(&cond).params.len(), 1);
}

#[test]
fn generated_placeholders_skip_caller_names() {
    let cond = Condition::and(vec![
        Condition::raw_with("[b] = :qp0", vec![("qp0", 5)]),
        Condition::eq("a", 1),
    ]);
    let stmt = render(&cond);
    assert_eq!(stmt.sql, "([b] = :qp0) AND ([a] = :qp1)");
    assert_eq!(stmt.params.get("qp0"), Some(&Value::Int(5)));
    assert_eq!(stmt.params.get("qp1"), Some(&Value::Int(1)));
}

#[test]
fn like_stringifies_scalar_values() {
    let stmt = render(&Condition::like("code", 12));
    assert_eq!(stmt.sql, "[code] LIKE :qp0");
    assert_eq!(stmt.params.get("qp0"), Some(&Value::from("%12%")));

    let stmt = render(&Condition::Like(
        Like::new("code", vec![Operand::value(1.5)]).mode(LikeMode::StartsWith),
    ));
    assert_eq!(stmt.params.get("qp0"), Some(&Value::from("1.5%")));

    let stmt = render(&Condition::Like(Like::new("code", vec![Operand::column("pattern")])));
    assert_eq!(stmt.sql, "[code] LIKE [pattern]");
    assert!(stmt.params.is_empty());
}

#[test]
fn not_like_with_several_values() {
    let cond = Condition::Like(
        Like::new("name", vec![Operand::value("a_"), Operand::value("b")]).negated(),
    );
    let stmt = render(&cond);
    assert_eq!(stmt.sql, "[name] NOT LIKE :qp0 AND [name] NOT LIKE :qp1");
    assert_eq!(stmt.params.get("qp0"), Some(&Value::from("%a[_]%")));
    assert_eq!(stmt.params.get("qp1"), Some(&Value::from("%b%")));

    let cond = Condition::Like(
        Like::new("name", vec![Operand::value("a"), Operand::value("b")])
            .negated()
            .any(),
    );
    assert_eq!(
        render(&cond).sql,
        "[name] NOT LIKE :qp0 OR [name] NOT LIKE :qp1"
    );
}

#[test]
fn case_sensitive_like_is_unsupported() {
    let cond = Condition::Like(Like::new("name", vec![Operand::value("x")]).case_sensitive(true));
    let err = QueryBuilder::new(V2019).build_condition(&cond).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn exists_renders_subquery() {
    let cond = Condition::exists(
        select("orders").and_where(Condition::raw("[orders].[user_id] = [users].[id]")),
    );
    assert_eq!(
        render(&cond).sql,
        "EXISTS (SELECT * FROM [orders] WHERE [orders].[user_id] = [users].[id])"
    );
}

// ==================== Functions ====================

#[test]
fn greatest_and_least_depend_on_version() {
    let f = Function::greatest(vec![Operand::column("a"), Operand::column("b")]);
    assert_eq!(
        QueryBuilder::new(V2019).build_function(&f).unwrap().sql,
        "(SELECT MAX(value) FROM (SELECT [a] AS value UNION SELECT [b] AS value) AS t)"
    );
    assert_eq!(
        QueryBuilder::new(V2022).build_function(&f).unwrap().sql,
        "GREATEST([a], [b])"
    );

    let f = Function::least(vec![Operand::column("a"), Operand::value(3)]);
    let stmt = QueryBuilder::new(V2019).build_function(&f).unwrap();
    assert_eq!(
        stmt.sql,
        "(SELECT MIN(value) FROM (SELECT [a] AS value UNION SELECT :qp0 AS value) AS t)"
    );
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn function_edge_cases() {
    let single = Function::greatest(vec![Operand::column("a")]);
    assert_eq!(QueryBuilder::new(V2022).build_function(&single).unwrap().sql, "[a]");

    let empty = Function::least(vec![]);
    let err = QueryBuilder::new(V2022).build_function(&empty).unwrap_err();
    assert!(err.is_invalid_argument());

    let longest = Function::longest(vec![Operand::column("a"), Operand::column("b")]);
    assert_eq!(
        QueryBuilder::new(V2022).build_function(&longest).unwrap().sql,
        "(SELECT TOP 1 value FROM (SELECT [a] AS value UNION SELECT [b] AS value) AS t ORDER BY LEN(value) DESC)"
    );
}

#[test]
fn shortest_orders_by_length_ascending() {
    let f = Function::shortest(vec![Operand::column("a"), Operand::value("xy")]);
    let stmt = QueryBuilder::new(V2022).build_function(&f).unwrap();
    assert_eq!(
        stmt.sql,
        "(SELECT TOP 1 value FROM (SELECT [a] AS value UNION SELECT :qp0 AS value) AS t ORDER BY LEN(value) ASC)"
    );
    assert_eq!(stmt.params.get("qp0"), Some(&Value::from("xy")));
}

#[test]
fn array_merge_aggregates_json_elements() {
    let f = Function::array_merge(vec![Operand::column("tags"), Operand::value("[\"x\"]")]);
    let stmt = QueryBuilder::new(V2022).build_function(&f).unwrap();
    assert_eq!(
        stmt.sql,
        "(SELECT '[' + STRING_AGG('\"' + STRING_ESCAPE(value, 'json') + '\"', ',') + ']' \
         FROM (SELECT value FROM OPENJSON([tags]) UNION SELECT value FROM OPENJSON(:qp0)) AS t)"
    );
    assert_eq!(stmt.params.len(), 1);

    for f in [
        Function::array_merge(vec![]),
        Function::shortest(vec![]),
        Function::greatest(vec![]),
    ] {
        assert!(QueryBuilder::new(V2019).build_function(&f).unwrap_err().is_invalid_argument());
    }
}

// ==================== SELECT and pagination ====================

#[test]
fn select_quotes_aliases_and_joins() {
    let q = select("dbo.users u")
        .columns(&["u.id", "u.name AS n"])
        .left_join("orders o", Condition::raw("[o].[user_id] = [u].[id]"));
    assert_eq!(
        QueryBuilder::new(V2019).build_select(&q).unwrap().sql,
        "SELECT [u].[id], [u].[name] AS [n] FROM [dbo].[users] [u] LEFT JOIN [orders] [o] ON [o].[user_id] = [u].[id]"
    );
}

#[test]
fn select_with_function_column() {
    let q = select("t").add_function(
        Function::greatest(vec![Operand::column("a"), Operand::column("b")]),
        "g",
    );
    assert_eq!(
        QueryBuilder::new(V2022).build_select(&q).unwrap().sql,
        "SELECT GREATEST([a], [b]) AS [g] FROM [t]"
    );
}

#[test]
fn offset_without_limit() {
    let stmt = QueryBuilder::new(V2019).build_select(&select("t").offset(10)).unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM [t] ORDER BY (SELECT NULL) OFFSET 10 ROWS");
}

#[test]
fn limit_with_zero_offset() {
    let stmt = QueryBuilder::new(V2019)
        .build_select(&select("t").limit(10).offset(0))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM [t] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
    );
}

#[test]
fn legacy_server_uses_row_number() {
    let stmt = QueryBuilder::new(V2008)
        .build_select(&select("t").columns(&["a"]).page(3, 5))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT TOP 5 * FROM (SELECT rowNum = ROW_NUMBER() over (ORDER BY (SELECT NULL)), [a] FROM [t]) sub WHERE rowNum > 10"
    );
}

#[test]
fn select_exists_wraps_query() {
    assert_eq!(
        QueryBuilder::default().select_exists("SELECT 1 FROM [t]"),
        "SELECT CASE WHEN EXISTS(SELECT 1 FROM [t]) THEN 1 ELSE 0 END"
    );
}

// ==================== DML ====================

#[test]
fn insert_variants() {
    let qb = QueryBuilder::new(V2019);
    assert_eq!(
        qb.build_insert(&insert("users"), None).unwrap().sql,
        "INSERT INTO [users] DEFAULT VALUES"
    );

    let from = insert("archive").from_query(
        &["id", "name"],
        select("users").columns(&["id", "name"]).and_where(Condition::eq("active", false)),
    );
    let stmt = qb.build_insert(&from, None).unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO [archive] ([id], [name]) SELECT [id], [name] FROM [users] WHERE [active] = :qp0"
    );
}

#[test]
fn varbinary_values_become_hex_conversions() {
    let files = TableDescriptor::new(QualifiedName::parse("files"))
        .with_column(ColumnDescriptor::new("data", "varbinary(max)"))
        .with_column(ColumnDescriptor::new("name", "nvarchar(64)"));
    let stmt = QueryBuilder::new(V2019)
        .build_insert(&insert("files").set("data", "abc").set("name", "a.txt"), Some(&files))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO [files] ([data], [name]) VALUES (CONVERT(VARBINARY(MAX), 0x616263), :qp0)"
    );
    assert_eq!(stmt.params.len(), 1);

    let stmt = QueryBuilder::new(V2019)
        .build_update(&update("files").set("data", vec![0xde_u8, 0xad]), Some(&files))
        .unwrap();
    assert_eq!(stmt.sql, "UPDATE [files] SET [data]=CONVERT(VARBINARY(MAX), 0xdead)");

    let stmt = QueryBuilder::new(V2019)
        .build_update(&update("files").set("data", Value::Null).set("name", Value::Null), Some(&files))
        .unwrap();
    assert_eq!(stmt.sql, "UPDATE [files] SET [data]=NULL, [name]=:qp0");
    assert_eq!(stmt.params.get("qp0"), Some(&Value::Null));
}

#[test]
fn batch_insert_binds_every_row() {
    let batch = batch_insert("t", &["a", "b"])
        .row(vec![Value::Int(1), Value::from("x")])
        .row(vec![Value::Int(2), Value::Null]);
    let stmt = QueryBuilder::new(V2019).build_batch_insert(&batch, None).unwrap();
    assert_eq!(stmt.sql, "INSERT INTO [t] ([a], [b]) VALUES (:qp0, :qp1), (:qp2, :qp3)");
    assert_eq!(stmt.params.get("qp3"), Some(&Value::Null));

    let err = QueryBuilder::new(V2019)
        .build_batch_insert(&batch_insert("t", &["a"]), None)
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let ragged = batch_insert("t", &["a", "b"]).row(vec![Value::Int(1)]);
    assert!(QueryBuilder::new(V2019).build_batch_insert(&ragged, None).is_err());
}

#[test]
fn update_and_delete() {
    let qb = QueryBuilder::new(V2019);
    let stmt = qb
        .build_update(
            &update("users")
                .set("name", "b")
                .set_expr("updated_at", "GETDATE()")
                .and_where(Condition::eq("id", 1)),
            None,
        )
        .unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE [users] SET [name]=:qp0, [updated_at]=GETDATE() WHERE [id] = :qp1"
    );
    assert!(qb.build_update(&update("users"), None).unwrap_err().is_invalid_argument());

    assert_eq!(qb.build_delete(&delete("users")).unwrap().sql, "DELETE FROM [users]");
}

#[test]
fn upsert_matches_on_every_covered_constraint() {
    let insert = insert("users").set("id", 1).set("email", "a@b.c").set("name", "a");
    let stmt = QueryBuilder::new(V2019)
        .build_upsert(&insert, &UpsertUpdate::All, Some(&users_table()), &users_constraints())
        .unwrap();
    assert_eq!(
        stmt.sql,
        "MERGE [users] WITH (HOLDLOCK) USING (VALUES (:qp0, :qp1, :qp2)) AS [EXCLUDED] ([id], [email], [name]) \
         ON (([users].[id]=[EXCLUDED].[id]) OR ([users].[email]=[EXCLUDED].[email])) \
         WHEN MATCHED THEN UPDATE SET [name]=[EXCLUDED].[name] \
         WHEN NOT MATCHED THEN INSERT ([id], [email], [name]) VALUES ([EXCLUDED].[id], [EXCLUDED].[email], [EXCLUDED].[name]);"
    );
    assert_eq!(stmt.params.len(), 3);
}

#[test]
fn upsert_without_update_branch() {
    let insert = insert("users").set("id", 1).set("name", "a");
    let stmt = QueryBuilder::new(V2019)
        .build_upsert(&insert, &UpsertUpdate::None, None, &users_constraints())
        .unwrap();
    assert_eq!(
        stmt.sql,
        "MERGE [users] WITH (HOLDLOCK) USING (VALUES (:qp0, :qp1)) AS [EXCLUDED] ([id], [name]) \
         ON ([users].[id]=[EXCLUDED].[id]) \
         WHEN NOT MATCHED THEN INSERT ([id], [name]) VALUES ([EXCLUDED].[id], [EXCLUDED].[name]);"
    );

    let explicit = UpsertUpdate::Columns(vec![("name".into(), Operand::expr("[users].[name] + '!'"))]);
    let stmt = QueryBuilder::new(V2019)
        .build_upsert(&insert, &explicit, None, &users_constraints())
        .unwrap();
    assert!(stmt.sql.contains("WHEN MATCHED THEN UPDATE SET [name]=[users].[name] + '!'"));
}

#[test]
fn upsert_without_covering_constraint_is_a_plain_insert() {
    let qb = QueryBuilder::new(V2019);
    let insert = insert("users").set("name", "a");
    let upsert = qb
        .build_upsert(&insert, &UpsertUpdate::All, None, &users_constraints())
        .unwrap();
    assert_eq!(upsert, qb.build_insert(&insert, None).unwrap());

    let none = qb
        .build_upsert(&insert, &UpsertUpdate::All, None, &TableConstraints::default())
        .unwrap();
    assert_eq!(none.sql, "INSERT INTO [users] ([name]) VALUES (:qp0)");
}

#[test]
fn insert_returning_defaults_to_primary_key() {
    let stmt = QueryBuilder::new(V2019)
        .build_insert_returning(&insert("users").set("email", "a@b.c"), Some(&users_table()), &[])
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SET NOCOUNT ON;DECLARE @temporary_inserted TABLE ([id] int NOT NULL);\
         INSERT INTO [users] ([email]) OUTPUT INSERTED.[id] INTO @temporary_inserted VALUES (:qp0);\
         SELECT * FROM @temporary_inserted;"
    );

    let stmt = QueryBuilder::new(V2019)
        .build_insert_returning(&insert("users").set("email", "a@b.c"), Some(&users_table()), &["id", "name"])
        .unwrap();
    assert!(stmt.sql.starts_with(
        "SET NOCOUNT ON;DECLARE @temporary_inserted TABLE ([id] int NOT NULL, [name] nvarchar(50) NULL);"
    ));
    assert!(stmt.sql.contains("OUTPUT INSERTED.[id],INSERTED.[name] INTO @temporary_inserted"));
}

#[test]
fn insert_returning_requires_metadata() {
    let qb = QueryBuilder::new(V2019);
    let err = qb.build_insert_returning(&insert("users"), None, &[]).unwrap_err();
    assert!(err.is_invalid_argument());

    let err = qb
        .build_insert_returning(&insert("users"), Some(&users_table()), &["missing"])
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn upsert_returning_injects_noop_update() {
    let insert = insert("users").set("id", 1).set("name", "a");
    let stmt = QueryBuilder::new(V2019)
        .build_upsert_returning(&insert, &UpsertUpdate::None, Some(&users_table()), &users_constraints(), &[])
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SET NOCOUNT ON;DECLARE @temporary_inserted TABLE ([id] int NOT NULL);DECLARE @temp int;\
         MERGE [users] WITH (HOLDLOCK) USING (VALUES (:qp0, :qp1)) AS [EXCLUDED] ([id], [name]) \
         ON ([users].[id]=[EXCLUDED].[id]) WHEN MATCHED THEN UPDATE SET @temp=1 \
         WHEN NOT MATCHED THEN INSERT ([id], [name]) VALUES ([EXCLUDED].[id], [EXCLUDED].[name]) \
         OUTPUT INSERTED.[id] INTO @temporary_inserted;SELECT * FROM @temporary_inserted;"
    );
}

// ==================== DDL ====================

#[test]
fn table_and_column_renames() {
    let qb = QueryBuilder::default();
    assert_eq!(qb.rename_table("users", "people").sql, "sp_rename [users], [people]");
    assert_eq!(
        qb.rename_column("dbo.users", "name", "full_name").sql,
        "sp_rename '[dbo].[users].[name]', [full_name], 'COLUMN'"
    );
    assert_eq!(
        qb.rename_column("users", "o'name", "name").sql,
        "sp_rename '[users].[o''name]', [name], 'COLUMN'"
    );
    assert_eq!(
        qb.rename_table("o'users", "users").sql,
        "sp_rename [o'users], [users]"
    );
}

#[test]
fn create_table_and_constraints() {
    let qb = QueryBuilder::default();
    let stmt = qb.create_table(
        "users",
        &[
            ("id", ColumnType::primary_key()),
            ("name", ColumnType::string().not_null()),
        ],
        None,
    );
    assert_eq!(
        stmt.sql,
        "CREATE TABLE [users] (\n\t[id] int IDENTITY PRIMARY KEY,\n\t[name] nvarchar(255) NOT NULL\n)"
    );

    assert_eq!(
        qb.add_foreign_key(
            "FK_orders_user",
            "orders",
            &["user_id"],
            "users",
            &["id"],
            Some(ReferentialAction::Cascade),
            ReferentialAction::parse("NO_ACTION"),
        )
        .sql,
        "ALTER TABLE [orders] ADD CONSTRAINT [FK_orders_user] FOREIGN KEY ([user_id]) REFERENCES [users] ([id]) ON DELETE CASCADE ON UPDATE NO ACTION"
    );
    assert_eq!(
        qb.create_index("IX_email", "users", &["email"], true).sql,
        "CREATE UNIQUE INDEX [IX_email] ON [users] ([email])"
    );
    assert_eq!(qb.drop_index("IX_email", "users").sql, "DROP INDEX [IX_email] ON [users]");
}

#[test]
fn default_values() {
    let qb = QueryBuilder::default();
    assert_eq!(
        qb.add_default_value("DF_users_active", "users", "active", &DefaultValue::Literal(Value::Bool(true)))
            .sql,
        "ALTER TABLE [users] ADD CONSTRAINT [DF_users_active] DEFAULT 1 FOR [active]"
    );
    assert_eq!(
        qb.add_default_value(
            "DF_users_created",
            "users",
            "created_at",
            &DefaultValue::Expression("GETDATE()".into())
        )
        .sql,
        "ALTER TABLE [users] ADD CONSTRAINT [DF_users_created] DEFAULT GETDATE() FOR [created_at]"
    );
    assert_eq!(
        qb.drop_default_value("DF_users_active", "users").sql,
        "ALTER TABLE [users] DROP CONSTRAINT [DF_users_active]"
    );
}

#[test]
fn alter_column_readds_constraints() {
    let ty = ColumnType::string().size(100).not_null().default_value("x").unique();
    let sql = QueryBuilder::default().alter_column("users", "name", &ty).sql;
    assert!(sql.starts_with("DECLARE @tableName VARCHAR(MAX) = '[users]'"), "{sql}");
    assert!(sql.contains("WHERE so.[type]='D')"));
    assert!(sql.contains("ALTER TABLE [users] ALTER COLUMN [name] nvarchar(100) NOT NULL"));
    assert!(sql.contains("ALTER TABLE [users] ADD CONSTRAINT [DF_users_name] DEFAULT 'x' FOR [name]"));
    assert!(sql.ends_with("ALTER TABLE [users] ADD CONSTRAINT [UQ_users_name] UNIQUE ([name])"));
}

#[test]
fn drop_column_clears_constraints_first() {
    let sql = QueryBuilder::default().drop_column("users", "name").sql;
    assert!(sql.contains("DECLARE @columnName VARCHAR(MAX) = 'name'"));
    assert!(!sql.contains("so.[type]"));
    assert!(sql.ends_with("END\nALTER TABLE [users] DROP COLUMN [name]"));
}

#[test]
fn comments_use_extended_properties() {
    let qb = QueryBuilder::default();
    let table = users_table();

    let stmt = qb.add_comment_on_table("dbo.users", Some(&table), "People's table").unwrap();
    assert_eq!(
        stmt.sql,
        "IF NOT EXISTS (SELECT 1 FROM fn_listextendedproperty(N'MS_description', 'SCHEMA', N'dbo', 'TABLE', N'users', DEFAULT, DEFAULT)) \
         EXEC sys.sp_addextendedproperty @name = N'MS_description', @value = N'People''s table', \
         @level0type = N'SCHEMA', @level0name = N'dbo', @level1type = N'TABLE', @level1name = N'users'; \
         ELSE EXEC sys.sp_updateextendedproperty @name = N'MS_description', @value = N'People''s table', \
         @level0type = N'SCHEMA', @level0name = N'dbo', @level1type = N'TABLE', @level1name = N'users';"
    );

    let stmt = qb.drop_comment_from_column("dbo.users", Some(&table), "name").unwrap();
    assert_eq!(
        stmt.sql,
        "IF EXISTS (SELECT 1 FROM fn_listextendedproperty(N'MS_description', 'SCHEMA', N'dbo', 'TABLE', N'users', 'COLUMN', N'name')) \
         EXEC sys.sp_dropextendedproperty @name = N'MS_description', \
         @level0type = N'SCHEMA', @level0name = N'dbo', @level1type = N'TABLE', @level1name = N'users', \
         @level2type = N'COLUMN', @level2name = N'name';"
    );

    let err = qb.add_comment_on_column("dbo.users", Some(&table), "missing", "x").unwrap_err();
    assert!(err.is_invalid_argument());
    let err = qb.drop_comment_from_table("ghosts", None).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn check_integrity_per_table() {
    let qb = QueryBuilder::default();
    let tables = vec!["orders".to_string(), "people".to_string()];
    assert_eq!(
        qb.check_integrity(true, Some("sales"), &tables).sql,
        "ALTER TABLE [sales].[orders] CHECK CONSTRAINT ALL; ALTER TABLE [sales].[people] CHECK CONSTRAINT ALL; "
    );
    assert_eq!(
        qb.clone()
            .with_default_schema("app")
            .check_integrity(false, None, &tables[..1])
            .sql,
        "ALTER TABLE [app].[orders] NOCHECK CONSTRAINT ALL; "
    );
}

#[test]
fn reset_sequence_reseeds_identity() {
    let qb = QueryBuilder::default();
    let table = users_table();
    assert_eq!(
        qb.reset_sequence("dbo.users", Some(&table), Some(10)).unwrap().sql,
        "DBCC CHECKIDENT ('[dbo].[users]', RESEED, 10)"
    );
    assert_eq!(
        qb.reset_sequence("dbo.users", Some(&table), None).unwrap().sql,
        "DBCC CHECKIDENT ('[dbo].[users]', RESEED, 0) WITH NO_INFOMSGS;DBCC CHECKIDENT ('[dbo].[users]', RESEED)"
    );

    let plain = TableDescriptor::new(QualifiedName::parse("tags"))
        .with_column(ColumnDescriptor::new("name", "nvarchar(20)").not_null())
        .with_primary_key(&["name"]);
    let err = qb.reset_sequence("tags", Some(&plain), None).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn column_type_translation() {
    let qb = QueryBuilder::default();
    assert_eq!(qb.column_type("string(64) NOT NULL"), "nvarchar(64) NOT NULL");
    assert_eq!(qb.column_type("bigpk"), "bigint IDENTITY PRIMARY KEY");
    assert_eq!(qb.quote_table_name("sales.[order]]s]"), "[sales].[order]]s]");
    assert_eq!(qb.quote_column_name("t.*"), "[t].*");
}
