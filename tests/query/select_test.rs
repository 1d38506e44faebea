//! SELECT rendering through the schema cache.

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pressdb::prelude::*;
    use pressdb::sql::{ColumnPolicy, QueryError};
    use sqlparser::dialect::{MySqlDialect, SQLiteDialect};
    use sqlparser::parser::Parser;
    use std::sync::Arc;

    fn posts_schema() -> SchemaCache {
        let source = StaticSchema::new().with_table(
            "posts",
            vec![
                ColumnRow::new("ID", "bigint(20) unsigned")
                    .primary()
                    .auto_increment(),
                ColumnRow::new("status", "varchar(20)").with_default("publish"),
                ColumnRow::new("post_type", "varchar(20)"),
                ColumnRow::new("post_title", "text"),
                ColumnRow::new("menu_order", "int(11)"),
                ColumnRow::new("rating", "decimal(3,1)"),
                ColumnRow::new("deleted_at", "datetime").nullable(),
            ],
        );
        SchemaCache::new(Arc::new(source), Arc::new(MemoryCache::new()))
    }

    fn assert_valid(sql: &str, dialect: Dialect) {
        let result = match dialect {
            Dialect::MySql => Parser::parse_sql(&MySqlDialect {}, sql),
            Dialect::Sqlite => Parser::parse_sql(&SQLiteDialect {}, sql),
        };
        assert!(result.is_ok(), "invalid SQL for {dialect}: {sql}: {result:?}");
    }

    #[test]
    fn empty_predicate_list() {
        let sql = posts_schema().query("posts").to_sql();
        assert_eq!(sql, "SELECT * FROM posts");
    }

    #[test]
    fn single_equality() {
        let sql = posts_schema()
            .query("posts")
            .filter("status", "publish")
            .to_sql();
        assert_eq!(sql, "SELECT * FROM posts WHERE status = 'publish'");
    }

    #[test]
    fn equality_and_in_list() {
        let sql = posts_schema()
            .query("posts")
            .filter("status", "publish")
            .filter_op("post_type", "IN", vec!["post", "page"])
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM posts WHERE status = 'publish' AND post_type IN('post','page')"
        );
        assert_valid(&sql, Dialect::MySql);
    }

    #[test]
    fn null_value_renders_is_null() {
        let sql = posts_schema()
            .query("posts")
            .filter("deleted_at", Value::Null)
            .to_sql();
        assert_eq!(sql, "SELECT * FROM posts WHERE deleted_at IS NULL");
    }

    #[test]
    fn unknown_column_contributes_no_clause() {
        let query = posts_schema()
            .query("posts")
            .filter("status", "draft")
            .filter("no_such_column", "x");
        assert_eq!(query.to_sql(), "SELECT * FROM posts WHERE status = 'draft'");
        assert_eq!(query.dropped().len(), 1);
    }

    #[test]
    fn scalar_values_default_to_equality() {
        let schema = posts_schema();
        let info = schema.get_table_info("posts");
        let values = [Value::from("abc"), Value::from(42), Value::from(1.5), Value::from(true)];

        for column in info.columns() {
            for value in &values {
                let sql = schema
                    .query("posts")
                    .filter(&column.name, value.clone())
                    .to_sql();
                let expected = format!("WHERE {} = ", column.name);
                assert!(sql.contains(&expected), "{sql}");
            }
        }
    }

    #[test]
    fn list_values_default_to_in() {
        let schema = posts_schema();
        let info = schema.get_table_info("posts");

        for column in info.columns() {
            let sql = schema
                .query("posts")
                .filter(&column.name, vec![Value::from(1), Value::from("2")])
                .to_sql();
            let expected = format!("WHERE {} IN(", column.name);
            assert!(sql.contains(&expected), "{sql}");
        }
    }

    #[test]
    fn numeric_in_list_is_bare_and_coerced() {
        let sql = posts_schema()
            .query("posts")
            .filter("ID", vec!["3", "5abc", "x"])
            .to_sql();
        assert_snapshot!(sql, @"SELECT * FROM posts WHERE ID IN(3,5,0)");
    }

    #[test]
    fn grouped_predicates() {
        let sql = posts_schema()
            .query("posts")
            .filter("post_type", "post")
            .filter_group(Relation::Or, |g| {
                g.filter("status", "publish").filter_group(Relation::And, |g| {
                    g.filter("status", "private").filter_op("menu_order", ">", 0)
                })
            })
            .to_sql();
        assert_snapshot!(
            sql,
            @"SELECT * FROM posts WHERE post_type = 'post' AND (status = 'publish' OR (status = 'private' AND menu_order > 0))"
        );
        assert_valid(&sql, Dialect::MySql);
    }

    #[test]
    fn full_statement_sqlite() {
        let sql = posts_schema()
            .query("posts")
            .dialect(Dialect::Sqlite)
            .select(["ID", "post_title"])
            .filter_op("post_title", "NOT LIKE", "%Bob's%")
            .filter_op("rating", "BETWEEN", vec![2.5, 4.0])
            .order_by("menu_order", SortDir::Desc)
            .limit(5)
            .offset(10)
            .to_sql();
        assert_snapshot!(
            sql,
            @"SELECT ID, post_title FROM posts WHERE post_title NOT LIKE '%Bob''s%' AND rating BETWEEN 2.5 AND 4.0 ORDER BY menu_order DESC LIMIT 5 OFFSET 10"
        );
        assert_valid(&sql, Dialect::Sqlite);
    }

    #[test]
    fn prepared_template() {
        let stmt = posts_schema()
            .query("posts")
            .filter("ID", "12")
            .filter_op("post_title", "LIKE", "100% cotton")
            .filter_op("post_type", "IN", vec!["a%b"])
            .render();

        assert_snapshot!(
            stmt.template(),
            @"SELECT * FROM posts WHERE ID = %d AND post_title LIKE %s AND post_type IN('a%%b')"
        );
        assert_eq!(
            stmt.args(),
            vec![SqlValue::Int(12), SqlValue::Text("100% cotton".into())]
        );
    }

    #[test]
    fn mysql_escaping_survives_injection_attempt() {
        let sql = posts_schema()
            .query("posts")
            .filter("status", "x\\' OR 1=1 -- ")
            .to_sql();
        assert_snapshot!(sql, @r"SELECT * FROM posts WHERE status = 'x\\\' OR 1=1 -- '");
        assert_valid(&sql, Dialect::MySql);
    }

    #[test]
    fn strict_policy_reports_drops() {
        let query = posts_schema()
            .query("posts")
            .column_policy(ColumnPolicy::Strict)
            .filter("status", "publish")
            .order_by("bogus", SortDir::Asc);

        let err = query.render_checked().unwrap_err();
        let QueryError::DroppedPredicates(dropped) = err;
        assert_eq!(dropped[0].column, "bogus");
    }

    #[test]
    fn unknown_table_renders_unfiltered() {
        let sql = posts_schema()
            .query("pages")
            .filter("status", "publish")
            .to_sql();
        assert_eq!(sql, "SELECT * FROM pages");
    }
}
