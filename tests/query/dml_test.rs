//! INSERT, UPDATE and DELETE rendering.

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pressdb::prelude::*;
    use pressdb::sql::DmlError;
    use sqlparser::dialect::{MySqlDialect, SQLiteDialect};
    use sqlparser::parser::Parser;
    use std::sync::Arc;

    fn comments() -> Arc<TableInfo> {
        Arc::new(TableInfo::from_rows(
            "comments",
            &[
                ColumnRow::new("comment_ID", "bigint(20) unsigned")
                    .primary()
                    .auto_increment(),
                ColumnRow::new("comment_post_ID", "bigint(20) unsigned"),
                ColumnRow::new("comment_author", "tinytext"),
                ColumnRow::new("comment_content", "text"),
                ColumnRow::new("comment_karma", "int(11)").with_default("0"),
                ColumnRow::new("comment_parent", "bigint(20)").nullable(),
            ],
        ))
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_insert_orders_columns_by_position() {
        let stmt = Insert::new(
            comments(),
            row(&[
                ("comment_karma", Value::from("7 points")),
                ("comment_author", Value::from("Jo")),
                ("comment_post_ID", Value::from(12)),
            ]),
        )
        .render()
        .unwrap();

        assert_snapshot!(
            stmt.to_sql(),
            @"INSERT INTO comments (comment_post_ID, comment_author, comment_karma) VALUES (12, 'Jo', 7)"
        );
        assert!(Parser::parse_sql(&MySqlDialect {}, &stmt.to_sql()).is_ok());
    }

    #[test]
    fn test_insert_template_and_args() {
        let stmt = Insert::new(
            comments(),
            row(&[
                ("comment_ID", Value::Null),
                ("comment_content", Value::from("50% off")),
                ("comment_parent", Value::Null),
            ]),
        )
        .dialect(Dialect::Sqlite)
        .render()
        .unwrap();

        assert_snapshot!(
            stmt.template(),
            @"INSERT INTO comments (comment_content, comment_parent) VALUES (%s, NULL)"
        );
        assert_eq!(stmt.args(), vec![SqlValue::Text("50% off".into())]);
        assert!(Parser::parse_sql(&SQLiteDialect {}, &stmt.to_sql()).is_ok());
    }

    #[test]
    fn test_update_by_primary_key() {
        let stmt = Update::new(
            comments(),
            row(&[("comment_content", Value::from("it's fine")), ("bogus", Value::from(1))]),
        )
        .filter("comment_ID", "42")
        .dialect(Dialect::Sqlite)
        .render()
        .unwrap();

        assert_snapshot!(
            stmt.to_sql(),
            @"UPDATE comments SET comment_content = 'it''s fine' WHERE comment_ID = 42"
        );
        assert!(Parser::parse_sql(&SQLiteDialect {}, &stmt.to_sql()).is_ok());
    }

    #[test]
    fn test_update_nullable_column_to_null() {
        let stmt = Update::new(comments(), row(&[("comment_parent", Value::Null)]))
            .filter_op("comment_karma", "<", 0)
            .render()
            .unwrap();
        assert_snapshot!(
            stmt.to_sql(),
            @"UPDATE comments SET comment_parent = NULL WHERE comment_karma < 0"
        );
    }

    #[test]
    fn test_update_with_only_dropped_filters_is_refused() {
        let update = Update::new(comments(), row(&[("comment_karma", Value::from(1))]))
            .filter("nope", 1);
        assert_eq!(update.dropped().len(), 1);
        assert!(matches!(
            update.render(),
            Err(DmlError::Unfiltered { verb: "update", .. })
        ));
    }

    #[test]
    fn test_update_without_known_columns() {
        let err = Update::new(comments(), row(&[("nope", Value::from(1))]))
            .filter("comment_ID", 1)
            .render()
            .unwrap_err();
        assert_eq!(err.to_string(), "no known columns to write in table 'comments'");
    }

    #[test]
    fn test_delete_with_between() {
        let stmt = Delete::new(comments())
            .filter_op("comment_ID", "between", vec![10, 20])
            .filter("comment_parent", Value::Null)
            .render()
            .unwrap();

        assert_snapshot!(
            stmt.to_sql(),
            @"DELETE FROM comments WHERE comment_ID BETWEEN 10 AND 20 AND comment_parent IS NULL"
        );
        assert_snapshot!(
            stmt.template(),
            @"DELETE FROM comments WHERE comment_ID BETWEEN %d AND %d AND comment_parent IS NULL"
        );
        assert_eq!(stmt.args(), vec![SqlValue::Int(10), SqlValue::Int(20)]);
    }

    #[test]
    fn test_delete_empty_in_list_is_refused() {
        let delete = Delete::new(comments()).filter("comment_ID", Vec::<i64>::new());
        assert!(matches!(
            delete.render(),
            Err(DmlError::Unfiltered { verb: "delete", .. })
        ));
    }
}
