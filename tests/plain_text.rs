#[cfg(test)]
mod tests {
    use bindery::{
        AnsiDialect, Arg, ArgMap, Config, NamedValue, OracleDialect, PostgresDialect, SqlDialect,
        SqlService, SqliteDialect, StatementProcessor, TableHolder, TemplateBuilder, TriState,
        Value,
    };
    use bindery_tests::{init_logs, silent_logs};
    use indoc::indoc;
    use time::macros::date;

    fn plain<D: SqlDialect>(dialect: D, builder: TemplateBuilder, roots: &[Arg]) -> String {
        SqlService::new(dialect)
            .create_plain_text(&builder.build(), roots)
            .expect("Failed to render the statement")
    }

    #[test]
    fn tri_state() {
        let statement = || {
            TemplateBuilder::new()
                .text("SELECT id FROM task WHERE ")
                .input_cmp("done", "=", "done")
        };
        let roots = |v: TriState| [Arg::from(ArgMap::new().with("done", v))];
        assert_eq!(
            plain(AnsiDialect, statement(), &roots(TriState::True)),
            "SELECT id FROM task WHERE done = 1"
        );
        assert_eq!(
            plain(AnsiDialect, statement(), &roots(TriState::False)),
            "SELECT id FROM task WHERE done = 0"
        );
        assert_eq!(
            plain(AnsiDialect, statement(), &roots(TriState::Undefined)),
            "SELECT id FROM task WHERE ((done IN (0,1)))"
        );
    }

    #[test]
    fn plain_markers() {
        let roots = [Arg::from(
            ArgMap::new()
                .with("limit", 10)
                .with("column", "created")
                .with("name", "it's"),
        )];
        let builder = TemplateBuilder::new()
            .text("SELECT * FROM person WHERE name = ")
            .plain_value("name")
            .text(" ORDER BY ")
            .plain_sql("column")
            .text(" FETCH FIRST ")
            .input("limit")
            .text(" ROWS ONLY");
        assert_eq!(
            plain(AnsiDialect, builder, &roots),
            "SELECT * FROM person WHERE name = 'it''s' ORDER BY created FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn typed_nulls() {
        let roots = [
            Arg::from(NamedValue::new("born", Value::Null).with_null_type(Value::Date(None))),
            Arg::pair("since", date!(2024 - 02 - 29)),
        ];
        let builder = || {
            TemplateBuilder::new()
                .text("UPDATE person SET born = ")
                .input("born")
                .text(" WHERE since >= ")
                .input("since")
        };
        assert_eq!(
            plain(AnsiDialect, builder(), &roots),
            "UPDATE person SET born = null WHERE since >= DATE '2024-02-29'"
        );
        assert_eq!(
            plain(OracleDialect, builder(), &roots),
            "UPDATE person SET born = null WHERE since >= to_date('29.02.2024 00:00:00','dd.mm.yyyy hh24:mi:ss')"
        );
        assert_eq!(
            plain(SqliteDialect, builder(), &roots),
            "UPDATE person SET born = null WHERE since >= '2024-02-29'"
        );
    }

    #[test]
    fn lists_per_dialect() {
        let roots = [Arg::pair("ids", Arg::collection([4, 8]))];
        let builder = || {
            TemplateBuilder::new()
                .text("DELETE FROM t WHERE ")
                .input_cmp("id", "NOT IN", "ids")
        };
        assert_eq!(
            plain(AnsiDialect, builder(), &roots),
            "DELETE FROM t WHERE ((id NOT IN (4,8)))"
        );
        // Plain text never binds, arrays included
        assert_eq!(
            plain(PostgresDialect, builder(), &roots),
            "DELETE FROM t WHERE ((id NOT IN (4,8)))"
        );
    }

    #[test]
    fn first_row_of_a_table() {
        let table = TableHolder::new([("id", Value::Int64(None))])
            .with_rows([
                [Value::from(5i64)],
                [Value::from(6i64)],
            ])
            .expect("Failed to fill the table");
        let builder = TemplateBuilder::new()
            .text("DELETE FROM t WHERE id = ")
            .input("id");
        assert_eq!(
            plain(AnsiDialect, builder, &[table.into()]),
            "DELETE FROM t WHERE id = 5"
        );
    }

    #[test]
    fn large_values_are_not_dumped() {
        init_logs();
        let statement = TemplateBuilder::new()
            .text("INSERT INTO doc (body, title) VALUES (")
            .input("body")
            .text(", ")
            .input("title")
            .text(")")
            .build();
        let roots = [Arg::from(
            ArgMap::new()
                .with("body", "x".repeat(5000))
                .with("title", "Draft"),
        )];
        let config = Config::default();
        let mut processor =
            StatementProcessor::new(&statement, &roots, &AnsiDialect, &config, None)
                .expect("Failed to bind the statement");
        silent_logs! {
            processor.simulate().expect("Failed to simulate");
        }
        assert_eq!(
            processor.current_sql(),
            Some("INSERT INTO doc (body, title) VALUES (?, ?)")
        );
        assert_eq!(
            processor.sql_dump(true, true),
            indoc! {"
                SQL with binds:
                INSERT INTO doc (body, title) VALUES (:body, :title)
                IN  :body => ? [CLOB]
                IN  :title => ? [VARCHAR Draft]
                SQL PLAIN Log:
                INSERT INTO doc (body, title) VALUES (__CLOB__, 'Draft')"}
        );
        assert_eq!(
            processor.sql_dump(false, true),
            "SQL PLAIN Log:\nINSERT INTO doc (body, title) VALUES (__CLOB__, 'Draft')"
        );
    }
}
