use crate::{Event, MockDatabase, Response, row, silent_logs};
use bindery::{
    AnsiDialect, Arg, ArgMap, ColumnInfo, Error, Result, Row, SelectStreamHandler, SqlService,
    SqlType, TemplateBuilder, Value,
};

struct Collector {
    database: MockDatabase,
    rows: Vec<(usize, String)>,
    finished: Option<usize>,
    open_at_finish: Vec<usize>,
    fail_at: Option<usize>,
}

impl Collector {
    fn new(database: &MockDatabase) -> Self {
        Self {
            database: database.clone(),
            rows: Vec::new(),
            finished: None,
            open_at_finish: Vec::new(),
            fail_at: None,
        }
    }
}

impl SelectStreamHandler for Collector {
    fn handle_row(&mut self, index: usize, columns: &[ColumnInfo], row: Row) -> Result<()> {
        assert_eq!(columns[0].name, "name");
        if self.fail_at == Some(index) {
            return Err(Error::msg(format!("Row {} rejected", index)));
        }
        let Value::Varchar(Some(name)) = &row[0] else {
            return Err(Error::msg("Expected a name"));
        };
        self.rows.push((index, name.clone()));
        Ok(())
    }

    fn finished(&mut self, row_count: usize) -> Result<()> {
        self.finished = Some(row_count);
        self.open_at_finish = self.database.open_statements();
        Ok(())
    }
}

pub async fn streaming_keeps_the_statement_open() {
    let database = MockDatabase::new(|execution| {
        let count = execution.value(1).as_i64().unwrap_or_default();
        Ok(Response::rows(
            vec![ColumnInfo::new("name", SqlType::Varchar, 40)],
            (0..count).map(|v| row([Value::Varchar(Some(format!("person {}", v)))])),
        ))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM person LIMIT ")
        .input("count")
        .build();
    let roots = [Arg::from(ArgMap::new().with("count", 3))];

    let mut collector = Collector::new(&database);
    service
        .select_streaming(&mut transaction, &statement, &roots, &mut collector)
        .await
        .expect("Failed to stream the persons");
    assert_eq!(
        collector.rows,
        [
            (0, "person 0".to_string()),
            (1, "person 1".to_string()),
            (2, "person 2".to_string()),
        ]
    );
    assert_eq!(collector.finished, Some(3));
    assert_eq!(collector.open_at_finish.len(), 1);
    let id = collector.open_at_finish[0];
    assert_eq!(database.closed(id), 1);
    assert_eq!(
        database.count(|e| matches!(e, Event::CloseCursor { id: v } if *v == id)),
        1
    );

    // Row limit
    let mut collector = Collector::new(&database);
    service
        .select_streaming_limited(&mut transaction, &statement, &roots, &mut collector, 2)
        .await
        .expect("Failed to stream two persons");
    assert_eq!(collector.rows.len(), 2);
    assert_eq!(collector.finished, Some(2));

    // Handler failure, the statement is released anyway
    let mut collector = Collector::new(&database);
    collector.fail_at = Some(1);
    silent_logs! {
        service
            .select_streaming(&mut transaction, &statement, &roots, &mut collector)
            .await
            .expect_err("The handler rejects the second row");
    }
    assert_eq!(collector.rows.len(), 1);
    assert_eq!(collector.finished, None);
    service
        .rollback(&mut transaction)
        .await
        .expect("Failed to rollback");
    assert!(database.open_statements().is_empty());
}
