use crate::{Event, MockDatabase, Response, row};
use bindery::{
    ColumnInfo, Config, OracleDialect, PostgresDialect, SqlService, SqlType, TemplateBuilder,
    Value,
};

fn hundred_rows() -> Response {
    Response::rows(
        vec![ColumnInfo::new("name", SqlType::Varchar, 68)],
        (0..100).map(|v| row([Value::Varchar(Some(format!("person {}", v)))])),
    )
}

fn fetch_sizes(database: &MockDatabase) -> Vec<usize> {
    database
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::FetchSize { size, .. } => Some(size),
            _ => None,
        })
        .collect()
}

pub async fn dynamic_fetch_size() {
    let statement = TemplateBuilder::new().text("SELECT name FROM person").build();
    // 100 bytes per row (32 + 68), at most 20 rows
    let config = Config::default().with_max_fetch_memory(2000);

    let database = MockDatabase::new(|_| Ok(hundred_rows())).with_fetch_size(10);
    let service = SqlService::new(OracleDialect).with_config(config.clone());
    let mut transaction = service.begin(database.connect());
    let rows = service
        .select(&mut transaction, &statement, &[])
        .await
        .expect("Failed to select the persons");
    assert_eq!(rows.len(), 100);
    assert_eq!(fetch_sizes(&database), [15, 20]);

    // Limited by the memory budget from the start
    let database = MockDatabase::new(|_| Ok(hundred_rows())).with_fetch_size(10);
    let service = SqlService::new(OracleDialect)
        .with_config(config.clone().with_max_fetch_memory(500));
    let mut transaction = service.begin(database.connect());
    service
        .select(&mut transaction, &statement, &[])
        .await
        .expect("Failed to select the persons");
    assert!(fetch_sizes(&database).is_empty());

    // Not every dialect grows the fetch size
    let database = MockDatabase::new(|_| Ok(hundred_rows())).with_fetch_size(10);
    let service = SqlService::new(PostgresDialect).with_config(config);
    let mut transaction = service.begin(database.connect());
    let rows = service
        .select(&mut transaction, &statement, &[])
        .await
        .expect("Failed to select the persons");
    assert_eq!(rows.len(), 100);
    assert!(fetch_sizes(&database).is_empty());
}
