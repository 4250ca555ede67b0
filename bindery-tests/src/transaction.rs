use crate::{Event, MockDatabase, Response, row, silent_logs};
use bindery::{
    AnsiDialect, Arg, ArgMap, ColumnInfo, OracleDialect, PostgresDialect, SqliteDialect,
    SqlService, SqlType, TemplateBuilder, Value,
};

pub async fn transaction_releases_statements() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service = SqlService::new(AnsiDialect);
    let statement = TemplateBuilder::new()
        .text("UPDATE account SET balance = balance - 10 WHERE id = ")
        .input("id")
        .build();
    let roots = [Arg::from(ArgMap::new().with("id", 3))];

    let mut transaction = service.begin(database.connect());
    for _ in 0..2 {
        service
            .update(&mut transaction, &statement, &roots)
            .await
            .expect("Failed to update the account");
    }
    assert_eq!(transaction.cache().len(), 1);
    service
        .rollback(&mut transaction)
        .await
        .expect("Failed to rollback");
    assert!(transaction.cache().is_empty());
    assert!(database.open_statements().is_empty());
    assert_eq!(database.events().last(), Some(&Event::Rollback));

    // The connection outlives the transaction
    for _ in 0..2 {
        service
            .update(&mut transaction, &statement, &roots)
            .await
            .expect("Failed to update the account");
    }
    let connection = transaction.into_connection();
    assert!(database.open_statements().is_empty());
    let mut transaction = service.begin(connection);
    service
        .update(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to update the account");
    service
        .commit(&mut transaction)
        .await
        .expect("Failed to commit");
    assert_eq!(database.count(|e| matches!(e, Event::Commit)), 1);
    assert_eq!(database.count(|e| matches!(e, Event::Rollback)), 1);
}

pub async fn sequence_next_value() {
    let database = MockDatabase::new(|execution| {
        let value = match execution.sql.as_str() {
            "SELECT person_seq.NEXTVAL FROM DUAL" => Some(42),
            "SELECT nextval('person_seq')" => Some(43),
            _ => None,
        };
        Ok(Response::rows(
            vec![ColumnInfo::new("nextval", SqlType::BigInt, 20)],
            value
                .into_iter()
                .map(|v: i64| row([Value::Int64(Some(v))])),
        ))
    });

    let service = SqlService::new(OracleDialect);
    let mut transaction = service.begin(database.connect());
    let value = service
        .sequence_next_value(&mut transaction, "person_seq")
        .await
        .expect("Failed to read the next Oracle sequence value");
    assert_eq!(value, 42);

    let service = SqlService::new(PostgresDialect);
    let mut transaction = service.begin(database.connect());
    let value = service
        .sequence_next_value(&mut transaction, "person_seq")
        .await
        .expect("Failed to read the next Postgres sequence value");
    assert_eq!(value, 43);

    silent_logs! {
        // No row
        let service = SqlService::new(AnsiDialect);
        let mut transaction = service.begin(database.connect());
        let error = service
            .sequence_next_value(&mut transaction, "person_seq")
            .await
            .expect_err("The sequence returns nothing");
        assert!(format!("{:#}", error).contains("returned no value"));

        // Not supported
        let service = SqlService::new(SqliteDialect);
        let mut transaction = service.begin(database.connect());
        service
            .sequence_next_value(&mut transaction, "person_seq")
            .await
            .expect_err("SQLite has no sequences");
    }
}
