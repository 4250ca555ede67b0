use crate::{Event, ExecutionKind, MockDatabase, Response, silent_logs};
use bindery::{
    AnsiDialect, Arg, ArgMap, BindError, Holder, PostgresDialect, SqlService, SqlType,
    TableHolder, TemplateBuilder, Value,
};

pub async fn stored_procedure_outputs() {
    let database = MockDatabase::new(|execution| {
        assert_eq!(execution.kind, ExecutionKind::Call);
        Ok(Response::default()
            .with_output(2, Value::Int64(Some(42)))
            .with_output(3, Value::Varchar(Some("person".into()))))
    });
    let service = SqlService::new(PostgresDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("CALL count_rows(")
        .input("table")
        .text(", ")
        .output("count")
        .text(", ")
        .output("label")
        .text(")")
        .build();
    let count = Holder::empty::<i64>();
    let outputs = ArgMap::new()
        .with("count", count.clone())
        .with("label", Value::Varchar(None));
    let roots = [
        Arg::from(ArgMap::new().with("table", "person")),
        Arg::from(outputs.clone()),
    ];
    let status = service
        .call_stored_procedure(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to call count_rows");
    assert!(status);
    assert_eq!(count.get_as::<i64>().unwrap(), Some(42));
    assert_eq!(outputs.value("label"), Value::Varchar(Some("person".into())));
    let registered = database
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::RegisterOutput {
                index, sql_type, ..
            } => Some((index, sql_type)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(registered, [(2, SqlType::BigInt), (3, SqlType::Varchar)]);
    assert_eq!(
        database.executions()[0].sql,
        "CALL count_rows(?, ?, ?)"
    );
    assert!(matches!(
        database.events().first(),
        Some(Event::PrepareCall { .. })
    ));
}

pub async fn stored_procedure_over_production() {
    let database = MockDatabase::new(|execution| {
        Ok(Response::default().with_output(2, execution.value(1)))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("CALL touch(")
        .batch_input("ids")
        .text(", ")
        .output("last")
        .text(")")
        .build();
    let last = Holder::empty::<i32>();

    // One batch, one value
    let roots = [Arg::from(
        ArgMap::new()
            .with("ids", Arg::array([5]))
            .with("last", last.clone()),
    )];
    service
        .call_stored_procedure(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to call touch");
    assert_eq!(last.get_as::<i32>().unwrap(), Some(5));

    // Two batches cannot write a single value holder
    let roots = [Arg::from(
        ArgMap::new()
            .with("ids", Arg::array([6, 7]))
            .with("last", last.clone()),
    )];
    silent_logs! {
        let error = service
            .call_stored_procedure(&mut transaction, &statement, &roots)
            .await
            .expect_err("The second value should be rejected");
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::OverProduction { token }) if token == ":last"
        ));
    }
    assert_eq!(last.get_as::<i32>().unwrap(), Some(5));

    // A list collects every batch
    let all = Holder::list(Vec::<i32>::new());
    let roots = [Arg::from(
        ArgMap::new()
            .with("ids", Arg::array([6, 7]))
            .with("last", all.clone()),
    )];
    service
        .call_stored_procedure(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to call touch for each id");
    assert_eq!(all.values_as::<i32>().unwrap(), [6, 7]);
}

pub async fn stored_procedure_without_batches() {
    let database = MockDatabase::new(|_| {
        Ok(Response::default()
            .with_output(2, Value::Int32(Some(1)))
            .with_status(false))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("CALL archive(")
        .input("id")
        .text(", ")
        .output("archived")
        .text(")")
        .build();
    let archived = Holder::of(Some(9));

    // No row in the table, the output keeps its value
    let table = TableHolder::new([("id", Value::Int32(None))]);
    let roots = [
        Arg::from(table.clone()),
        Arg::from(ArgMap::new().with("archived", archived.clone())),
    ];
    let status = service
        .call_stored_procedure(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to call archive without rows");
    assert!(status);
    assert!(database.executions().is_empty());
    assert_eq!(archived.get_as::<i32>().unwrap(), Some(9));

    // The status of the driver is returned
    let table = table.with_row([Value::from(3)]).expect("Failed to add the row");
    let roots = [
        Arg::from(table),
        Arg::from(ArgMap::new().with("archived", archived.clone())),
    ];
    let status = service
        .call_stored_procedure(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to call archive");
    assert!(!status);
    assert_eq!(archived.get_as::<i32>().unwrap(), Some(1));
}
