use crate::{MockDatabase, Response, silent_logs};
use bindery::{
    AnsiDialect, Arg, Error, OracleDialect, Result, SqlService, TableHolder, TemplateBuilder,
    Value,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

pub async fn function_evaluated_once() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let calls = Arc::new(AtomicUsize::new(0));
    let service = SqlService::new(AnsiDialect).with_functions({
        let calls = calls.clone();
        move |name: &str, args: &[String], _roots: &[Arg]| -> Result<Arg> {
            calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "batch_id" => Ok(Arg::from(1000 + args.len() as i32)),
                _ => Err(Error::msg(format!("Unknown function {}", name))),
            }
        }
    });
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("INSERT INTO item (id, batch) VALUES (")
        .input("id")
        .text(", ")
        .function("batch_id", &["items"])
        .text(")")
        .build();
    let table = TableHolder::new([("id", Value::Int32(None))])
        .with_rows([
            [Value::from(1)],
            [Value::from(2)],
            [Value::from(3)],
        ])
        .expect("Failed to fill the table");
    let inserted = service
        .insert(&mut transaction, &statement, &[table.into()])
        .await
        .expect("Failed to insert the items");
    assert_eq!(inserted, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let executions = database.executions();
    assert_eq!(executions.len(), 3);
    assert!(executions.iter().all(|v| v.value(2) == Value::from(1001)));

    // Unknown functions fail before anything is prepared
    let statement = TemplateBuilder::new()
        .text("SELECT ")
        .function("missing", &[])
        .build();
    database.clear();
    silent_logs! {
        let error = service
            .select(&mut transaction, &statement, &[])
            .await
            .expect_err("The function does not exist");
        assert!(format!("{:#}", error).contains("Unknown function missing"));
    }
    assert!(database.prepared().is_empty());
}

pub async fn dialect_literals() {
    let database = MockDatabase::new(|_| Ok(Response::default()));
    let service = SqlService::new(OracleDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT ")
        .dialect_literal("nvl")
        .text("(name, '-') FROM person WHERE created < ")
        .dialect_literal("sysdate")
        .build();
    service
        .select(&mut transaction, &statement, &[])
        .await
        .expect("Failed to select with dialect literals");
    assert_eq!(
        database.executions()[0].sql,
        "SELECT NVL(name, '-') FROM person WHERE created < SYSDATE"
    );
}
