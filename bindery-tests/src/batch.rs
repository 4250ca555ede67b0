use crate::{ExecutionKind, MockDatabase, Response};
use bindery::{
    AnsiDialect, Arg, ArgMap, Bean, BeanArray, SqlService, TableHolder, TemplateBuilder, Value,
};

fn update_statement() -> bindery::ParsedStatement {
    TemplateBuilder::new()
        .text("UPDATE t SET v = ")
        .input("v")
        .text(" WHERE id = ")
        .input("id")
        .build()
}

pub async fn batch_update_table() {
    let database = MockDatabase::new(|execution| {
        Ok(Response::affected(match execution.value(2) {
            Value::Int32(Some(2)) => 2,
            _ => 1,
        }))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let table = TableHolder::new([("v", Value::Varchar(None)), ("id", Value::Int32(None))])
        .with_rows([
            ["one".into(), 1.into()],
            ["two".into(), 2.into()],
            ["three".into(), 3.into()],
        ])
        .expect("Failed to fill the table");
    let affected = service
        .update(&mut transaction, &update_statement(), &[table.into()])
        .await
        .expect("Failed to update from the table");
    assert_eq!(affected, 4);
    let executions = database.executions();
    assert_eq!(executions.len(), 3);
    assert!(executions.iter().all(|v| v.kind == ExecutionKind::Update));
    assert!(
        executions
            .iter()
            .all(|v| v.sql == "UPDATE t SET v = ? WHERE id = ?")
    );
    let pairs = executions
        .iter()
        .map(|v| (v.value(1), v.value(2)))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        [
            (Value::from("one"), Value::from(1)),
            (Value::from("two"), Value::from(2)),
            (Value::from("three"), Value::from(3)),
        ]
    );
    // Same statement text, promoted on the second row
    assert_eq!(database.prepared().len(), 2);
}

pub async fn batch_table_filter() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let table = TableHolder::new([("v", Value::Varchar(None)), ("id", Value::Int32(None))])
        .with_rows([
            ["one".into(), 1.into()],
            ["two".into(), 2.into()],
            ["three".into(), 3.into()],
        ])
        .expect("Failed to fill the table");
    let affected = service
        .update(
            &mut transaction,
            &update_statement(),
            &[table.filter_rows([2, 0]).into()],
        )
        .await
        .expect("Failed to update from the filtered table");
    assert_eq!(affected, 2);
    let ids = database
        .executions()
        .iter()
        .map(|v| v.value(2))
        .collect::<Vec<_>>();
    assert_eq!(ids, [Value::from(3), Value::from(1)]);

    // Empty table, nothing to execute
    database.clear();
    let empty = TableHolder::new([("v", Value::Varchar(None)), ("id", Value::Int32(None))]);
    let affected = service
        .update(&mut transaction, &update_statement(), &[empty.into()])
        .await
        .expect("Failed to update from an empty table");
    assert_eq!(affected, 0);
    assert!(database.executions().is_empty());
}

pub async fn batch_marker_array() {
    #[derive(Bean, Default)]
    struct Person {
        id: i32,
        name: String,
        #[property_skip]
        #[allow(dead_code)]
        notes: String,
    }

    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());

    // `:{ids}` runs once per element, the plain `:group` is repeated
    let statement = TemplateBuilder::new()
        .text("DELETE FROM person WHERE grp = ")
        .input("group")
        .text(" AND id = ")
        .batch_input("ids")
        .build();
    let roots = [Arg::from(
        ArgMap::new()
            .with("group", 4)
            .with("ids", Arg::array([10, 11, 12])),
    )];
    let deleted = service
        .delete(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to delete by id");
    assert_eq!(deleted, 3);
    let executions = database.executions();
    assert_eq!(
        executions
            .iter()
            .map(|v| (v.value(1), v.value(2)))
            .collect::<Vec<_>>(),
        [
            (Value::from(4), Value::from(10)),
            (Value::from(4), Value::from(11)),
            (Value::from(4), Value::from(12)),
        ]
    );

    // Bean array, one execution per bean
    database.clear();
    let persons = BeanArray::new(vec![
        Person {
            id: 1,
            name: "Alice".into(),
            notes: String::new(),
        },
        Person {
            id: 2,
            name: "Bob".into(),
            notes: String::new(),
        },
    ]);
    let statement = TemplateBuilder::new()
        .text("INSERT INTO person (id, name) VALUES (")
        .input("id")
        .text(", ")
        .input("name")
        .text(")")
        .build();
    let inserted = service
        .insert(&mut transaction, &statement, &[persons.arg()])
        .await
        .expect("Failed to insert the persons");
    assert_eq!(inserted, 2);
    let executions = database.executions();
    assert_eq!(executions[1].value(1), Value::from(2));
    assert_eq!(executions[1].value(2), Value::from("Bob"));
    assert!(Person::find_property("notes").is_none());
}
