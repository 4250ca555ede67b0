use crate::{Event, ExecutionKind, MockDatabase, Response, row, silent_logs};
use bindery::{
    AnsiDialect, Arg, ArgMap, BindError, ColumnInfo, Config, Holder, PostgresDialect, SqlBind,
    SqlService, SqlType, TemplateBuilder, Value,
};

fn names() -> Vec<ColumnInfo> {
    vec![ColumnInfo::new("name", SqlType::Varchar, 40)]
}

fn name_of(id: i32) -> Value {
    Value::Varchar(Some(
        match id {
            3 => "Carol",
            7 => "Alice",
            9 => "Bob",
            _ => "Unknown",
        }
        .into(),
    ))
}

pub async fn select_single_value() {
    let database = MockDatabase::new(|execution| {
        Ok(match execution.value(1) {
            Value::Int32(Some(7)) => Response::rows(names(), [row([name_of(7)])]),
            _ => Response::rows(names(), []),
        })
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM t WHERE id = ")
        .input("id")
        .build();

    let roots = [Arg::from(ArgMap::new().with("id", Holder::of(Some(7))))];
    let rows = service
        .select(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select the person 7");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], name_of(7));
    let binds = database
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Bind { index, bind, .. } => Some((index, bind)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        binds,
        [(1, SqlBind::new(SqlType::Integer, Value::Int32(Some(7))))]
    );
    let executions = database.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].kind, ExecutionKind::Query);
    assert_eq!(executions[0].sql, "SELECT name FROM t WHERE id = ?");
    assert!(database.open_statements().is_empty());

    // Missing row
    let roots = [Arg::from(ArgMap::new().with("id", Holder::of(Some(8))))];
    let rows = service
        .select(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select the person 8");
    assert!(rows.is_empty());

    // Nothing is prepared when a bind cannot be resolved
    database.clear();
    silent_logs! {
        let error = service
            .select(&mut transaction, &statement, &[Arg::from(ArgMap::new())])
            .await
            .expect_err("Should not resolve :id");
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::UnresolvedInput { .. })
        ));
        assert!(database.prepared().is_empty());
    }
}

pub async fn select_in_list() {
    let database = MockDatabase::new(|execution| {
        assert_eq!(
            execution.sql,
            "SELECT name FROM t WHERE ((id IN (3,7,9)))",
            "The list should be written inline"
        );
        assert!(execution.binds.is_empty());
        Ok(Response::rows(
            names(),
            [3, 7, 9].map(|id| row([name_of(id)])),
        ))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM t WHERE ")
        .input_cmp("id", "=", "id")
        .build();
    let roots = [Arg::from(ArgMap::new().with("id", Arg::array([3, 7, 9])))];
    let rows = service
        .select(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select the persons 3, 7 and 9");
    assert_eq!(
        rows.iter().map(|v| v[0].clone()).collect::<Vec<_>>(),
        [name_of(3), name_of(7), name_of(9)]
    );
    assert_eq!(database.executions().len(), 1);
}

pub async fn select_in_list_as_array() {
    let database = MockDatabase::new(|execution| {
        let ids = execution
            .value(1)
            .elements()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_i64())
            .collect::<Vec<_>>();
        Ok(Response::rows(
            names(),
            ids.into_iter().map(|id| row([name_of(id as i32)])),
        ))
    });
    let service = SqlService::new(PostgresDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM t WHERE ")
        .input_cmp("id", "=", "id")
        .build();
    let roots = [Arg::from(ArgMap::new().with("id", Arg::array([3, 7, 9])))];
    let rows = service
        .select(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select the persons 3, 7 and 9");
    assert_eq!(rows.len(), 3);
    let executions = database.executions();
    assert_eq!(executions[0].sql, "SELECT name FROM t WHERE id = ANY (?)");
    assert_eq!(executions[0].binds[&1].sql_type, SqlType::Array);

    // An empty list is not bound
    database.clear();
    let roots = [Arg::from(
        ArgMap::new().with("id", Arg::array(Vec::<i32>::new())),
    )];
    service
        .select(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select with an empty list");
    let executions = database.executions();
    assert_eq!(executions[0].sql, "SELECT name FROM t WHERE id is null");
    assert!(executions[0].binds.is_empty());
}

pub async fn select_into_holders() {
    let database = MockDatabase::new(|execution| {
        let rows = match execution.value(1) {
            Value::Int32(Some(1)) => vec![row([
                Value::Varchar(Some("Alice".into())),
                Value::Int64(Some(30)),
            ])],
            Value::Int32(Some(2)) => vec![
                row([Value::Varchar(Some("Bob".into())), Value::Int64(Some(40))]),
                row([Value::Varchar(Some("Bob".into())), Value::Int64(Some(41))]),
            ],
            _ => Vec::new(),
        };
        Ok(Response::rows(
            vec![
                ColumnInfo::new("name", SqlType::Varchar, 40),
                ColumnInfo::new("age", SqlType::BigInt, 20),
            ],
            rows,
        ))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name, age FROM person WHERE id = ")
        .input("id")
        .select_into("name")
        .select_into("age")
        .build();
    assert_eq!(
        statement.original,
        "SELECT name, age FROM person WHERE id = :id INTO :name, :age"
    );

    let name = Holder::empty::<String>();
    let age = Holder::empty::<i32>();
    let roots = [
        Arg::from(ArgMap::new().with("id", 1)),
        Arg::from(
            ArgMap::new()
                .with("name", name.clone())
                .with("age", age.clone()),
        ),
    ];
    service
        .select_into(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select into the holders");
    assert_eq!(
        database.executions()[0].sql,
        "SELECT name, age FROM person WHERE id = ?"
    );
    assert_eq!(name.get_as::<String>().unwrap(), Some("Alice".into()));
    assert_eq!(age.get_as::<i32>().unwrap(), Some(30));

    // No row keeps the previous values
    let roots = [
        Arg::from(ArgMap::new().with("id", 5)),
        Arg::from(
            ArgMap::new()
                .with("name", name.clone())
                .with("age", age.clone()),
        ),
    ];
    service
        .select_into(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to select into the holders");
    assert_eq!(name.get_as::<String>().unwrap(), Some("Alice".into()));

    // Two rows for single value holders
    let roots = [
        Arg::from(ArgMap::new().with("id", 2)),
        Arg::from(
            ArgMap::new()
                .with("name", name.clone())
                .with("age", age.clone()),
        ),
    ];
    silent_logs! {
        let error = service
            .select_into(&mut transaction, &statement, &roots)
            .await
            .expect_err("Two rows cannot go into a single value holder");
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::OverProduction { .. })
        ));
        assert!(format!("{:#}", error).contains("SQL with binds:"));
    }
    assert_eq!(name.get_as::<String>().unwrap(), Some("Alice".into()));
    service
        .commit(&mut transaction)
        .await
        .expect("Failed to commit");
    assert!(database.open_statements().is_empty());
}

pub async fn select_into_list() {
    let database = MockDatabase::new(|_| {
        Ok(Response::rows(
            names(),
            ["Alice", "Bob", "Alice"].map(|v| row([Value::Varchar(Some(v.into()))])),
        ))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM person")
        .select_into("names")
        .build();

    let list = Holder::list(Vec::<String>::new());
    let set = Holder::set_of(Vec::<String>::new());
    service
        .select_into(
            &mut transaction,
            &statement,
            &[Arg::from(ArgMap::new().with("names", list.clone()))],
        )
        .await
        .expect("Failed to select into the list");
    assert_eq!(
        list.values_as::<String>().unwrap(),
        ["Alice", "Bob", "Alice"]
    );
    service
        .select_into(
            &mut transaction,
            &statement,
            &[Arg::from(ArgMap::new().with("names", set.clone()))],
        )
        .await
        .expect("Failed to select into the set");
    assert_eq!(set.values_as::<String>().unwrap(), ["Alice", "Bob"]);
}

pub async fn select_limited() {
    let database = MockDatabase::new(|_| {
        Ok(Response::rows(
            names(),
            (0..10).map(|v| row([Value::Varchar(Some(format!("person {}", v)))])),
        ))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new().text("SELECT name FROM person").build();
    let rows = service
        .select_limited(&mut transaction, &statement, &[], 4)
        .await
        .expect("Failed to select 4 persons");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3][0], Value::Varchar(Some("person 3".into())));
    let rows = service
        .select(&mut transaction, &statement, &[])
        .await
        .expect("Failed to select every person");
    assert_eq!(rows.len(), 10);
}

pub async fn select_duplicate_binds() {
    let database = MockDatabase::new(|execution| {
        let id = execution.value(1).as_i64().unwrap_or_default() as i32;
        Ok(Response::rows(names(), [row([name_of(id)])]))
    });
    let statement = TemplateBuilder::new()
        .text("SELECT name FROM t WHERE id = ")
        .input("id")
        .select_into("name")
        .build();
    for check in [false, true] {
        database.clear();
        let service = SqlService::new(AnsiDialect)
            .with_config(Config::default().with_check_duplicate_binds(check));
        let mut transaction = service.begin(database.connect());
        let first = Holder::empty::<String>();
        let second = Holder::empty::<String>();
        let roots = [
            Arg::from(ArgMap::new().with("id", 7).with("name", first.clone())),
            Arg::pair("id", 9),
            Arg::from(ArgMap::new().with("name", second.clone())),
        ];
        silent_logs! {
            let rows = service
                .select(&mut transaction, &statement, &roots)
                .await
                .expect("Failed to select with duplicate binds");
            assert_eq!(rows.len(), 1);
        }
        let executions = database.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].value(1), Value::Int32(Some(7)));
        assert_eq!(first.get_as::<String>().unwrap().as_deref(), Some("Alice"));
        assert_eq!(second.get_as::<String>().unwrap(), None);
    }
}
