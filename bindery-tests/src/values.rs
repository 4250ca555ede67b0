use crate::{MockDatabase, Response, silent_logs};
use bindery::{AnsiDialect, Arg, ArgMap, SqlService, SqlType, TemplateBuilder, Value};
use indoc::indoc;
use rust_decimal::Decimal;
use time::macros::datetime;
use uuid::Uuid;

pub async fn typed_binds() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let id = Uuid::new_v4();
    let roots = [Arg::from(
        ArgMap::new()
            .with("id", id)
            .with("price", Decimal::new(1999, 2))
            .with("active", true)
            .with("created", datetime!(2025-03-01 10:30:00))
            .with("image", vec![0xCAu8, 0xFE]),
    )];
    let statement = TemplateBuilder::new()
        .text("INSERT INTO product (id, price, active, created, image)\nVALUES (")
        .input("id")
        .text(", ")
        .input("price")
        .text(", ")
        .input("active")
        .text(", ")
        .input("created")
        .text(", ")
        .input("image")
        .text(")")
        .build();
    let affected = service
        .insert(&mut transaction, &statement, &roots)
        .await
        .expect("Failed to insert the product");
    assert_eq!(affected, 1);

    let executions = database.executions();
    assert_eq!(executions.len(), 1);
    let types = executions[0]
        .binds
        .values()
        .map(|b| b.sql_type)
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        [
            SqlType::Other,
            SqlType::Numeric,
            SqlType::Integer,
            SqlType::Timestamp,
            SqlType::Blob,
        ]
    );
    // Booleans travel as integers
    assert_eq!(executions[0].value(3), Value::Int32(Some(1)));
    assert_eq!(executions[0].value(1), Value::Uuid(Some(id)));

    silent_logs! {
        let plain = service
            .create_plain_text(&statement, &roots)
            .expect("Failed to render the product");
        assert_eq!(
            plain,
            format!(
                indoc! {"
                    INSERT INTO product (id, price, active, created, image)
                    VALUES ('{}', 19.99, 1, TIMESTAMP '2025-03-01 10:30:00', NULL)"},
                id
            )
        );
    }
}
