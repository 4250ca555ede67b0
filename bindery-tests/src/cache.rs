use crate::{Event, MockDatabase, Response};
use bindery::{AnsiDialect, Arg, ArgMap, Config, SqlService, TemplateBuilder};
use std::time::Duration;

pub async fn cache_promotes_on_second_use() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service = SqlService::new(AnsiDialect).with_config(
        Config::default()
            .with_statement_cache_size(1)
            .with_admission_window(Duration::from_secs(60)),
    );
    let mut transaction = service.begin(database.connect());
    let first = TemplateBuilder::new()
        .text("UPDATE person SET visits = visits + 1 WHERE id = ")
        .input("id")
        .build();
    let second = TemplateBuilder::new()
        .text("DELETE FROM person WHERE id = ")
        .input("id")
        .build();
    let roots = [Arg::from(ArgMap::new().with("id", 1))];

    // First use, prepared and closed
    service
        .update(&mut transaction, &first, &roots)
        .await
        .expect("Failed to run the first update");
    assert_eq!(database.prepared().len(), 1);
    assert_eq!(database.closed(0), 1);
    assert!(transaction.cache().is_empty());

    // Second use within the window, prepared again and kept
    service
        .update(&mut transaction, &first, &roots)
        .await
        .expect("Failed to run the second update");
    assert_eq!(database.prepared().len(), 2);
    assert_eq!(database.closed(1), 0);
    assert_eq!(transaction.cache().len(), 1);

    // Reused from now on, the bindings are cleared in between
    for _ in 0..3 {
        service
            .update(&mut transaction, &first, &roots)
            .await
            .expect("Failed to run a cached update");
    }
    assert_eq!(database.prepared().len(), 2);
    assert!(database.executions().iter().skip(1).all(|v| v.id == 1));
    assert_eq!(
        database.count(|e| matches!(e, Event::ClearBindings { id: 1 })),
        4
    );

    // A different statement promoted into the full cache evicts the first one
    service
        .delete(&mut transaction, &second, &roots)
        .await
        .expect("Failed to run the first delete");
    service
        .delete(&mut transaction, &second, &roots)
        .await
        .expect("Failed to run the second delete");
    assert_eq!(database.prepared().len(), 4);
    assert_eq!(database.closed(1), 1);
    assert_eq!(database.closed(3), 0);
    assert_eq!(transaction.cache().len(), 1);

    // Released when the transaction ends
    service
        .commit(&mut transaction)
        .await
        .expect("Failed to commit");
    assert!(transaction.cache().is_empty());
    assert_eq!(database.closed(1), 1);
    assert_eq!(database.closed(3), 1);
    assert!(database.open_statements().is_empty());
    assert_eq!(database.events().last(), Some(&Event::Commit));

    // Admission history is forgotten on commit
    service
        .delete(&mut transaction, &second, &roots)
        .await
        .expect("Failed to run the delete after commit");
    assert!(transaction.cache().is_empty());

    // Dropping the transaction closes what is cached
    service
        .delete(&mut transaction, &second, &roots)
        .await
        .expect("Failed to run the delete after commit");
    assert_eq!(transaction.cache().len(), 1);
    assert_eq!(database.open_statements().len(), 1);
    drop(transaction);
    assert!(database.open_statements().is_empty());
}

pub async fn cache_disabled() {
    let database = MockDatabase::new(|_| Ok(Response::affected(1)));
    let service =
        SqlService::new(AnsiDialect).with_config(Config::default().with_statement_cache_size(0));
    let mut transaction = service.begin(database.connect());
    let statement = TemplateBuilder::new()
        .text("UPDATE person SET visits = 0 WHERE id = ")
        .input("id")
        .build();
    let roots = [Arg::from(ArgMap::new().with("id", 1))];
    for _ in 0..3 {
        service
            .update(&mut transaction, &statement, &roots)
            .await
            .expect("Failed to run the update");
    }
    assert_eq!(database.prepared().len(), 3);
    assert!(database.open_statements().is_empty());
    assert!(transaction.cache().is_empty());
}
