use crate::{Event, MockDatabase, Response, silent_logs};
use bindery::{AnsiDialect, SqlService, TemplateBuilder};
use std::time::Duration;

pub async fn cancel_running_statement() {
    let database = MockDatabase::new(|_| {
        Ok(Response::affected(100).with_delay(Duration::from_secs(30)))
    });
    let service = SqlService::new(AnsiDialect);
    let mut transaction = service.begin(database.connect());
    let monitor = transaction.monitor();
    let statement = TemplateBuilder::new()
        .text("DELETE FROM audit")
        .build();

    // Nothing running
    assert!(!service.cancel(&monitor).expect("Failed to cancel"));

    let cancel = async {
        while !monitor.is_active() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        service.cancel(&monitor).expect("Failed to cancel")
    };
    silent_logs! {
        let (result, cancelled) = tokio::join!(
            service.delete(&mut transaction, &statement, &[]),
            cancel
        );
        assert!(cancelled);
        let error = result.expect_err("The delete should be cancelled");
        assert!(format!("{:#}", error).contains("was cancelled"));
    }
    assert!(!monitor.is_active());
    assert_eq!(database.count(|e| matches!(e, Event::Cancel { .. })), 1);
    assert!(database.open_statements().is_empty());
}
