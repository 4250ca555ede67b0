mod batch;
mod cache;
mod cancel;
mod fetch;
mod functions;
mod mock;
mod procedure;
mod select;
mod streaming;
mod transaction;
mod values;

pub use batch::*;
pub use cache::*;
pub use cancel::*;
pub use fetch::*;
pub use functions::*;
pub use mock::*;
pub use procedure::*;
pub use select::*;
pub use streaming::*;
pub use transaction::*;
pub use values::*;

use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs every scenario, each one on its own mock database.
pub async fn execute_tests() {
    select_single_value().await;
    select_in_list().await;
    select_in_list_as_array().await;
    select_into_holders().await;
    select_into_list().await;
    select_limited().await;
    select_duplicate_binds().await;
    batch_update_table().await;
    batch_marker_array().await;
    batch_table_filter().await;
    stored_procedure_outputs().await;
    stored_procedure_over_production().await;
    stored_procedure_without_batches().await;
    streaming_keeps_the_statement_open().await;
    cache_promotes_on_second_use().await;
    cache_disabled().await;
    cancel_running_statement().await;
    function_evaluated_once().await;
    dialect_literals().await;
    dynamic_fetch_size().await;
    transaction_releases_statements().await;
    sequence_next_value().await;
    typed_binds().await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
