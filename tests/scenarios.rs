#[cfg(test)]
mod tests {
    use bindery_tests::*;

    #[tokio::test]
    async fn select_single_value() {
        init_logs();
        bindery_tests::select_single_value().await;
    }

    #[tokio::test]
    async fn select_in_list() {
        init_logs();
        bindery_tests::select_in_list().await;
    }

    #[tokio::test]
    async fn select_in_list_as_array() {
        init_logs();
        bindery_tests::select_in_list_as_array().await;
    }

    #[tokio::test]
    async fn select_into_holders() {
        init_logs();
        bindery_tests::select_into_holders().await;
    }

    #[tokio::test]
    async fn select_into_list() {
        init_logs();
        bindery_tests::select_into_list().await;
    }

    #[tokio::test]
    async fn select_limited() {
        init_logs();
        bindery_tests::select_limited().await;
    }

    #[tokio::test]
    async fn select_duplicate_binds() {
        init_logs();
        bindery_tests::select_duplicate_binds().await;
    }

    #[tokio::test]
    async fn batch_update_table() {
        init_logs();
        bindery_tests::batch_update_table().await;
    }

    #[tokio::test]
    async fn batch_marker_array() {
        init_logs();
        bindery_tests::batch_marker_array().await;
    }

    #[tokio::test]
    async fn batch_table_filter() {
        init_logs();
        bindery_tests::batch_table_filter().await;
    }

    #[tokio::test]
    async fn stored_procedure_outputs() {
        init_logs();
        bindery_tests::stored_procedure_outputs().await;
    }

    #[tokio::test]
    async fn stored_procedure_over_production() {
        init_logs();
        bindery_tests::stored_procedure_over_production().await;
    }

    #[tokio::test]
    async fn stored_procedure_without_batches() {
        init_logs();
        bindery_tests::stored_procedure_without_batches().await;
    }

    #[tokio::test]
    async fn streaming_keeps_the_statement_open() {
        init_logs();
        bindery_tests::streaming_keeps_the_statement_open().await;
    }

    #[tokio::test]
    async fn cache_promotes_on_second_use() {
        init_logs();
        bindery_tests::cache_promotes_on_second_use().await;
    }

    #[tokio::test]
    async fn cache_disabled() {
        init_logs();
        bindery_tests::cache_disabled().await;
    }

    #[tokio::test]
    async fn cancel_running_statement() {
        init_logs();
        bindery_tests::cancel_running_statement().await;
    }

    #[tokio::test]
    async fn function_evaluated_once() {
        init_logs();
        bindery_tests::function_evaluated_once().await;
    }

    #[tokio::test]
    async fn dialect_literals() {
        init_logs();
        bindery_tests::dialect_literals().await;
    }

    #[tokio::test]
    async fn dynamic_fetch_size() {
        init_logs();
        bindery_tests::dynamic_fetch_size().await;
    }

    #[tokio::test]
    async fn transaction_releases_statements() {
        init_logs();
        bindery_tests::transaction_releases_statements().await;
    }

    #[tokio::test]
    async fn sequence_next_value() {
        init_logs();
        bindery_tests::sequence_next_value().await;
    }

    #[tokio::test]
    async fn typed_binds() {
        init_logs();
        bindery_tests::typed_binds().await;
    }

    #[tokio::test]
    async fn all_scenarios_in_sequence() {
        init_logs();
        execute_tests().await;
    }
}
