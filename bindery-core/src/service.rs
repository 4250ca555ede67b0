use crate::{
    Arg, Config, Connection, Error, FunctionResolver, ParsedStatement, Result, Row,
    SelectStreamHandler, SqlDialect, StatementMonitor, StatementProcessor, Transaction,
};
use std::sync::Arc;

/// Entry point to run statements: holds the dialect, the configuration and the function resolver
/// shared by every statement.
///
/// ```rust
/// use bindery_core::{Arg, ArgMap, OracleDialect, SqlService, TemplateBuilder};
/// let service = SqlService::new(OracleDialect);
/// let statement = TemplateBuilder::new()
///     .text("SELECT name FROM person WHERE created < ")
///     .dialect_literal("sysdate")
///     .text(" AND id = ")
///     .input("id")
///     .build();
/// let roots = [Arg::from(ArgMap::new().with("id", 7))];
/// assert_eq!(
///     service.create_plain_text(&statement, &roots).unwrap(),
///     "SELECT name FROM person WHERE created < SYSDATE AND id = 7"
/// );
/// ```
pub struct SqlService<D: SqlDialect> {
    dialect: D,
    config: Config,
    functions: Option<Arc<dyn FunctionResolver>>,
}

impl<D: SqlDialect> SqlService<D> {
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            config: Config::default(),
            functions: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_functions(mut self, functions: impl FunctionResolver + 'static) -> Self {
        self.functions = Some(Arc::new(functions));
        self
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts a unit of work on `connection`.
    pub fn begin<C: Connection>(&self, connection: C) -> Transaction<C> {
        Transaction::new(connection, &self.config)
    }

    fn processor<'s>(
        &'s self,
        statement: &'s ParsedStatement,
        roots: &[Arg],
        max_rows: usize,
    ) -> Result<StatementProcessor<'s>> {
        Ok(StatementProcessor::new(
            statement,
            roots,
            self.dialect.as_dyn(),
            &self.config,
            self.functions.as_deref(),
        )?
        .with_max_rows(max_rows))
    }

    pub async fn select<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<Vec<Row>> {
        self.select_limited(transaction, statement, roots, 0).await
    }

    /// Reads at most `max_rows` rows per batch, 0 reads every row.
    pub async fn select_limited<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
        max_rows: usize,
    ) -> Result<Vec<Row>> {
        let mut processor = self.processor(statement, roots, max_rows)?;
        processor.select(transaction, None).await
    }

    pub async fn select_into<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<()> {
        self.select_into_limited(transaction, statement, roots, 0)
            .await
    }

    pub async fn select_into_limited<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
        max_rows: usize,
    ) -> Result<()> {
        let mut processor = self.processor(statement, roots, max_rows)?;
        processor.select_into(transaction, None).await
    }

    pub async fn select_streaming<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
        handler: &mut dyn SelectStreamHandler,
    ) -> Result<()> {
        self.select_streaming_limited(transaction, statement, roots, handler, 0)
            .await
    }

    pub async fn select_streaming_limited<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
        handler: &mut dyn SelectStreamHandler,
        max_rows: usize,
    ) -> Result<()> {
        let mut processor = self.processor(statement, roots, max_rows)?;
        processor.select_streaming(transaction, handler).await
    }

    /// Number of inserted rows.
    pub async fn insert<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<u64> {
        let mut processor = self.processor(statement, roots, 0)?;
        processor.modify(transaction).await
    }

    /// Number of updated rows.
    pub async fn update<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<u64> {
        let mut processor = self.processor(statement, roots, 0)?;
        processor.modify(transaction).await
    }

    /// Number of deleted rows.
    pub async fn delete<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<u64> {
        let mut processor = self.processor(statement, roots, 0)?;
        processor.modify(transaction).await
    }

    pub async fn call_stored_procedure<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        statement: &ParsedStatement,
        roots: &[Arg],
    ) -> Result<bool> {
        let mut processor = self.processor(statement, roots, 0)?;
        processor.call(transaction).await
    }

    /// The statement with every value inlined, without touching the database.
    pub fn create_plain_text(&self, statement: &ParsedStatement, roots: &[Arg]) -> Result<String> {
        self.processor(statement, roots, 0)?.create_plain_text()
    }

    /// Next value of a database sequence.
    pub async fn sequence_next_value<C: Connection>(
        &self,
        transaction: &mut Transaction<C>,
        sequence: &str,
    ) -> Result<i64> {
        let statement = ParsedStatement::text(self.dialect.sequence_next_value(sequence)?);
        let rows = self.select_limited(transaction, &statement, &[], 1).await?;
        match rows.first().and_then(|row| row.first()).and_then(|v| v.as_i64()) {
            Some(value) => Ok(value),
            None => {
                let error = Error::msg(format!("The sequence {} returned no value", sequence));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    pub async fn commit<C: Connection>(&self, transaction: &mut Transaction<C>) -> Result<()> {
        transaction.commit().await
    }

    pub async fn rollback<C: Connection>(&self, transaction: &mut Transaction<C>) -> Result<()> {
        transaction.rollback().await
    }

    /// Interrupts the statement running on the transaction owning `monitor`.
    pub fn cancel(&self, monitor: &StatementMonitor) -> Result<bool> {
        monitor.cancel()
    }
}
