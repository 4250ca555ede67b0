use crate::{
    Arg, BindError, ColumnInfo, Config, Connection, Cursor, Error, FunctionResolver, InputBind,
    Lease, OutputBind, ParsedStatement, Prepared, Result, Row, SqlBind, SqlDialect, SqlType,
    StatementCache, StatementKind, Transaction, Value, find_next_placeholder,
    resolver::BindResolver,
};
use anyhow::Context as _;
use std::{collections::BTreeMap, fmt::Write};

/// Called once after a query completed, before its last statement is closed.
pub trait FetchMonitor: Send {
    /// `rows` is `None` for select into statements.
    fn post_fetch_data(&mut self, rows: Option<&[Row]>) -> Result<()>;
}

/// Receives the rows of a streaming select one at a time.
pub trait SelectStreamHandler: Send {
    fn handle_row(&mut self, index: usize, columns: &[ColumnInfo], row: Row) -> Result<()>;

    /// Called after the last row, the last statement is still open.
    fn finished(&mut self, row_count: usize) -> Result<()>;
}

#[derive(Debug)]
enum Bind {
    Input(InputBind),
    Output(OutputBind),
}

/// Rendering of one batch.
#[derive(Debug, Default)]
struct Scratch {
    sql: String,
    replacements: Vec<Option<String>>,
    binds: BTreeMap<usize, SqlBind>,
}

struct Open<P: Prepared> {
    lease: Lease<P>,
    cursor: Option<P::Cursor>,
}

fn release<P: Prepared>(cache: &StatementCache<P>, open: Option<Open<P>>) {
    let Some(Open { lease, cursor }) = open else {
        return;
    };
    if let Some(mut cursor) = cursor {
        if let Err(e) = cursor.close() {
            log::warn!("Could not close the cursor: {:#}", e);
        }
    }
    cache.checkin(lease);
}

/// Executes a tokenized statement against the argument roots it was bound to.
///
/// All the binds are resolved when the processor is created, binding errors happen before any
/// statement is prepared. Batched inputs (tables, bean arrays, `:{batch}` markers) execute the
/// statement once per row, as long as every batched input has a row.
///
/// ```rust
/// use bindery_core::{AnsiDialect, Arg, ArgMap, Config, StatementProcessor, TemplateBuilder};
/// let statement = TemplateBuilder::new()
///     .text("SELECT name FROM person WHERE ")
///     .input_cmp("id", "=", "ids")
///     .build();
/// let roots = [Arg::from(ArgMap::new().with("ids", Arg::array([3, 5])))];
/// let config = Config::default();
/// let mut processor =
///     StatementProcessor::new(&statement, &roots, &AnsiDialect, &config, None).unwrap();
/// assert_eq!(
///     processor.create_plain_text().unwrap(),
///     "SELECT name FROM person WHERE ((id IN (3,5)))"
/// );
/// ```
pub struct StatementProcessor<'a> {
    statement: &'a ParsedStatement,
    dialect: &'a dyn SqlDialect,
    config: &'a Config,
    max_rows: usize,
    /// One per token of the statement text.
    binds: Vec<Bind>,
    into: Vec<OutputBind>,
    driver_binds: usize,
    input_batch: Option<usize>,
    output_batch: Option<usize>,
    current: Option<Scratch>,
}

impl<'a> StatementProcessor<'a> {
    pub fn new(
        statement: &'a ParsedStatement,
        roots: &[Arg],
        dialect: &'a dyn SqlDialect,
        config: &'a Config,
        functions: Option<&dyn FunctionResolver>,
    ) -> Result<Self> {
        let resolver = BindResolver::new(roots, dialect)
            .with_functions(functions)
            .with_check_duplicates(config.check_duplicate_binds);
        let (binds, into) = Self::bind(statement, &resolver).with_context(|| {
            format!(
                "While binding the statement `{}`",
                crate::truncate_long!(statement.original)
            )
        })?;
        let mut processor = Self {
            statement,
            dialect,
            config,
            max_rows: 0,
            binds,
            into,
            driver_binds: 0,
            input_batch: None,
            output_batch: None,
            current: None,
        };
        for bind in &mut processor.binds {
            let (driver, index) = match bind {
                Bind::Input(v) => (v.is_driver_bind(dialect), &mut v.driver_index),
                Bind::Output(v) => (v.is_driver_bind(), &mut v.driver_index),
            };
            if driver {
                processor.driver_binds += 1;
                *index = Some(processor.driver_binds);
            }
        }
        Ok(processor)
    }

    fn bind(
        statement: &ParsedStatement,
        resolver: &BindResolver<'_>,
    ) -> Result<(Vec<Bind>, Vec<OutputBind>)> {
        let mut binds = Vec::with_capacity(statement.tokens.len());
        for token in &statement.tokens {
            binds.push(if token.is_output() {
                Bind::Output(OutputBind::new(token.clone(), resolver.resolve_output(token)?))
            } else {
                Bind::Input(InputBind::new(token.clone(), resolver.resolve_input(token)?))
            });
        }
        let mut into = Vec::with_capacity(statement.into.len());
        for token in &statement.into {
            if !token.select_into || !token.is_output() {
                let error = Error::new(BindError::InvalidSelectInto {
                    token: token.parsed.clone(),
                });
                log::error!("{:#}", error);
                return Err(error);
            }
            into.push(OutputBind::new(
                token.clone(),
                resolver.resolve_output(token)?,
            ));
        }
        Ok((binds, into))
    }

    /// Stop reading each result after `max_rows` rows, 0 reads everything.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn inputs(&self) -> impl Iterator<Item = &InputBind> {
        self.binds.iter().filter_map(|v| match v {
            Bind::Input(v) => Some(v),
            _ => None,
        })
    }

    /// Output binds of the statement text followed by the select into binds.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputBind> {
        self.binds
            .iter()
            .filter_map(|v| match v {
                Bind::Output(v) => Some(v),
                _ => None,
            })
            .chain(self.into.iter())
    }

    fn outputs_mut(&mut self) -> impl Iterator<Item = &mut OutputBind> {
        self.binds
            .iter_mut()
            .filter_map(|v| match v {
                Bind::Output(v) => Some(v),
                _ => None,
            })
            .chain(self.into.iter_mut())
    }

    /// SQL of the batch being executed.
    pub fn current_sql(&self) -> Option<&str> {
        self.current.as_ref().map(|v| v.sql.as_str())
    }

    fn has_next_input_batch(&self) -> bool {
        let next = self.input_batch.map_or(0, |v| v + 1);
        let mut batched = false;
        for input in self.inputs() {
            if input.is_batch() {
                batched = true;
                if !input.has_batch(next) {
                    return false;
                }
            }
        }
        batched || next == 0
    }

    fn next_input_batch(&mut self) {
        self.input_batch = Some(self.input_batch.map_or(0, |v| v + 1));
    }

    fn next_output_batch(&mut self) {
        let batch = self.output_batch.map_or(0, |v| v + 1);
        self.output_batch = Some(batch);
        for output in self.outputs_mut() {
            output.next_batch(batch);
        }
    }

    fn render(&self, batch: usize, force_plain: bool) -> Result<Scratch> {
        let mut scratch = Scratch {
            replacements: vec![None; self.binds.len()],
            ..Default::default()
        };
        for (i, bind) in self.binds.iter().enumerate() {
            match bind {
                Bind::Input(input) => {
                    let rendered = input.render(batch, self.dialect, force_plain)?;
                    scratch.replacements[i] = Some(rendered.text);
                    if let (Some(bind), Some(index)) = (rendered.bind, input.driver_index) {
                        scratch.binds.insert(index, bind);
                    }
                }
                Bind::Output(..) => scratch.replacements[i] = Some("?".into()),
            }
        }
        scratch.sql = self.statement.render(&scratch.replacements);
        Ok(scratch)
    }

    fn prepare_input_statement_and_binds(&mut self) -> Result<()> {
        let scratch = self.render(self.input_batch.unwrap_or(0), false)?;
        self.current = Some(scratch);
        Ok(())
    }

    fn dump(&self) {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("\n{}", self.sql_dump(true, true));
        } else if log::log_enabled!(log::Level::Info) {
            log::info!("\n{}", self.sql_dump(true, false));
        }
    }

    /// Diagnostic text of the current batch: the original statement with its binds, and the
    /// statement with every bind inlined. Large objects are never written.
    pub fn sql_dump(&self, with_binds: bool, with_plain: bool) -> String {
        let rendered;
        let scratch = match &self.current {
            Some(v) => v,
            None => match self.render(self.input_batch.unwrap_or(0), false) {
                Ok(v) => {
                    rendered = v;
                    &rendered
                }
                Err(e) => return format!("{:#}", e),
            },
        };
        let mut binds = String::new();
        for (i, bind) in self.binds.iter().enumerate() {
            let Bind::Input(input) = bind else {
                continue;
            };
            let Some(bind) = input.driver_index.and_then(|v| scratch.binds.get(&v)) else {
                continue;
            };
            let replacement = scratch.replacements[i].as_deref().unwrap_or_default();
            let _ = write!(
                binds,
                "IN  {} => {} [{}",
                input.token.parsed,
                replacement,
                bind.sql_type.name()
            );
            if !bind.sql_type.is_lob() && !matches!(bind.value, Value::Blob(..) | Value::Clob(..))
            {
                let _ = write!(binds, " {}", bind.value);
            }
            binds.push_str("]\n");
        }
        for (i, bind) in self.binds.iter().enumerate() {
            if let Bind::Output(output) = bind {
                let replacement = scratch.replacements[i].as_deref().unwrap_or_default();
                self.dump_output(&mut binds, output, replacement);
            }
        }
        for output in &self.into {
            self.dump_output(&mut binds, output, "");
        }
        let mut out = String::new();
        if with_binds {
            out.push_str("SQL with binds:\n");
            out.push_str(self.statement.original.trim());
            let binds = binds.trim();
            if !binds.is_empty() {
                out.push('\n');
                out.push_str(binds);
            }
        }
        if with_plain {
            let mut sql = scratch.sql.clone();
            let mut position = find_next_placeholder(&sql, 0);
            let mut index = 1;
            while let Some(pos) = position {
                if index > self.driver_binds {
                    break;
                }
                let replacement = match scratch.binds.get(&index) {
                    Some(bind) => self.plain_replacement(bind),
                    None => "?".to_string(),
                };
                sql.replace_range(pos..pos + 1, &replacement);
                position = find_next_placeholder(&sql, pos + replacement.len().max(1));
                index += 1;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("SQL PLAIN Log:\n");
            out.push_str(sql.trim());
        }
        out
    }

    fn dump_output(&self, out: &mut String, output: &OutputBind, replacement: &str) {
        let _ = write!(out, "OUT {} => {}", output.token.parsed, replacement);
        let prototype = output.output.prototype();
        if !matches!(prototype, Value::Null) {
            let _ = write!(out, " [{}]", self.dialect.output_type(&prototype).name());
        }
        out.push('\n');
    }

    fn plain_replacement(&self, bind: &SqlBind) -> String {
        match (&bind.sql_type, &bind.value) {
            (SqlType::Blob | SqlType::LongVarbinary, _) | (_, Value::Blob(..)) => "__BLOB__".into(),
            (SqlType::Clob | SqlType::LongVarchar, _) | (_, Value::Clob(..)) => "__CLOB__".into(),
            _ => self.dialect.plain_text(&bind.value).replace('?', " "),
        }
    }

    /// Statement of the first batch with every value inlined, nothing is executed.
    ///
    /// Empty when a batched input has no rows.
    pub fn create_plain_text(&mut self) -> Result<String> {
        self.input_batch = None;
        if !self.has_next_input_batch() {
            return Ok(String::new());
        }
        let scratch = self.render(0, true)?;
        let sql = scratch.sql.clone();
        self.current = Some(scratch);
        Ok(sql)
    }

    /// Renders and logs every batch without executing anything.
    pub fn simulate(&mut self) -> Result<()> {
        while self.has_next_input_batch() {
            self.next_input_batch();
            self.prepare_input_statement_and_binds()?;
            self.dump();
        }
        Ok(())
    }

    fn with_statement<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|error| {
            let error = error.context(format!("statement:\n{}", self.sql_dump(true, false)));
            log::error!("{:#}", error);
            error
        })
    }

    fn bind_batch<P: Prepared>(&self, prepared: &mut P, call: bool) -> Result<()> {
        let Some(scratch) = &self.current else {
            return Ok(());
        };
        for (index, bind) in &scratch.binds {
            prepared.bind_index(*index, bind)?;
        }
        if call {
            for bind in &self.binds {
                if let Bind::Output(output) = bind {
                    if let Some(index) = output.driver_index {
                        let sql_type = self.dialect.output_type(&output.output.prototype());
                        prepared.register_output(index, sql_type)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn consume_select_into_row(&mut self, row: &Row) -> Result<()> {
        if self.into.len() > row.len() {
            let error = Error::msg(format!(
                "The query returned {} columns but {} are selected into binds",
                row.len(),
                self.into.len()
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        for (output, value) in self.into.iter_mut().zip(row.iter()) {
            output.consume(value.clone())?;
        }
        Ok(())
    }

    fn consume_output_row<P: Prepared>(&mut self, prepared: &mut P) -> Result<()> {
        for bind in &mut self.binds {
            if let Bind::Output(output) = bind {
                if let Some(index) = output.driver_index {
                    output.consume(prepared.out_value(index)?)?;
                }
            }
        }
        Ok(())
    }

    fn finish_output_batch(&mut self) -> Result<()> {
        for output in self.outputs_mut() {
            output.finish()?;
        }
        Ok(())
    }

    fn max_fetch_size(&self, columns: &[ColumnInfo]) -> usize {
        let row_size = 32 + columns.iter().map(|c| c.display_size).sum::<usize>();
        (self.config.max_fetch_memory / row_size).max(1)
    }

    /// Reads a result up to the row limit, growing the fetch size when the dialect asks for it.
    async fn fetch_rows<K: Cursor>(&self, cursor: &mut K) -> Result<Vec<Row>> {
        let initial = cursor.fetch_size();
        let dynamic = self.dialect.dynamic_fetch_size() && initial > 0;
        let max_fetch = self.max_fetch_size(cursor.columns());
        let mut fetch = initial;
        let mut count = 0;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().await? {
            count += 1;
            if dynamic && count % fetch == 0 && fetch < max_fetch {
                let next = initial.max(count / 2).min(max_fetch);
                if next != fetch {
                    fetch = next;
                    log::trace!("Fetch size set to {} after {} rows", fetch, count);
                    cursor.set_fetch_size(fetch)?;
                }
            }
            rows.push(row);
            if self.max_rows > 0 && rows.len() >= self.max_rows {
                break;
            }
        }
        Ok(rows)
    }

    /// Runs a query, returns every row and feeds the select into binds.
    pub async fn select<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        monitor: Option<&mut dyn FetchMonitor>,
    ) -> Result<Vec<Row>> {
        let mut last = None;
        let mut rows = Vec::new();
        let result = self
            .run_query(transaction, &mut last, Some(&mut rows))
            .await
            .and_then(|()| match monitor {
                Some(monitor) => monitor.post_fetch_data(Some(&rows)),
                None => Ok(()),
            });
        release(&transaction.cache, last);
        self.with_statement(result).map(|()| rows)
    }

    /// Runs a query whose values only flow into the select into binds.
    pub async fn select_into<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        monitor: Option<&mut dyn FetchMonitor>,
    ) -> Result<()> {
        let mut last = None;
        let result = self
            .run_query(transaction, &mut last, None)
            .await
            .and_then(|()| match monitor {
                Some(monitor) => monitor.post_fetch_data(None),
                None => Ok(()),
            });
        release(&transaction.cache, last);
        self.with_statement(result)
    }

    async fn run_query<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        last: &mut Option<Open<C::Prepared>>,
        mut rows: Option<&mut Vec<Row>>,
    ) -> Result<()> {
        while self.has_next_input_batch() {
            self.next_input_batch();
            self.prepare_input_statement_and_binds()?;
            self.dump();
            let sql = self.current_sql().unwrap_or_default().to_string();
            let lease = transaction
                .cache
                .checkout(&mut transaction.connection, &sql, StatementKind::Query)
                .await?;
            let open = last.insert(Open {
                lease,
                cursor: None,
            });
            self.bind_batch(&mut *open.lease, false)?;
            let fetched = {
                let _active = transaction.monitor.register(open.lease.canceller());
                let cursor = open.cursor.insert(open.lease.query().await?);
                self.fetch_rows(cursor).await?
            };
            for row in fetched {
                self.next_output_batch();
                self.consume_select_into_row(&row)?;
                if let Some(rows) = rows.as_deref_mut() {
                    rows.push(row);
                }
            }
            // The last statement stays open for the monitor
            if self.has_next_input_batch() {
                release(&transaction.cache, last.take());
            }
        }
        self.finish_output_batch()
    }

    /// Runs a query passing each row to `handler` instead of collecting them.
    pub async fn select_streaming<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        handler: &mut dyn SelectStreamHandler,
    ) -> Result<()> {
        let mut last = None;
        let result = self.run_streaming(transaction, &mut last, handler).await;
        release(&transaction.cache, last);
        self.with_statement(result)
    }

    async fn run_streaming<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        last: &mut Option<Open<C::Prepared>>,
        handler: &mut dyn SelectStreamHandler,
    ) -> Result<()> {
        let mut count = 0;
        while self.has_next_input_batch() {
            self.next_input_batch();
            self.prepare_input_statement_and_binds()?;
            self.dump();
            let sql = self.current_sql().unwrap_or_default().to_string();
            let lease = transaction
                .cache
                .checkout(&mut transaction.connection, &sql, StatementKind::Query)
                .await?;
            let open = last.insert(Open {
                lease,
                cursor: None,
            });
            self.bind_batch(&mut *open.lease, false)?;
            {
                let _active = transaction.monitor.register(open.lease.canceller());
                let cursor = open.cursor.insert(open.lease.query().await?);
                let columns = cursor.columns().to_vec();
                while let Some(row) = cursor.next().await? {
                    handler.handle_row(count, &columns, row)?;
                    count += 1;
                    if self.max_rows > 0 && count >= self.max_rows {
                        break;
                    }
                }
            }
            if self.has_next_input_batch() {
                release(&transaction.cache, last.take());
            }
        }
        self.finish_output_batch()?;
        handler.finished(count)
    }

    /// Runs an insert, update or delete, returns the sum of the affected rows of every batch.
    pub async fn modify<C: Connection>(&mut self, transaction: &mut Transaction<C>) -> Result<u64> {
        let mut last = None;
        let result = self.run_modify(transaction, &mut last).await;
        release(&transaction.cache, last);
        self.with_statement(result)
    }

    async fn run_modify<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        last: &mut Option<Open<C::Prepared>>,
    ) -> Result<u64> {
        let mut count = 0;
        while self.has_next_input_batch() {
            self.next_input_batch();
            self.prepare_input_statement_and_binds()?;
            self.dump();
            let sql = self.current_sql().unwrap_or_default().to_string();
            let lease = transaction
                .cache
                .checkout(&mut transaction.connection, &sql, StatementKind::Query)
                .await?;
            let open = last.insert(Open {
                lease,
                cursor: None,
            });
            self.bind_batch(&mut *open.lease, false)?;
            {
                let _active = transaction.monitor.register(open.lease.canceller());
                count += open.lease.update().await?;
            }
            release(&transaction.cache, last.take());
        }
        Ok(count)
    }

    /// Runs a stored procedure call once per batch and reads back its output parameters.
    ///
    /// Every batch is executed, the status is true when all the executions returned true.
    pub async fn call<C: Connection>(&mut self, transaction: &mut Transaction<C>) -> Result<bool> {
        let mut last = None;
        let result = self.run_call(transaction, &mut last).await;
        release(&transaction.cache, last);
        self.with_statement(result)
    }

    async fn run_call<C: Connection>(
        &mut self,
        transaction: &mut Transaction<C>,
        last: &mut Option<Open<C::Prepared>>,
    ) -> Result<bool> {
        let mut status = true;
        while self.has_next_input_batch() {
            self.next_input_batch();
            self.prepare_input_statement_and_binds()?;
            self.dump();
            let sql = self.current_sql().unwrap_or_default().to_string();
            let lease = transaction
                .cache
                .checkout(&mut transaction.connection, &sql, StatementKind::Call)
                .await?;
            let open = last.insert(Open {
                lease,
                cursor: None,
            });
            self.bind_batch(&mut *open.lease, true)?;
            let executed = {
                let _active = transaction.monitor.register(open.lease.canceller());
                open.lease.call().await?
            };
            status &= executed;
            self.next_output_batch();
            self.consume_output_row(&mut *open.lease)?;
            release(&transaction.cache, last.take());
        }
        self.finish_output_batch()?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AnsiDialect, ArgMap, Holder, OracleDialect, PostgresDialect, TableHolder, TemplateBuilder,
    };
    use indoc::indoc;

    fn processor<'a>(
        statement: &'a ParsedStatement,
        roots: &[Arg],
        dialect: &'a dyn SqlDialect,
        config: &'a Config,
    ) -> StatementProcessor<'a> {
        StatementProcessor::new(statement, roots, dialect, config, None).unwrap()
    }

    #[test]
    fn driver_indexes_follow_the_tokens() {
        let statement = TemplateBuilder::new()
            .text("CALL p(")
            .input("a")
            .text(", ")
            .plain_value("b")
            .text(", ")
            .output("c")
            .text(", ")
            .input("d")
            .text(")")
            .build();
        let roots = [Arg::from(
            ArgMap::new()
                .with("a", 1)
                .with("b", 2)
                .with("c", Holder::empty::<i32>())
                .with("d", 4),
        )];
        let config = Config::default();
        let processor = processor(&statement, &roots, &AnsiDialect, &config);
        let indexes = processor
            .binds
            .iter()
            .map(|v| match v {
                Bind::Input(v) => v.driver_index,
                Bind::Output(v) => v.driver_index,
            })
            .collect::<Vec<_>>();
        assert_eq!(indexes, [Some(1), None, Some(2), Some(3)]);
        assert_eq!(processor.driver_binds, 3);
    }

    #[test]
    fn batches_stop_at_the_shortest_input() {
        let long = TableHolder::new([("v", Value::Int32(None))])
            .with_rows([
                [1.into()],
                [2.into()],
                [3.into()],
            ])
            .unwrap();
        let short = TableHolder::new([("w", Value::Int32(None))])
            .with_rows([
                [1.into()],
                [2.into()],
            ])
            .unwrap();
        let statement = TemplateBuilder::new()
            .text("UPDATE t SET v = ")
            .input("v")
            .text(" WHERE w = ")
            .input("w")
            .build();
        let roots = [Arg::from(long), Arg::from(short)];
        let config = Config::default();
        let mut processor = processor(&statement, &roots, &AnsiDialect, &config);
        let mut batches = 0;
        while processor.has_next_input_batch() {
            processor.next_input_batch();
            batches += 1;
        }
        assert_eq!(batches, 2);
    }

    #[test]
    fn without_batch_inputs_there_is_one_batch() {
        let statement = ParsedStatement::text("SELECT 1");
        let config = Config::default();
        let mut processor = processor(&statement, &[], &AnsiDialect, &config);
        assert!(processor.has_next_input_batch());
        processor.next_input_batch();
        assert!(!processor.has_next_input_batch());
    }

    #[test]
    fn plain_text_is_idempotent() {
        let statement = TemplateBuilder::new()
            .text("SELECT * FROM person WHERE name = ")
            .input("name")
            .text(" AND ")
            .input_cmp("id", "<>", "ids")
            .text(" ORDER BY ")
            .plain_sql("order")
            .build();
        let roots = [Arg::from(
            ArgMap::new()
                .with("name", "O'Neil")
                .with("ids", Arg::array([1, 2]))
                .with("order", "name DESC"),
        )];
        let config = Config::default();
        let mut processor = processor(&statement, &roots, &AnsiDialect, &config);
        let first = processor.create_plain_text().unwrap();
        let second = processor.create_plain_text().unwrap();
        assert_eq!(
            first,
            "SELECT * FROM person WHERE name = 'O''Neil' AND ((id NOT IN (1,2))) ORDER BY name DESC"
        );
        assert_eq!(first, second);
        assert_eq!(processor.input_batch, None);
    }

    #[test]
    fn plain_text_of_empty_batch() {
        let table = TableHolder::new([("id", Value::Int32(None))]);
        let statement = TemplateBuilder::new()
            .text("DELETE FROM t WHERE id = ")
            .input("id")
            .build();
        let roots = [Arg::from(table)];
        let config = Config::default();
        let mut processor = processor(&statement, &roots, &AnsiDialect, &config);
        assert_eq!(processor.create_plain_text().unwrap(), "");
    }

    #[test]
    fn dump_with_binds_and_plain_text() {
        let statement = TemplateBuilder::new()
            .text("UPDATE doc SET data = ")
            .input("data")
            .text(", title = ")
            .input("title")
            .text(" WHERE note = 'why?' AND id = ")
            .input("id")
            .build();
        let roots = [Arg::from(
            ArgMap::new()
                .with("data", Value::Blob(Some([1u8, 2, 3].into())))
                .with("title", "what?")
                .with("id", 7),
        )];
        let config = Config::default();
        let mut processor = processor(&statement, &roots, &AnsiDialect, &config);
        processor.next_input_batch();
        processor.prepare_input_statement_and_binds().unwrap();
        assert_eq!(
            processor.sql_dump(true, true),
            indoc! {"
                SQL with binds:
                UPDATE doc SET data = :data, title = :title WHERE note = 'why?' AND id = :id
                IN  :data => ? [BLOB]
                IN  :title => ? [VARCHAR what?]
                IN  :id => ? [INTEGER 7]
                SQL PLAIN Log:
                UPDATE doc SET data = __BLOB__, title = 'what ' WHERE note = 'why?' AND id = 7"}
        );
    }

    #[test]
    fn dump_of_outputs() {
        let statement = TemplateBuilder::new()
            .text("CALL count_rows(")
            .input("table")
            .text(", ")
            .output("count")
            .text(")")
            .build();
        let roots = [Arg::from(
            ArgMap::new()
                .with("table", "person")
                .with("count", Holder::empty::<i64>()),
        )];
        let config = Config::default();
        let processor = processor(&statement, &roots, &PostgresDialect, &config);
        assert_eq!(
            processor.sql_dump(true, true),
            indoc! {"
                SQL with binds:
                CALL count_rows(:table, :count)
                IN  :table => ? [VARCHAR person]
                OUT :count => ? [BIGINT]
                SQL PLAIN Log:
                CALL count_rows('person', ?)"}
        );
    }

    #[test]
    fn binding_errors_name_the_statement() {
        let statement = TemplateBuilder::new()
            .text("SELECT a FROM t WHERE b = ")
            .input("missing")
            .build();
        let config = Config::default();
        let error = StatementProcessor::new(&statement, &[], &OracleDialect, &config, None)
            .err()
            .unwrap();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::UnresolvedInput { .. })
        ));
        assert!(format!("{:#}", error).contains("SELECT a FROM t WHERE b = :missing"));
    }
}
