use bindery::{
    Cancel, ColumnInfo, Connection, Cursor, Error, Prepared, Result, Row, SqlBind, SqlType, Value,
};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

/// Driver call recorded by [`MockDatabase`], `id` identifies the prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Prepare { id: usize, sql: String },
    PrepareCall { id: usize, sql: String },
    Bind { id: usize, index: usize, bind: SqlBind },
    ClearBindings { id: usize },
    RegisterOutput { id: usize, index: usize, sql_type: SqlType },
    Query { id: usize },
    Update { id: usize },
    Call { id: usize },
    FetchSize { id: usize, size: usize },
    CloseCursor { id: usize },
    Close { id: usize },
    Cancel { id: usize },
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Query,
    Update,
    Call,
}

/// Statement as received by the driver when executed.
#[derive(Debug, Clone)]
pub struct Execution {
    pub id: usize,
    pub kind: ExecutionKind,
    pub sql: String,
    pub binds: BTreeMap<usize, SqlBind>,
}

impl Execution {
    /// Value bound at `index`, `Value::Null` when nothing was bound.
    pub fn value(&self, index: usize) -> Value {
        self.binds
            .get(&index)
            .map(|v| v.value.clone())
            .unwrap_or_default()
    }
}

/// Scripted outcome of an execution.
#[derive(Debug, Clone)]
pub struct Response {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub affected: u64,
    pub outputs: BTreeMap<usize, Value>,
    pub status: bool,
    /// Time the execution takes, it can be cancelled meanwhile.
    pub delay: Option<Duration>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected: 0,
            outputs: BTreeMap::new(),
            status: true,
            delay: None,
        }
    }
}

impl Response {
    pub fn rows(columns: Vec<ColumnInfo>, rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            ..Default::default()
        }
    }

    pub fn with_output(mut self, index: usize, value: Value) -> Self {
        self.outputs.insert(index, value);
        self
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub fn row(values: impl IntoIterator<Item = Value>) -> Row {
    values.into_iter().collect()
}

type Responder = dyn Fn(&Execution) -> Result<Response> + Send + Sync;

struct Shared {
    responder: Box<Responder>,
    events: Mutex<Vec<Event>>,
    executions: Mutex<Vec<Execution>>,
    fetch_size: AtomicUsize,
    next_id: AtomicUsize,
}

/// In memory database answering every execution through a responder and recording every driver
/// call, shared by all the connections it opens.
#[derive(Clone)]
pub struct MockDatabase(Arc<Shared>);

impl MockDatabase {
    pub fn new(responder: impl Fn(&Execution) -> Result<Response> + Send + Sync + 'static) -> Self {
        Self(Arc::new(Shared {
            responder: Box::new(responder),
            events: Default::default(),
            executions: Default::default(),
            fetch_size: AtomicUsize::new(10),
            next_id: AtomicUsize::new(0),
        }))
    }

    /// Initial fetch size of the cursors opened from now on.
    pub fn with_fetch_size(self, size: usize) -> Self {
        self.0.fetch_size.store(size, Ordering::SeqCst);
        self
    }

    pub fn connect(&self) -> MockConnection {
        MockConnection {
            database: self.clone(),
        }
    }

    fn record(&self, event: Event) {
        log::trace!("{:?}", event);
        self.0.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.events.lock().clone()
    }

    pub fn clear(&self) {
        self.0.events.lock().clear();
        self.0.executions.lock().clear();
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.0.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.0.executions.lock().clone()
    }

    /// Statements prepared so far, as `(id, sql)`.
    pub fn prepared(&self) -> Vec<(usize, String)> {
        self.0
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Prepare { id, sql } | Event::PrepareCall { id, sql } => {
                    Some((*id, sql.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of times statement `id` was closed.
    pub fn closed(&self, id: usize) -> usize {
        self.count(|e| matches!(e, Event::Close { id: v } if *v == id))
    }

    /// Prepared statements never closed.
    pub fn open_statements(&self) -> Vec<usize> {
        self.prepared()
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| self.closed(*id) == 0)
            .collect()
    }

    fn prepare(&self, sql: &str, call: bool) -> MockPrepared {
        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(if call {
            Event::PrepareCall {
                id,
                sql: sql.into(),
            }
        } else {
            Event::Prepare {
                id,
                sql: sql.into(),
            }
        });
        MockPrepared {
            id,
            sql: sql.into(),
            database: self.clone(),
            binds: BTreeMap::new(),
            registered: BTreeMap::new(),
            outputs: BTreeMap::new(),
            canceller: Arc::new(MockCancel {
                id,
                database: self.clone(),
                notify: Notify::new(),
            }),
            closed: false,
        }
    }
}

pub struct MockConnection {
    database: MockDatabase,
}

impl MockConnection {
    pub fn database(&self) -> &MockDatabase {
        &self.database
    }
}

impl Connection for MockConnection {
    type Prepared = MockPrepared;

    async fn prepare(&mut self, sql: &str) -> Result<MockPrepared> {
        Ok(self.database.prepare(sql, false))
    }

    async fn prepare_call(&mut self, sql: &str) -> Result<MockPrepared> {
        Ok(self.database.prepare(sql, true))
    }

    async fn commit(&mut self) -> Result<()> {
        self.database.record(Event::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.database.record(Event::Rollback);
        Ok(())
    }
}

pub struct MockCancel {
    id: usize,
    database: MockDatabase,
    notify: Notify,
}

impl Cancel for MockCancel {
    fn cancel(&self) -> Result<()> {
        self.database.record(Event::Cancel { id: self.id });
        self.notify.notify_one();
        Ok(())
    }
}

pub struct MockPrepared {
    id: usize,
    sql: String,
    database: MockDatabase,
    binds: BTreeMap<usize, SqlBind>,
    registered: BTreeMap<usize, SqlType>,
    outputs: BTreeMap<usize, Value>,
    canceller: Arc<MockCancel>,
    closed: bool,
}

impl MockPrepared {
    pub fn id(&self) -> usize {
        self.id
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::msg(format!("Statement {} is closed", self.id)));
        }
        Ok(())
    }

    async fn execute(&mut self, kind: ExecutionKind) -> Result<Response> {
        self.check_open()?;
        let execution = Execution {
            id: self.id,
            kind,
            sql: self.sql.clone(),
            binds: self.binds.clone(),
        };
        self.database.record(match kind {
            ExecutionKind::Query => Event::Query { id: self.id },
            ExecutionKind::Update => Event::Update { id: self.id },
            ExecutionKind::Call => Event::Call { id: self.id },
        });
        self.database.0.executions.lock().push(execution.clone());
        let response = (self.database.0.responder)(&execution)?;
        if let Some(delay) = response.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.canceller.notify.notified() => {
                    return Err(Error::msg(format!("Statement {} was cancelled", self.id)));
                }
            }
        }
        Ok(response)
    }
}

impl Prepared for MockPrepared {
    type Cursor = MockCursor;

    fn bind_index(&mut self, index: usize, bind: &SqlBind) -> Result<()> {
        self.check_open()?;
        self.database.record(Event::Bind {
            id: self.id,
            index,
            bind: bind.clone(),
        });
        self.binds.insert(index, bind.clone());
        Ok(())
    }

    fn clear_bindings(&mut self) -> Result<()> {
        self.check_open()?;
        self.database.record(Event::ClearBindings { id: self.id });
        self.binds.clear();
        self.registered.clear();
        Ok(())
    }

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<()> {
        self.check_open()?;
        self.database.record(Event::RegisterOutput {
            id: self.id,
            index,
            sql_type,
        });
        self.registered.insert(index, sql_type);
        Ok(())
    }

    async fn query(&mut self) -> Result<MockCursor> {
        let response = self.execute(ExecutionKind::Query).await?;
        Ok(MockCursor {
            id: self.id,
            database: self.database.clone(),
            columns: response.columns,
            rows: response.rows.into(),
            fetch_size: self.database.0.fetch_size.load(Ordering::SeqCst),
        })
    }

    async fn update(&mut self) -> Result<u64> {
        Ok(self.execute(ExecutionKind::Update).await?.affected)
    }

    async fn call(&mut self) -> Result<bool> {
        let response = self.execute(ExecutionKind::Call).await?;
        self.outputs = response.outputs;
        Ok(response.status)
    }

    fn out_value(&mut self, index: usize) -> Result<Value> {
        if !self.registered.contains_key(&index) {
            return Err(Error::msg(format!(
                "Parameter {} of statement {} is not registered as output",
                index, self.id
            )));
        }
        Ok(self.outputs.get(&index).cloned().unwrap_or_default())
    }

    fn canceller(&self) -> Arc<dyn Cancel> {
        self.canceller.clone()
    }

    fn close(&mut self) -> Result<()> {
        self.database.record(Event::Close { id: self.id });
        self.closed = true;
        Ok(())
    }
}

pub struct MockCursor {
    id: usize,
    database: MockDatabase,
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Row>,
    fetch_size: usize,
}

impl Cursor for MockCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    fn set_fetch_size(&mut self, size: usize) -> Result<()> {
        self.database.record(Event::FetchSize { id: self.id, size });
        self.fetch_size = size;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.database.record(Event::CloseCursor { id: self.id });
        Ok(())
    }
}
