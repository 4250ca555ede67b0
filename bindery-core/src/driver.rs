use crate::{Result, SqlBind, SqlType, Value};
use std::{future::Future, sync::Arc};

/// One result row, values in column order.
pub type Row = Box<[Value]>;

/// Result column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: SqlType,
    /// Maximum width in characters, used to estimate the memory of a prefetched row.
    pub display_size: usize,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, sql_type: SqlType, display_size: usize) -> Self {
        Self {
            name: name.into(),
            sql_type,
            display_size,
        }
    }
}

/// Handle able to interrupt a running statement from another task.
pub trait Cancel: Send + Sync {
    fn cancel(&self) -> Result<()>;
}

/// Live database connection, the statement processor only prepares statements on it.
pub trait Connection: Send {
    type Prepared: Prepared;

    /// Compile a statement using `?` positional placeholders.
    fn prepare(&mut self, sql: &str) -> impl Future<Output = Result<Self::Prepared>> + Send;

    /// Compile a stored procedure call, its outputs can be registered and read back.
    fn prepare_call(&mut self, sql: &str) -> impl Future<Output = Result<Self::Prepared>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Compiled statement.
///
/// Bind indexes start from 1, in placeholder order.
pub trait Prepared: Send {
    type Cursor: Cursor;

    fn bind_index(&mut self, index: usize, bind: &SqlBind) -> Result<()>;

    fn clear_bindings(&mut self) -> Result<()>;

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<()>;

    fn query(&mut self) -> impl Future<Output = Result<Self::Cursor>> + Send;

    /// Number of rows affected.
    fn update(&mut self) -> impl Future<Output = Result<u64>> + Send;

    /// Execute a call, the returned status is driver defined.
    fn call(&mut self) -> impl Future<Output = Result<bool>> + Send;

    /// Value of a registered output after `call`.
    fn out_value(&mut self, index: usize) -> Result<Value>;

    fn canceller(&self) -> Arc<dyn Cancel>;

    fn close(&mut self) -> Result<()>;
}

/// Forward only result set.
pub trait Cursor: Send {
    fn columns(&self) -> &[ColumnInfo];

    fn next(&mut self) -> impl Future<Output = Result<Option<Row>>> + Send;

    fn fetch_size(&self) -> usize;

    fn set_fetch_size(&mut self, size: usize) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
