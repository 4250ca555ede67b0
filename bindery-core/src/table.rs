use crate::{Error, Result, Value};
use anyhow::Context;
use parking_lot::RwLock;
use std::{fmt, sync::Arc};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowState {
    #[default]
    NonChanged,
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    /// Typed NULL every value of the column is converted to.
    pub prototype: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub values: Vec<Value>,
    pub state: RowState,
}

#[derive(Debug, Default)]
struct TableData {
    columns: Vec<TableColumn>,
    rows: Vec<TableRow>,
}

/// Row collection with named, typed columns. Binds address it as `:table.column`, one execution
/// per row.
///
/// ```rust
/// use bindery_core::{TableHolder, Value};
/// let table = TableHolder::new([("id", Value::Int32(None)), ("name", Value::Varchar(None))])
///     .with_row([1.into(), "alpha".into()])?;
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(table.value(0, "id"), Some(Value::Int32(Some(1))));
/// # Ok::<(), bindery_core::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct TableHolder(Arc<RwLock<TableData>>);

impl TableHolder {
    pub fn new<'a>(columns: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, prototype)| TableColumn {
                name: name.into(),
                prototype: prototype.as_null(),
            })
            .collect();
        Self(Arc::new(RwLock::new(TableData {
            columns,
            rows: Vec::new(),
        })))
    }

    pub fn with_row(self, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        self.push_row(values, RowState::NonChanged)?;
        Ok(self)
    }

    pub fn with_rows<R: IntoIterator<Item = Value>>(
        self,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<Self> {
        for row in rows {
            self.push_row(row, RowState::NonChanged)?;
        }
        Ok(self)
    }

    pub fn columns(&self) -> Vec<TableColumn> {
        self.0.read().columns.clone()
    }

    /// Column lookup, the first letter is matched case insensitively (`:t.Name` and `:t.name`).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.0
            .read()
            .columns
            .iter()
            .position(|c| same_property_name(&c.name, name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.0.read().rows.len()
    }

    pub fn rows(&self) -> Vec<TableRow> {
        self.0.read().rows.clone()
    }

    /// Appends a row, values are converted to the column types. Missing trailing values are NULL.
    pub fn push_row(
        &self,
        values: impl IntoIterator<Item = Value>,
        state: RowState,
    ) -> Result<usize> {
        let mut data = self.0.write();
        let mut values = values.into_iter();
        let row = data
            .columns
            .iter()
            .map(|c| match values.next() {
                Some(v) => v.convert_to(&c.prototype).with_context(|| {
                    format!("While converting a value for the table column `{}`", c.name)
                }),
                None => Ok(c.prototype.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        data.rows.push(TableRow { values: row, state });
        Ok(data.rows.len() - 1)
    }

    /// Appends a row of NULLs marked as inserted.
    pub fn add_row(&self) -> usize {
        let mut data = self.0.write();
        let values = data.columns.iter().map(|c| c.prototype.clone()).collect();
        data.rows.push(TableRow {
            values,
            state: RowState::Inserted,
        });
        data.rows.len() - 1
    }

    pub fn remove_row(&self, index: usize) -> Option<TableRow> {
        let mut data = self.0.write();
        (index < data.rows.len()).then(|| data.rows.remove(index))
    }

    /// Grows (adding inserted rows) or shrinks (dropping trailing rows) to exactly `len` rows.
    pub fn resize(&self, len: usize) {
        while self.row_count() < len {
            self.add_row();
        }
        self.0.write().rows.truncate(len);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<Value> {
        let index = self.column_index(column)?;
        self.0
            .read()
            .rows
            .get(row)
            .and_then(|r| r.values.get(index).cloned())
    }

    pub fn set_value(&self, row: usize, column: &str, value: Value) -> Result<()> {
        let index = self.column_index(column).ok_or_else(|| {
            let error = Error::msg(format!("Table does not have a column `{}`", column));
            log::error!("{:#}", error);
            error
        })?;
        let mut data = self.0.write();
        let value = value.convert_to(&data.columns[index].prototype)?;
        let Some(target) = data.rows.get_mut(row) else {
            let error = Error::msg(format!("Table row {} is out of range", row));
            log::error!("{:#}", error);
            return Err(error);
        };
        target.values[index] = value;
        if target.state == RowState::NonChanged {
            target.state = RowState::Updated;
        }
        Ok(())
    }

    pub fn row_state(&self, row: usize) -> Option<RowState> {
        self.0.read().rows.get(row).map(|r| r.state)
    }

    pub fn set_row_state(&self, row: usize, state: RowState) {
        if let Some(r) = self.0.write().rows.get_mut(row) {
            r.state = state;
        }
    }

    /// Rows in the given state, for example only the inserted ones for an INSERT statement.
    pub fn filter(&self, state: RowState) -> TableFilter {
        let rows = self
            .0
            .read()
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state == state)
            .map(|(i, _)| i)
            .collect();
        TableFilter {
            table: self.clone(),
            rows,
        }
    }

    pub fn filter_rows(&self, rows: impl IntoIterator<Item = usize>) -> TableFilter {
        TableFilter {
            table: self.clone(),
            rows: rows.into_iter().collect(),
        }
    }
}

impl fmt::Debug for TableHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        f.debug_struct("TableHolder")
            .field("columns", &data.columns)
            .field("rows", &data.rows)
            .finish()
    }
}

/// Subset of the rows of a table, in the given order.
#[derive(Debug, Clone)]
pub struct TableFilter {
    pub table: TableHolder,
    pub rows: Vec<usize>,
}

/// Property names match when equal except for the case of the first letter.
pub fn same_property_name(a: &str, b: &str) -> bool {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    match (a_chars.next(), b_chars.next()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b) && a_chars.as_str() == b_chars.as_str(),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableHolder {
        TableHolder::new([("id", Value::Int64(None)), ("name", Value::Varchar(None))])
            .with_rows([
                [Value::Int32(Some(1)), "a".into()],
                [Value::Int32(Some(2)), "b".into()],
            ])
            .expect("Failed to fill the table")
    }

    #[test]
    fn rows_are_converted_to_column_types() {
        let table = table();
        assert_eq!(table.value(1, "id"), Some(Value::Int64(Some(2))));
        assert_eq!(table.value(0, "Name"), Some(Value::Varchar(Some("a".into()))));
        assert_eq!(table.value(0, "missing"), None);
    }

    #[test]
    fn resize_grows_and_shrinks() {
        let table = table();
        table.resize(4);
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.row_state(3), Some(RowState::Inserted));
        assert_eq!(table.value(3, "id"), Some(Value::Int64(None)));
        table.resize(1);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.value(0, "name"), Some(Value::Varchar(Some("a".into()))));
    }

    #[test]
    fn filter_by_state() {
        let table = table();
        table.set_value(1, "name", "B".into()).unwrap();
        let filter = table.filter(RowState::Updated);
        assert_eq!(filter.rows, vec![1]);
        assert!(table.set_value(5, "name", "x".into()).is_err());
    }

    #[test]
    fn unconvertible_values_are_rejected() {
        let table = TableHolder::new([("id", Value::Int32(None)), ("name", Value::Varchar(None))]);
        let error = table
            .push_row(["abc".into(), "a".into()], RowState::Inserted)
            .expect_err("abc is not an integer");
        assert!(format!("{:#}", error).contains("`id`"));
        assert_eq!(table.row_count(), 0);
        assert!(table.clone().with_row(["12".into()]).is_ok());
        assert_eq!(table.value(0, "id"), Some(Value::Int32(Some(12))));
        assert!(table.with_row([Value::Blob(Some([1u8].into()))]).is_err());
    }
}
