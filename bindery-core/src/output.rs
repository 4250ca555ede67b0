use crate::{
    Arg, ArgMap, BeanArrayRef, BeanRef, BindError, Error, Holder, HolderType, Result, TableHolder,
    Token, TriState, Value,
};
use anyhow::Context as _;
use std::sync::Arc;

/// Destination of an output bind, chosen by the shape of the resolved container.
#[derive(Debug, Clone)]
pub enum Output {
    /// Holder receiving exactly one value.
    SingleHolder { holder: Holder },
    /// Array, list or set holder collecting every value.
    ArrayHolder { holder: Holder },
    /// Entry of a map.
    Map { map: ArgMap, key: String },
    /// Property of each bean, batched when there is more than one bean.
    BeanProperty { beans: Vec<BeanRef>, property: String },
    /// Column of a table, one row per batch.
    Table {
        table: TableHolder,
        rows: Option<Vec<usize>>,
        column: String,
    },
    /// Property of a bean array, one bean per batch.
    BeanArray {
        array: BeanArrayRef,
        indices: Option<Vec<usize>>,
        property: String,
    },
}

impl Output {
    pub fn is_batch(&self) -> bool {
        match self {
            Output::SingleHolder { .. } | Output::Map { .. } => false,
            Output::BeanProperty { beans, .. } => beans.len() > 1,
            Output::ArrayHolder { .. } | Output::Table { .. } | Output::BeanArray { .. } => true,
        }
    }

    /// Typed NULL of the values this destination expects, `Value::Null` when unknown.
    pub fn prototype(&self) -> Value {
        match self {
            Output::SingleHolder { holder } => match holder.holder_type() {
                HolderType::TriState => Value::Int32(None),
                HolderType::Any => holder.value().as_null(),
                t => t.element().clone(),
            },
            Output::ArrayHolder { holder } => holder.holder_type().element().clone(),
            Output::Map { map, key } => map.value(key).as_null(),
            Output::BeanProperty { beans, property } => beans
                .first()
                .and_then(|b| b.0.read().property(property))
                .and_then(|v| v.as_value().map(Value::as_null))
                .unwrap_or_default(),
            Output::Table { table, column, .. } => table
                .columns()
                .into_iter()
                .find(|c| crate::same_property_name(&c.name, column))
                .map(|c| c.prototype)
                .unwrap_or_default(),
            Output::BeanArray {
                array, property, ..
            } => array
                .0
                .read()
                .property(0, property)
                .and_then(|v| v.as_value().map(Value::as_null))
                .unwrap_or_default(),
        }
    }
}

/// An output bound to its token, accumulates the values until [`OutputBind::finish`].
#[derive(Debug)]
pub struct OutputBind {
    pub token: Arc<Token>,
    pub output: Output,
    /// Position of the driver placeholder, 1 based, `None` for select into outputs.
    pub driver_index: Option<usize>,
    batch: Option<usize>,
    last_batch: Option<usize>,
    values: Vec<(usize, Value)>,
}

impl OutputBind {
    pub fn new(token: Arc<Token>, output: Output) -> Self {
        Self {
            token,
            output,
            driver_index: None,
            batch: None,
            last_batch: None,
            values: Vec::new(),
        }
    }

    pub fn is_select_into(&self) -> bool {
        self.token.select_into
    }

    pub fn is_driver_bind(&self) -> bool {
        !self.token.select_into
    }

    pub fn is_batch(&self) -> bool {
        self.output.is_batch()
    }

    pub fn next_batch(&mut self, index: usize) {
        self.batch = Some(index);
        self.last_batch = Some(index);
    }

    /// Receives the value of the current batch.
    pub fn consume(&mut self, value: Value) -> Result<()> {
        if !self.is_batch() && !self.values.is_empty() {
            let error = Error::new(BindError::OverProduction {
                token: self.token.parsed.clone(),
            });
            log::error!("{:#}", error);
            return Err(error);
        }
        self.values.push((self.batch.unwrap_or(0), value));
        Ok(())
    }

    /// Writes the accumulated values into the destination, once after the last batch.
    ///
    /// A non batch destination that received nothing keeps its previous value.
    pub fn finish(&mut self) -> Result<()> {
        let values = std::mem::take(&mut self.values);
        let context = || format!("While writing the output {}", self.token.parsed);
        let result = match &self.output {
            Output::SingleHolder { holder } => match values.into_iter().next() {
                Some((_, value)) => write_holder(holder, value),
                None => Ok(()),
            },
            Output::ArrayHolder { holder } => {
                let element = holder.holder_type().element().clone();
                let mut converted = Vec::with_capacity(values.len());
                for (_, value) in values {
                    let value = value.convert_to(&element)?;
                    if matches!(holder.holder_type(), HolderType::Set(..))
                        && converted.contains(&value)
                    {
                        continue;
                    }
                    converted.push(value);
                }
                let args = converted.into_iter().map(Arg::Value).collect();
                holder.set(match holder.holder_type() {
                    HolderType::Array(..) => Arg::Array(args),
                    _ => Arg::Collection(args),
                });
                Ok(())
            }
            Output::Map { map, key } => match values.into_iter().next() {
                Some((_, value)) => value
                    .convert_to(&map.value(key).as_null())
                    .map(|v| map.insert(key.clone(), v)),
                None => Ok(()),
            },
            Output::BeanProperty { beans, property } => {
                if beans.len() == 1 {
                    match values.into_iter().next() {
                        Some((_, value)) => beans[0].0.write().set_property(property, value),
                        None => Ok(()),
                    }
                } else {
                    values.into_iter().try_for_each(|(i, value)| match beans.get(i) {
                        Some(bean) => bean.0.write().set_property(property, value),
                        None => Ok(()),
                    })
                }
            }
            Output::Table {
                table,
                rows,
                column,
            } => {
                if rows.is_none() {
                    table.resize(self.last_batch.map_or(0, |v| v + 1));
                }
                values.into_iter().try_for_each(|(i, value)| {
                    let row = match rows {
                        Some(rows) => rows.get(i).copied(),
                        None => Some(i),
                    };
                    match row {
                        Some(row) => table.set_value(row, column, value),
                        None => Ok(()),
                    }
                })
            }
            Output::BeanArray {
                array,
                indices,
                property,
            } => {
                let mut array = array.0.write();
                if indices.is_none() {
                    array.resize(self.last_batch.map_or(0, |v| v + 1));
                }
                values.into_iter().try_for_each(|(i, value)| {
                    let index = match indices {
                        Some(indices) => indices.get(i).copied(),
                        None => Some(i),
                    };
                    match index {
                        Some(index) => array.set_property(index, property, value),
                        None => Ok(()),
                    }
                })
            }
        };
        result.with_context(context)
    }
}

fn write_holder(holder: &Holder, value: Value) -> Result<()> {
    match holder.holder_type() {
        HolderType::TriState => holder.set(Arg::TriState(TriState::from_value(&value)?)),
        HolderType::Any => holder.set(Arg::Value(value)),
        t => holder.set(Arg::Value(value.convert_to(t.element())?)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TemplateBuilder;

    fn token(path: &str) -> Arc<Token> {
        TemplateBuilder::new()
            .select_into(path)
            .build()
            .into
            .remove(0)
    }

    #[test]
    fn single_holder_rejects_a_second_value() {
        let holder = Holder::of(Some(1i64));
        let mut output = OutputBind::new(
            token("h"),
            Output::SingleHolder {
                holder: holder.clone(),
            },
        );
        output.next_batch(0);
        output.consume(Value::Int32(Some(5))).unwrap();
        output.next_batch(1);
        let error = output.consume(Value::Int32(Some(6))).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::OverProduction { .. })
        ));
        output.finish().unwrap();
        assert_eq!(holder.value(), Value::Int64(Some(5)));
    }

    #[test]
    fn zero_values_keep_the_previous_value() {
        let holder = Holder::of(Some("before".to_string()));
        let mut output = OutputBind::new(
            token("h"),
            Output::SingleHolder {
                holder: holder.clone(),
            },
        );
        output.finish().unwrap();
        assert_eq!(holder.value(), Value::Varchar(Some("before".into())));
    }

    #[test]
    fn set_holder_deduplicates() {
        let holder = Holder::set_of::<i32>([]);
        let mut output = OutputBind::new(
            token("ids"),
            Output::ArrayHolder {
                holder: holder.clone(),
            },
        );
        for (i, v) in [1, 2, 1, 3].into_iter().enumerate() {
            output.next_batch(i);
            output.consume(Value::Int64(Some(v))).unwrap();
        }
        output.finish().unwrap();
        assert_eq!(holder.values_as::<i32>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn map_entry_keeps_its_type() {
        let map = ArgMap::new()
            .with("count", Value::Int64(None))
            .with("flag", Value::Boolean(None));
        let mut count = OutputBind::new(
            token("count"),
            Output::Map {
                map: map.clone(),
                key: "count".into(),
            },
        );
        count.consume(Value::Varchar(Some("42".into()))).unwrap();
        count.finish().unwrap();
        assert_eq!(map.value("count"), Value::Int64(Some(42)));

        // New keys take the value as it comes
        let mut total = OutputBind::new(
            token("total"),
            Output::Map {
                map: map.clone(),
                key: "total".into(),
            },
        );
        total.consume(Value::Int32(Some(7))).unwrap();
        total.finish().unwrap();
        assert_eq!(map.value("total"), Value::Int32(Some(7)));

        let mut flag = OutputBind::new(
            token("flag"),
            Output::Map {
                map: map.clone(),
                key: "flag".into(),
            },
        );
        flag.consume(Value::Varchar(Some("not a flag".into()))).unwrap();
        assert!(flag.finish().is_err());
        assert_eq!(map.value("flag"), Value::Boolean(None));
    }

    #[test]
    fn table_is_resized_to_the_last_batch() {
        let table = TableHolder::new([("name", Value::Varchar(None))])
            .with_rows([
                ["a".into()],
                ["b".into()],
                ["c".into()],
                ["d".into()],
            ])
            .unwrap();
        let mut output = OutputBind::new(
            token("t.name"),
            Output::Table {
                table: table.clone(),
                rows: None,
                column: "name".into(),
            },
        );
        for (i, v) in ["x", "y"].into_iter().enumerate() {
            output.next_batch(i);
            output.consume(v.into()).unwrap();
        }
        output.finish().unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(1, "name"), Some("y".into()));
    }

    #[test]
    fn empty_result_clears_the_table() {
        let table = TableHolder::new([("name", Value::Varchar(None))])
            .with_row(["a".into()])
            .unwrap();
        let mut output = OutputBind::new(
            token("t.name"),
            Output::Table {
                table: table.clone(),
                rows: None,
                column: "name".into(),
            },
        );
        output.finish().unwrap();
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn map_entry() {
        let map = ArgMap::new();
        let mut output = OutputBind::new(
            token("count"),
            Output::Map {
                map: map.clone(),
                key: "count".into(),
            },
        );
        output.next_batch(0);
        output.consume(Value::Int64(Some(12))).unwrap();
        output.finish().unwrap();
        assert_eq!(map.value("count"), Value::Int64(Some(12)));
    }
}
