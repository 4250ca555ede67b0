use crate::{
    Arg, BeanArrayRef, BeanRef, BindError, Error, Result, SqlBind, SqlDialect, TableHolder, Token,
    TriState, Value, negated_list_operator,
};
use std::{fmt::Write, sync::Arc};

/// Source of an input bind, chosen by the shape of the resolved value.
#[derive(Debug, Clone)]
pub enum Input {
    /// One value, the same for every batch.
    Single { value: Value },
    /// IN list, or one element per batch when the marker is a batch marker.
    Array { values: Vec<Value>, element: Value },
    /// One row per batch.
    Table {
        table: TableHolder,
        rows: Option<Vec<usize>>,
        column: String,
    },
    /// One bean per batch.
    BeanArray {
        array: BeanArrayRef,
        indices: Option<Vec<usize>>,
        property: String,
    },
    /// Property of each bean of a plain array, one bean per batch.
    BeanProperty { beans: Vec<BeanRef>, property: String },
    /// Undefined binds as the list `(0,1)`, defined as its integer code.
    TriState(TriState),
    /// Value computed once by the function resolver.
    Function { name: String, value: Box<Input> },
    /// Vendor SQL text.
    DialectLiteral { text: String },
}

impl Input {
    pub fn is_batch(&self, token: &Token) -> bool {
        match self {
            Input::Array { .. } | Input::TriState(TriState::Undefined) => token.batch,
            Input::Table { .. } | Input::BeanArray { .. } | Input::BeanProperty { .. } => true,
            _ => false,
        }
    }

    pub fn has_batch(&self, token: &Token, index: usize) -> bool {
        if !self.is_batch(token) {
            return index == 0;
        }
        match self {
            Input::Array { values, .. } => index < values.len(),
            Input::TriState(..) => index < 2,
            Input::Table { table, rows, .. } => match rows {
                Some(rows) => index < rows.len(),
                None => index < table.row_count(),
            },
            Input::BeanArray {
                array, indices, ..
            } => match indices {
                Some(indices) => index < indices.len(),
                None => index < array.0.read().len(),
            },
            Input::BeanProperty { beans, .. } => index < beans.len(),
            _ => index == 0,
        }
    }
}

/// What an input renders into for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Text replacing the marker (and its comparison prefix).
    pub text: String,
    pub bind: Option<SqlBind>,
}

/// An input bound to its token.
#[derive(Debug)]
pub struct InputBind {
    pub token: Arc<Token>,
    pub input: Input,
    /// Position of the driver placeholder, 1 based, `None` when rendered inline.
    pub driver_index: Option<usize>,
}

impl InputBind {
    pub fn new(token: Arc<Token>, input: Input) -> Self {
        Self {
            token,
            input,
            driver_index: None,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.input.is_batch(&self.token)
    }

    pub fn has_batch(&self, index: usize) -> bool {
        self.input.has_batch(&self.token, index)
    }

    /// Whether rendering produces a driver placeholder.
    pub fn is_driver_bind(&self, dialect: &dyn SqlDialect) -> bool {
        if self.token.plain_value || self.token.plain_sql {
            return false;
        }
        Self::binds(&self.input, &self.token, dialect)
    }

    fn binds(input: &Input, token: &Token, dialect: &dyn SqlDialect) -> bool {
        match input {
            Input::DialectLiteral { .. } => false,
            Input::Function { value, .. } => Self::binds(value, token, dialect),
            Input::Array { values, .. } if !token.batch => {
                token.comparison.is_some() && dialect.in_list_generates_bind(values)
            }
            Input::TriState(TriState::Undefined) if !token.batch => {
                token.comparison.is_some() && dialect.in_list_generates_bind(&tri_state_codes())
            }
            _ => true,
        }
    }

    /// Replacement text and driver value of batch `batch`.
    ///
    /// With `force_plain` every value is inlined as a literal (plain sql markers stay raw).
    pub fn render(
        &self,
        batch: usize,
        dialect: &dyn SqlDialect,
        force_plain: bool,
    ) -> Result<Rendered> {
        let plain = force_plain || self.token.plain_value;
        self.render_input(&self.input, batch, dialect, plain)
    }

    fn render_input(
        &self,
        input: &Input,
        batch: usize,
        dialect: &dyn SqlDialect,
        plain: bool,
    ) -> Result<Rendered> {
        match input {
            Input::Single { value } => Ok(self.render_scalar(value.clone(), dialect, plain)),
            Input::Array { values, element } => {
                if self.token.batch {
                    let value = values.get(batch).cloned().unwrap_or_else(|| element.clone());
                    Ok(self.render_scalar(value, dialect, plain))
                } else {
                    self.render_list(values, element, dialect, plain)
                }
            }
            Input::TriState(TriState::Undefined) => {
                let codes = tri_state_codes();
                if self.token.batch {
                    let value = codes.get(batch).cloned().unwrap_or(Value::Int32(None));
                    Ok(self.render_scalar(value, dialect, plain))
                } else {
                    self.render_list(&codes, &Value::Int32(None), dialect, plain)
                }
            }
            Input::TriState(value) => Ok(self.render_scalar(
                Value::Int32(value.integer_value()),
                dialect,
                plain,
            )),
            Input::Table { table, rows, column } => {
                let row = match rows {
                    Some(rows) => rows.get(batch).copied(),
                    None => Some(batch),
                };
                let value = row
                    .and_then(|row| table.value(row, column))
                    .unwrap_or(Value::Null);
                Ok(self.render_scalar(value, dialect, plain))
            }
            Input::BeanArray {
                array,
                indices,
                property,
            } => {
                let index = match indices {
                    Some(indices) => indices.get(batch).copied(),
                    None => Some(batch),
                };
                let value = index.and_then(|i| array.0.read().property(i, property));
                let value = self.scalar(value.unwrap_or_else(Arg::null), batch)?;
                Ok(self.render_scalar(value, dialect, plain))
            }
            Input::BeanProperty { beans, property } => {
                let value = beans
                    .get(batch)
                    .and_then(|bean| bean.0.read().property(property))
                    .unwrap_or_else(Arg::null);
                let value = self.scalar(value, batch)?;
                Ok(self.render_scalar(value, dialect, plain))
            }
            Input::Function { value, .. } => self.render_input(value, 0, dialect, plain),
            Input::DialectLiteral { text } => Ok(Rendered {
                text: text.clone(),
                bind: None,
            }),
        }
    }

    fn prefix(&self, out: &mut String) {
        if let Some(comparison) = &self.token.comparison {
            let _ = write!(out, "{} {} ", comparison.attribute, comparison.op);
        }
    }

    fn render_scalar(&self, value: Value, dialect: &dyn SqlDialect, plain: bool) -> Rendered {
        let mut text = String::new();
        self.prefix(&mut text);
        if self.token.plain_sql {
            let _ = write!(text, "{}", value);
            Rendered { text, bind: None }
        } else if plain {
            dialect.write_value(&mut text, &value);
            Rendered { text, bind: None }
        } else {
            text.push('?');
            Rendered {
                text,
                bind: Some(dialect.build_bind(&value)),
            }
        }
    }

    fn render_list(
        &self,
        values: &[Value],
        element: &Value,
        dialect: &dyn SqlDialect,
        plain: bool,
    ) -> Result<Rendered> {
        let mut text = String::new();
        let Some(comparison) = &self.token.comparison else {
            if self.token.plain_sql {
                text.push('(');
                crate::separated_by(
                    &mut text,
                    values,
                    |out, v| {
                        let _ = write!(out, "{}", v);
                    },
                    ",",
                );
                text.push(')');
            } else {
                dialect.write_value_list(&mut text, values);
            }
            return Ok(Rendered { text, bind: None });
        };
        let negated = negated_list_operator(&self.token.parsed, &comparison.op)?;
        if !plain && !self.token.plain_sql && dialect.in_list_generates_bind(values) {
            if negated {
                dialect.write_not_in_list_bind(&mut text, &comparison.attribute);
            } else {
                dialect.write_in_list_bind(&mut text, &comparison.attribute);
            }
            let array = Value::Array(Some(values.into()), element.clone().into());
            return Ok(Rendered {
                text,
                bind: Some(dialect.build_bind(&array)),
            });
        }
        if negated {
            dialect.write_not_in_list(&mut text, &comparison.attribute, values);
        } else {
            dialect.write_in_list(&mut text, &comparison.attribute, values);
        }
        Ok(Rendered { text, bind: None })
    }

    fn scalar(&self, arg: Arg, index: usize) -> Result<Value> {
        scalar_value(&self.token, arg, index).inspect_err(|e| log::error!("{:#}", e))
    }
}

fn tri_state_codes() -> [Value; 2] {
    [Value::Int32(Some(0)), Value::Int32(Some(1))]
}

/// The scalar carried by `arg`, holders are read.
pub(crate) fn scalar_value(token: &Token, arg: Arg, index: usize) -> Result<Value> {
    match arg {
        Arg::Value(v) => Ok(v),
        Arg::TriState(v) => Ok(Value::Int32(v.integer_value())),
        Arg::Holder(h) => Ok(h.value()),
        arg => Err(Error::new(BindError::NotScalar {
            token: token.parsed.clone(),
            index,
        })
        .context(format!("Found a {}", arg.shape()))),
    }
}

/// Scalars carried by the elements of an array or collection.
pub(crate) fn scalar_values(token: &Token, items: Vec<Arg>) -> Result<Vec<Value>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| scalar_value(token, v, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnsiDialect, PostgresDialect, SqlType, TemplateBuilder};

    fn token(builder: TemplateBuilder) -> Arc<Token> {
        builder.build().tokens[0].clone()
    }

    fn ints(values: impl IntoIterator<Item = i32>) -> Vec<Value> {
        values.into_iter().map(|v| Value::Int32(Some(v))).collect()
    }

    #[test]
    fn scalar_is_bound_unchanged() {
        let bind = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", "=", "id")),
            Input::Single {
                value: Value::Int64(Some(7)),
            },
        );
        assert!(!bind.is_batch());
        assert!(bind.has_batch(0));
        assert!(!bind.has_batch(1));
        let rendered = bind.render(0, &AnsiDialect, false).unwrap();
        assert_eq!(rendered.text, "id = ?");
        assert_eq!(
            rendered.bind,
            Some(SqlBind::new(SqlType::BigInt, Value::Int64(Some(7))))
        );
        let plain = bind.render(0, &AnsiDialect, true).unwrap();
        assert_eq!(plain.text, "id = 7");
        assert_eq!(plain.bind, None);
    }

    #[test]
    fn list_rewrites_the_comparison() {
        let input = Input::Array {
            values: ints([3, 7, 9]),
            element: Value::Int32(None),
        };
        let equal = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", "=", "ids")),
            input.clone(),
        );
        assert!(!equal.is_driver_bind(&AnsiDialect));
        assert_eq!(
            equal.render(0, &AnsiDialect, false).unwrap().text,
            "((id IN (3,7,9)))"
        );
        let different = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", "<>", "ids")),
            input.clone(),
        );
        assert_eq!(
            different.render(0, &AnsiDialect, false).unwrap().text,
            "((id NOT IN (3,7,9)))"
        );
        let greater = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", ">", "ids")),
            input,
        );
        assert!(greater.render(0, &AnsiDialect, false).is_err());
    }

    #[test]
    fn empty_list() {
        let bind = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", "IN", "ids")),
            Input::Array {
                values: Vec::new(),
                element: Value::Int32(None),
            },
        );
        assert!(!bind.is_driver_bind(&PostgresDialect));
        let rendered = bind.render(0, &PostgresDialect, false).unwrap();
        assert_eq!(rendered.text, "id is null");
        assert_eq!(rendered.bind, None);
    }

    #[test]
    fn array_bind_list() {
        let bind = InputBind::new(
            token(TemplateBuilder::new().input_cmp("id", "!=", "ids")),
            Input::Array {
                values: ints([1, 2]),
                element: Value::Int32(None),
            },
        );
        assert!(bind.is_driver_bind(&PostgresDialect));
        let rendered = bind.render(0, &PostgresDialect, false).unwrap();
        assert_eq!(rendered.text, "NOT (id = ANY (?))");
        assert_eq!(rendered.bind.map(|b| b.sql_type), Some(SqlType::Array));
    }

    #[test]
    fn batch_array_binds_elements() {
        let bind = InputBind::new(
            token(TemplateBuilder::new().batch_input("v")),
            Input::Array {
                values: ints([4, 5]),
                element: Value::Int32(None),
            },
        );
        assert!(bind.is_batch());
        assert!(bind.has_batch(1));
        assert!(!bind.has_batch(2));
        let rendered = bind.render(1, &AnsiDialect, false).unwrap();
        assert_eq!(rendered.text, "?");
        assert_eq!(rendered.bind.unwrap().value, Value::Int32(Some(5)));
    }

    #[test]
    fn tri_state() {
        let undefined = InputBind::new(
            token(TemplateBuilder::new().input_cmp("active", "=", "active")),
            Input::TriState(TriState::Undefined),
        );
        assert_eq!(
            undefined.render(0, &AnsiDialect, false).unwrap().text,
            "((active IN (0,1)))"
        );
        let defined = InputBind::new(
            token(TemplateBuilder::new().input_cmp("active", "=", "active")),
            Input::TriState(TriState::True),
        );
        assert_eq!(
            defined.render(0, &AnsiDialect, false).unwrap().bind,
            Some(SqlBind::new(SqlType::Integer, Value::Int32(Some(1))))
        );
    }

    #[test]
    fn plain_markers() {
        let plain_value = InputBind::new(
            token(TemplateBuilder::new().plain_value("name")),
            Input::Single {
                value: "o'neil".into(),
            },
        );
        assert!(!plain_value.is_driver_bind(&AnsiDialect));
        assert_eq!(
            plain_value.render(0, &AnsiDialect, false).unwrap().text,
            "'o''neil'"
        );
        let plain_sql = InputBind::new(
            token(TemplateBuilder::new().plain_sql("order")),
            Input::Single {
                value: "name DESC".into(),
            },
        );
        assert_eq!(
            plain_sql.render(0, &AnsiDialect, true).unwrap().text,
            "name DESC"
        );
    }

    #[test]
    fn plain_sql_list() {
        let bind = InputBind::new(
            token(TemplateBuilder::new().plain_sql("columns")),
            Input::Array {
                values: vec!["id".into(), "name".into(), Value::Int32(Some(2))],
                element: Value::Varchar(None),
            },
        );
        assert_eq!(
            bind.render(0, &AnsiDialect, false).unwrap().text,
            "(id,name,2)"
        );
    }

    #[test]
    fn table_rows() {
        let table = TableHolder::new([("id", Value::Int32(None))])
            .with_rows([
                [1.into()],
                [2.into()],
                [3.into()],
            ])
            .unwrap();
        let bind = InputBind::new(
            token(TemplateBuilder::new().input("t.id")),
            Input::Table {
                table: table.clone(),
                rows: Some(vec![2, 0]),
                column: "id".into(),
            },
        );
        assert!(bind.is_batch());
        assert!(bind.has_batch(1));
        assert!(!bind.has_batch(2));
        assert_eq!(
            bind.render(0, &AnsiDialect, false).unwrap().bind.unwrap().value,
            Value::Int32(Some(3))
        );
    }
}
