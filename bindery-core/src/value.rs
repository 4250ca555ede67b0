use crate::{AsValue, BindError, Error, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::fmt::{self, Display};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed scalar moved between argument roots and the driver.
///
/// Every typed variant carries an `Option` payload: `None` is a NULL that still knows its type,
/// which is what the driver needs to bind a typed NULL.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Char(Option<char>),
    Varchar(Option<String>),
    Clob(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    Array(Option<Box<[Value]>>, /* type: */ Box<Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Char(l), Self::Char(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Clob(l), Self::Clob(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Array(l, ..), Self::Array(r, ..)) => l == r && self.same_type(other),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(.., l), Self::Array(.., r)) => l.same_type(r),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Char(None)
            | Value::Varchar(None)
            | Value::Clob(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::Array(None, ..) => true,
            _ => false,
        }
    }

    /// The NULL of the same type as this value.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(..) => Value::Decimal(None),
            Value::Char(..) => Value::Char(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Clob(..) => Value::Clob(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
            Value::Array(.., ty) => Value::Array(None, ty.clone()),
        }
    }

    /// Casts this value to the type of `prototype`, keeping NULL as a typed NULL.
    ///
    /// `Value::Null` as prototype means "any type": the value is returned unchanged.
    pub fn convert_to(self, prototype: &Value) -> Result<Value> {
        if matches!(prototype, Value::Null) || self.same_type(prototype) {
            return Ok(self);
        }
        if self.is_null() {
            return Ok(prototype.as_null());
        }
        macro_rules! convert {
            ($ty:ty, $variant:path) => {
                <$ty as AsValue>::try_from_value(self).map(|v| $variant(Some(v)))
            };
        }
        match prototype {
            Value::Boolean(..) => convert!(bool, Value::Boolean),
            Value::Int16(..) => convert!(i16, Value::Int16),
            Value::Int32(..) => convert!(i32, Value::Int32),
            Value::Int64(..) => convert!(i64, Value::Int64),
            Value::Float32(..) => convert!(f32, Value::Float32),
            Value::Float64(..) => convert!(f64, Value::Float64),
            Value::Decimal(..) => convert!(Decimal, Value::Decimal),
            Value::Char(..) => convert!(char, Value::Char),
            Value::Varchar(..) => convert!(String, Value::Varchar),
            Value::Clob(..) => convert!(String, Value::Clob),
            Value::Blob(..) => convert!(Box<[u8]>, Value::Blob),
            Value::Date(..) => convert!(Date, Value::Date),
            Value::Time(..) => convert!(Time, Value::Time),
            Value::Timestamp(..) => convert!(PrimitiveDateTime, Value::Timestamp),
            Value::TimestampWithTimezone(..) => {
                convert!(OffsetDateTime, Value::TimestampWithTimezone)
            }
            Value::Uuid(..) => convert!(Uuid, Value::Uuid),
            Value::Array(.., ty) => {
                let values = match self {
                    Value::Array(Some(values), ..) => values.into_vec(),
                    v => vec![v],
                };
                let values = values
                    .into_iter()
                    .map(|v| v.convert_to(ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(Some(values.into()), ty.clone()))
            }
            Value::Null => Ok(self),
        }
    }

    /// Elements of an array value, `None` for scalars.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(Some(v), ..) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Boolean(Some(v)) => Some(*v as i64),
            Value::Int16(Some(v)) => Some(*v as i64),
            Value::Int32(Some(v)) => Some(*v as i64),
            Value::Int64(Some(v)) => Some(*v),
            Value::Decimal(Some(v)) => v.to_i64(),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            v if v.is_null() => f.write_str("null"),
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int16(Some(v)) => write!(f, "{v}"),
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::Float32(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Decimal(Some(v)) => write!(f, "{v}"),
            Value::Char(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) | Value::Clob(Some(v)) => f.write_str(v),
            Value::Blob(Some(v)) => write!(f, "[{} bytes]", v.len()),
            Value::Date(Some(v)) => write!(f, "{v}"),
            Value::Time(Some(v)) => write!(f, "{v}"),
            Value::Timestamp(Some(v)) => write!(f, "{v}"),
            Value::TimestampWithTimezone(Some(v)) => write!(f, "{v}"),
            Value::Uuid(Some(v)) => write!(f, "{v}"),
            Value::Array(Some(v), ..) => {
                f.write_str("[")?;
                for (i, v) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            _ => f.write_str("null"),
        }
    }
}

/// Driver type code of a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Null,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Numeric,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Blob,
    LongVarbinary,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Other,
    Array,
}

impl SqlType {
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Null => "NULL",
            SqlType::Boolean => "BOOLEAN",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::Clob => "CLOB",
            SqlType::Blob => "BLOB",
            SqlType::LongVarbinary => "LONGVARBINARY",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            SqlType::Other => "OTHER",
            SqlType::Array => "ARRAY",
        }
    }

    /// Large objects never show up in diagnostic dumps.
    pub fn is_lob(&self) -> bool {
        matches!(
            self,
            SqlType::Blob | SqlType::Clob | SqlType::LongVarbinary | SqlType::LongVarchar
        )
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A driver bound value: type code plus value.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlBind {
    pub sql_type: SqlType,
    pub value: Value,
}

impl SqlBind {
    pub fn new(sql_type: SqlType, value: Value) -> Self {
        Self { sql_type, value }
    }
}

/// Three valued boolean: the undefined state binds as "either".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    False,
    True,
    #[default]
    Undefined,
}

impl TriState {
    pub fn integer_value(&self) -> Option<i32> {
        match self {
            TriState::False => Some(0),
            TriState::True => Some(1),
            TriState::Undefined => None,
        }
    }

    pub fn from_value(value: &Value) -> Result<TriState> {
        if value.is_null() {
            return Ok(TriState::Undefined);
        }
        match value {
            Value::Boolean(Some(v)) => Ok((*v).into()),
            v => match v.as_i64() {
                Some(0) => Ok(TriState::False),
                Some(1) => Ok(TriState::True),
                _ => Err(Error::new(BindError::Conversion {
                    value: v.to_string(),
                    target: "TriState",
                })),
            },
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::True } else { TriState::False }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.integer_value() {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("null"),
        }
    }
}
