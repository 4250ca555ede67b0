use crate::{Error, Result, Value, truncate_long};
use atoi::FromRadix10SignedChecked;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339,
    macros::format_description,
};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// This is what bean properties, holders and row accessors use to move values in and out of the
/// argument graph.
///
/// # Conversion contract
/// - `try_from_value` accepts the canonical variant for the type (e.g. `Value::Int32` for `i32`)
///   and, where it is lossless, the other numeric widths with range checks.
/// - Text values are parsed, the whole text must be consumed (`123abc` is an error).
/// - A typed NULL converts only into `Option<T>`.
///
/// # Examples
/// ```rust
/// use bindery_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The typed NULL of this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn conversion_error<T>(value: &Value) -> Error {
    let error = Error::msg(format!(
        "Cannot convert {} to {}",
        truncate_long!(format!("{:?}", value)),
        any::type_name::<T>(),
    ));
    log::error!("{:#}", error);
    error
}

fn parse_integer<T: FromRadix10SignedChecked>(value: &Value, text: &str) -> Result<T> {
    let text = text.trim();
    match T::from_radix_10_signed_checked(text.as_bytes()) {
        (Some(v), len) if len == text.len() && len > 0 => Ok(v),
        _ => Err(conversion_error::<T>(value)),
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                let result = match &value {
                    $destination(Some(v)) => Some(*v),
                    Value::Boolean(Some(v)) => Some(*v as _),
                    Value::Int16(Some(v)) => <$source>::try_from(*v).ok(),
                    Value::Int32(Some(v)) => <$source>::try_from(*v).ok(),
                    Value::Int64(Some(v)) => <$source>::try_from(*v).ok(),
                    Value::Decimal(Some(v)) if v.fract().is_zero() => {
                        v.to_i64().and_then(|v| <$source>::try_from(v).ok())
                    }
                    Value::Float32(Some(v)) if v.fract() == 0.0 => {
                        <$source>::from_f32(*v)
                    }
                    Value::Float64(Some(v)) if v.fract() == 0.0 => {
                        <$source>::from_f64(*v)
                    }
                    Value::Varchar(Some(v)) => return parse_integer(&value, v),
                    _ => None,
                };
                result.ok_or_else(|| conversion_error::<Self>(&value))
            }
        }
    };
}
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                let result = match &value {
                    $destination(Some(v)) => Some(*v),
                    Value::Int16(Some(v)) => Some(*v as _),
                    Value::Int32(Some(v)) => Some(*v as _),
                    Value::Int64(Some(v)) => Some(*v as _),
                    Value::Float32(Some(v)) => Some(*v as _),
                    Value::Float64(Some(v)) => Some(*v as _),
                    Value::Decimal(Some(v)) => v.to_f64().map(|v| v as _),
                    Value::Varchar(Some(v)) => fast_float::parse(v.trim()).ok(),
                    _ => None,
                };
                result.ok_or_else(|| conversion_error::<Self>(&value))
            }
        }
    };
}
impl_as_value_float!(f32, Value::Float32);
impl_as_value_float!(f64, Value::Float64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Boolean(Some(v)) => Ok(*v),
            Value::Int16(Some(v)) => Ok(*v != 0),
            Value::Int32(Some(v)) => Ok(*v != 0),
            Value::Int64(Some(v)) => Ok(*v != 0),
            Value::Decimal(Some(v)) => Ok(!v.is_zero()),
            Value::Varchar(Some(v)) => match v.trim() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => Err(conversion_error::<Self>(&value)),
            },
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let result = match &value {
            Value::Decimal(Some(v)) => Some(*v),
            Value::Int16(Some(v)) => Some((*v).into()),
            Value::Int32(Some(v)) => Some((*v).into()),
            Value::Int64(Some(v)) => Some((*v).into()),
            Value::Float32(Some(v)) => Decimal::from_f32(*v),
            Value::Float64(Some(v)) => Decimal::from_f64(*v),
            Value::Varchar(Some(v)) => v.trim().parse().ok(),
            _ => None,
        };
        result.ok_or_else(|| conversion_error::<Self>(&value))
    }
}

impl AsValue for char {
    fn as_empty_value() -> Value {
        Value::Char(None)
    }
    fn as_value(self) -> Value {
        Value::Char(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Char(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) if v.chars().count() == 1 => {
                v.chars().next().ok_or_else(|| conversion_error::<Self>(&value))
            }
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) | Value::Clob(Some(v)) => Ok(v),
            Value::Char(Some(v)) => Ok(v.into()),
            Value::Blob(..) | Value::Array(..) => Err(conversion_error::<Self>(&value)),
            v if v.is_null() => Err(conversion_error::<Self>(&v)),
            v => Ok(v.to_string()),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) | Value::Clob(Some(v)) => Ok(v.into_bytes().into()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]>>::try_from_value(value).map(Into::into)
    }
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $destination:path, $parse:expr) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    Value::Varchar(Some(v)) => match ($parse)(v.trim()) {
                        Ok(result) => Ok(result),
                        Err(_) => Err(conversion_error::<Self>(&Value::Varchar(Some(v)))),
                    },
                    v => Self::try_from_other(v),
                }
            }
        }
    };
}

trait FromOtherTemporal: Sized {
    fn try_from_other(value: Value) -> Result<Self> {
        Err(conversion_error::<Self>(&value))
    }
}
impl FromOtherTemporal for Time {
    fn try_from_other(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(v.time()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}
impl FromOtherTemporal for Date {
    fn try_from_other(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(v.date()),
            Value::TimestampWithTimezone(Some(v)) => Ok(v.date()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}
impl FromOtherTemporal for PrimitiveDateTime {
    fn try_from_other(value: Value) -> Result<Self> {
        match value {
            Value::Date(Some(v)) => Ok(v.midnight()),
            Value::TimestampWithTimezone(Some(v)) => Ok(PrimitiveDateTime::new(v.date(), v.time())),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}
impl FromOtherTemporal for OffsetDateTime {
    fn try_from_other(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}

impl_as_value_temporal!(Date, Value::Date, |v| Date::parse(
    v,
    format_description!("[year]-[month]-[day]")
));
impl_as_value_temporal!(Time, Value::Time, |v: &str| Time::parse(
    v,
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]")
)
.or_else(|_| Time::parse(v, format_description!("[hour]:[minute]"))));
impl_as_value_temporal!(PrimitiveDateTime, Value::Timestamp, |v: &str| {
    PrimitiveDateTime::parse(
        v,
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            v,
            format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )
    })
});
impl_as_value_temporal!(OffsetDateTime, Value::TimestampWithTimezone, |v| {
    OffsetDateTime::parse(v, &Rfc3339)
});

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => {
                Uuid::parse_str(v.trim()).map_err(|_| conversion_error::<Self>(&value))
            }
            Value::Blob(Some(v)) => {
                Uuid::from_slice(v).map_err(|_| conversion_error::<Self>(&value))
            }
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}
