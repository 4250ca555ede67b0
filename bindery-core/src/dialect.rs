use crate::{BindError, Error, Result, SqlBind, SqlType, Value, separated_by};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($out:ident, $value:expr) => {{
        if $value.is_finite() {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        } else {
            let _ = write!($out, "'{}'", $value);
        }
    }};
}

/// Vendor specific knowledge needed to bind and inline values.
///
/// Every method has a default producing generic SQL, implementations override what their database
/// does differently.
pub trait SqlDialect: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlDialect;

    fn name(&self) -> &'static str;

    /// Maximum number of elements of a single `IN (...)` list.
    fn max_list_size(&self) -> usize {
        1000
    }

    /// Strings longer than this are bound as large objects and truncated when inlined.
    fn max_string_length(&self) -> usize {
        4000
    }

    fn is_large_string(&self, value: &str) -> bool {
        value.chars().nth(self.max_string_length()).is_some()
    }

    fn clob_enabled(&self) -> bool {
        true
    }

    fn blob_enabled(&self) -> bool {
        true
    }

    /// Escape occurrences of `search` with `replace` while copying into `out`.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Render a value as an SQL literal.
    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(out, *v),
            Value::Float64(Some(v)) => write_float!(out, *v),
            Value::Decimal(Some(v)) => {
                let _ = write!(out, "{}", v);
            }
            Value::Char(Some(v)) => {
                let mut buf = [0u8; 4];
                self.write_value_string(out, v.encode_utf8(&mut buf));
            }
            Value::Varchar(Some(v)) | Value::Clob(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            Value::Date(Some(v)) => self.write_value_date(out, v),
            Value::Time(Some(v)) => self.write_value_time(out, v),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(out, v),
            Value::TimestampWithTimezone(Some(v)) => self.write_value_timestamptz(out, v),
            Value::Uuid(Some(v)) => {
                let _ = write!(out, "'{}'", v);
            }
            Value::Array(Some(v), ..) => self.write_value_list(out, v),
            _ => self.write_value_none(out),
        }
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("null");
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push(if value { '1' } else { '0' });
    }

    /// Quoted string literal, truncated to `max_string_length` characters.
    fn write_value_string(&self, out: &mut String, value: &str) {
        let max = self.max_string_length();
        let value = match value.char_indices().nth(max) {
            Some((end, _)) => {
                let truncated = &value[..end];
                log::warn!(
                    "Plain text of a string with more than {} characters, truncated to '{}'",
                    max,
                    crate::truncate_long!(truncated)
                );
                truncated
            }
            None => value,
        };
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    /// Binary content cannot be inlined.
    fn write_value_blob(&self, out: &mut String, _value: &[u8]) {
        log::warn!("Plain text of a BLOB is not supported, using NULL");
        out.push_str("NULL");
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        let _ = write!(
            out,
            "DATE '{:04}-{:02}-{:02}'",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let _ = write!(
            out,
            "TIME '{:02}:{:02}:{:02}'",
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn write_value_timestamp(&self, out: &mut String, value: &PrimitiveDateTime) {
        let _ = write!(
            out,
            "TIMESTAMP '{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
            value.year(),
            value.month() as u8,
            value.day(),
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn write_value_timestamptz(&self, out: &mut String, value: &OffsetDateTime) {
        let (h, m, _) = value.offset().as_hms();
        let _ = write!(
            out,
            "TIMESTAMP WITH TIME ZONE '{:04}-{:02}-{:02} {:02}:{:02}:{:02}{:+03}:{:02}'",
            value.year(),
            value.month() as u8,
            value.day(),
            value.hour(),
            value.minute(),
            value.second(),
            h,
            m.abs()
        );
    }

    /// `(a,b,c)`, an empty list is `(-1)` so that the statement stays valid.
    fn write_value_list(&self, out: &mut String, values: &[Value]) {
        out.push('(');
        if values.is_empty() {
            out.push_str("-1");
        } else {
            separated_by(out, values, |out, v| self.write_value(out, v), ",");
        }
        out.push(')');
    }

    fn plain_text(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value);
        out
    }

    /// Driver type code and value for a bind.
    fn build_bind(&self, value: &Value) -> SqlBind {
        let sql_type = match value {
            Value::Null => SqlType::Null,
            Value::Boolean(v) => {
                return SqlBind::new(SqlType::Integer, Value::Int32(v.map(|v| v as i32)));
            }
            Value::Int16(..) => SqlType::SmallInt,
            Value::Int32(..) => SqlType::Integer,
            Value::Int64(..) => SqlType::BigInt,
            Value::Float32(..) => SqlType::Float,
            Value::Float64(..) => SqlType::Double,
            Value::Decimal(..) => SqlType::Numeric,
            Value::Char(v) => {
                return SqlBind::new(SqlType::Varchar, Value::Varchar(v.map(String::from)));
            }
            Value::Varchar(Some(v)) if self.is_large_string(v) => self.large_text_type(),
            Value::Varchar(..) => SqlType::Varchar,
            Value::Clob(None) => SqlType::Varchar,
            Value::Clob(Some(..)) => self.large_text_type(),
            Value::Blob(..) => {
                if self.blob_enabled() {
                    SqlType::Blob
                } else {
                    SqlType::LongVarbinary
                }
            }
            Value::Date(..) => SqlType::Date,
            Value::Time(..) => SqlType::Time,
            Value::Timestamp(..) => SqlType::Timestamp,
            Value::TimestampWithTimezone(..) => SqlType::TimestampWithTimezone,
            Value::Uuid(..) => SqlType::Other,
            Value::Array(..) => SqlType::Array,
        };
        SqlBind::new(sql_type, value.clone())
    }

    fn large_text_type(&self) -> SqlType {
        if self.clob_enabled() {
            SqlType::Clob
        } else {
            SqlType::LongVarchar
        }
    }

    /// Type registered for a stored procedure output expecting values like `prototype`.
    fn output_type(&self, prototype: &Value) -> SqlType {
        match prototype {
            Value::Boolean(..) | Value::Int32(..) => SqlType::Integer,
            Value::Int16(..) => SqlType::SmallInt,
            Value::Int64(..) => SqlType::BigInt,
            Value::Float32(..) => SqlType::Float,
            Value::Float64(..) => SqlType::Double,
            Value::Char(..) | Value::Varchar(..) | Value::Clob(..) => SqlType::Varchar,
            Value::Blob(..) => {
                if self.blob_enabled() {
                    SqlType::Blob
                } else {
                    SqlType::LongVarbinary
                }
            }
            Value::Date(..) => SqlType::Date,
            Value::Time(..) => SqlType::Time,
            Value::Timestamp(..) => SqlType::Timestamp,
            Value::TimestampWithTimezone(..) => SqlType::TimestampWithTimezone,
            Value::Array(..) => SqlType::Array,
            Value::Null | Value::Decimal(..) | Value::Uuid(..) => SqlType::Numeric,
        }
    }

    fn write_null_check(&self, out: &mut String, attribute: &str) {
        out.push_str(attribute);
        out.push_str(" is null");
    }

    fn write_not_null_check(&self, out: &mut String, attribute: &str) {
        out.push_str(attribute);
        out.push_str(" is not null");
    }

    /// Whether IN lists are rendered as a single array bind instead of inline literals.
    fn in_list_generates_bind(&self, _values: &[Value]) -> bool {
        false
    }

    /// `((attribute IN (..)) OR (attribute IN (..)))`, one group every `max_list_size` values.
    fn write_in_list(&self, out: &mut String, attribute: &str, values: &[Value]) {
        if values.is_empty() {
            return self.write_null_check(out, attribute);
        }
        self.write_in_list_chunks(out, attribute, values, " IN ", " OR ");
    }

    fn write_not_in_list(&self, out: &mut String, attribute: &str, values: &[Value]) {
        if values.is_empty() {
            return self.write_not_null_check(out, attribute);
        }
        self.write_in_list_chunks(out, attribute, values, " NOT IN ", " AND ");
    }

    fn write_in_list_chunks(
        &self,
        out: &mut String,
        attribute: &str,
        values: &[Value],
        op: &str,
        join: &str,
    ) {
        out.push('(');
        separated_by(
            out,
            values.chunks(self.max_list_size().max(1)),
            |out, chunk| {
                out.push('(');
                out.push_str(attribute);
                out.push_str(op);
                out.push('(');
                separated_by(out, chunk, |out, v| self.write_value(out, v), ",");
                out.push_str("))");
            },
            join,
        );
        out.push(')');
    }

    /// IN list as a single array bind, used when `in_list_generates_bind` holds.
    fn write_in_list_bind(&self, out: &mut String, attribute: &str) {
        out.push_str(attribute);
        out.push_str(" = ANY (?)");
    }

    fn write_not_in_list_bind(&self, out: &mut String, attribute: &str) {
        out.push_str("NOT (");
        self.write_in_list_bind(out, attribute);
        out.push(')');
    }

    fn sysdate_token(&self) -> &'static str {
        "SYSDATE"
    }

    fn upper_token(&self) -> &'static str {
        "UPPER"
    }

    fn lower_token(&self) -> &'static str {
        "LOWER"
    }

    fn trim_token(&self) -> &'static str {
        "TRIM"
    }

    fn nvl_token(&self) -> &'static str {
        "NVL"
    }

    /// Vendor spelling of a `$$name` literal, unknown names are kept lowercased.
    fn dialect_literal(&self, name: &str) -> String {
        let name = name.to_lowercase();
        match name.as_str() {
            "sysdate" => self.sysdate_token().into(),
            "upper" => self.upper_token().into(),
            "lower" => self.lower_token().into(),
            "trim" => self.trim_token().into(),
            "nvl" => self.nvl_token().into(),
            _ => {
                log::warn!("Used unknown database specific token `$${}`", name);
                name
            }
        }
    }

    /// Grow the cursor fetch size while reading, bounded by `Config::max_fetch_memory`.
    fn dynamic_fetch_size(&self) -> bool {
        false
    }

    /// Query returning the next value of a sequence.
    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("SELECT NEXT VALUE FOR {}", sequence))
    }
}

/// Generic SQL, closest to the standard.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiDialect;

impl SqlDialect for AnsiDialect {
    fn as_dyn(&self) -> &dyn SqlDialect {
        self
    }

    fn name(&self) -> &'static str {
        "ansi"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn as_dyn(&self) -> &dyn SqlDialect {
        self
    }

    fn name(&self) -> &'static str {
        "oracle"
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        self.write_value_timestamp(out, &value.midnight());
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let _ = write!(
            out,
            "to_date('{:02}:{:02}:{:02}','hh24:mi:ss')",
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn write_value_timestamp(&self, out: &mut String, value: &PrimitiveDateTime) {
        let _ = write!(
            out,
            "to_date('{:02}.{:02}.{:04} {:02}:{:02}:{:02}','dd.mm.yyyy hh24:mi:ss')",
            value.day(),
            value.month() as u8,
            value.year(),
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn write_value_timestamptz(&self, out: &mut String, value: &OffsetDateTime) {
        self.write_value_timestamp(out, &PrimitiveDateTime::new(value.date(), value.time()));
    }

    fn dynamic_fetch_size(&self) -> bool {
        true
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        Ok(format!("SELECT {}.NEXTVAL FROM DUAL", sequence))
    }
}

/// PostgreSQL binds whole lists as arrays (`attribute = ANY (?)`).
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn as_dyn(&self) -> &dyn SqlDialect {
        self
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("'\\x");
        out.push_str(&hex::encode(value));
        out.push('\'');
    }

    fn build_bind(&self, value: &Value) -> SqlBind {
        match value {
            Value::Boolean(..) => SqlBind::new(SqlType::Boolean, value.clone()),
            Value::Clob(Some(..)) => SqlBind::new(SqlType::LongVarchar, value.clone()),
            Value::Blob(..) => SqlBind::new(SqlType::LongVarbinary, value.clone()),
            _ => AnsiDialect.build_bind(value),
        }
    }

    fn output_type(&self, prototype: &Value) -> SqlType {
        match prototype {
            Value::Boolean(..) => SqlType::Boolean,
            _ => AnsiDialect.output_type(prototype),
        }
    }

    fn in_list_generates_bind(&self, values: &[Value]) -> bool {
        !values.is_empty()
    }

    fn sysdate_token(&self) -> &'static str {
        "now()"
    }

    fn nvl_token(&self) -> &'static str {
        "COALESCE"
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        let mut out = String::from("SELECT nextval('");
        self.write_escaped(&mut out, sequence, '\'', "''");
        out.push_str("')");
        Ok(out)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn as_dyn(&self) -> &dyn SqlDialect {
        self
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        let _ = write!(
            out,
            "'{:04}-{:02}-{:02}'",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let _ = write!(
            out,
            "'{:02}:{:02}:{:02}'",
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn write_value_timestamp(&self, out: &mut String, value: &PrimitiveDateTime) {
        let _ = write!(
            out,
            "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
            value.year(),
            value.month() as u8,
            value.day(),
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    fn clob_enabled(&self) -> bool {
        false
    }

    fn blob_enabled(&self) -> bool {
        false
    }

    fn sysdate_token(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn nvl_token(&self) -> &'static str {
        "IFNULL"
    }

    fn sequence_next_value(&self, sequence: &str) -> Result<String> {
        let error = Error::msg(format!(
            "SQLite does not support sequences (requested `{}`)",
            sequence
        ));
        log::error!("{:#}", error);
        Err(error)
    }
}

/// Checks the comparison operator written before a list bind, `true` for a negated list.
pub(crate) fn negated_list_operator(token: &str, op: &str) -> Result<bool> {
    match op.trim().to_ascii_uppercase().as_str() {
        "=" | "IN" => Ok(false),
        "<>" | "!=" | "NOT IN" => Ok(true),
        _ => {
            let error = Error::new(BindError::UnsupportedOperator {
                token: token.into(),
                op: op.into(),
            });
            log::error!("{:#}", error);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn ints(values: impl IntoIterator<Item = i32>) -> Vec<Value> {
        values.into_iter().map(|v| Value::Int32(Some(v))).collect()
    }

    #[test]
    fn plain_text_literals() {
        let dialect = AnsiDialect;
        assert_eq!(dialect.plain_text(&Value::Null), "null");
        assert_eq!(dialect.plain_text(&Value::Int64(None)), "null");
        assert_eq!(dialect.plain_text(&Value::Boolean(Some(true))), "1");
        assert_eq!(dialect.plain_text(&Value::Float64(Some(1.5))), "1.5");
        assert_eq!(dialect.plain_text(&"it's".into()), "'it''s'");
        assert_eq!(
            dialect.plain_text(&Value::Blob(Some([1u8, 2].into()))),
            "NULL"
        );
        assert_eq!(
            dialect.plain_text(&Value::Date(Some(date!(2024 - 02 - 29)))),
            "DATE '2024-02-29'"
        );
        assert_eq!(
            dialect.plain_text(&Value::Array(Some([].into()), Value::Int32(None).into())),
            "(-1)"
        );
        assert_eq!(
            dialect.plain_text(&Value::Array(
                Some(ints([1, 2]).into()),
                Value::Int32(None).into()
            )),
            "(1,2)"
        );
    }

    #[test]
    fn long_strings_are_truncated() {
        let dialect = AnsiDialect;
        let text = "x".repeat(4100);
        let plain = dialect.plain_text(&Value::Varchar(Some(text)));
        assert_eq!(plain.len(), 4002);
    }

    #[test]
    fn oracle_dates() {
        let dialect = OracleDialect;
        assert_eq!(
            dialect.plain_text(&Value::Timestamp(Some(datetime!(2023-07-04 13:05:09)))),
            "to_date('04.07.2023 13:05:09','dd.mm.yyyy hh24:mi:ss')"
        );
        assert!(dialect.dynamic_fetch_size());
        assert_eq!(
            dialect.sequence_next_value("seq_order").unwrap(),
            "SELECT seq_order.NEXTVAL FROM DUAL"
        );
    }

    #[test]
    fn in_lists() {
        let dialect = AnsiDialect;
        let mut out = String::new();
        dialect.write_in_list(&mut out, "id", &ints([1, 2, 3]));
        assert_eq!(out, "((id IN (1,2,3)))");
        out.clear();
        dialect.write_not_in_list(&mut out, "id", &ints([4]));
        assert_eq!(out, "((id NOT IN (4)))");
        out.clear();
        dialect.write_in_list(&mut out, "id", &[]);
        assert_eq!(out, "id is null");
        out.clear();
        dialect.write_not_in_list(&mut out, "id", &[]);
        assert_eq!(out, "id is not null");
    }

    #[test]
    fn in_list_chunks() {
        let dialect = AnsiDialect;
        let mut out = String::new();
        dialect.write_in_list(&mut out, "id", &ints(0..2001));
        assert_eq!(out.matches(" IN (").count(), 3);
        assert_eq!(out.matches(" OR ").count(), 2);
        assert!(out.ends_with("(id IN (2000)))"));
        out.clear();
        dialect.write_not_in_list(&mut out, "id", &ints(0..1001));
        assert_eq!(out.matches(" AND ").count(), 1);
    }

    #[test]
    fn binds() {
        let dialect = AnsiDialect;
        assert_eq!(dialect.build_bind(&Value::Null).sql_type, SqlType::Null);
        assert_eq!(
            dialect.build_bind(&Value::Boolean(Some(true))),
            SqlBind::new(SqlType::Integer, Value::Int32(Some(1)))
        );
        assert_eq!(
            dialect.build_bind(&Value::Varchar(None)).sql_type,
            SqlType::Varchar
        );
        assert_eq!(
            dialect
                .build_bind(&Value::Varchar(Some("y".repeat(4001))))
                .sql_type,
            SqlType::Clob
        );
        assert_eq!(
            SqliteDialect
                .build_bind(&Value::Varchar(Some("y".repeat(4001))))
                .sql_type,
            SqlType::LongVarchar
        );
        assert_eq!(
            dialect.build_bind(&Value::Char(Some('c'))),
            SqlBind::new(SqlType::Varchar, "c".into())
        );
        assert_eq!(
            PostgresDialect.build_bind(&Value::Boolean(Some(false))).sql_type,
            SqlType::Boolean
        );
    }

    #[test]
    fn dialect_literals() {
        assert_eq!(AnsiDialect.dialect_literal("SysDate"), "SYSDATE");
        assert_eq!(PostgresDialect.dialect_literal("sysdate"), "now()");
        assert_eq!(PostgresDialect.dialect_literal("nvl"), "COALESCE");
        assert_eq!(SqliteDialect.dialect_literal("NVL"), "IFNULL");
        assert_eq!(AnsiDialect.dialect_literal("Custom"), "custom");
    }

    #[test]
    fn list_operators() {
        assert!(!negated_list_operator(":ids", "=").unwrap());
        assert!(!negated_list_operator(":ids", "in").unwrap());
        assert!(negated_list_operator(":ids", "<>").unwrap());
        assert!(negated_list_operator(":ids", "not in").unwrap());
        let error = negated_list_operator(":ids", ">").unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn postgres_lists_and_sequences() {
        let dialect = PostgresDialect;
        assert!(dialect.in_list_generates_bind(&ints([1])));
        assert!(!dialect.in_list_generates_bind(&[]));
        let mut out = String::new();
        dialect.write_not_in_list_bind(&mut out, "id");
        assert_eq!(out, "NOT (id = ANY (?))");
        assert_eq!(
            dialect.sequence_next_value("s").unwrap(),
            "SELECT nextval('s')"
        );
        assert!(SqliteDialect.sequence_next_value("s").is_err());
    }
}
