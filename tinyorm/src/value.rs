use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::result::{DbResult, TinyOrmError};

/// A single scalar column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Convert the value the way SQLite column affinity converts a compared operand.
    ///
    /// Text columns compare numbers as their text form, numeric columns parse
    /// numeric text. Anything that does not convert cleanly is returned unchanged.
    pub fn coerce(self, ty: SqlType) -> Value {
        match (ty, self) {
            (SqlType::Text, Value::Integer(v)) => Value::Text(v.to_string()),
            (SqlType::Text, Value::Real(v)) => Value::Text(format!("{:?}", v)),
            (SqlType::Integer, Value::Text(text)) => match text.trim().parse::<i64>() {
                Ok(v) => Value::Integer(v),
                Err(_) => Value::Text(text),
            },
            (SqlType::Integer, Value::Real(v)) if v.fract() == 0.0 => Value::Integer(v as i64),
            (SqlType::Real, Value::Integer(v)) => Value::Real(v as f64),
            (SqlType::Real, Value::Text(text)) => match text.trim().parse::<f64>() {
                Ok(v) => Value::Real(v),
                Err(_) => Value::Text(text),
            },
            (_, value) => value,
        }
    }

    fn mismatch(&self, expected: &str) -> TinyOrmError {
        TinyOrmError::Decode(format!("expected {}, found {}", expected, self.kind()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl<F: Field> From<F> for Value {
    fn from(field: F) -> Self {
        field.into_value()
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Real(v) => ValueRef::Real(*v),
            Value::Text(v) => ValueRef::Text(v.as_bytes()),
            Value::Blob(v) => ValueRef::Blob(v),
        }))
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(bytes) => Value::Text(
                std::str::from_utf8(bytes)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))?
                    .to_owned(),
            ),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        })
    }
}

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
        }
    }
}

/// A Rust scalar that can be stored in a single column.
pub trait Field: Sized {
    const SQL_TYPE: SqlType;

    fn into_value(self) -> Value;
    fn from_value(value: Value) -> DbResult<Self>;
}

impl Field for String {
    const SQL_TYPE: SqlType = SqlType::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }
}

impl Field for i64 {
    const SQL_TYPE: SqlType = SqlType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(other.mismatch("integer")),
        }
    }
}

macro_rules! narrow_integer_field {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                const SQL_TYPE: SqlType = SqlType::Integer;

                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }

                fn from_value(value: Value) -> DbResult<Self> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        TinyOrmError::Decode(format!(
                            "{} does not fit in {}",
                            wide,
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

narrow_integer_field!(i32, u32, i16, u16, u8);

impl Field for bool {
    const SQL_TYPE: SqlType = SqlType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }

    fn from_value(value: Value) -> DbResult<Self> {
        Ok(i64::from_value(value)? != 0)
    }
}

impl Field for f64 {
    const SQL_TYPE: SqlType = SqlType::Real;

    fn into_value(self) -> Value {
        Value::Real(self)
    }

    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Real(v) => Ok(v),
            // SQLite hands back integral reals as integers.
            Value::Integer(v) => Ok(v as f64),
            other => Err(other.mismatch("real")),
        }
    }
}

impl Field for Vec<u8> {
    const SQL_TYPE: SqlType = SqlType::Blob;

    fn into_value(self) -> Value {
        Value::Blob(self)
    }

    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Blob(bytes) => Ok(bytes),
            other => Err(other.mismatch("blob")),
        }
    }
}

impl<F: Field> Field for Option<F> {
    const SQL_TYPE: SqlType = F::SQL_TYPE;

    fn into_value(self) -> Value {
        match self {
            Some(field) => field.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => F::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_conversions() {
        assert_eq!(String::from_value("a".into()).unwrap(), "a");
        assert_eq!(Value::from(7u32), Value::Integer(7));
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert!(bool::from_value(Value::Integer(1)).unwrap());
        assert_eq!(f64::from_value(Value::Integer(3)).unwrap(), 3.0);
    }

    #[test]
    fn value_coerce_to_column_type() {
        assert_eq!(Value::Integer(10).coerce(SqlType::Text), Value::from("10"));
        assert_eq!(Value::Real(1.5).coerce(SqlType::Text), Value::from("1.5"));
        assert_eq!(Value::from(" 42 ").coerce(SqlType::Integer), Value::Integer(42));
        assert_eq!(Value::Real(3.0).coerce(SqlType::Integer), Value::Integer(3));
        assert_eq!(Value::Integer(2).coerce(SqlType::Real), Value::Real(2.0));
        assert_eq!(Value::from("abc").coerce(SqlType::Integer), Value::from("abc"));
        assert_eq!(Value::Null.coerce(SqlType::Text), Value::Null);
    }

    #[test]
    fn field_type_mismatch() {
        assert!(matches!(
            String::from_value(Value::Integer(1)),
            Err(TinyOrmError::Decode(_))
        ));
        assert!(matches!(
            u8::from_value(Value::Integer(300)),
            Err(TinyOrmError::Decode(_))
        ));
    }
}
