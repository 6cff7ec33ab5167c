use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgValueRef;
use sqlx::types::Json;
use sqlx::{Decode, Postgres, QueryBuilder, TypeInfo, ValueRef};

use crate::error::{SResult, StorageError};

/// A single value as exchanged with the storage driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Json(_) => "json",
        }
    }

    /// Pushes a placeholder bound to this value. `Null` is written inline so
    /// that Postgres infers its type from the surrounding statement.
    pub fn push_bind<'args>(self, qb: &mut QueryBuilder<'args, Postgres>) {
        match self {
            SqlValue::Null => {
                qb.push("NULL");
            }
            SqlValue::Bool(v) => {
                qb.push_bind(v);
            }
            SqlValue::Int(v) => {
                qb.push_bind(v);
            }
            SqlValue::Float(v) => {
                qb.push_bind(v);
            }
            SqlValue::Text(v) => {
                qb.push_bind(v);
            }
            SqlValue::Bytes(v) => {
                qb.push_bind(v);
            }
            SqlValue::Timestamp(v) => {
                qb.push_bind(v);
            }
            SqlValue::Json(v) => {
                qb.push_bind(Json(v));
            }
        }
    }

    /// Reads a raw Postgres column, choosing the variant from its type.
    pub fn from_value_ref(value: PgValueRef<'_>) -> SResult<Self> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        let type_name = value.type_info().name().to_string();
        let v = match type_name.as_str() {
            "BOOL" => SqlValue::Bool(<bool as Decode<Postgres>>::decode(value)?),
            "INT2" => SqlValue::Int(<i16 as Decode<Postgres>>::decode(value)?.into()),
            "INT4" => SqlValue::Int(<i32 as Decode<Postgres>>::decode(value)?.into()),
            "INT8" => SqlValue::Int(<i64 as Decode<Postgres>>::decode(value)?),
            "FLOAT4" => SqlValue::Float(<f32 as Decode<Postgres>>::decode(value)?.into()),
            "FLOAT8" => SqlValue::Float(<f64 as Decode<Postgres>>::decode(value)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                SqlValue::Text(<String as Decode<Postgres>>::decode(value)?)
            }
            "BYTEA" => SqlValue::Bytes(<Vec<u8> as Decode<Postgres>>::decode(value)?),
            "TIMESTAMPTZ" => {
                SqlValue::Timestamp(<DateTime<Utc> as Decode<Postgres>>::decode(value)?)
            }
            "TIMESTAMP" => {
                SqlValue::Timestamp(<NaiveDateTime as Decode<Postgres>>::decode(value)?.and_utc())
            }
            "JSON" | "JSONB" => {
                let Json(v) = <Json<serde_json::Value> as Decode<Postgres>>::decode(value)?;
                SqlValue::Json(v)
            }
            _ => return Err(StorageError::ColumnType(type_name)),
        };
        Ok(v)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        SqlValue::Json(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_bind_numbers_placeholders() {
        let mut qb = QueryBuilder::<Postgres>::new("insert into users (name, age, bio) values (");
        SqlValue::from("ann").push_bind(&mut qb);
        qb.push(", ");
        SqlValue::from(41).push_bind(&mut qb);
        qb.push(", ");
        SqlValue::from(None::<String>).push_bind(&mut qb);
        qb.push(")");

        assert_eq!(
            "insert into users (name, age, bio) values ($1, $2, NULL)",
            qb.sql()
        );
    }

    #[test]
    fn push_bind_all_kinds() {
        let values = vec![
            SqlValue::Bool(true),
            SqlValue::Float(1.5),
            SqlValue::Bytes(vec![1, 2]),
            SqlValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
            SqlValue::Json(serde_json::json!({"a": 1})),
        ];
        let mut qb = QueryBuilder::<Postgres>::new("select ");
        for v in values {
            v.push_bind(&mut qb);
            qb.push(" ");
        }
        assert_eq!("select $1 $2 $3 $4 $5 ", qb.sql());
    }

    #[test]
    fn conversions_and_kinds() {
        assert!(SqlValue::from(None::<i64>).is_null());
        assert_eq!(SqlValue::Int(3), SqlValue::from(Some(3i64)));
        assert_eq!("text", SqlValue::from("x").kind());
        assert_eq!("int", SqlValue::from(7i32).kind());
        assert_eq!("json", SqlValue::from(serde_json::Value::Null).kind());
        assert_eq!("null", SqlValue::Null.kind());
    }
}
