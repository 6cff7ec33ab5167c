use std::ops::Deref;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{ColumnIndex, Postgres, QueryBuilder, Row};

use crate::error::{SResult, StorageError};
use crate::into_optional::IntoOptional;
use crate::optional::Optional;
use crate::sql_value::SqlValue;

/// Populates a value from a driver-supplied [`SqlValue`].
pub trait Scan {
    fn scan(&mut self, value: &SqlValue) -> SResult<()>;
}

/// Produces the [`SqlValue`] to write for a value.
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SResult<SqlValue>;
}

/// An [`Optional`] restricted to payloads that can scan and bind themselves.
///
/// `NULL` maps to absent in both directions. A payload that fails to scan
/// leaves the container absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlOptional<T: Scan + ToSqlValue> {
    pub(crate) inner: Optional<T>,
}

impl<T: Scan + ToSqlValue + Default> Default for SqlOptional<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Scan + ToSqlValue> SqlOptional<T> {
    pub fn none() -> Self
    where
        T: Default,
    {
        Optional::none().into()
    }

    pub fn some(value: T) -> Self {
        Optional::some(value).into()
    }

    pub fn from_ref(value: Option<&T>) -> Self
    where
        T: Clone + Default,
    {
        Optional::from_ref(value).into()
    }

    pub fn set(&mut self, value: impl IntoOptional<T>) {
        self.inner.set(value);
    }

    pub fn into_inner(self) -> Optional<T> {
        self.inner
    }

    /// Binds this value as the next placeholder of `qb`.
    pub fn push_bind<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) -> SResult<()> {
        self.to_sql_value()?.push_bind(qb);
        Ok(())
    }

    /// Reads one column of `row` and scans it into a fresh container.
    pub fn scan_column<I>(row: &PgRow, index: I) -> SResult<Self>
    where
        T: Default,
        I: ColumnIndex<PgRow>,
    {
        let raw = row.try_get_raw(index)?;
        let value = SqlValue::from_value_ref(raw)?;
        let mut out = Self::none();
        out.scan(&value)?;
        Ok(out)
    }
}

impl<T: Scan + ToSqlValue> From<Optional<T>> for SqlOptional<T> {
    fn from(inner: Optional<T>) -> Self {
        Self { inner }
    }
}

impl<T: Scan + ToSqlValue> Deref for SqlOptional<T> {
    type Target = Optional<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Scan + ToSqlValue + Default> Scan for SqlOptional<T> {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        if value.is_null() {
            *self = Self::none();
            return Ok(());
        }

        if let Err(e) = self.inner.value.scan(value) {
            log::trace!("scan of {} failed, resetting to absent: {e}", value.kind());
            *self = Self::none();
            return Err(e);
        }

        self.inner.present = true;
        Ok(())
    }
}

impl<T: Scan + ToSqlValue> ToSqlValue for SqlOptional<T> {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        if !self.inner.present {
            return Ok(SqlValue::Null);
        }
        self.inner.value.to_sql_value()
    }
}

fn unsupported(found: &SqlValue, target: &'static str) -> StorageError {
    StorageError::Unsupported {
        found: found.kind(),
        target,
    }
}

fn utf8<'a>(bytes: &'a [u8], target: &'static str) -> SResult<&'a str> {
    std::str::from_utf8(bytes).map_err(|_| StorageError::Parse(format!("{bytes:?}"), target))
}

fn parse<T: std::str::FromStr>(s: &str, target: &'static str) -> SResult<T> {
    s.trim()
        .parse()
        .map_err(|_| StorageError::Parse(s.to_string(), target))
}

impl Scan for i64 {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Int(v) => *v,
            SqlValue::Text(s) => parse(s, "i64")?,
            SqlValue::Bytes(b) => parse(utf8(b, "i64")?, "i64")?,
            other => return Err(unsupported(other, "i64")),
        };
        Ok(())
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Int(*self))
    }
}

impl Scan for i32 {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        let mut wide = 0i64;
        wide.scan(value)?;
        *self = i32::try_from(wide).map_err(|_| StorageError::OutOfRange(wide, "i32"))?;
        Ok(())
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Int((*self).into()))
    }
}

/// Largest integer magnitude an `f64` holds without rounding.
const MAX_EXACT_F64_INT: u64 = 1 << 53;

impl Scan for f64 {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Float(v) => *v,
            SqlValue::Int(v) if v.unsigned_abs() <= MAX_EXACT_F64_INT => *v as f64,
            SqlValue::Int(v) => return Err(StorageError::OutOfRange(*v, "f64")),
            SqlValue::Text(s) => parse(s, "f64")?,
            SqlValue::Bytes(b) => parse(utf8(b, "f64")?, "f64")?,
            other => return Err(unsupported(other, "f64")),
        };
        Ok(())
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Float(*self))
    }
}

impl Scan for bool {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Bool(v) => *v,
            SqlValue::Int(0) => false,
            SqlValue::Int(1) => true,
            SqlValue::Text(s) => match s.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
                "0" | "f" | "F" | "false" | "FALSE" | "False" => false,
                _ => return Err(StorageError::Parse(s.clone(), "bool")),
            },
            other => return Err(unsupported(other, "bool")),
        };
        Ok(())
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Bool(*self))
    }
}

impl Scan for String {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Text(s) => s.clone(),
            SqlValue::Bytes(b) => utf8(b, "String")?.to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Timestamp(v) => v.to_rfc3339(),
            other => return Err(unsupported(other, "String")),
        };
        Ok(())
    }
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Text(self.clone()))
    }
}

impl Scan for Vec<u8> {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Bytes(b) => b.clone(),
            SqlValue::Text(s) => s.as_bytes().to_vec(),
            other => return Err(unsupported(other, "bytes")),
        };
        Ok(())
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Bytes(self.clone()))
    }
}

impl Scan for DateTime<Utc> {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Timestamp(v) => *v,
            SqlValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map_err(|_| StorageError::Parse(s.clone(), "timestamp"))?
                .with_timezone(&Utc),
            other => return Err(unsupported(other, "timestamp")),
        };
        Ok(())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Timestamp(*self))
    }
}

impl Scan for serde_json::Value {
    fn scan(&mut self, value: &SqlValue) -> SResult<()> {
        *self = match value {
            SqlValue::Json(v) => v.clone(),
            SqlValue::Text(s) => serde_json::from_str(s)
                .map_err(|_| StorageError::Parse(s.clone(), "json"))?,
            SqlValue::Bytes(b) => serde_json::from_slice(b)
                .map_err(|_| StorageError::Parse(format!("{b:?}"), "json"))?,
            other => return Err(unsupported(other, "json")),
        };
        Ok(())
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(&self) -> SResult<SqlValue> {
        Ok(SqlValue::Json(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Only accepts even integers, and refuses to bind negative ones.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Even(i64);

    impl Scan for Even {
        fn scan(&mut self, value: &SqlValue) -> SResult<()> {
            self.0.scan(value)?;
            if self.0 % 2 != 0 {
                return Err(StorageError::Invalid(format!("{} is odd", self.0)));
            }
            Ok(())
        }
    }

    impl ToSqlValue for Even {
        fn to_sql_value(&self) -> SResult<SqlValue> {
            if self.0 < 0 {
                return Err(StorageError::Invalid("negative".into()));
            }
            self.0.to_sql_value()
        }
    }

    #[test]
    fn scan_null_is_absent() -> SResult<()> {
        let mut o = SqlOptional::some(Even(4));
        o.scan(&SqlValue::Null)?;
        assert!(!o.is_present());
        assert_eq!(Even(0), o.get());
        Ok(())
    }

    #[test]
    fn scan_value_is_present() -> SResult<()> {
        let mut o = SqlOptional::<Even>::none();
        o.scan(&SqlValue::Int(8))?;
        assert!(o.is_present());
        assert_eq!(Even(8), o.get());

        let mut s = SqlOptional::<String>::none();
        s.scan(&SqlValue::Text(String::new()))?;
        assert!(s.is_present());
        assert_eq!("", s.get());
        Ok(())
    }

    #[test]
    fn failed_scan_resets_to_absent() {
        let mut o = SqlOptional::some(Even(2));
        let err = o.scan(&SqlValue::Int(3)).unwrap_err();
        assert!(matches!(err, StorageError::Invalid(ref m) if m == "3 is odd"));
        assert!(!o.is_present());
        assert_eq!(Even(0), o.inner.value);

        let mut o = SqlOptional::<Even>::none();
        let err = o.scan(&SqlValue::Bool(true)).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Unsupported {
                found: "bool",
                target: "i64"
            }
        ));
        assert!(!o.is_present());
    }

    #[test]
    fn bind_absent_is_null() -> SResult<()> {
        assert_eq!(SqlValue::Null, SqlOptional::<Even>::none().to_sql_value()?);
        Ok(())
    }

    #[test]
    fn bind_present_delegates() -> SResult<()> {
        assert_eq!(SqlValue::Int(6), SqlOptional::some(Even(6)).to_sql_value()?);

        let err = SqlOptional::some(Even(-2)).to_sql_value().unwrap_err();
        assert!(matches!(err, StorageError::Invalid(ref m) if m == "negative"));
        Ok(())
    }

    #[test]
    fn push_bind_into_query() -> SResult<()> {
        let mut qb = QueryBuilder::<Postgres>::new("update users set nickname = ");
        SqlOptional::<String>::none().push_bind(&mut qb)?;
        qb.push(", age = ");
        SqlOptional::some(30i32).push_bind(&mut qb)?;
        qb.push(" where id = ");
        SqlOptional::some(1i64).push_bind(&mut qb)?;

        assert_eq!(
            "update users set nickname = NULL, age = $1 where id = $2",
            qb.sql()
        );
        Ok(())
    }

    #[test]
    fn constructors_and_set() {
        let v = 9i64;
        let mut o = SqlOptional::from_ref(Some(&v));
        assert_eq!(9, o.get());
        assert!(SqlOptional::<i64>::from_ref(None) == SqlOptional::none());

        o.set(None);
        assert!(!o.is_present());
        o.set(11);
        assert_eq!(Some(11), o.clone().into_inner().into_option());
        assert_eq!(SqlOptional::<i64>::default(), SqlOptional::none());
    }

    #[test]
    fn builtin_conversions() -> SResult<()> {
        let mut i = 0i32;
        i.scan(&SqlValue::Text(" 12 ".into()))?;
        assert_eq!(12, i);
        assert!(matches!(
            i.scan(&SqlValue::Int(i64::MAX)),
            Err(StorageError::OutOfRange(_, "i32"))
        ));

        let mut f = 0f64;
        f.scan(&SqlValue::Int(2))?;
        assert_eq!(2.0, f);
        f.scan(&SqlValue::Int(-(1 << 53)))?;
        assert_eq!(-9007199254740992.0, f);
        assert!(matches!(
            f.scan(&SqlValue::Int((1 << 53) + 1)),
            Err(StorageError::OutOfRange(9007199254740993, "f64"))
        ));

        let mut b = false;
        b.scan(&SqlValue::Text("t".into()))?;
        assert!(b);
        assert!(b.scan(&SqlValue::Text("maybe".into())).is_err());

        let mut s = String::new();
        s.scan(&SqlValue::Int(5))?;
        assert_eq!("5", s);

        let mut bytes = Vec::new();
        bytes.scan(&SqlValue::Text("ab".into()))?;
        assert_eq!(b"ab".to_vec(), bytes);

        let mut ts = DateTime::<Utc>::default();
        ts.scan(&SqlValue::Text("2024-01-02T03:04:05Z".into()))?;
        assert_eq!("2024-01-02T03:04:05+00:00", ts.to_rfc3339());

        let mut j = serde_json::Value::Null;
        j.scan(&SqlValue::Text(r#"{"k":[1,2]}"#.into()))?;
        assert_eq!(serde_json::json!({"k": [1, 2]}), j);
        Ok(())
    }

    #[test]
    fn serializes_like_optional() -> serde_json::Result<()> {
        assert_eq!("0", serde_json::to_string(&SqlOptional::<i64>::none())?);
        assert_eq!("7", serde_json::to_string(&SqlOptional::some(7i64))?);

        let o: SqlOptional<String> = serde_json::from_str(r#""""#)?;
        assert!(o.is_present());
        Ok(())
    }
}
