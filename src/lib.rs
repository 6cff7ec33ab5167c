mod error;
mod into_optional;
mod json;
mod optional;
mod sql;
mod sql_value;

pub use crate::error::{SResult, StorageError};
pub use crate::into_optional::IntoOptional;
pub use crate::optional::Optional;
pub use crate::sql::{Scan, SqlOptional, ToSqlValue};
pub use crate::sql_value::SqlValue;
