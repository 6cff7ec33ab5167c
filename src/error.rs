use sqlx::error::BoxDynError;
use thiserror::Error;

pub type SResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cannot scan {found} into {target}")]
    Unsupported {
        found: &'static str,
        target: &'static str,
    },
    #[error("cannot parse {0:?} as {1}")]
    Parse(String, &'static str),
    #[error("value {0} out of range for {1}")]
    OutOfRange(i64, &'static str),
    #[error("unsupported column type: {0}")]
    ColumnType(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Driver(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(#[from] BoxDynError),
}
