use crate::cancel::Cancelled;
use table_columnar::{BuilderError, ProblemError, StorageType, Value};

pub type GroupingResult<T> = Result<T, GroupingError>;

/// Fatal failures of grouping and aggregation.
///
/// Data-quality issues are never reported through this type; they travel as problems next to the
/// result.
#[derive(Debug, thiserror::Error)]
pub enum GroupingError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("key column {column} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("grouping strategy covers {actual} key columns, expected {expected}")]
    StrategyCountMismatch { expected: usize, actual: usize },

    #[error("duplicate output column: {name}")]
    DuplicateColumn { name: String },

    #[error("order map expects {expected} rows but the groups cover {actual}")]
    OrderMapSize { expected: usize, actual: usize },

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Problems(#[from] ProblemError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("{aggregator} expected {expected}, but got {value}")]
    TypeMismatch {
        aggregator: String,
        expected: &'static str,
        value: Value,
    },

    #[error("{aggregator} cannot be applied to column {column} of type {storage_type}")]
    UnsupportedColumnType {
        aggregator: String,
        column: String,
        storage_type: StorageType,
    },
}
